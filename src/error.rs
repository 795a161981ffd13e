//! Error types for the Econest telemetry client.
//!
//! All fallible operations in this crate return [`Result`] with
//! [`EconestError`]. Variants fall into three containment tiers:
//!
//! - **Frame errors** ([`EconestError::UnsupportedFrameKind`],
//!   [`EconestError::TruncatedFrame`], [`EconestError::MalformedFrame`]) —
//!   produced by the decoder, contained inside the session's receive loop.
//!   The offending message is dropped and streaming continues.
//! - **Connection errors** ([`EconestError::Handshake`],
//!   [`EconestError::Connection`], [`EconestError::Transport`]) — end the
//!   current session, contained inside the supervisor's retry loop.
//! - **[`EconestError::Cancelled`]** — cooperative stop; the clean shutdown
//!   path, not a failure.
//!
//! Use [`EconestError::is_retryable`] to tell the tiers apart when routing
//! an error, and the helper constructors for the common cases:
//!
//! ```rust
//! use econest::EconestError;
//!
//! let error = EconestError::connection_failed("all candidate addresses exhausted");
//! assert!(error.is_retryable());
//! ```

use thiserror::Error;

/// Result type alias for Econest client operations.
pub type Result<T, E = EconestError> = std::result::Result<T, E>;

/// Boxed source error carried by connection-tier variants.
type Source = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for Econest client operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EconestError {
    /// Frame header carried a kind other than the sample-data sentinel.
    /// The message belongs to another part of the device protocol and is
    /// dropped without escalation.
    #[error("unsupported frame kind {kind}")]
    UnsupportedFrameKind { kind: u32 },

    /// A field read would run past the end of the received buffer.
    #[error(
        "truncated frame in {context}: need {needed} bytes at offset {offset}, have {available}"
    )]
    TruncatedFrame { context: &'static str, offset: usize, needed: usize, available: usize },

    /// Frame failed a structural sanity check that bounds checking alone
    /// cannot attribute to truncation.
    #[error("malformed frame: {details}")]
    MalformedFrame { details: String },

    /// A handshake call against one candidate address failed.
    #[error("handshake with {address} failed: {reason}")]
    Handshake {
        address: String,
        reason: String,
        #[source]
        source: Option<Source>,
    },

    /// Session could not be established on any candidate address.
    #[error("connection failed: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Source>,
    },

    /// Mid-stream read or write failure, including a failed heartbeat probe.
    #[error("transport error: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Source>,
    },

    /// Cooperative stop requested by the owner.
    #[error("operation cancelled")]
    Cancelled,
}

impl EconestError {
    /// Returns whether the supervisor should retry after this error.
    ///
    /// Frame errors never reach the supervisor, so only the connection tier
    /// answers `true`; [`EconestError::Cancelled`] ends the retry loop.
    pub fn is_retryable(&self) -> bool {
        match self {
            EconestError::Handshake { .. } => true,
            EconestError::Connection { .. } => true,
            EconestError::Transport { .. } => true,
            EconestError::UnsupportedFrameKind { .. } => false,
            EconestError::TruncatedFrame { .. } => false,
            EconestError::MalformedFrame { .. } => false,
            EconestError::Cancelled => false,
        }
    }

    /// Returns whether this is a decode-level error that must stay contained
    /// within the receive loop.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            EconestError::UnsupportedFrameKind { .. }
                | EconestError::TruncatedFrame { .. }
                | EconestError::MalformedFrame { .. }
        )
    }

    /// Helper constructor for handshake failures against one address.
    pub fn handshake_failed(address: impl Into<String>, reason: impl Into<String>) -> Self {
        EconestError::Handshake { address: address.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for handshake failures with an underlying cause.
    pub fn handshake_failed_with_source(
        address: impl Into<String>,
        reason: impl Into<String>,
        source: Source,
    ) -> Self {
        EconestError::Handshake {
            address: address.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for session-level connection failures.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        EconestError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection failures with an underlying cause.
    pub fn connection_failed_with_source(reason: impl Into<String>, source: Source) -> Self {
        EconestError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for mid-stream transport failures.
    pub fn transport_error(reason: impl Into<String>) -> Self {
        EconestError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport failures with an underlying cause.
    pub fn transport_error_with_source(reason: impl Into<String>, source: Source) -> Self {
        EconestError::Transport { reason: reason.into(), source: Some(source) }
    }
}
