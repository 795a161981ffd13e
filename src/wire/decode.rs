//! Sample frame decoding.
//!
//! Offset-based, single-pass, no backtracking. The header's declared
//! `length` is not trusted: every read is bounds-checked against the actual
//! buffer and a shortfall fails with
//! [`TruncatedFrame`](crate::EconestError::TruncatedFrame) instead of
//! reading out of bounds.

use tracing::trace;

use super::{
    CHANNELS_PER_SUB_DEVICE, ChannelSample, FrameHeader, SAMPLE_FRAME_KIND, SamplePayload,
    SubDeviceSamples,
};
use crate::{EconestError, Result};

// Sanity cap on the header's declared payload length. A sample frame with
// the maximum 255 sub-devices is under 21 KiB; anything claiming more than
// this is protocol drift, not data.
const MAX_DECLARED_LENGTH: u32 = 1 << 20;

impl FrameHeader {
    /// Check the header invariants before any payload field is read.
    pub fn validate(&self) -> Result<()> {
        if self.kind != SAMPLE_FRAME_KIND {
            return Err(EconestError::UnsupportedFrameKind { kind: self.kind });
        }
        if self.length > MAX_DECLARED_LENGTH {
            return Err(EconestError::MalformedFrame {
                details: format!("declared length {} exceeds {}", self.length, MAX_DECLARED_LENGTH),
            });
        }
        Ok(())
    }
}

/// Decode one binary message into a [`SamplePayload`].
///
/// Fails with [`EconestError::UnsupportedFrameKind`] for non-sample frames
/// (the caller drops those silently) and
/// [`EconestError::TruncatedFrame`] when any field would read past the end
/// of the buffer. Deterministic and side-effect free.
pub fn decode_sample_frame(data: &[u8]) -> Result<SamplePayload> {
    let mut offset = 0usize;

    let header = FrameHeader {
        version: read_u32(data, &mut offset, "frame header")?,
        checksum: read_u32(data, &mut offset, "frame header")?,
        kind: read_u32(data, &mut offset, "frame header")?,
        length: read_u32(data, &mut offset, "frame header")?,
    };
    header.validate()?;

    let timestamp = read_u32(data, &mut offset, "sample payload")?;
    let sub_device_count = read_u8(data, &mut offset, "sample payload")?;

    let main = read_channel_sample(data, &mut offset, "main channel")?;

    let mut sub_devices = Vec::with_capacity(sub_device_count as usize);
    for _ in 0..sub_device_count {
        let number = read_u8(data, &mut offset, "sub-device block")?;
        let mut channels = [ChannelSample::default(); CHANNELS_PER_SUB_DEVICE];
        for channel in channels.iter_mut() {
            *channel = read_channel_sample(data, &mut offset, "sub-device block")?;
        }
        sub_devices.push(SubDeviceSamples { number, channels });
    }

    trace!(
        "Decoded sample frame: version={}, timestamp={}, sub_devices={}",
        header.version,
        timestamp,
        sub_devices.len()
    );

    Ok(SamplePayload { timestamp, main, sub_devices })
}

fn read_channel_sample(
    data: &[u8],
    offset: &mut usize,
    context: &'static str,
) -> Result<ChannelSample> {
    let power = read_i32(data, offset, context)?;
    let energy = read_u32(data, offset, context)?;
    Ok(ChannelSample { power, energy })
}

/// Bounds-checked little-endian read helpers. Each advances `offset` only
/// on success.
fn read_u32(data: &[u8], offset: &mut usize, context: &'static str) -> Result<u32> {
    let bytes = take(data, offset, 4, context)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_i32(data: &[u8], offset: &mut usize, context: &'static str) -> Result<i32> {
    let bytes = take(data, offset, 4, context)?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u8(data: &[u8], offset: &mut usize, context: &'static str) -> Result<u8> {
    let bytes = take(data, offset, 1, context)?;
    Ok(bytes[0])
}

fn take<'a>(
    data: &'a [u8],
    offset: &mut usize,
    needed: usize,
    context: &'static str,
) -> Result<&'a [u8]> {
    let start = *offset;
    let end = start.checked_add(needed).ok_or(EconestError::TruncatedFrame {
        context,
        offset: start,
        needed,
        available: data.len().saturating_sub(start),
    })?;
    if end > data.len() {
        return Err(EconestError::TruncatedFrame {
            context,
            offset: start,
            needed,
            available: data.len().saturating_sub(start),
        });
    }
    *offset = end;
    Ok(&data[start..end])
}
