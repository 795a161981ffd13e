//! Econest wire format structures and decoding.
//!
//! The device pushes binary frames over its streaming interface. Sample
//! frames carry one measurement for the main channel plus a variable number
//! of sub-devices, each reporting a fixed block of 10 channels:
//!
//! 1. **Frame header** (16 bytes) - version, checksum, kind, declared length
//! 2. **Sample payload** (5 bytes) - timestamp, sub-device count
//! 3. **Main channel** (8 bytes) - instantaneous power, cumulative energy
//! 4. **Sub-device blocks** (81 bytes each) - device number, 10 channel pairs
//!
//! All fields are little-endian with no padding. Only frames with
//! `kind == 2` are sample frames; other kinds belong to unrelated parts of
//! the device protocol and are skipped by the caller.
//!
//! Decoding is a pure function over a byte slice: no I/O, no state, every
//! read bounds-checked against the received buffer.

pub mod decode;

pub use decode::decode_sample_frame;

/// Header kind value marking a sample-data frame.
pub const SAMPLE_FRAME_KIND: u32 = 2;

/// Fixed channel count reported by every sub-device block.
pub const CHANNELS_PER_SUB_DEVICE: usize = 10;

/// Size of the frame header in bytes.
pub const FRAME_HEADER_LEN: usize = 16;

/// Frame header present on every message from the streaming interface.
///
/// ```text
/// struct econestWsPkgHead {
///   uint32_t version;   // offset 0
///   uint32_t crc;       // offset 4, not verified
///   uint32_t type;      // offset 8, 2 = sample data
///   uint32_t length;    // offset 12, declared payload length
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u32,
    pub checksum: u32,
    pub kind: u32,
    pub length: u32,
}

/// One power/energy measurement pair.
///
/// `power` is signed instantaneous watts (negative values represent export
/// or reverse flow); `energy` is the device's raw cumulative counter with
/// no defined wraparound semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSample {
    pub power: i32,
    pub energy: u32,
}

/// Channel block reported by one metering sub-device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubDeviceSamples {
    /// Device-assigned unit number.
    pub number: u8,
    /// Always exactly [`CHANNELS_PER_SUB_DEVICE`] channels, in wire order.
    pub channels: [ChannelSample; CHANNELS_PER_SUB_DEVICE],
}

/// Fully decoded sample frame.
///
/// The wire-level sub-device count is `sub_devices.len()`; consecutive
/// frames from the same device may legitimately report different counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePayload {
    /// Device timestamp for this sample batch.
    pub timestamp: u32,
    /// Main channel measurement.
    pub main: ChannelSample,
    /// Sub-device blocks in arrival order.
    pub sub_devices: Vec<SubDeviceSamples>,
}
