//! Notification payload decoding
//!
//! Both glove characteristics carry consecutive big-endian `u16` words:
//!
//! ```text
//! stretch: [s0 hi][s0 lo][s1 hi][s1 lo] ... one word per sensor
//! imu:     [ox][oy][oz][ax][ay][az]         orientation then acceleration
//! ```

use crate::domain::identifier::GloveProfile;
use crate::domain::models::{ChannelId, IMU_WORDS};
use tracing::debug;

/// Characteristic handles bound to a glove during connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelBinding {
    pub stretch: Option<ChannelId>,
    pub imu: Option<ChannelId>,
}

/// A decoded notification. Short payloads yield fewer words than the
/// channel carries; only the decoded prefix is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Stretch(Vec<u16>),
    Imu(Vec<u16>),
}

/// Decode up to `count` big-endian words; a trailing odd byte is dropped.
pub fn decode_words(payload: &[u8], count: usize) -> Vec<u16> {
    payload
        .chunks_exact(2)
        .take(count)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Turn a raw notification into a frame for the channel it arrived on.
///
/// Returns `None` for channels that are not bound to this glove, and for IMU
/// notifications on gloves without an IMU.
pub fn decode_frame(
    profile: &GloveProfile,
    channels: &ChannelBinding,
    channel: ChannelId,
    payload: &[u8],
) -> Option<Frame> {
    if channels.stretch == Some(channel) {
        let words = decode_words(payload, profile.sensor_count());
        if words.len() < profile.sensor_count() {
            debug!(
                "Short stretch payload on {}: {} of {} words",
                channel,
                words.len(),
                profile.sensor_count()
            );
        }
        Some(Frame::Stretch(words))
    } else if profile.has_imu && channels.imu == Some(channel) {
        let words = decode_words(payload, IMU_WORDS);
        if words.len() < IMU_WORDS {
            debug!(
                "Short IMU payload on {}: {} of {} words",
                channel,
                words.len(),
                IMU_WORDS
            );
        }
        Some(Frame::Imu(words))
    } else {
        None
    }
}
