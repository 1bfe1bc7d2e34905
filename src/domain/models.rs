use std::fmt;

/// Number of logical finger joints reported for every glove, regardless of topology.
pub const JOINT_COUNT: usize = 15;

/// Number of orientation readings placed ahead of the joints in the output.
pub const ORIENTATION_COUNT: usize = 3;

/// Length of the host-facing output: orientation xyz then 15 joints.
pub const OUTPUT_LEN: usize = ORIENTATION_COUNT + JOINT_COUNT;

/// IMU words per notification: orientation (x, y, z) then acceleration (x, y, z).
pub const IMU_WORDS: usize = 6;

/// Fixed-point divisor applied to IMU orientation words.
pub const ORIENTATION_SCALE: f64 = 100.0;

/// One complete reading for the host: `[0..3]` orientation, `[3..18]` joints
/// ordered thumb base to pinky tip.
pub type GloveReading = [f64; OUTPUT_LEN];

/// Stable handle assigned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GloveId(pub usize);

impl fmt::Display for GloveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "glove {}", self.0)
    }
}

/// Attribute handle of a notifying characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u16);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    ConnectionStatus {
        glove: GloveId,
        status: ConnectionStatus,
    },
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
