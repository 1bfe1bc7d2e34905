//! Glove library error types

use crate::domain::models::GloveId;
use std::fmt;
use thiserror::Error;

/// Discovery step a connection attempt was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStep {
    Services,
    Characteristics,
    Descriptors { channel: usize },
}

impl fmt::Display for DiscoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Services => f.write_str("services"),
            Self::Characteristics => f.write_str("characteristics"),
            Self::Descriptors { channel } => write!(f, "descriptors of channel {}", channel),
        }
    }
}

/// Errors reported by a transport implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No peripheral answers to the identifier
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Platform call returned a failure status code
    #[error("Transport status {0:#010x}")]
    Status(u32),

    /// Handle was released or never issued by this transport
    #[error("Stale handle")]
    StaleHandle,
}

/// Errors from registry and connection operations
#[derive(Error, Debug)]
pub enum GloveError {
    /// Unknown glove id
    #[error("Invalid glove handle: {0}")]
    InvalidHandle(GloveId),

    /// Identifier string does not encode a usable topology
    #[error("Malformed identifier {identifier:?}: {reason}")]
    MalformedIdentifier { identifier: String, reason: String },

    /// Transport could not open a handle for the identifier
    #[error("Could not resolve device handle")]
    HandleResolution(#[source] TransportError),

    /// Unexpected answer while discovering the GATT layout
    #[error("Enumeration of {step} failed: {reason}")]
    ProtocolEnumeration { step: DiscoveryStep, reason: String },

    /// Discovery buffer could not be sized or reserved
    #[error("Could not allocate {count} entries for {step}")]
    Allocation { step: DiscoveryStep, count: usize },

    /// Enabling notifications on a channel failed
    #[error("Could not enable notifications on channel {channel}")]
    DescriptorWrite {
        channel: usize,
        #[source]
        source: TransportError,
    },

    /// Registering the value-changed callback failed
    #[error("Could not subscribe to channel {channel}")]
    Subscription {
        channel: usize,
        #[source]
        source: TransportError,
    },
}

pub type Result<T> = std::result::Result<T, GloveError>;
