//! Glove GATT Protocol
//!
//! Attribute types exchanged with the transport during discovery, and the
//! constants needed to switch notifications on.
//!
//! # Glove GATT layout
//!
//! ```text
//! service[0]
//!   characteristic[0]  stretch words, notify   -> descriptors: CCCD (0x2902)
//!   characteristic[1]  IMU words, notify       -> descriptors: CCCD (0x2902)
//!                      (present on IMU gloves only)
//! ```

use crate::domain::models::ChannelId;

/// Client Characteristic Configuration Descriptor UUID (16-bit form)
pub const CCCD_UUID: u16 = 0x2902;

/// CCCD value bits
pub mod cccd {
    pub const NOTIFY: u16 = 0x0001;
}

/// Little-endian CCCD payload switching notifications on or off.
pub fn cccd_value(enable_notifications: bool) -> [u8; 2] {
    let bits = if enable_notifications { cccd::NOTIFY } else { 0 };
    bits.to_le_bytes()
}

/// Answer to the sizing half of a two-phase enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountReply {
    /// The transport has `n` entries and needs a buffer to return them
    MoreData(u16),
    /// The transport reported nothing further to fetch
    NoMoreData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub uuid: String,
    pub attribute_handle: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicRef {
    pub uuid: String,
    pub service_handle: u16,
    /// Handle reported on value-changed events
    pub attribute_handle: ChannelId,
    pub notifiable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    ClientCharacteristicConfiguration,
    Other(u16),
}

impl DescriptorKind {
    pub fn from_uuid(uuid: u16) -> Self {
        if uuid == CCCD_UUID {
            Self::ClientCharacteristicConfiguration
        } else {
            Self::Other(uuid)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRef {
    pub kind: DescriptorKind,
    pub characteristic_handle: ChannelId,
    pub attribute_handle: u16,
}

/// The descriptor that controls notifications for a characteristic.
pub fn find_notification_descriptor(descriptors: &[DescriptorRef]) -> Option<&DescriptorRef> {
    descriptors
        .iter()
        .find(|d| d.kind == DescriptorKind::ClientCharacteristicConfiguration)
}
