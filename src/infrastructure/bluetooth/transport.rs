//! GATT transport boundary
//!
//! The library never talks to an OS Bluetooth stack directly. Device lookup,
//! attribute discovery and notification delivery are provided by a
//! [`GattTransport`] implementation.
//!
//! Discovery follows the two-phase pattern of the platform GATT APIs: a
//! sizing call answers [`CountReply::MoreData`] with the entry count, the
//! caller reserves a buffer of that size, and a second call fills it.
//!
//! # Contract
//!
//! - Calls on one handle are issued strictly in discovery order; calling out of
//!   order is a transport-level protocol error.
//! - Fill calls push at most `buffer.capacity()` entries.
//! - Notification callbacks may run on any thread, concurrently with every
//!   other method.
//! - [`GattTransport::unsubscribe`] must not return while the callback it
//!   revokes is still running, and must guarantee it is never invoked again.

use crate::domain::error::TransportError;
use crate::domain::models::ChannelId;
use crate::infrastructure::bluetooth::protocol::{
    CharacteristicRef, CountReply, DescriptorRef, ServiceRef,
};
use std::sync::Arc;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Invoked with the changed characteristic's handle and its new value.
pub type NotificationCallback = Arc<dyn Fn(ChannelId, &[u8]) + Send + Sync>;

pub trait GattTransport: Send + Sync {
    /// Opaque communication handle for one device
    type Handle: Send;
    /// Token for one registered value-changed callback
    type Subscription: Send;

    /// Open a handle for the device named by `identifier`.
    fn resolve_handle(&self, identifier: &str) -> TransportResult<Self::Handle>;

    fn service_count(&self, handle: &Self::Handle) -> TransportResult<CountReply>;

    fn services(
        &self,
        handle: &Self::Handle,
        buffer: &mut Vec<ServiceRef>,
    ) -> TransportResult<()>;

    fn characteristic_count(
        &self,
        handle: &Self::Handle,
        service: &ServiceRef,
    ) -> TransportResult<CountReply>;

    fn characteristics(
        &self,
        handle: &Self::Handle,
        service: &ServiceRef,
        buffer: &mut Vec<CharacteristicRef>,
    ) -> TransportResult<()>;

    fn descriptor_count(
        &self,
        handle: &Self::Handle,
        characteristic: &CharacteristicRef,
    ) -> TransportResult<CountReply>;

    fn descriptors(
        &self,
        handle: &Self::Handle,
        characteristic: &CharacteristicRef,
        buffer: &mut Vec<DescriptorRef>,
    ) -> TransportResult<()>;

    /// Write the client configuration descriptor.
    fn write_descriptor(
        &self,
        handle: &Self::Handle,
        descriptor: &DescriptorRef,
        enable_notifications: bool,
    ) -> TransportResult<()>;

    /// Register `callback` for value changes on `characteristic`.
    fn subscribe(
        &self,
        handle: &Self::Handle,
        characteristic: &CharacteristicRef,
        callback: NotificationCallback,
    ) -> TransportResult<Self::Subscription>;

    /// Revoke a callback and wait for any in-flight invocation to finish.
    fn unsubscribe(&self, handle: &Self::Handle, subscription: Self::Subscription);

    fn release_handle(&self, handle: Self::Handle);
}
