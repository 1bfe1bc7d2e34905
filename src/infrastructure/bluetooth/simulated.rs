//! In-process glove transport
//!
//! Emulates the GATT layout of StretchSense gloves without a radio. Used by
//! the demo host to stream synthetic hand motion and by tests to script
//! failures at any discovery step and to check call ordering.

use crate::domain::error::TransportError;
use crate::domain::identifier::GloveProfile;
use crate::domain::models::{ChannelId, IMU_WORDS};
use crate::infrastructure::bluetooth::protocol::{
    cccd_value, CharacteristicRef, CountReply, DescriptorKind, DescriptorRef, ServiceRef,
    CCCD_UUID,
};
use crate::infrastructure::bluetooth::transport::{
    GattTransport, NotificationCallback, TransportResult,
};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Glove service UUID ("stretchsense" in the trailing bytes)
pub const GLOVE_SERVICE_UUID: &str = "00001000-7374-7265-7563-6873656e7365";

/// Attribute handles of the stretch and IMU characteristics
const CHANNEL_HANDLES: [u16; 2] = [0x000E, 0x0012];

/// Characteristic user description descriptor
const USER_DESCRIPTION_UUID: u16 = 0x2901;

/// Transport call, recorded in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    ResolveHandle,
    ServiceCount,
    Services,
    CharacteristicCount,
    Characteristics,
    DescriptorCount,
    Descriptors,
    WriteDescriptor,
    Subscribe,
    Unsubscribe,
    ReleaseHandle,
}

/// Scripted misbehaviour for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Service count query answers without asking for a buffer
    ServiceCountComplete,
    /// Service count query reports zero services
    ZeroServices,
    /// Characteristic count query answers without asking for a buffer
    CharacteristicCountComplete,
    /// Only the stretch characteristic is exposed
    SingleCharacteristic,
    /// Descriptor count query for `channel` answers without asking for a buffer
    DescriptorCountComplete { channel: usize },
    /// Descriptor count query for `channel` reports zero descriptors
    ZeroDescriptors { channel: usize },
    /// Descriptor list for `channel` lacks the configuration descriptor
    MissingCccd { channel: usize },
    WriteDescriptorFails { channel: usize },
    SubscribeFails { channel: usize },
}

/// Transport status reported for injected failures
const STATUS_FAILURE: u32 = 0x8000_4005;

#[derive(Debug)]
pub struct SimHandle {
    device: usize,
    serial: u64,
}

#[derive(Debug)]
pub struct SimSubscription {
    id: u64,
}

struct Subscriber {
    id: u64,
    handle_serial: u64,
    channel: ChannelId,
    callback: NotificationCallback,
}

struct SimulatedGlove {
    identifier: String,
    channel_count: usize,
    faults: Vec<Fault>,
    subscribers: Vec<Subscriber>,
    /// Last value written to each channel's CCCD
    cccd: [[u8; 2]; 2],
}

impl SimulatedGlove {
    fn new(identifier: &str, channel_count: usize) -> Self {
        Self {
            identifier: identifier.to_string(),
            channel_count,
            faults: Vec::new(),
            subscribers: Vec::new(),
            cccd: [cccd_value(false); 2],
        }
    }

    fn has_fault(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn characteristic(&self, index: usize) -> CharacteristicRef {
        CharacteristicRef {
            uuid: format!("{:08x}-7374-7265-7563-6873656e7365", 0x1001 + index),
            service_handle: 0x000C,
            attribute_handle: ChannelId(CHANNEL_HANDLES[index]),
            notifiable: true,
        }
    }

    fn exposed_characteristics(&self) -> usize {
        if self.has_fault(Fault::SingleCharacteristic) {
            1
        } else {
            self.channel_count
        }
    }

    fn channel_index(&self, handle: ChannelId) -> Option<usize> {
        CHANNEL_HANDLES
            .iter()
            .take(self.channel_count)
            .position(|h| ChannelId(*h) == handle)
    }

    fn descriptors(&self, index: usize) -> Vec<DescriptorRef> {
        let characteristic_handle = ChannelId(CHANNEL_HANDLES[index]);
        let mut descriptors = vec![DescriptorRef {
            kind: DescriptorKind::from_uuid(USER_DESCRIPTION_UUID),
            characteristic_handle,
            attribute_handle: characteristic_handle.0 + 1,
        }];
        if !self.has_fault(Fault::MissingCccd { channel: index }) {
            descriptors.push(DescriptorRef {
                kind: DescriptorKind::from_uuid(CCCD_UUID),
                characteristic_handle,
                attribute_handle: characteristic_handle.0 + 2,
            });
        }
        descriptors
    }
}

#[derive(Default)]
struct Inner {
    devices: Vec<SimulatedGlove>,
    calls: Vec<Call>,
    open_handles: HashSet<u64>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn device(&self, handle: &SimHandle) -> TransportResult<&SimulatedGlove> {
        if !self.open_handles.contains(&handle.serial) {
            return Err(TransportError::StaleHandle);
        }
        self.devices
            .get(handle.device)
            .ok_or(TransportError::StaleHandle)
    }

    fn device_mut(&mut self, handle: &SimHandle) -> TransportResult<&mut SimulatedGlove> {
        if !self.open_handles.contains(&handle.serial) {
            return Err(TransportError::StaleHandle);
        }
        self.devices
            .get_mut(handle.device)
            .ok_or(TransportError::StaleHandle)
    }
}

#[derive(Default)]
pub struct SimulatedTransport {
    inner: Mutex<Inner>,
    // Held for the whole of every callback invocation so unsubscribe can drain.
    delivery: Mutex<()>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: Call) -> MutexGuard<'_, Inner> {
        let mut inner = self.inner();
        inner.calls.push(call);
        inner
    }

    /// Make a glove reachable under `identifier`. Its layout follows the
    /// identifier; unparseable identifiers get a stretch channel only.
    pub fn add_glove(&self, identifier: &str) {
        let channel_count = GloveProfile::parse(identifier)
            .map(|p| p.channel_count())
            .unwrap_or(1);
        self.inner()
            .devices
            .push(SimulatedGlove::new(identifier, channel_count));
    }

    pub fn inject_fault(&self, identifier: &str, fault: Fault) {
        let mut inner = self.inner();
        if let Some(device) = inner
            .devices
            .iter_mut()
            .find(|d| d.identifier == identifier)
        {
            device.faults.push(fault);
        }
    }

    pub fn clear_faults(&self, identifier: &str) {
        let mut inner = self.inner();
        if let Some(device) = inner
            .devices
            .iter_mut()
            .find(|d| d.identifier == identifier)
        {
            device.faults.clear();
        }
    }

    /// Transport calls issued so far.
    pub fn calls(&self) -> Vec<Call> {
        self.inner().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner().calls.clear();
    }

    pub fn open_handles(&self) -> usize {
        self.inner().open_handles.len()
    }

    pub fn active_subscriptions(&self, identifier: &str) -> usize {
        self.inner()
            .devices
            .iter()
            .filter(|d| d.identifier == identifier)
            .map(|d| d.subscribers.len())
            .sum()
    }

    /// Deliver a raw value change on characteristic `channel` (0 stretch, 1 IMU).
    ///
    /// Returns how many callbacks ran.
    pub fn notify(&self, identifier: &str, channel: usize, payload: &[u8]) -> usize {
        let Some(&handle) = CHANNEL_HANDLES.get(channel) else {
            return 0;
        };
        let handle = ChannelId(handle);
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let callbacks: Vec<NotificationCallback> = self
            .inner()
            .devices
            .iter()
            .filter(|d| d.identifier == identifier)
            .flat_map(|d| d.subscribers.iter())
            .filter(|s| s.channel == handle)
            .map(|s| s.callback.clone())
            .collect();

        trace!(
            "Delivering {} bytes on {} to {} subscriber(s)",
            payload.len(),
            handle,
            callbacks.len()
        );
        for callback in &callbacks {
            callback(handle, payload);
        }
        callbacks.len()
    }

    /// Deliver big-endian stretch words.
    pub fn notify_stretch(&self, identifier: &str, raw: &[u16]) -> usize {
        self.notify(identifier, 0, &encode_words(raw))
    }

    /// Deliver big-endian IMU words.
    pub fn notify_imu(&self, identifier: &str, raw: &[u16; IMU_WORDS]) -> usize {
        self.notify(identifier, 1, &encode_words(raw))
    }

    /// Push one frame of synthetic hand motion to every subscribed glove.
    ///
    /// Fingers curl and open on staggered sine waves while the palm heading
    /// turns slowly, all derived from `phase` in radians.
    pub fn stream_tick(&self, phase: f64) {
        let targets: Vec<(String, usize)> = self
            .inner()
            .devices
            .iter()
            .filter(|d| !d.subscribers.is_empty())
            .map(|d| {
                let sensors = GloveProfile::parse(&d.identifier)
                    .map(|p| p.sensor_count())
                    .unwrap_or(0);
                (d.identifier.clone(), sensors)
            })
            .collect();

        for (identifier, sensors) in targets {
            let stretch: Vec<u16> = (0..sensors)
                .map(|i| {
                    let wave = (phase + i as f64 * 0.4).sin();
                    (1200.0 + 800.0 * wave) as u16
                })
                .collect();
            self.notify_stretch(&identifier, &stretch);

            let heading = (phase.to_degrees() * 10.0).rem_euclid(360.0);
            let imu = [
                (heading * 100.0) as u16,
                ((phase.sin() * 20.0 + 180.0) * 100.0) as u16,
                ((phase.cos() * 10.0 + 180.0) * 100.0) as u16,
                0,
                0,
                980,
            ];
            self.notify_imu(&identifier, &imu);
        }
    }
}

fn encode_words(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

fn injected() -> TransportError {
    TransportError::Status(STATUS_FAILURE)
}

/// Push up to `buffer.capacity()` entries.
fn fill<E>(buffer: &mut Vec<E>, entries: impl IntoIterator<Item = E>) {
    let room = buffer.capacity().saturating_sub(buffer.len());
    buffer.extend(entries.into_iter().take(room));
}

fn count_of(len: usize) -> CountReply {
    CountReply::MoreData(u16::try_from(len).unwrap_or(u16::MAX))
}

impl GattTransport for SimulatedTransport {
    type Handle = SimHandle;
    type Subscription = SimSubscription;

    fn resolve_handle(&self, identifier: &str) -> TransportResult<SimHandle> {
        let mut inner = self.record(Call::ResolveHandle);
        let device = inner
            .devices
            .iter()
            .position(|d| d.identifier == identifier)
            .ok_or_else(|| TransportError::NotFound(identifier.to_string()))?;
        let serial = inner.next_id();
        inner.open_handles.insert(serial);
        Ok(SimHandle { device, serial })
    }

    fn service_count(&self, handle: &SimHandle) -> TransportResult<CountReply> {
        let inner = self.record(Call::ServiceCount);
        let device = inner.device(handle)?;
        if device.has_fault(Fault::ServiceCountComplete) {
            Ok(CountReply::NoMoreData)
        } else if device.has_fault(Fault::ZeroServices) {
            Ok(CountReply::MoreData(0))
        } else {
            Ok(CountReply::MoreData(1))
        }
    }

    fn services(&self, handle: &SimHandle, buffer: &mut Vec<ServiceRef>) -> TransportResult<()> {
        let inner = self.record(Call::Services);
        inner.device(handle)?;
        fill(
            buffer,
            [ServiceRef {
                uuid: GLOVE_SERVICE_UUID.to_string(),
                attribute_handle: 0x000C,
            }],
        );
        Ok(())
    }

    fn characteristic_count(
        &self,
        handle: &SimHandle,
        _service: &ServiceRef,
    ) -> TransportResult<CountReply> {
        let inner = self.record(Call::CharacteristicCount);
        let device = inner.device(handle)?;
        if device.has_fault(Fault::CharacteristicCountComplete) {
            return Ok(CountReply::NoMoreData);
        }
        Ok(count_of(device.exposed_characteristics()))
    }

    fn characteristics(
        &self,
        handle: &SimHandle,
        _service: &ServiceRef,
        buffer: &mut Vec<CharacteristicRef>,
    ) -> TransportResult<()> {
        let inner = self.record(Call::Characteristics);
        let device = inner.device(handle)?;
        fill(
            buffer,
            (0..device.exposed_characteristics()).map(|i| device.characteristic(i)),
        );
        Ok(())
    }

    fn descriptor_count(
        &self,
        handle: &SimHandle,
        characteristic: &CharacteristicRef,
    ) -> TransportResult<CountReply> {
        let inner = self.record(Call::DescriptorCount);
        let device = inner.device(handle)?;
        let index = device
            .channel_index(characteristic.attribute_handle)
            .ok_or_else(injected)?;
        if device.has_fault(Fault::DescriptorCountComplete { channel: index }) {
            return Ok(CountReply::NoMoreData);
        }
        if device.has_fault(Fault::ZeroDescriptors { channel: index }) {
            return Ok(CountReply::MoreData(0));
        }
        Ok(count_of(device.descriptors(index).len()))
    }

    fn descriptors(
        &self,
        handle: &SimHandle,
        characteristic: &CharacteristicRef,
        buffer: &mut Vec<DescriptorRef>,
    ) -> TransportResult<()> {
        let inner = self.record(Call::Descriptors);
        let device = inner.device(handle)?;
        let index = device
            .channel_index(characteristic.attribute_handle)
            .ok_or_else(injected)?;
        fill(buffer, device.descriptors(index));
        Ok(())
    }

    fn write_descriptor(
        &self,
        handle: &SimHandle,
        descriptor: &DescriptorRef,
        enable_notifications: bool,
    ) -> TransportResult<()> {
        let mut inner = self.record(Call::WriteDescriptor);
        let device = inner.device_mut(handle)?;
        let index = device
            .channel_index(descriptor.characteristic_handle)
            .ok_or_else(injected)?;
        if descriptor.kind != DescriptorKind::ClientCharacteristicConfiguration
            || device.has_fault(Fault::WriteDescriptorFails { channel: index })
        {
            return Err(injected());
        }
        device.cccd[index] = cccd_value(enable_notifications);
        Ok(())
    }

    fn subscribe(
        &self,
        handle: &SimHandle,
        characteristic: &CharacteristicRef,
        callback: NotificationCallback,
    ) -> TransportResult<SimSubscription> {
        let mut inner = self.record(Call::Subscribe);
        let id = inner.next_id();
        let device = inner.device_mut(handle)?;
        let index = device
            .channel_index(characteristic.attribute_handle)
            .ok_or_else(injected)?;
        // Registering before notifications are enabled is out of order.
        if device.cccd[index] != cccd_value(true)
            || device.has_fault(Fault::SubscribeFails { channel: index })
        {
            return Err(injected());
        }
        device.subscribers.push(Subscriber {
            id,
            handle_serial: handle.serial,
            channel: characteristic.attribute_handle,
            callback,
        });
        Ok(SimSubscription { id })
    }

    fn unsubscribe(&self, handle: &SimHandle, subscription: SimSubscription) {
        {
            let mut inner = self.record(Call::Unsubscribe);
            if let Some(device) = inner.devices.get_mut(handle.device) {
                device.subscribers.retain(|s| s.id != subscription.id);
            }
        }
        // Wait out any delivery that cloned the callback before removal.
        drop(self.delivery.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn release_handle(&self, handle: SimHandle) {
        let mut inner = self.record(Call::ReleaseHandle);
        inner.open_handles.remove(&handle.serial);
        if let Some(device) = inner.devices.get_mut(handle.device) {
            device.subscribers.retain(|s| s.handle_serial != handle.serial);
            device.cccd = [cccd_value(false); 2];
        }
    }
}
