//! BLE Connection Module
//!
//! Drives the discovery and subscription handshake for one glove:
//!
//! ```text
//! Disconnected -> HandleResolved -> ServicesEnumerated -> CharacteristicsEnumerated
//!              -> Subscribing(0) [-> Subscribing(1)] -> Connected
//! ```
//!
//! Any failure moves to `Failed`, revokes whatever was already registered and
//! releases the handle. There is no partial connection and no retry; the
//! caller starts again from the top.

use crate::domain::error::{DiscoveryStep, GloveError, Result};
use crate::domain::glove::Glove;
use crate::domain::models::{AppEvent, ChannelId, MessageSeverity, StatusMessage};
use crate::infrastructure::bluetooth::protocol::{self, CharacteristicRef, CountReply};
use crate::infrastructure::bluetooth::transport::{
    GattTransport, NotificationCallback, TransportResult,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    HandleResolved,
    ServicesEnumerated,
    CharacteristicsEnumerated,
    Subscribing { channel: usize },
    Connected,
    Failed,
}

/// An established connection. Dropping it revokes every subscription, then
/// releases the handle and unbinds the glove's channels.
pub struct ConnectionSession<T: GattTransport> {
    transport: Arc<T>,
    glove: Arc<Glove>,
    handle: Option<T::Handle>,
    subscriptions: Vec<T::Subscription>,
    channels: Vec<ChannelId>,
    state: SessionState,
}

impl<T: GattTransport> ConnectionSession<T> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Subscribed characteristics: stretch, then IMU if fitted.
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// Tear the connection down now rather than at drop.
    pub fn close(self) {
        drop(self);
    }

    fn teardown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        for subscription in self.subscriptions.drain(..) {
            self.transport.unsubscribe(&handle, subscription);
        }
        self.transport.release_handle(handle);
        self.glove.unbind_channels();
        self.state = SessionState::Disconnected;
        info!("{} disconnected", self.glove.id());
    }
}

impl<T: GattTransport> Drop for ConnectionSession<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// BLE Connection handler
pub struct BleConnection<T: GattTransport> {
    transport: Arc<T>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl<T: GattTransport> BleConnection<T> {
    pub fn new(transport: Arc<T>, event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            transport,
            event_sender,
        }
    }

    /// Run the full handshake for `glove`. Blocks until every step completes.
    pub fn connect(&self, glove: &Arc<Glove>) -> Result<ConnectionSession<T>> {
        info!("Connecting to {} ({})", glove.id(), glove.identifier());
        self.send_log(
            &format!("Connecting to {}...", glove.id()),
            MessageSeverity::Info,
        );
        let mut state = SessionState::Disconnected;

        // Step 1: Resolve the device handle
        let handle = match self.transport.resolve_handle(glove.identifier()) {
            Ok(handle) => handle,
            Err(e) => {
                self.report_failure(glove, &mut state, &e.to_string());
                return Err(GloveError::HandleResolution(e));
            }
        };
        advance(glove, &mut state, SessionState::HandleResolved);

        let mut subscriptions = Vec::new();
        match self.handshake(glove, &handle, &mut state, &mut subscriptions) {
            Ok(channels) => {
                advance(glove, &mut state, SessionState::Connected);
                self.send_log(
                    &format!("{} connected", glove.id()),
                    MessageSeverity::Success,
                );
                Ok(ConnectionSession {
                    transport: Arc::clone(&self.transport),
                    glove: Arc::clone(glove),
                    handle: Some(handle),
                    subscriptions,
                    channels,
                    state,
                })
            }
            Err(e) => {
                self.report_failure(glove, &mut state, &e.to_string());
                for subscription in subscriptions {
                    self.transport.unsubscribe(&handle, subscription);
                }
                self.transport.release_handle(handle);
                glove.unbind_channels();
                Err(e)
            }
        }
    }

    /// Steps 2-4. Subscriptions are pushed as they succeed so the caller can
    /// revoke them on failure.
    fn handshake(
        &self,
        glove: &Arc<Glove>,
        handle: &T::Handle,
        state: &mut SessionState,
        subscriptions: &mut Vec<T::Subscription>,
    ) -> Result<Vec<ChannelId>> {
        let transport = &*self.transport;

        // Step 2: Enumerate services, only the first one is used
        let step = DiscoveryStep::Services;
        let count = expect_more_data(step, transport.service_count(handle))?;
        let mut services = allocate(step, count)?;
        transport
            .services(handle, &mut services)
            .map_err(|e| enumeration_error(step, e))?;
        let service = services
            .first()
            .ok_or_else(|| no_entries(step))?
            .clone();
        debug!("{} using service {}", glove.id(), service.uuid);
        advance(glove, state, SessionState::ServicesEnumerated);

        // Step 3: Enumerate characteristics of that service
        let step = DiscoveryStep::Characteristics;
        let count = expect_more_data(step, transport.characteristic_count(handle, &service))?;
        let mut characteristics = allocate(step, count)?;
        transport
            .characteristics(handle, &service, &mut characteristics)
            .map_err(|e| enumeration_error(step, e))?;
        let expected = glove.profile().channel_count();
        if characteristics.len() < expected {
            return Err(GloveError::ProtocolEnumeration {
                step,
                reason: format!(
                    "expected {} characteristics, found {}",
                    expected,
                    characteristics.len()
                ),
            });
        }
        advance(glove, state, SessionState::CharacteristicsEnumerated);

        // Step 4: Enable and register notifications per channel
        let mut channels = Vec::with_capacity(expected);
        for (index, characteristic) in characteristics.iter().take(expected).enumerate() {
            advance(glove, state, SessionState::Subscribing { channel: index });
            let subscription = self.subscribe_channel(glove, handle, index, characteristic)?;
            subscriptions.push(subscription);
            channels.push(characteristic.attribute_handle);
        }

        Ok(channels)
    }

    fn subscribe_channel(
        &self,
        glove: &Arc<Glove>,
        handle: &T::Handle,
        index: usize,
        characteristic: &CharacteristicRef,
    ) -> Result<T::Subscription> {
        let transport = &*self.transport;
        let step = DiscoveryStep::Descriptors { channel: index };

        let count = expect_more_data(step, transport.descriptor_count(handle, characteristic))?;
        let mut descriptors = allocate(step, count)?;
        transport
            .descriptors(handle, characteristic, &mut descriptors)
            .map_err(|e| enumeration_error(step, e))?;
        debug!("{} descriptors found for channel {}", descriptors.len(), index);

        let descriptor = protocol::find_notification_descriptor(&descriptors).ok_or_else(|| {
            GloveError::ProtocolEnumeration {
                step,
                reason: "no client configuration descriptor".to_string(),
            }
        })?;
        transport
            .write_descriptor(handle, descriptor, true)
            .map_err(|source| GloveError::DescriptorWrite {
                channel: index,
                source,
            })?;
        info!(
            "Notifications enabled for {} channel {} ({})",
            glove.id(),
            index,
            characteristic.attribute_handle
        );

        glove.bind_channel(index, characteristic.attribute_handle);

        let target = Arc::clone(glove);
        let callback: NotificationCallback =
            Arc::new(move |channel: ChannelId, payload: &[u8]| {
                target.handle_notification(channel, payload)
            });
        transport
            .subscribe(handle, characteristic, callback)
            .map_err(|source| GloveError::Subscription {
                channel: index,
                source,
            })
    }

    fn report_failure(&self, glove: &Glove, state: &mut SessionState, reason: &str) {
        error!(
            "{} connection failed after {:?}: {}",
            glove.id(),
            state,
            reason
        );
        advance(glove, state, SessionState::Failed);
        self.send_log(
            &format!("{} connection failed: {}", glove.id(), reason),
            MessageSeverity::Error,
        );
    }

    /// Send a log message
    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}

fn advance(glove: &Glove, state: &mut SessionState, next: SessionState) {
    debug!("{} {:?} -> {:?}", glove.id(), state, next);
    *state = next;
}

/// The sizing call must ask for a buffer; anything else aborts the attempt.
fn expect_more_data(step: DiscoveryStep, reply: TransportResult<CountReply>) -> Result<u16> {
    match reply {
        Ok(CountReply::MoreData(count)) => Ok(count),
        Ok(CountReply::NoMoreData) => Err(GloveError::ProtocolEnumeration {
            step,
            reason: "count query did not report more data".to_string(),
        }),
        Err(e) => Err(enumeration_error(step, e)),
    }
}

/// Reserve a discovery buffer. A zero count is treated as an allocation failure.
fn allocate<E>(step: DiscoveryStep, count: u16) -> Result<Vec<E>> {
    let count = usize::from(count);
    if count == 0 {
        return Err(GloveError::Allocation { step, count });
    }
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(count)
        .map_err(|_| GloveError::Allocation { step, count })?;
    Ok(buffer)
}

fn enumeration_error(step: DiscoveryStep, e: impl std::fmt::Display) -> GloveError {
    GloveError::ProtocolEnumeration {
        step,
        reason: e.to_string(),
    }
}

fn no_entries(step: DiscoveryStep) -> GloveError {
    GloveError::ProtocolEnumeration {
        step,
        reason: "transport returned no entries".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decoder::ChannelBinding;
    use crate::domain::models::GloveId;
    use crate::infrastructure::bluetooth::simulated::{Call, Fault, SimulatedTransport};

    const IMU_GLOVE: &str = "{00601001-7374-7265-7563-6873656e7365}";
    const PLAIN_GLOVE: &str = "{00000501-7374-7265-7563-6873656e7365}";

    fn setup(
        identifier: &str,
    ) -> (
        Arc<SimulatedTransport>,
        BleConnection<SimulatedTransport>,
        Arc<Glove>,
    ) {
        let transport = Arc::new(SimulatedTransport::new());
        transport.add_glove(identifier);
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = BleConnection::new(Arc::clone(&transport), tx);
        let glove = Arc::new(Glove::new(GloveId(0), identifier).unwrap());
        (transport, connection, glove)
    }

    #[test]
    fn test_imu_glove_subscribes_two_channels() {
        let (transport, connection, glove) = setup(IMU_GLOVE);
        let session = connection.connect(&glove).unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.channels().len(), 2);
        let channels = glove.channels();
        assert_eq!(channels.stretch, Some(session.channels()[0]));
        assert_eq!(channels.imu, Some(session.channels()[1]));
        assert_eq!(transport.active_subscriptions(IMU_GLOVE), 2);
    }

    #[test]
    fn test_plain_glove_subscribes_one_channel() {
        let (transport, connection, glove) = setup(PLAIN_GLOVE);
        let session = connection.connect(&glove).unwrap();
        assert_eq!(session.channels().len(), 1);
        assert_eq!(glove.channels().imu, None);
        assert_eq!(transport.active_subscriptions(PLAIN_GLOVE), 1);
    }

    #[test]
    fn test_steps_run_in_protocol_order() {
        let (transport, connection, glove) = setup(PLAIN_GLOVE);
        let _session = connection.connect(&glove).unwrap();
        assert_eq!(
            transport.calls(),
            vec![
                Call::ResolveHandle,
                Call::ServiceCount,
                Call::Services,
                Call::CharacteristicCount,
                Call::Characteristics,
                Call::DescriptorCount,
                Call::Descriptors,
                Call::WriteDescriptor,
                Call::Subscribe,
            ]
        );
    }

    #[test]
    fn test_service_count_without_more_data_stops_early() {
        let (transport, connection, glove) = setup(PLAIN_GLOVE);
        transport.inject_fault(PLAIN_GLOVE, Fault::ServiceCountComplete);
        let err = connection.connect(&glove).err().unwrap();
        assert!(matches!(
            err,
            GloveError::ProtocolEnumeration {
                step: DiscoveryStep::Services,
                ..
            }
        ));
        assert_eq!(
            transport.calls(),
            vec![Call::ResolveHandle, Call::ServiceCount, Call::ReleaseHandle]
        );
    }

    #[test]
    fn test_zero_services_is_allocation_error() {
        let (transport, connection, glove) = setup(PLAIN_GLOVE);
        transport.inject_fault(PLAIN_GLOVE, Fault::ZeroServices);
        let err = connection.connect(&glove).err().unwrap();
        assert!(matches!(err, GloveError::Allocation { count: 0, .. }));
    }

    #[test]
    fn test_unknown_device_fails_resolution() {
        let (_transport, connection, _) = setup(PLAIN_GLOVE);
        let stranger = Arc::new(Glove::new(GloveId(1), "{00001501}").unwrap());
        let err = connection.connect(&stranger).err().unwrap();
        assert!(matches!(err, GloveError::HandleResolution(_)));
    }

    #[test]
    fn test_late_failure_revokes_earlier_subscription() {
        let (transport, connection, glove) = setup(IMU_GLOVE);
        transport.inject_fault(IMU_GLOVE, Fault::SubscribeFails { channel: 1 });
        let err = connection.connect(&glove).err().unwrap();
        assert!(matches!(err, GloveError::Subscription { channel: 1, .. }));
        assert_eq!(transport.active_subscriptions(IMU_GLOVE), 0);
        assert_eq!(glove.channels(), ChannelBinding::default());
        assert_eq!(transport.open_handles(), 0);
    }

    #[test]
    fn test_descriptor_write_failure() {
        let (transport, connection, glove) = setup(IMU_GLOVE);
        transport.inject_fault(IMU_GLOVE, Fault::WriteDescriptorFails { channel: 0 });
        let err = connection.connect(&glove).err().unwrap();
        assert!(matches!(err, GloveError::DescriptorWrite { channel: 0, .. }));
        assert!(!transport.calls().contains(&Call::Subscribe));
    }

    #[test]
    fn test_characteristic_count_without_more_data_stops_early() {
        let (transport, connection, glove) = setup(IMU_GLOVE);
        transport.inject_fault(IMU_GLOVE, Fault::CharacteristicCountComplete);
        let err = connection.connect(&glove).err().unwrap();
        assert!(matches!(
            err,
            GloveError::ProtocolEnumeration {
                step: DiscoveryStep::Characteristics,
                ..
            }
        ));
        assert_eq!(
            transport.calls(),
            vec![
                Call::ResolveHandle,
                Call::ServiceCount,
                Call::Services,
                Call::CharacteristicCount,
                Call::ReleaseHandle,
            ]
        );
        assert_eq!(transport.open_handles(), 0);
    }

    #[test]
    fn test_incomplete_imu_descriptor_count_revokes_stretch() {
        let (transport, connection, glove) = setup(IMU_GLOVE);
        transport.inject_fault(IMU_GLOVE, Fault::DescriptorCountComplete { channel: 1 });
        let err = connection.connect(&glove).err().unwrap();
        assert!(matches!(
            err,
            GloveError::ProtocolEnumeration {
                step: DiscoveryStep::Descriptors { channel: 1 },
                ..
            }
        ));
        assert_eq!(
            transport.calls()[8..],
            [
                Call::Subscribe,
                Call::DescriptorCount,
                Call::Unsubscribe,
                Call::ReleaseHandle,
            ]
        );
        assert_eq!(transport.active_subscriptions(IMU_GLOVE), 0);
        assert_eq!(transport.open_handles(), 0);
        assert_eq!(glove.channels(), ChannelBinding::default());
    }

    #[test]
    fn test_zero_imu_descriptors_is_allocation_error() {
        let (transport, connection, glove) = setup(IMU_GLOVE);
        transport.inject_fault(IMU_GLOVE, Fault::ZeroDescriptors { channel: 1 });
        let err = connection.connect(&glove).err().unwrap();
        assert!(matches!(
            err,
            GloveError::Allocation {
                step: DiscoveryStep::Descriptors { channel: 1 },
                count: 0,
            }
        ));
        assert_eq!(transport.active_subscriptions(IMU_GLOVE), 0);
        assert_eq!(transport.open_handles(), 0);
    }

    #[test]
    fn test_missing_imu_characteristic() {
        let (transport, connection, glove) = setup(IMU_GLOVE);
        transport.inject_fault(IMU_GLOVE, Fault::SingleCharacteristic);
        let err = connection.connect(&glove).err().unwrap();
        assert!(matches!(
            err,
            GloveError::ProtocolEnumeration {
                step: DiscoveryStep::Characteristics,
                ..
            }
        ));
    }

    #[test]
    fn test_drop_releases_everything() {
        let (transport, connection, glove) = setup(IMU_GLOVE);
        let session = connection.connect(&glove).unwrap();
        session.close();
        assert_eq!(transport.active_subscriptions(IMU_GLOVE), 0);
        assert_eq!(transport.open_handles(), 0);
        assert_eq!(glove.channels(), ChannelBinding::default());
    }
}
