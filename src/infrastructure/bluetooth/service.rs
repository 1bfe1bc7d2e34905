//! Glove Service Module
//!
//! Host-facing entry point. Owns the registry and one connection session per
//! connected glove, and forwards every host operation to the right glove.

use crate::domain::error::Result;
use crate::domain::glove::{Glove, GloveSnapshot};
use crate::domain::joints::JointLimits;
use crate::domain::models::{
    AppEvent, ConnectionStatus, GloveId, GloveReading, MessageSeverity, StatusMessage, JOINT_COUNT,
};
use crate::domain::registry::GloveRegistry;
use crate::infrastructure::bluetooth::connection::{BleConnection, ConnectionSession};
use crate::infrastructure::bluetooth::transport::GattTransport;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Main service coordinating registry and connections
pub struct GloveService<T: GattTransport> {
    registry: GloveRegistry,
    connection: BleConnection<T>,
    sessions: HashMap<GloveId, ConnectionSession<T>>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl<T: GattTransport> GloveService<T> {
    pub fn new(transport: Arc<T>, event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            registry: GloveRegistry::new(),
            connection: BleConnection::new(transport, event_sender.clone()),
            sessions: HashMap::new(),
            event_sender,
        }
    }

    /// Register a glove from its identifier string.
    pub fn register(&mut self, identifier: &str) -> Result<GloveId> {
        self.registry.register(identifier)
    }

    pub fn glove(&self, id: GloveId) -> Result<&Arc<Glove>> {
        self.registry.get(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Registered identifiers in id order.
    pub fn identifiers(&self) -> Vec<String> {
        self.registry.identifiers()
    }

    pub fn is_connected(&self, id: GloveId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Connect a glove. Already connected gloves are left untouched.
    pub fn connect(&mut self, id: GloveId) -> Result<()> {
        let glove = Arc::clone(self.registry.get(id)?);
        if self.is_connected(id) {
            info!("{} already connected", id);
            return Ok(());
        }

        self.send_status(id, ConnectionStatus::Connecting);
        match self.connection.connect(&glove) {
            Ok(session) => {
                self.sessions.insert(id, session);
                self.send_status(id, ConnectionStatus::Connected);
                Ok(())
            }
            Err(e) => {
                self.send_status(id, ConnectionStatus::Error);
                Err(e)
            }
        }
    }

    /// Disconnect a glove. Disconnected gloves are left untouched.
    pub fn disconnect(&mut self, id: GloveId) -> Result<()> {
        self.registry.get(id)?;
        let Some(session) = self.sessions.remove(&id) else {
            return Ok(());
        };
        session.close();

        self.send_log(&format!("{} disconnected", id), MessageSeverity::Info);
        self.send_status(id, ConnectionStatus::Disconnected);
        Ok(())
    }

    /// Current 18-value output: orientation then joint angles.
    pub fn reading(&self, id: GloveId) -> Result<GloveReading> {
        Ok(self.registry.get(id)?.reading())
    }

    /// Seconds since the glove last notified, `None` if it never has.
    pub fn seconds_since_last_notification(&self, id: GloveId) -> Result<Option<f64>> {
        Ok(self
            .registry
            .get(id)?
            .since_last_notification()
            .map(|elapsed| elapsed.as_secs_f64()))
    }

    pub fn set_angle_range(
        &self,
        id: GloveId,
        min_angles: [f64; JOINT_COUNT],
        max_angles: [f64; JOINT_COUNT],
    ) -> Result<()> {
        self.set_joint_limits(id, JointLimits::new(min_angles, max_angles))
    }

    pub fn set_joint_limits(&self, id: GloveId, limits: JointLimits) -> Result<()> {
        self.registry.get(id)?.set_joint_limits(limits);
        Ok(())
    }

    pub fn reset_calibration(&self, id: GloveId) -> Result<()> {
        self.registry.get(id)?.reset_calibration();
        info!("{} calibration reset", id);
        Ok(())
    }

    pub fn snapshot(&self, id: GloveId) -> Result<GloveSnapshot> {
        Ok(self.registry.get(id)?.snapshot())
    }

    /// Disconnect everything and forget every glove. Ids start again from 0.
    pub fn clear(&mut self) {
        let mut connected: Vec<GloveId> = self.sessions.keys().copied().collect();
        connected.sort();
        for id in connected {
            if let Some(session) = self.sessions.remove(&id) {
                session.close();
                self.send_status(id, ConnectionStatus::Disconnected);
            }
        }

        let count = self.registry.len();
        self.registry.clear();
        info!("Registry cleared ({} gloves released)", count);
        self.send_log("All gloves released", MessageSeverity::Info);
    }

    fn send_status(&self, glove: GloveId, status: ConnectionStatus) {
        let _ = self
            .event_sender
            .send(AppEvent::ConnectionStatus { glove, status });
    }

    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}
