//! Glove entity
//!
//! A [`Glove`] owns everything the library knows about one physical device.
//! All mutable state lives in a single record behind a per-glove lock, so a
//! notification is applied as a whole and a host read sees either all of it or
//! none of it.

use crate::domain::calibration::{Calibration, SensorBounds};
use crate::domain::decoder::{self, ChannelBinding, Frame};
use crate::domain::error::Result;
use crate::domain::identifier::GloveProfile;
use crate::domain::joints::{self, JointLimits};
use crate::domain::models::{ChannelId, GloveId, GloveReading, IMU_WORDS};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug)]
struct GloveState {
    raw_stretch: Vec<u16>,
    calibration: Calibration,
    stretch: Vec<f64>,
    raw_imu: [u16; IMU_WORDS],
    limits: JointLimits,
    last_notification: Option<Instant>,
    channels: ChannelBinding,
}

impl GloveState {
    fn new(profile: &GloveProfile) -> Self {
        let sensors = profile.sensor_count();
        Self {
            raw_stretch: vec![0; sensors],
            calibration: Calibration::new(sensors),
            stretch: vec![0.0; sensors],
            raw_imu: [0; IMU_WORDS],
            limits: JointLimits::default(),
            last_notification: None,
            channels: ChannelBinding::default(),
        }
    }

    fn apply(&mut self, frame: Frame) {
        match frame {
            Frame::Stretch(words) => {
                for (i, raw) in words.into_iter().enumerate() {
                    self.raw_stretch[i] = raw;
                    self.stretch[i] = self.calibration.update(i, raw);
                }
            }
            Frame::Imu(words) => {
                self.raw_imu[..words.len()].copy_from_slice(&words);
            }
        }
    }

    /// Stretch values recomputed against the current bounds.
    fn refresh_stretch(&mut self) {
        for (i, raw) in self.raw_stretch.iter().enumerate() {
            self.stretch[i] = self.calibration.bounds()[i].normalize(*raw);
        }
    }
}

/// Consistent copy of a glove's full state, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct GloveSnapshot {
    pub raw_stretch: Vec<u16>,
    pub bounds: Vec<SensorBounds>,
    pub stretch: Vec<f64>,
    pub raw_imu: [u16; IMU_WORDS],
    pub limits: JointLimits,
    pub channels: ChannelBinding,
    pub since_last_notification: Option<Duration>,
    pub reading: GloveReading,
}

#[derive(Debug)]
pub struct Glove {
    id: GloveId,
    identifier: String,
    profile: GloveProfile,
    state: Mutex<GloveState>,
}

impl Glove {
    /// Create a glove from its identifier string. The topology is fixed here.
    pub fn new(id: GloveId, identifier: &str) -> Result<Self> {
        let profile = GloveProfile::parse(identifier)?;
        Ok(Self {
            id,
            identifier: identifier.to_string(),
            profile,
            state: Mutex::new(GloveState::new(&profile)),
        })
    }

    pub fn id(&self) -> GloveId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn profile(&self) -> &GloveProfile {
        &self.profile
    }

    fn state(&self) -> MutexGuard<'_, GloveState> {
        // A panicking reader cannot leave the record half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one value-changed notification.
    ///
    /// Channels not bound to this glove are ignored, but still count as
    /// activity for [`Glove::since_last_notification`].
    pub fn handle_notification(&self, channel: ChannelId, payload: &[u8]) {
        let mut state = self.state();
        match decoder::decode_frame(&self.profile, &state.channels, channel, payload) {
            Some(frame) => {
                trace!("{} notification on {}: {:02X?}", self.id, channel, payload);
                state.apply(frame);
            }
            None => trace!("{} ignoring notification on {}", self.id, channel),
        }
        state.last_notification = Some(Instant::now());
    }

    /// The 18-value host reading: orientation then scaled joint angles.
    pub fn reading(&self) -> GloveReading {
        let state = self.state();
        Self::compute_reading(&self.profile, &state)
    }

    fn compute_reading(profile: &GloveProfile, state: &GloveState) -> GloveReading {
        let mapped = joints::map_joints(profile.topology, &state.stretch);
        let angles = state.limits.scale(&mapped);
        joints::compose_reading(&state.raw_imu, &angles)
    }

    pub fn snapshot(&self) -> GloveSnapshot {
        let state = self.state();
        GloveSnapshot {
            raw_stretch: state.raw_stretch.clone(),
            bounds: state.calibration.bounds().to_vec(),
            stretch: state.stretch.clone(),
            raw_imu: state.raw_imu,
            limits: state.limits,
            channels: state.channels,
            since_last_notification: state.last_notification.map(|t| t.elapsed()),
            reading: Self::compute_reading(&self.profile, &state),
        }
    }

    /// Time since the last notification, or `None` if none has arrived.
    pub fn since_last_notification(&self) -> Option<Duration> {
        self.state().last_notification.map(|t| t.elapsed())
    }

    pub fn joint_limits(&self) -> JointLimits {
        self.state().limits
    }

    /// Replace both angle arrays at once.
    pub fn set_joint_limits(&self, limits: JointLimits) {
        self.state().limits = limits;
    }

    /// Return every sensor to the unobserved state; stretch reads `0` until
    /// new samples establish a range.
    pub fn reset_calibration(&self) {
        let mut state = self.state();
        state.calibration.reset();
        state.refresh_stretch();
    }

    pub fn channels(&self) -> ChannelBinding {
        self.state().channels
    }

    /// Record the characteristic for channel `index` (0 = stretch, 1 = IMU).
    pub fn bind_channel(&self, index: usize, channel: ChannelId) {
        let mut state = self.state();
        match index {
            0 => state.channels.stretch = Some(channel),
            1 => state.channels.imu = Some(channel),
            _ => {}
        }
    }

    pub fn unbind_channels(&self) {
        self.state().channels = ChannelBinding::default();
    }
}
