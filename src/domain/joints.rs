//! Joint mapping and angle scaling
//!
//! Calibrated stretch values are spread over the 15 logical joints according to
//! the glove topology, then scaled into angles with per-joint limits.
//!
//! ```text
//! joint index   0  1  2 | 3  4  5 | 6  7  8 | 9 10 11 | 12 13 14
//! finger        thumb   | index   | middle  | ring    | pinky
//! ```

use crate::domain::identifier::Topology;
use crate::domain::models::{
    GloveReading, IMU_WORDS, JOINT_COUNT, ORIENTATION_COUNT, ORIENTATION_SCALE, OUTPUT_LEN,
};
use serde::{Deserialize, Serialize};

/// Spread calibrated sensor values over the 15 joints.
///
/// Joints without a driving sensor (only possible with a short input) stay at `0`.
pub fn map_joints(topology: Topology, stretch: &[f64]) -> [f64; JOINT_COUNT] {
    let mut joints = [0.0; JOINT_COUNT];
    let sensors = stretch.iter().take(topology.sensor_count()).enumerate();

    match topology {
        Topology::Five => {
            for (i, &value) in sensors {
                joints[3 * i..3 * i + 3].fill(value);
            }
        }
        Topology::Ten => {
            for (i, &value) in sensors {
                let base = 3 * (i / 2);
                if i % 2 == 0 {
                    joints[base] = value;
                } else {
                    joints[base + 1] = value;
                    joints[base + 2] = value;
                }
            }
        }
        Topology::Fifteen => {
            for (i, &value) in sensors {
                joints[i] = value;
            }
        }
    }

    joints
}

/// Per-joint rotation limits used to turn `[0, 1]` stretch into angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub min_angles: [f64; JOINT_COUNT],
    pub max_angles: [f64; JOINT_COUNT],
}

impl Default for JointLimits {
    /// Identity scaling: output equals the mapped stretch value.
    fn default() -> Self {
        Self {
            min_angles: [0.0; JOINT_COUNT],
            max_angles: [1.0; JOINT_COUNT],
        }
    }
}

impl JointLimits {
    pub fn new(min_angles: [f64; JOINT_COUNT], max_angles: [f64; JOINT_COUNT]) -> Self {
        Self {
            min_angles,
            max_angles,
        }
    }

    /// Rotation limits in degrees for a rigged human hand.
    pub fn hand() -> Self {
        const THUMB_MIN: [f64; 3] = [0.0, 0.0, 0.0];
        const THUMB_MAX: [f64; 3] = [90.0, 90.0, 90.0];
        const FINGER_MIN: [f64; 3] = [-10.0, -15.0, 0.0];
        const FINGER_MAX: [f64; 3] = [75.0, 110.0, 80.0];

        let mut limits = Self::default();
        for finger in 0..5 {
            let (min, max) = if finger == 0 {
                (THUMB_MIN, THUMB_MAX)
            } else {
                (FINGER_MIN, FINGER_MAX)
            };
            limits.min_angles[3 * finger..3 * finger + 3].copy_from_slice(&min);
            limits.max_angles[3 * finger..3 * finger + 3].copy_from_slice(&max);
        }
        limits
    }

    /// `value * max + min` per joint; non-finite inputs count as `0`.
    pub fn scale(&self, joints: &[f64; JOINT_COUNT]) -> [f64; JOINT_COUNT] {
        let mut angles = [0.0; JOINT_COUNT];
        for (j, angle) in angles.iter_mut().enumerate() {
            let value = if joints[j].is_finite() { joints[j] } else { 0.0 };
            *angle = value * self.max_angles[j] + self.min_angles[j];
        }
        angles
    }
}

/// Assemble the host reading from IMU words and scaled joint angles.
pub fn compose_reading(imu: &[u16; IMU_WORDS], angles: &[f64; JOINT_COUNT]) -> GloveReading {
    let mut reading = [0.0; OUTPUT_LEN];
    for (slot, &word) in reading.iter_mut().zip(imu.iter()).take(ORIENTATION_COUNT) {
        *slot = f64::from(word) / ORIENTATION_SCALE;
    }
    reading[ORIENTATION_COUNT..].copy_from_slice(angles);
    reading
}
