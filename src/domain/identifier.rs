//! Glove identifier parsing
//!
//! Gloves are addressed by a braced GUID string whose leading digits encode the
//! hardware fitted to the glove:
//!
//! ```text
//! {00601001-7374-7265-7563-6873656e7365}
//!  ^^^       IMU code, "006" = IMU fitted, anything else = none
//!     ^^^    stretch sensor count, base 10 (005, 010 or 015)
//! ```
//!
//! The remaining characters are carried through to the transport untouched.

use crate::domain::error::{GloveError, Result};

/// Byte range of the IMU presence code.
const IMU_CODE: std::ops::Range<usize> = 1..4;
/// Byte range of the stretch sensor count.
const SENSOR_COUNT: std::ops::Range<usize> = 4..7;
/// IMU code meaning "IMU fitted".
const IMU_PRESENT: &str = "006";

/// How many stretch sensors the glove carries, which decides the joint mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// One sensor per finger
    Five,
    /// Base joint plus a shared sensor for the two distal joints
    Ten,
    /// One sensor per joint
    Fifteen,
}

impl Topology {
    pub fn from_sensor_count(count: u32) -> Option<Self> {
        match count {
            5 => Some(Self::Five),
            10 => Some(Self::Ten),
            15 => Some(Self::Fifteen),
            _ => None,
        }
    }

    pub fn sensor_count(self) -> usize {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::Fifteen => 15,
        }
    }
}

/// Hardware description decoded once from the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GloveProfile {
    pub has_imu: bool,
    pub topology: Topology,
}

impl GloveProfile {
    /// Notifying characteristics the glove exposes: stretch, then IMU if fitted.
    pub fn channel_count(&self) -> usize {
        if self.has_imu {
            2
        } else {
            1
        }
    }

    pub fn sensor_count(&self) -> usize {
        self.topology.sensor_count()
    }

    /// Parse the fixed-position fields of an identifier string.
    pub fn parse(identifier: &str) -> Result<Self> {
        let malformed = |reason: String| GloveError::MalformedIdentifier {
            identifier: identifier.to_string(),
            reason,
        };

        let imu_code = identifier
            .get(IMU_CODE)
            .ok_or_else(|| malformed("missing IMU code".into()))?;
        let count_field = identifier
            .get(SENSOR_COUNT)
            .ok_or_else(|| malformed("missing sensor count".into()))?;

        if !count_field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(format!(
                "sensor count {:?} is not a number",
                count_field
            )));
        }
        let count: u32 = count_field
            .parse()
            .map_err(|e| malformed(format!("sensor count {:?}: {}", count_field, e)))?;
        let topology = Topology::from_sensor_count(count)
            .ok_or_else(|| malformed(format!("unsupported sensor count {}", count)))?;

        Ok(Self {
            has_imu: imu_code == IMU_PRESENT,
            topology,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_imu_ten_sensor() {
        let profile = GloveProfile::parse("{00601001-7374-7265-7563-6873656e7365}").unwrap();
        assert!(profile.has_imu);
        assert_eq!(profile.topology, Topology::Ten);
        assert_eq!(profile.channel_count(), 2);
    }

    #[test]
    fn test_parse_plain_five_sensor() {
        let profile = GloveProfile::parse("{00000501-7374-7265-7563-6873656e7365}").unwrap();
        assert!(!profile.has_imu);
        assert_eq!(profile.sensor_count(), 5);
        assert_eq!(profile.channel_count(), 1);
    }

    #[test]
    fn test_unknown_imu_code_means_no_imu() {
        let profile = GloveProfile::parse("{00701501}").unwrap();
        assert!(!profile.has_imu);
        assert_eq!(profile.topology, Topology::Fifteen);
    }

    #[test]
    fn test_non_numeric_count_is_malformed() {
        let err = GloveProfile::parse("{0060a001}").unwrap_err();
        assert!(matches!(err, GloveError::MalformedIdentifier { .. }));
        // Trailing garbage is rejected rather than read as a number prefix.
        let err = GloveProfile::parse("{0060100x}").unwrap_err();
        assert!(matches!(err, GloveError::MalformedIdentifier { .. }));
    }

    #[test]
    fn test_unsupported_count_is_malformed() {
        assert!(GloveProfile::parse("{00600701}").is_err());
        assert!(GloveProfile::parse("{00600001}").is_err());
    }

    #[test]
    fn test_short_identifier_is_malformed() {
        assert!(GloveProfile::parse("{0060").is_err());
        assert!(GloveProfile::parse("").is_err());
    }
}
