//! StretchSense smart glove library
//!
//! Turns raw stretch-sensor and IMU notifications into calibrated joint
//! angles for a host application.
//!
//! ```text
//! identifier -> GloveProfile -> ConnectionSession -> notifications
//!            -> calibration -> joint mapping -> angle scaling -> reading
//! ```

pub mod domain;
pub mod infrastructure;

pub use domain::error::{GloveError, TransportError};
pub use domain::glove::{Glove, GloveSnapshot};
pub use domain::joints::JointLimits;
pub use domain::models::{AppEvent, ConnectionStatus, GloveId, GloveReading};
pub use infrastructure::bluetooth::transport::GattTransport;
pub use infrastructure::bluetooth::GloveService;
