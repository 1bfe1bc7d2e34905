//! Infrastructure layer: transports and process setup.

pub mod bluetooth;
pub mod logging;
