//! Domain layer: glove state and the pure transforms applied to it.

pub mod calibration;
pub mod decoder;
pub mod error;
pub mod glove;
pub mod identifier;
pub mod joints;
pub mod models;
pub mod registry;
pub mod settings;
