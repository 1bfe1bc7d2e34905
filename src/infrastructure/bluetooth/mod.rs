//! Bluetooth Module
//!
//! Connects StretchSense gloves over a GATT transport and routes their
//! notifications into the domain layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      GloveService                        │
//! │  (Host API: registry, sessions, status events)           │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌────────────┐  ┌────────────┐  ┌──────────────┐
//! │ Connection │  │  Protocol  │  │  Transport   │
//! │            │  │            │  │              │
//! │ - Discovery│  │ - CCCD     │  │ - Boundary   │
//! │ - Subscribe│  │ - Attribute│  │   trait      │
//! │ - Teardown │  │   refs     │  │ - Simulated  │
//! └────────────┘  └────────────┘  └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - GATT attribute types and notification descriptor values
//! - [`transport`] - Boundary trait implemented by a platform stack
//! - [`connection`] - Discovery and subscription state machine
//! - [`service`] - Host-facing coordinator
//! - [`simulated`] - In-process transport for the demo and tests

pub mod connection;
pub mod protocol;
pub mod service;
pub mod simulated;
pub mod transport;

// Re-export main service for convenience
pub use service::GloveService;
