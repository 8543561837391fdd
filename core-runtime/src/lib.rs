//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the scan pipeline:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! Every other `core-*` crate depends on this one for its configuration
//! types, the shared [`events::EventBus`] and the logging conventions.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
