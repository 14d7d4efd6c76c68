//! vigil-core — shared types and configuration for the Vigil monitor.
//!
//! The configuration is loaded once at startup and never reloaded. Every
//! other crate receives already-validated [`ServiceSpec`]s and notifier
//! settings from here.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AlertsConfig, MonitorConfig, PagerDutyConfig, ServiceSpec, SlackConfig, StatusConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
