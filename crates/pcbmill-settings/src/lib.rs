//! PCBMill Settings Crate
//!
//! Handles the job configuration file: defaults, JSON/TOML persistence,
//! validation and conversion into machine and cut settings.

pub mod config;
pub mod error;

pub use config::JobConfig;
pub use error::{SettingsError, SettingsResult};
