//! Behavioral scoring core: interaction lead scoring and assessment scoring.

pub mod assessment;
pub mod config;
pub mod error;
pub mod interaction;
pub mod store;
pub mod telemetry;
