//! # sqlshift-core
//!
//! Core types shared by every sqlshift crate. This crate has no database
//! dependencies and provides the foundation for the others.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`value`] - The opaque [`Value`] scalar carried by row operations
//! - [`settings`] - Settings for the database target and migration runs
//! - [`settings_loader`] - TOML/JSON loading with environment overrides
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use error::{ExecutionError, ShiftError, ShiftResult};
pub use settings::{DatabaseSettings, MigrationSettings, Settings};
pub use value::Value;
