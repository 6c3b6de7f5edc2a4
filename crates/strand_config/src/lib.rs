//! Parsing and validation of `strand.toml` router configuration files.
//!
//! The router consumes a [`RouterConfig`] as an opaque parameter struct: the
//! trial budget, bounding-box margins, cost weights, the congestion schedule,
//! the routing-unit granularity, and the timing-driven switch.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config};
pub use types::*;
