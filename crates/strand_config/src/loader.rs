//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{RouterConfig, StrandConfig};
use std::path::Path;

/// Loads and validates a `strand.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<RouterConfig, ConfigError> {
    let config_path = project_dir.join("strand.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `strand.toml` configuration from a string.
///
/// A file without a `[router]` table yields the default configuration.
pub fn load_config_from_str(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: StrandConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config.router)?;
    Ok(config.router)
}

/// Checks that the router parameters are usable.
pub fn validate_config(config: &RouterConfig) -> Result<(), ConfigError> {
    if config.max_iterations == 0 {
        return invalid("max_iterations must be at least 1");
    }
    if config.bounding_box_margin_x < 0 || config.bounding_box_margin_y < 0 {
        return invalid("bounding box margins must not be negative");
    }
    let weights = [
        ("wirelength_weight", config.wirelength_weight),
        ("hop_weight", config.hop_weight),
        ("timing_weight", config.timing_weight),
        (
            "initial_present_congestion_factor",
            config.initial_present_congestion_factor,
        ),
        (
            "historical_congestion_factor",
            config.historical_congestion_factor,
        ),
        ("criticality_exponent", config.criticality_exponent),
    ];
    for (name, value) in weights {
        if !value.is_finite() || value < 0.0 {
            return invalid(&format!("{name} must be a non-negative number, got {value}"));
        }
    }
    let multiplier = config.present_congestion_multiplier;
    if multiplier.is_nan() || multiplier < 1.0 {
        return invalid("present_congestion_multiplier must be at least 1.0");
    }
    for (name, value) in [
        ("max_criticality", config.max_criticality),
        ("min_reroute_criticality", config.min_reroute_criticality),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return invalid(&format!("{name} must lie in [0, 1], got {value}"));
        }
    }
    Ok(())
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.to_string()))
}
