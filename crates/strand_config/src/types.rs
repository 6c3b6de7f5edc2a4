//! Configuration types deserialized from `strand.toml`.

use serde::Deserialize;
use std::fmt;

/// The top-level configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct StrandConfig {
    /// Router parameters.
    #[serde(default)]
    pub router: RouterConfig,
}

/// How fabric elements are grouped into routing units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One routing unit per wire segment.
    Wire,
    /// One routing unit per multi-segment node.
    #[default]
    Node,
    /// One routing unit per exit node, sharing entry sub-nodes between siblings.
    NodeGroup,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Wire => write!(f, "wire"),
            Granularity::Node => write!(f, "node"),
            Granularity::NodeGroup => write!(f, "node_group"),
        }
    }
}

/// Parameters of a negotiated-congestion routing run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Trial-iteration budget before the run is declared exhausted.
    pub max_iterations: u32,
    /// Routing-unit granularity.
    pub granularity: Granularity,
    /// Whether the search mixes in a delay term weighted by criticality.
    pub timing_driven: bool,
    /// Columns added on each side of a connection's bounding box.
    pub bounding_box_margin_x: i32,
    /// Rows added on each side of a connection's bounding box.
    pub bounding_box_margin_y: i32,
    /// Retry a net unbounded once when its bounded search fails.
    pub relax_bounding_box: bool,
    /// Weight of the remaining Manhattan distance in the cost estimate.
    pub wirelength_weight: f64,
    /// Weight of the search depth in the cost estimate.
    pub hop_weight: f64,
    /// Weight of the delay estimate in timing-driven mode.
    pub timing_weight: f64,
    /// Present-congestion factor used in the first iteration.
    pub initial_present_congestion_factor: f64,
    /// Growth applied to the present-congestion factor every iteration.
    pub present_congestion_multiplier: f64,
    /// Historical-congestion accumulation factor.
    pub historical_congestion_factor: f64,
    /// Upper clamp on connection criticality.
    pub max_criticality: f64,
    /// Exponent sharpening the default criticality estimate.
    pub criticality_exponent: f64,
    /// Connections above this criticality are rerouted every iteration.
    pub min_reroute_criticality: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            granularity: Granularity::Node,
            timing_driven: false,
            bounding_box_margin_x: 3,
            bounding_box_margin_y: 15,
            relax_bounding_box: true,
            wirelength_weight: 0.8,
            hop_weight: 0.0,
            timing_weight: 0.35,
            initial_present_congestion_factor: 0.5,
            present_congestion_multiplier: 2.0,
            historical_congestion_factor: 1.0,
            max_criticality: 0.99,
            criticality_exponent: 3.0,
            min_reroute_criticality: 0.85,
        }
    }
}
