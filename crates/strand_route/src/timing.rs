//! The pluggable delay/criticality contributor for timing-driven routing.

use crate::connection::Connection;
use crate::graph::{RoutingGraph, RoutingUnit};
use crate::ids::ConnectionId;
use std::collections::HashMap;
use strand_common::Rect;
use strand_config::RouterConfig;

/// Delay and criticality oracle consulted by the search in timing-driven
/// mode.
pub trait TimingOracle {
    /// Intrinsic delay of entering a unit, in nanoseconds.
    fn unit_delay(&self, unit: &RoutingUnit) -> f64;

    /// Estimated delay from a unit's bounds to a sink's bounds.
    fn estimate_delay(&self, from: &Rect, to: &Rect) -> f64;

    /// Recomputes criticalities from the current paths.
    fn analyze(&mut self, graph: &RoutingGraph, connections: &[Connection]);

    /// Criticality of a connection in `[0, 1]`.
    fn criticality(&self, connection: &Connection) -> f64;
}

/// A distance-proportional delay model.
///
/// Path delay is the sum of unit delays plus a fixed cost per unit entered;
/// criticality is the delay relative to the slowest connection, sharpened by
/// an exponent and clamped.
#[derive(Debug, Clone)]
pub struct LinearTiming {
    tile_delay_ns: f64,
    hop_delay_ns: f64,
    max_criticality: f64,
    exponent: f64,
    criticality: HashMap<ConnectionId, f64>,
}

impl LinearTiming {
    /// Creates a model with explicit delays and criticality shaping.
    pub fn new(tile_delay_ns: f64, hop_delay_ns: f64, max_criticality: f64, exponent: f64) -> Self {
        Self {
            tile_delay_ns,
            hop_delay_ns,
            max_criticality,
            exponent,
            criticality: HashMap::new(),
        }
    }

    /// Creates a model with default delays and the configured shaping.
    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(
            0.1,
            0.05,
            config.max_criticality,
            config.criticality_exponent,
        )
    }

    /// Delay along a connection's current path.
    pub fn path_delay(&self, graph: &RoutingGraph, connection: &Connection) -> f64 {
        connection
            .path()
            .iter()
            .map(|step| self.unit_delay(graph.unit(step.unit)))
            .sum()
    }
}

impl TimingOracle for LinearTiming {
    fn unit_delay(&self, unit: &RoutingUnit) -> f64 {
        unit.delay() + self.hop_delay_ns + self.tile_delay_ns * unit.length() as f64
    }

    fn estimate_delay(&self, from: &Rect, to: &Rect) -> f64 {
        self.tile_delay_ns * from.distance(to) as f64
    }

    fn analyze(&mut self, graph: &RoutingGraph, connections: &[Connection]) {
        let delays: Vec<(ConnectionId, f64)> = connections
            .iter()
            .map(|c| (c.id(), self.path_delay(graph, c)))
            .collect();
        let max_delay = delays.iter().map(|&(_, d)| d).fold(0.0, f64::max);
        self.criticality.clear();
        for (id, delay) in delays {
            let crit = if max_delay > 0.0 {
                (delay / max_delay).powf(self.exponent).min(self.max_criticality)
            } else {
                0.0
            };
            self.criticality.insert(id, crit);
        }
    }

    fn criticality(&self, connection: &Connection) -> f64 {
        self.criticality
            .get(&connection.id())
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::PathStep;
    use crate::graph::UnitKey;
    use crate::ids::{NetId, UnitId};
    use strand_fabric::{ElementKind, FabricBuilder, NodeId};

    #[test]
    fn longest_path_is_most_critical() {
        let mut b = FabricBuilder::new();
        let nodes: Vec<NodeId> = (0..4)
            .map(|i| b.add_node(format!("n{i}"), ElementKind::Interconnect, Rect::tile(i, 0)))
            .collect();
        let fabric = b.build();
        let mut graph = RoutingGraph::new();
        let units: Vec<UnitId> = nodes
            .iter()
            .map(|&n| graph.get_or_create_unit(&fabric, UnitKey::Node(n)))
            .collect();

        let make = |id: u32, path: &[UnitId]| {
            let mut c = Connection::new(
                ConnectionId::from_raw(id),
                NetId::from_raw(0),
                (path[path.len() - 1], NodeId::from_raw(0), Rect::tile(0, 0)),
                (path[0], NodeId::from_raw(0), Rect::tile(0, 0)),
                (0, 0),
            );
            c.path = path.iter().map(|&u| PathStep::unit(u)).collect();
            c
        };
        let long = make(0, &[units[3], units[2], units[1], units[0]]);
        let short = make(1, &[units[1], units[0]]);

        let mut timing = LinearTiming::new(0.1, 0.05, 0.99, 1.0);
        timing.analyze(&graph, &[long.clone(), short.clone()]);
        assert_eq!(timing.criticality(&long), 0.99);
        assert!((timing.criticality(&short) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_connection_is_not_critical() {
        let timing = LinearTiming::new(0.1, 0.05, 0.99, 3.0);
        let c = Connection::new(
            ConnectionId::from_raw(9),
            NetId::from_raw(0),
            (UnitId::from_raw(0), NodeId::from_raw(0), Rect::tile(0, 0)),
            (UnitId::from_raw(1), NodeId::from_raw(1), Rect::tile(3, 4)),
            (0, 0),
        );
        assert_eq!(timing.criticality(&c), 0.0);
        assert!((timing.estimate_delay(&Rect::tile(0, 0), &Rect::tile(3, 4)) - 0.7).abs() < 1e-9);
    }
}
