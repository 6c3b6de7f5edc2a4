//! The negotiated-congestion cost schedule.
//!
//! Present cost reacts to current overuse and is recomputed whenever a unit's
//! occupancy changes; historical cost accumulates across iterations for
//! resources that stay overused. Together they push competing connections
//! apart over successive iterations.

use crate::connection::PathStep;
use crate::graph::{RoutingGraph, Usage};
use crate::ids::{EntryId, UnitId};
use serde::{Deserialize, Serialize};
use strand_config::RouterConfig;

/// Present cost for a resource at the given `occupancy - capacity`.
pub fn present_cost(overuse: i64, present_factor: f64) -> f64 {
    match overuse {
        o if o < 0 => 1.0,
        0 => 1.0 + present_factor,
        o => 1.0 + (o + 1) as f64 * present_factor,
    }
}

/// Counts of resources violating the capacity or single-driver rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CongestionReport {
    /// Units used by more sources than their capacity.
    pub overused_units: usize,
    /// Entry sub-nodes used by more sources than their capacity.
    pub overused_entries: usize,
    /// Units with more than one distinct parent.
    pub illegal_units: usize,
    /// Entry sub-nodes with more than one distinct parent.
    pub illegal_entries: usize,
}

impl CongestionReport {
    /// Returns whether no resource is overused.
    pub fn is_valid(&self) -> bool {
        self.overused_units == 0 && self.overused_entries == 0
    }

    /// Returns whether some resource has more than one driver.
    pub fn has_illegal(&self) -> bool {
        self.illegal_units > 0 || self.illegal_entries > 0
    }

    /// Returns whether the routing is finished.
    pub fn is_converged(&self) -> bool {
        self.is_valid() && !self.has_illegal()
    }
}

/// Owns the present/historical congestion schedule and applies usage
/// changes to the resource graph.
#[derive(Debug, Clone)]
pub struct CongestionManager {
    present_factor: f64,
    multiplier: f64,
    historical_factor: f64,
}

impl CongestionManager {
    /// Creates a manager with an explicit schedule.
    pub fn new(initial_present_factor: f64, multiplier: f64, historical_factor: f64) -> Self {
        Self {
            present_factor: initial_present_factor,
            multiplier,
            historical_factor,
        }
    }

    /// Creates a manager from router configuration.
    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(
            config.initial_present_congestion_factor,
            config.present_congestion_multiplier,
            config.historical_congestion_factor,
        )
    }

    /// The current present-congestion factor.
    pub fn present_factor(&self) -> f64 {
        self.present_factor
    }

    /// The historical accumulation factor.
    pub fn historical_factor(&self) -> f64 {
        self.historical_factor
    }

    /// Closes an iteration: grows the present factor, then rescores every
    /// unit and entry sub-node.
    pub fn end_iteration(&mut self, graph: &mut RoutingGraph) {
        self.present_factor *= self.multiplier;
        self.update_costs(graph);
    }

    /// Rescores every unit and entry sub-node at the current factors.
    pub fn update_costs(&self, graph: &mut RoutingGraph) {
        for unit in graph.units_mut() {
            self.rescore(&mut unit.usage, unit.capacity);
        }
        for entry in graph.entries_mut() {
            self.rescore(&mut entry.usage, entry.capacity);
        }
    }

    fn rescore(&self, usage: &mut Usage, capacity: u32) {
        let overuse = usage.overuse(capacity);
        usage.present_cost = present_cost(overuse, self.present_factor);
        if overuse > 0 {
            usage.historical_cost += overuse as f64 * self.historical_factor;
        }
    }

    /// Records `source` as a user of every unit and entry on `path`
    /// (sink first) and refreshes their present cost.
    pub fn add_path(&self, graph: &mut RoutingGraph, source: UnitId, path: &[PathStep]) {
        for (i, step) in path.iter().enumerate() {
            let parent = path.get(i + 1).map(|p| p.unit);
            let unit = graph.unit_mut(step.unit);
            unit.usage.add_user(source, parent);
            let capacity = unit.capacity;
            self.refresh(&mut unit.usage, capacity);
            let shared = unit.shared;
            if let Some(entry) = step.entry {
                self.update_entry(graph, entry, |u| u.add_user(source, parent));
            }
            // the electrical node is occupied, not driven, by each wire
            if let Some(node) = shared {
                self.update_entry(graph, node, |u| u.add_user(source, None));
            }
        }
    }

    /// Removes the usage recorded by [`add_path`](Self::add_path) for the
    /// same path.
    pub fn rip_up_path(&self, graph: &mut RoutingGraph, source: UnitId, path: &[PathStep]) {
        for (i, step) in path.iter().enumerate() {
            let parent = path.get(i + 1).map(|p| p.unit);
            let unit = graph.unit_mut(step.unit);
            unit.usage.remove_user(source, parent);
            let capacity = unit.capacity;
            self.refresh(&mut unit.usage, capacity);
            let shared = unit.shared;
            if let Some(entry) = step.entry {
                self.update_entry(graph, entry, |u| u.remove_user(source, parent));
            }
            if let Some(node) = shared {
                self.update_entry(graph, node, |u| u.remove_user(source, None));
            }
        }
    }

    fn update_entry(&self, graph: &mut RoutingGraph, entry: EntryId, f: impl FnOnce(&mut Usage)) {
        let entry = graph.entry_mut(entry);
        f(&mut entry.usage);
        let capacity = entry.capacity;
        self.refresh(&mut entry.usage, capacity);
    }

    fn refresh(&self, usage: &mut Usage, capacity: u32) {
        usage.present_cost = present_cost(usage.overuse(capacity), self.present_factor);
    }

    /// Counts overused and illegal resources across the whole graph.
    pub fn survey(&self, graph: &RoutingGraph) -> CongestionReport {
        let mut report = CongestionReport::default();
        for unit in graph.units() {
            report.overused_units += unit.is_overused() as usize;
            report.illegal_units += unit.is_illegal() as usize;
        }
        for entry in graph.entries() {
            report.overused_entries += entry.is_overused() as usize;
            report.illegal_entries += entry.is_illegal() as usize;
        }
        report
    }
}
