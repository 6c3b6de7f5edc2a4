//! Cost-directed best-first search for a single connection.
//!
//! The search runs over the lazily expanded resource graph. Per-unit scratch
//! state lives in the arena and is reset through the touched list before the
//! search returns, so units are reused across searches without reallocation.

use crate::connection::{Connection, PathStep};
use crate::graph::{Child, Expander, RoutingGraph, RoutingUnit, UnitKind};
use crate::ids::{EntryId, UnitId};
use crate::net::NetWrapper;
use crate::timing::TimingOracle;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use strand_config::RouterConfig;
use strand_fabric::Fabric;

/// A pending unit in the priority queue.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    unit: UnitId,
    total_cost: f64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; equal costs pop the lower unit index first
        other
            .total_cost
            .total_cmp(&self.total_cost)
            .then_with(|| other.unit.cmp(&self.unit))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Weights of the cost estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostWeights {
    /// Weight on the remaining Manhattan distance.
    pub wirelength: f64,
    /// Weight on the search depth.
    pub hop: f64,
    /// Weight on the delay estimate in timing-driven mode.
    pub timing: f64,
}

impl CostWeights {
    /// Reads the weights from router configuration.
    pub fn from_config(config: &RouterConfig) -> Self {
        Self {
            wirelength: config.wirelength_weight,
            hop: config.hop_weight,
            timing: config.timing_weight,
        }
    }
}

/// Reusable search engine. Holds the queue and touched list between
/// searches so their allocations are kept.
#[derive(Debug)]
pub struct PathSearch {
    weights: CostWeights,
    queue: BinaryHeap<QueueEntry>,
    touched: Vec<UnitId>,
    searches: usize,
    expansions: usize,
}

impl PathSearch {
    /// Creates a search engine with the given weights.
    pub fn new(weights: CostWeights) -> Self {
        Self {
            weights,
            queue: BinaryHeap::new(),
            touched: Vec::new(),
            searches: 0,
            expansions: 0,
        }
    }

    /// Number of searches run so far.
    pub fn searches(&self) -> usize {
        self.searches
    }

    /// Number of units popped and expanded so far.
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Finds the cheapest path for `conn` under the current congestion
    /// costs.
    ///
    /// Returns the path sink first, or `None` when the queue empties before
    /// the sink is reached. Does not touch occupancy; the caller rips up and
    /// re-adds usage around the search.
    pub fn search<F: Fabric + ?Sized>(
        &mut self,
        graph: &mut RoutingGraph,
        expander: &Expander<'_, F>,
        conn: &Connection,
        net: &NetWrapper,
        present_factor: f64,
        timing: Option<&dyn TimingOracle>,
    ) -> Option<Vec<PathStep>> {
        self.searches += 1;
        let result = self.run(graph, expander, conn, net, present_factor, timing);
        graph.reset_search(&self.touched);
        self.touched.clear();
        self.queue.clear();
        result
    }

    fn run<F: Fabric + ?Sized>(
        &mut self,
        graph: &mut RoutingGraph,
        expander: &Expander<'_, F>,
        conn: &Connection,
        net: &NetWrapper,
        present_factor: f64,
        timing: Option<&dyn TimingOracle>,
    ) -> Option<Vec<PathStep>> {
        let source = conn.source();
        let sink = conn.sink();
        self.touch(graph, source);
        self.queue.push(QueueEntry {
            unit: source,
            total_cost: 0.0,
        });

        while let Some(QueueEntry { unit, total_cost }) = self.queue.pop() {
            let state = graph.search_state(unit);
            if state.visited || total_cost > state.total_cost {
                continue;
            }
            graph.search_state_mut(unit).visited = true;
            if unit == sink {
                return Some(backtrace(graph, sink));
            }
            self.expansions += 1;

            let parent = *graph.search_state(unit);
            for child in expander.expand(graph, unit) {
                if !admissible(graph, conn, net, child.unit) {
                    continue;
                }
                let child_state = graph.search_state(child.unit);
                if child_state.visited {
                    continue;
                }
                let child_unit = graph.unit(child.unit);
                let reuse = child_unit.usage().user_count(net.source()) as f64;
                let partial_cost = parent.partial_cost
                    + unit_cost(graph, child, net, present_factor)
                    + bias_cost(child_unit, net);
                let depth = parent.depth + 1;
                let distance = child_unit.bounds().distance(&graph.unit(sink).bounds()) as f64;
                let congestion_total = partial_cost
                    + self.weights.wirelength * distance / (1.0 + reuse)
                    + self.weights.hop * depth as f64;

                let (partial_delay, total) = match timing {
                    Some(oracle) => {
                        let delay = parent.partial_delay + oracle.unit_delay(child_unit);
                        let estimate = oracle
                            .estimate_delay(&child_unit.bounds(), &graph.unit(sink).bounds());
                        let crit = conn.criticality();
                        let total = (1.0 - crit) * congestion_total
                            + crit * self.weights.timing * (delay + estimate);
                        (delay, total)
                    }
                    None => (0.0, congestion_total),
                };

                if child_state.touched && total >= child_state.total_cost {
                    continue;
                }
                self.touch(graph, child.unit);
                let state = graph.search_state_mut(child.unit);
                state.partial_cost = partial_cost;
                state.partial_delay = partial_delay;
                state.total_cost = total;
                state.prev = Some(unit);
                state.prev_entry = child.entry;
                state.depth = depth;
                self.queue.push(QueueEntry {
                    unit: child.unit,
                    total_cost: total,
                });
            }
        }
        None
    }

    fn touch(&mut self, graph: &mut RoutingGraph, unit: UnitId) {
        let state = graph.search_state_mut(unit);
        if !state.touched {
            state.touched = true;
            self.touched.push(unit);
        }
    }
}

/// Whether the search may enter `unit` on the way to `conn`'s sink.
///
/// Any wire of the connection's own pin nodes is allowed, so wire-mode
/// searches can cross a multi-wire pin.
fn admissible(graph: &RoutingGraph, conn: &Connection, net: &NetWrapper, unit: UnitId) -> bool {
    if unit == conn.sink() {
        return true;
    }
    let u = graph.unit(unit);
    if u.node() == conn.sink_node() || u.node() == conn.source_node() {
        return true;
    }
    match u.kind() {
        UnitKind::SourcePin | UnitKind::SinkPin | UnitKind::Reserved => false,
        UnitKind::PinBounce => {
            let (dx, dy) = u.bounds().gaps(&graph.unit(conn.sink()).bounds());
            dx <= 1 && dy <= 1
        }
        UnitKind::Interconnect => net.is_relaxed() || u.bounds().intersects(&conn.bbox()),
    }
}

/// Congestion-scaled cost of entering `child`.
fn unit_cost(graph: &RoutingGraph, child: Child, net: &NetWrapper, present_factor: f64) -> f64 {
    let source = net.source();
    let unit = graph.unit(child.unit);
    let usage = unit.usage();
    let reuse = usage.user_count(source);
    let mut historical = usage.historical_cost;
    let mut present = shared_present(
        usage.present_cost,
        reuse,
        usage.occupancy(),
        unit.capacity(),
        present_factor,
    );
    if let Some(entry) = child.entry {
        let (h, p) = entry_costs(graph, entry, net, present_factor);
        historical += h;
        present += p;
    }
    // a wire pays for the congestion of its whole node, at unit scale
    if let Some(node) = unit.shared() {
        let (h, p) = entry_costs(graph, node, net, present_factor);
        historical *= h;
        present *= p;
    }
    unit.base_cost() * historical * present / (1.0 + reuse as f64)
}

fn entry_costs(
    graph: &RoutingGraph,
    entry: EntryId,
    net: &NetWrapper,
    present_factor: f64,
) -> (f64, f64) {
    let entry = graph.entry(entry);
    let usage = entry.usage();
    let present = shared_present(
        usage.present_cost,
        usage.user_count(net.source()),
        usage.occupancy(),
        entry.capacity(),
        present_factor,
    );
    (usage.historical_cost, present)
}

/// A net never pays congestion for itself: when its own source already uses
/// a resource the present term only counts the other users.
fn shared_present(
    stored: f64,
    reuse: u32,
    occupancy: u32,
    capacity: u32,
    present_factor: f64,
) -> f64 {
    if reuse > 0 {
        1.0 + (occupancy as f64 - capacity as f64).max(0.0) * present_factor
    } else {
        stored
    }
}

/// Pull towards the net's centroid, weaker for high-fanout nets.
fn bias_cost(unit: &RoutingUnit, net: &NetWrapper) -> f64 {
    let fanout = net.fanout().max(1) as f64;
    let distance = unit.bounds().center().manhattan(&net.centroid());
    unit.base_cost() / fanout * distance / net.double_hpwl().max(1.0)
}

fn backtrace(graph: &RoutingGraph, sink: UnitId) -> Vec<PathStep> {
    let mut path = Vec::new();
    let mut current = Some(sink);
    while let Some(unit) = current {
        let state = graph.search_state(unit);
        path.push(PathStep {
            unit,
            entry: state.prev_entry,
        });
        current = state.prev;
    }
    path
}
