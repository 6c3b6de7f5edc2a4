//! Negotiated-congestion detailed router for FPGA interconnect fabrics.
//!
//! Every net is split into driver-to-sink connections. Each iteration routes
//! a batch of connections with a cost-directed search over routing units that
//! are materialized lazily from the [`Fabric`] oracle. Resources may be
//! shared between nets at first; their present and historical congestion
//! costs grow until every net finds its own wiring. Nets that end up with a
//! resource reached from two different parents are then repaired into trees.
//!
//! # Pipeline
//!
//! 1. **Initialize**: build nets, connections, and pin units from a
//!    [`RouteDesign`]
//! 2. **Iterate**: rip up and re-route connections, then update costs
//! 3. **Repair**: once nothing is overused, remove cycles and multiple
//!    drivers from each net's resource graph
//! 4. **Translate**: turn unit paths into PIPs and [`RouteTree`]s
//!
//! # Usage
//!
//! ```ignore
//! use strand_route::route_design;
//!
//! let outcome = route_design(&fabric, &design, config, &sink)?;
//! for net in &outcome.nets {
//!     println!("{}: {} pips", net.name, net.pips.len());
//! }
//! ```

#![warn(missing_docs)]

pub mod congestion;
pub mod connection;
pub mod design;
pub mod error;
pub mod graph;
pub mod ids;
pub mod net;
pub mod repair;
pub mod route_tree;
pub mod router;
pub mod search;
pub mod timing;

pub use congestion::{CongestionManager, CongestionReport};
pub use connection::{Connection, PathStep};
pub use design::{DesignNet, NetClass, RouteDesign};
pub use error::RouteError;
pub use graph::{Expander, RoutingGraph, RoutingUnit, UnitKey, UnitKind};
pub use ids::{ConnectionId, EntryId, NetId, UnitId};
pub use net::NetWrapper;
pub use repair::{repair_net, RepairOutcome};
pub use route_tree::{translate_net, RouteNode, RouteResource, RouteTree, RoutedNet};
pub use router::{FailureSummary, RouteOutcome, RouteStats, RouteStatus, Router, RouterState};
pub use search::{CostWeights, PathSearch};
pub use timing::{LinearTiming, TimingOracle};

use strand_config::RouterConfig;
use strand_diagnostics::DiagnosticSink;
use strand_fabric::Fabric;

/// Routes every signal net of a design over a fabric.
///
/// Builds a [`Router`], runs it to convergence or exhaustion, and returns the
/// per-net switch points and route trees. Fatal problems are returned as
/// [`RouteError`] and also emitted into `sink`; non-convergence is only a
/// warning and shows up in [`RouteOutcome::status`].
pub fn route_design<F: Fabric + ?Sized>(
    fabric: &F,
    design: &RouteDesign,
    config: RouterConfig,
    sink: &DiagnosticSink,
) -> Result<RouteOutcome, RouteError> {
    let mut router = Router::new(fabric, design, config, sink)?;
    router.route(sink)
}
