//! The negotiated-congestion control loop.
//!
//! Each iteration rips up and re-routes a batch of connections one at a
//! time, so every search sees the usage left by the searches before it.
//! Once no resource is overused, nets with several drivers on a resource
//! are repaired. Otherwise costs are updated and the next batch is routed,
//! until convergence or the iteration budget runs out.

use crate::congestion::{CongestionManager, CongestionReport};
use crate::connection::{Connection, PathStep};
use crate::design::{NetClass, RouteDesign};
use crate::error::{
    RouteError, BOUNDING_BOX_RELAXED, ITERATIONS_EXHAUSTED, NET_WITHOUT_SINKS, REPAIR_INCOMPLETE,
};
use crate::graph::{Expander, RoutingGraph};
use crate::ids::{ConnectionId, NetId};
use crate::net::NetWrapper;
use crate::repair::repair_net;
use crate::route_tree::{translate_net, RoutedNet};
use crate::search::{CostWeights, PathSearch};
use crate::timing::{LinearTiming, TimingOracle};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use strand_common::StrandResult;
use strand_config::{validate_config, RouterConfig};
use strand_diagnostics::{Diagnostic, DiagnosticSink, Locus};
use strand_fabric::{Fabric, NodeId};
use tracing::{debug, info, trace, warn};

/// Where the control loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterState {
    /// Nets and connections are being built.
    Initializing,
    /// Batches are being routed.
    Iterating,
    /// A batch left no overused or multi-driven resource.
    Converged,
    /// The iteration budget ran out.
    Exhausted,
}

/// What was still wrong when the iteration budget ran out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Iterations run.
    pub iterations: u32,
    /// Remaining overused and multi-driven resources.
    pub congestion: CongestionReport,
    /// Connections touching a remaining violation.
    pub congested_connections: usize,
}

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStatus {
    /// Every connection is routed legally.
    Converged,
    /// The budget ran out; the routing is best-effort.
    Exhausted(FailureSummary),
}

/// Counters collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStats {
    /// Routing units materialized.
    pub units: usize,
    /// Entry sub-nodes materialized.
    pub entries: usize,
    /// Connection reroutes across all iterations.
    pub connections_routed: usize,
    /// Searches run, including bounding-box retries.
    pub searches: usize,
    /// Units expanded by the searches.
    pub expansions: usize,
    /// Nets passed through tree repair.
    pub repairs: usize,
    /// Back edges removed by tree repair.
    pub cycles_removed: usize,
    /// Paths regrafted by tree repair.
    pub grafts: usize,
    /// Nets whose bounding box was dropped.
    pub relaxed_nets: usize,
}

/// The result of a routing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    /// How the run ended.
    pub status: RouteStatus,
    /// Iterations run.
    pub iterations: u32,
    /// Per-net wiring, in router net order.
    pub nets: Vec<RoutedNet>,
    /// Run counters.
    pub stats: RouteStats,
}

impl RouteOutcome {
    /// Returns whether the run converged.
    pub fn is_converged(&self) -> bool {
        self.status == RouteStatus::Converged
    }
}

/// Emits the error as a diagnostic and hands it back for propagation.
fn emit_error(sink: &DiagnosticSink, err: RouteError) -> RouteError {
    sink.emit(err.to_diagnostic());
    err
}

/// One routing run over a fabric.
///
/// All per-run state, including the resource graph and its caches, is owned
/// here and dropped with the router.
pub struct Router<'a, F: Fabric + ?Sized> {
    fabric: &'a F,
    config: RouterConfig,
    expander: Expander<'a, F>,
    graph: RoutingGraph,
    nets: Vec<NetWrapper>,
    connections: Vec<Connection>,
    congestion: CongestionManager,
    search: PathSearch,
    timing: Option<Box<dyn TimingOracle + 'a>>,
    state: RouterState,
    iteration: u32,
    stats: RouteStats,
}

impl<'a, F: Fabric + ?Sized> Router<'a, F> {
    /// Validates the configuration and builds nets, connections, and their
    /// pin units.
    pub fn new(
        fabric: &'a F,
        design: &RouteDesign,
        config: RouterConfig,
        sink: &DiagnosticSink,
    ) -> Result<Self, RouteError> {
        validate_config(&config).map_err(|e| emit_error(sink, e.into()))?;

        let reserved: HashSet<NodeId> = design.reserved_nodes().collect();
        let expander = Expander::new(fabric, config.granularity, reserved);
        let timing: Option<Box<dyn TimingOracle + 'a>> = if config.timing_driven {
            Some(Box::new(LinearTiming::from_config(&config)))
        } else {
            None
        };
        let mut router = Self {
            fabric,
            congestion: CongestionManager::from_config(&config),
            search: PathSearch::new(CostWeights::from_config(&config)),
            config,
            expander,
            graph: RoutingGraph::new(),
            nets: Vec::new(),
            connections: Vec::new(),
            timing,
            state: RouterState::Initializing,
            iteration: 0,
            stats: RouteStats::default(),
        };

        for (index, dnet) in design.nets.iter().enumerate() {
            if dnet.class != NetClass::Signal {
                continue;
            }
            if dnet.sinks.is_empty() {
                sink.emit(Diagnostic::warning(
                    NET_WITHOUT_SINKS,
                    format!("net `{}` has no sinks and was not routed", dnet.name),
                    Locus::Run,
                ));
                continue;
            }
            let id = NetId::from_index(router.nets.len());
            let driver = if router.expander.is_reserved(dnet.driver) {
                match dnet.alternate_driver {
                    Some(alt) if !router.expander.is_reserved(alt) => {
                        debug!(net = %dnet.name, "driver reserved, using alternate driver");
                        alt
                    }
                    _ => {
                        return Err(emit_error(
                            sink,
                            RouteError::MissingAlternateSource {
                                net: id,
                                name: dnet.name.clone(),
                            },
                        ))
                    }
                }
            } else {
                dnet.driver
            };
            if let Err(err) = router.add_net(id, index, &dnet.name, driver, &dnet.sinks) {
                return Err(emit_error(sink, err.into()));
            }
        }
        debug!(
            nets = router.nets.len(),
            connections = router.connections.len(),
            granularity = %router.config.granularity,
            "router initialized"
        );
        Ok(router)
    }

    fn add_net(
        &mut self,
        id: NetId,
        index: usize,
        name: &str,
        driver: NodeId,
        sinks: &[NodeId],
    ) -> StrandResult<()> {
        let source = self.expander.unit_for_node(&mut self.graph, driver)?;
        let source_bounds = self.graph.unit(source).bounds();
        let sink_units = sinks
            .iter()
            .map(|&s| Ok((self.expander.unit_for_node(&mut self.graph, s)?, s)))
            .collect::<StrandResult<Vec<_>>>()?;
        let mut pin_bounds = vec![source_bounds];
        pin_bounds.extend(sink_units.iter().map(|&(u, _)| self.graph.unit(u).bounds()));

        let mut net = NetWrapper::new(id, name.to_string(), index, (source, driver), &pin_bounds);
        let margin = (
            self.config.bounding_box_margin_x,
            self.config.bounding_box_margin_y,
        );
        for (unit, node) in sink_units {
            let conn_id = ConnectionId::from_index(self.connections.len());
            self.connections.push(Connection::new(
                conn_id,
                id,
                (source, driver, source_bounds),
                (unit, node, self.graph.unit(unit).bounds()),
                margin,
            ));
            net.connections.push(conn_id);
        }
        self.nets.push(net);
        Ok(())
    }

    /// Replaces the delay/criticality oracle used in timing-driven mode.
    pub fn with_timing_oracle(mut self, oracle: impl TimingOracle + 'a) -> Self {
        self.timing = Some(Box::new(oracle));
        self
    }

    /// Current control-loop state.
    pub fn state(&self) -> RouterState {
        self.state
    }

    /// The current iteration, starting at 1 once routing begins.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// The resource graph.
    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    /// The routed nets.
    pub fn nets(&self) -> &[NetWrapper] {
        &self.nets
    }

    /// Every connection, indexed by [`ConnectionId`].
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// The connections of one net.
    pub fn net_connections(&self, net: NetId) -> &[Connection] {
        &self.connections[self.nets[net.index()].connection_range()]
    }

    /// The congestion schedule.
    pub fn congestion(&self) -> &CongestionManager {
        &self.congestion
    }

    /// Runs the control loop to convergence or exhaustion.
    ///
    /// Fails on an unreachable sink, a missing switch point, or a broken
    /// invariant; each failure is also emitted into `sink`. Exhaustion is
    /// not an error: it is reported as a warning and in the outcome status.
    pub fn route(&mut self, sink: &DiagnosticSink) -> Result<RouteOutcome, RouteError> {
        self.state = RouterState::Iterating;
        self.iteration = 1;
        let report = loop {
            let batch = self.select_batch();
            for &idx in &batch {
                self.route_connection(idx, sink)?;
            }

            let mut report = self.congestion.survey(&self.graph);
            if report.is_valid() {
                if report.has_illegal() {
                    self.repair_illegal_nets(sink)?;
                    report = self.congestion.survey(&self.graph);
                }
                self.update_timing();
            }
            info!(
                iteration = self.iteration,
                routed = batch.len(),
                overused_units = report.overused_units,
                overused_entries = report.overused_entries,
                illegal_units = report.illegal_units,
                illegal_entries = report.illegal_entries,
                present_factor = self.congestion.present_factor(),
                "routing iteration finished"
            );

            if report.is_converged() {
                self.state = RouterState::Converged;
                break report;
            }
            if self.iteration >= self.config.max_iterations {
                self.state = RouterState::Exhausted;
                break report;
            }
            self.congestion.end_iteration(&mut self.graph);
            self.iteration += 1;
        };

        let status = match self.state {
            RouterState::Exhausted => {
                let summary = FailureSummary {
                    iterations: self.iteration,
                    congested_connections: (0..self.connections.len())
                        .filter(|&i| self.is_congested(&self.connections[i]))
                        .count(),
                    congestion: report,
                };
                warn!(
                    iterations = self.iteration,
                    congested_connections = summary.congested_connections,
                    "routing did not converge"
                );
                sink.emit(
                    Diagnostic::warning(
                        ITERATIONS_EXHAUSTED,
                        format!(
                            "routing did not converge after {} iterations",
                            self.iteration
                        ),
                        Locus::Run,
                    )
                    .with_note(format!(
                        "{} units and {} entry sub-nodes overused, {} units and {} entry sub-nodes with several drivers",
                        summary.congestion.overused_units,
                        summary.congestion.overused_entries,
                        summary.congestion.illegal_units,
                        summary.congestion.illegal_entries
                    ))
                    .with_help("raise max_iterations or the present congestion multiplier"),
                );
                RouteStatus::Exhausted(summary)
            }
            _ => RouteStatus::Converged,
        };

        let mut nets = Vec::with_capacity(self.nets.len());
        for net in &self.nets {
            let conns = &self.connections[net.connection_range()];
            let routed = translate_net(self.fabric, &self.graph, net, conns)
                .map_err(|e| emit_error(sink, e))?;
            nets.push(routed);
        }

        self.stats.units = self.graph.unit_count();
        self.stats.entries = self.graph.entry_count();
        self.stats.searches = self.search.searches();
        self.stats.expansions = self.search.expansions();
        Ok(RouteOutcome {
            status,
            iterations: self.iteration,
            nets,
            stats: self.stats.clone(),
        })
    }

    /// Connection indices to route this iteration, highest-fanout nets
    /// first, then shortest connections.
    fn select_batch(&self) -> Vec<usize> {
        let mut batch: Vec<usize> = if self.iteration <= 1 {
            (0..self.connections.len()).collect()
        } else {
            (0..self.connections.len())
                .filter(|&i| self.needs_reroute(&self.connections[i]))
                .collect()
        };
        batch.sort_by_key(|&i| {
            let c = &self.connections[i];
            (
                Reverse(self.nets[c.net().index()].fanout()),
                c.hpwl(),
                c.id(),
            )
        });
        batch
    }

    fn needs_reroute(&self, conn: &Connection) -> bool {
        !conn.is_routed()
            || self.is_congested(conn)
            || (self.config.timing_driven
                && conn.criticality() > self.config.min_reroute_criticality)
    }

    /// Whether the connection's path touches an overused or multi-driven
    /// resource.
    fn is_congested(&self, conn: &Connection) -> bool {
        conn.path().iter().any(|step| {
            let unit = self.graph.unit(step.unit);
            let entry_bad = step.entry.into_iter().chain(unit.shared()).any(|e| {
                let entry = self.graph.entry(e);
                entry.is_overused() || entry.is_illegal()
            });
            unit.is_overused() || unit.is_illegal() || entry_bad
        })
    }

    fn route_connection(&mut self, idx: usize, sink: &DiagnosticSink) -> Result<(), RouteError> {
        let net_idx = self.connections[idx].net().index();
        let source = self.nets[net_idx].source();
        let old = std::mem::take(&mut self.connections[idx].path);
        self.congestion.rip_up_path(&mut self.graph, source, &old);

        let mut found = self.search_connection(idx);
        if found.is_none() && self.config.relax_bounding_box && !self.nets[net_idx].is_relaxed() {
            let net = &mut self.nets[net_idx];
            net.relax();
            self.stats.relaxed_nets += 1;
            debug!(net = %net.name(), "search failed inside bounding box, retrying unbounded");
            sink.emit(Diagnostic::note(
                BOUNDING_BOX_RELAXED,
                format!("bounding box of net `{}` relaxed", net.name()),
                Locus::Net(net.id().as_raw()),
            ));
            found = self.search_connection(idx);
        }
        let Some(path) = found else {
            let conn = &self.connections[idx];
            return Err(emit_error(
                sink,
                RouteError::UnreachableSink {
                    net: conn.net(),
                    connection: conn.id(),
                    name: self.nets[net_idx].name().to_string(),
                },
            ));
        };

        self.congestion.add_path(&mut self.graph, source, &path);
        trace!(
            connection = %self.connections[idx].id(),
            hops = path.len(),
            "routed connection"
        );
        self.connections[idx].path = path;
        self.stats.connections_routed += 1;
        Ok(())
    }

    fn search_connection(&mut self, idx: usize) -> Option<Vec<PathStep>> {
        let conn = &self.connections[idx];
        let net = &self.nets[conn.net().index()];
        let timing = if self.config.timing_driven {
            self.timing.as_deref()
        } else {
            None
        };
        self.search.search(
            &mut self.graph,
            &self.expander,
            conn,
            net,
            self.congestion.present_factor(),
            timing,
        )
    }

    fn repair_illegal_nets(&mut self, sink: &DiagnosticSink) -> Result<(), RouteError> {
        for net_idx in 0..self.nets.len() {
            let range = self.nets[net_idx].connection_range();
            let illegal = self.connections[range.clone()].iter().any(|c| {
                c.path().iter().any(|step| {
                    self.graph.unit(step.unit).is_illegal()
                        || step.entry.is_some_and(|e| self.graph.entry(e).is_illegal())
                })
            });
            if !illegal {
                continue;
            }
            let net = &self.nets[net_idx];
            let outcome = repair_net(
                &mut self.graph,
                &self.congestion,
                net.source(),
                &mut self.connections[range],
            )
            .map_err(|e| emit_error(sink, e.into()))?;
            self.stats.repairs += 1;
            self.stats.cycles_removed += outcome.cycles_removed;
            self.stats.grafts += outcome.grafts;
            debug!(
                net = %net.name(),
                cycles_removed = outcome.cycles_removed,
                grafts = outcome.grafts,
                legal = outcome.legal,
                "repaired net"
            );
            if !outcome.legal {
                sink.emit(Diagnostic::warning(
                    REPAIR_INCOMPLETE,
                    format!("tree repair left net `{}` with a multi-driven resource", net.name()),
                    Locus::Net(net.id().as_raw()),
                ));
            }
        }
        Ok(())
    }

    fn update_timing(&mut self) {
        if !self.config.timing_driven {
            return;
        }
        let Some(oracle) = self.timing.as_mut() else {
            return;
        };
        oracle.analyze(&self.graph, &self.connections);
        for conn in &mut self.connections {
            conn.criticality = oracle.criticality(conn);
        }
    }
}
