//! Restores tree shape on nets whose paths give a resource several drivers.
//!
//! Runs only once no resource is overused. Cycles in the union of a net's
//! paths are broken first by back-edge removal, after which every path is
//! recomputed as a fewest-hop path in the repaired graph. Remaining
//! multi-driver points are then resolved one at a time by grafting the
//! longest path's upstream part onto every other path through the point.

use crate::congestion::CongestionManager;
use crate::connection::{Connection, PathStep};
use crate::graph::RoutingGraph;
use crate::ids::{ConnectionId, EntryId, UnitId};
use petgraph::algo::astar;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{depth_first_search, Control, DfsEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use strand_common::{InternalError, StrandResult};
use tracing::debug;

/// The union of a net's paths, source to sink. Edge weights record the
/// entry sub-node crossed on that hop.
type NetGraph = DiGraphMap<UnitId, Option<EntryId>>;

/// What [`repair_net`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
    /// Back edges removed from the net graph.
    pub cycles_removed: usize,
    /// Paths rewired onto another connection's upstream part.
    pub grafts: usize,
    /// Whether every resource of the net now has at most one driver.
    pub legal: bool,
}

/// A resource with more than one distinct parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IllegalPoint {
    Unit(UnitId),
    Entry(EntryId),
}

impl IllegalPoint {
    fn matches(self, step: &PathStep) -> bool {
        match self {
            IllegalPoint::Unit(u) => step.unit == u,
            IllegalPoint::Entry(e) => step.entry == Some(e),
        }
    }
}

/// Repairs one net's paths in place and reconciles occupancy.
///
/// `connections` are the net's connections; all share the driver unit
/// `source`. Unrouted connections are left alone.
pub fn repair_net(
    graph: &mut RoutingGraph,
    congestion: &CongestionManager,
    source: UnitId,
    connections: &mut [Connection],
) -> StrandResult<RepairOutcome> {
    let mut paths: Vec<Vec<PathStep>> = connections.iter().map(|c| c.path.clone()).collect();
    let ids: Vec<ConnectionId> = connections.iter().map(Connection::id).collect();
    let mut outcome = RepairOutcome::default();

    let mut net_graph = build_graph(&paths);
    if find_back_edge(&net_graph, source).is_some() {
        let protected: HashSet<UnitId> = std::iter::once(source)
            .chain(connections.iter().map(Connection::sink))
            .collect();
        outcome.cycles_removed = remove_cycles(&mut net_graph, source, &protected);
        for (path, conn) in paths.iter_mut().zip(connections.iter()) {
            if path.is_empty() {
                continue;
            }
            *path = shortest_path(&net_graph, source, conn.sink()).ok_or_else(|| {
                InternalError::new(format!(
                    "cycle removal disconnected the sink of connection {}",
                    conn.id()
                ))
            })?;
        }
        debug!(
            net = %connections[0].net(),
            cycles = outcome.cycles_removed,
            "removed routing cycles"
        );
    }

    let limit = paths.iter().map(Vec::len).sum::<usize>() + 1;
    for _ in 0..limit {
        let Some(point) = first_illegal(&paths) else {
            break;
        };
        let grafts = resolve(&mut paths, &ids, point);
        debug!(?point, grafts, "grafted paths onto longest driver");
        outcome.grafts += grafts;
    }
    outcome.legal = first_illegal(&paths).is_none();

    for (path, conn) in paths.iter().zip(connections.iter()) {
        if path.is_empty() {
            continue;
        }
        let ends_ok = path.first().map(|s| s.unit) == Some(conn.sink())
            && path.last().map(|s| s.unit) == Some(source);
        if !ends_ok {
            return Err(InternalError::new(format!(
                "repaired path of connection {} no longer joins its pins",
                conn.id()
            )));
        }
    }

    for conn in connections.iter() {
        congestion.rip_up_path(graph, source, &conn.path);
    }
    for (conn, path) in connections.iter_mut().zip(paths) {
        conn.path = path;
        congestion.add_path(graph, source, &conn.path);
    }
    Ok(outcome)
}

fn build_graph(paths: &[Vec<PathStep>]) -> NetGraph {
    let mut g = NetGraph::new();
    for path in paths {
        let forward: Vec<PathStep> = path.iter().rev().copied().collect();
        for step in &forward {
            g.add_node(step.unit);
        }
        for pair in forward.windows(2) {
            if !g.contains_edge(pair[0].unit, pair[1].unit) {
                g.add_edge(pair[0].unit, pair[1].unit, pair[1].entry);
            }
        }
    }
    g
}

fn find_back_edge(g: &NetGraph, root: UnitId) -> Option<(UnitId, UnitId)> {
    if !g.contains_node(root) {
        return None;
    }
    depth_first_search(g, Some(root), |event| match event {
        DfsEvent::BackEdge(u, v) => Control::Break((u, v)),
        _ => Control::Continue,
    })
    .break_value()
}

/// Removes back edges until the graph reachable from `root` is acyclic.
/// Each round deletes at least one edge, so the loop is bounded by the
/// edge count.
fn remove_cycles(g: &mut NetGraph, root: UnitId, protected: &HashSet<UnitId>) -> usize {
    let mut removed = 0;
    while let Some((u, v)) = find_back_edge(g, root) {
        g.remove_edge(u, v);
        removed += 1;
        if !protected.contains(&u) && g.neighbors(u).next().is_none() {
            g.remove_node(u);
        }
    }
    removed
}

/// Fewest-hop path from `source` to `sink`, sink first.
fn shortest_path(g: &NetGraph, source: UnitId, sink: UnitId) -> Option<Vec<PathStep>> {
    let (_, nodes) = astar(g, source, |n| n == sink, |_| 1u32, |_| 0u32)?;
    let mut steps = Vec::with_capacity(nodes.len());
    steps.push(PathStep::unit(source));
    for pair in nodes.windows(2) {
        let entry = g.edge_weight(pair[0], pair[1]).copied().flatten();
        steps.push(PathStep {
            unit: pair[1],
            entry,
        });
    }
    steps.reverse();
    Some(steps)
}

/// The lowest-indexed unit, then entry, with more than one parent across
/// the net's paths.
fn first_illegal(paths: &[Vec<PathStep>]) -> Option<IllegalPoint> {
    let mut unit_parents: BTreeMap<UnitId, BTreeSet<UnitId>> = BTreeMap::new();
    let mut entry_parents: BTreeMap<EntryId, BTreeSet<UnitId>> = BTreeMap::new();
    for path in paths {
        for (i, step) in path.iter().enumerate() {
            let Some(parent) = path.get(i + 1) else {
                continue;
            };
            unit_parents.entry(step.unit).or_default().insert(parent.unit);
            if let Some(entry) = step.entry {
                entry_parents.entry(entry).or_default().insert(parent.unit);
            }
        }
    }
    unit_parents
        .iter()
        .find(|(_, parents)| parents.len() > 1)
        .map(|(&u, _)| IllegalPoint::Unit(u))
        .or_else(|| {
            entry_parents
                .iter()
                .find(|(_, parents)| parents.len() > 1)
                .map(|(&e, _)| IllegalPoint::Entry(e))
        })
}

/// Rewires every path through `point` whose parent there differs from the
/// longest path's. Returns the number of paths rewired.
fn resolve(paths: &mut [Vec<PathStep>], ids: &[ConnectionId], point: IllegalPoint) -> usize {
    let forward: Vec<Vec<PathStep>> = paths
        .iter()
        .map(|p| p.iter().rev().copied().collect())
        .collect();
    let through: Vec<(usize, usize)> = forward
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            p.iter()
                .position(|s| point.matches(s))
                .filter(|&pos| pos > 0)
                .map(|pos| (i, pos))
        })
        .collect();
    let Some(&(winner, wpos)) = through.iter().max_by(|a, b| {
        forward[a.0]
            .len()
            .cmp(&forward[b.0].len())
            .then_with(|| ids[b.0].cmp(&ids[a.0]))
    }) else {
        return 0;
    };
    let winner_parent = forward[winner][wpos - 1].unit;

    let mut grafts = 0;
    for &(i, pos) in &through {
        if i == winner || forward[i][pos - 1].unit == winner_parent {
            continue;
        }
        let mut grafted: Vec<PathStep> = match point {
            IllegalPoint::Unit(_) => forward[winner][..=wpos]
                .iter()
                .chain(&forward[i][pos + 1..])
                .copied()
                .collect(),
            IllegalPoint::Entry(_) => forward[winner][..wpos]
                .iter()
                .chain(&forward[i][pos..])
                .copied()
                .collect(),
        };
        erase_loops(&mut grafted);
        grafted.reverse();
        paths[i] = grafted;
        grafts += 1;
    }
    grafts
}

/// Cuts every revisit out of a source-first path, keeping the first visit.
fn erase_loops(path: &mut Vec<PathStep>) {
    let mut out: Vec<PathStep> = Vec::with_capacity(path.len());
    for &step in path.iter() {
        match out.iter().position(|s| s.unit == step.unit) {
            Some(j) => out.truncate(j + 1),
            None => out.push(step),
        }
    }
    *path = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::UnitKey;
    use crate::ids::NetId;
    use strand_common::Rect;
    use strand_fabric::{ElementKind, FabricBuilder, FabricGraph, NodeId};

    struct Fixture {
        fabric: FabricGraph,
        graph: RoutingGraph,
        units: Vec<UnitId>,
    }

    fn fixture(count: usize) -> Fixture {
        let mut b = FabricBuilder::new();
        let nodes: Vec<NodeId> = (0..count)
            .map(|i| b.add_node(format!("n{i}"), ElementKind::Interconnect, Rect::tile(0, 0)))
            .collect();
        let fabric = b.build();
        let mut graph = RoutingGraph::new();
        let units = nodes
            .iter()
            .map(|&n| graph.get_or_create_unit(&fabric, UnitKey::Node(n)))
            .collect();
        Fixture {
            fabric,
            graph,
            units,
        }
    }

    fn conn(id: u32, forward: &[PathStep]) -> Connection {
        let mut c = Connection::new(
            ConnectionId::from_raw(id),
            NetId::from_raw(0),
            (forward[0].unit, NodeId::from_raw(0), Rect::tile(0, 0)),
            (
                forward[forward.len() - 1].unit,
                NodeId::from_raw(0),
                Rect::tile(0, 0),
            ),
            (0, 0),
        );
        c.path = forward.iter().rev().copied().collect();
        c
    }

    fn steps(units: &[UnitId]) -> Vec<PathStep> {
        units.iter().map(|&u| PathStep::unit(u)).collect()
    }

    fn forward_units(c: &Connection) -> Vec<UnitId> {
        c.forward_path().map(|s| s.unit).collect()
    }

    fn install(f: &mut Fixture, cm: &CongestionManager, conns: &[Connection]) {
        for c in conns {
            cm.add_path(&mut f.graph, c.source(), &c.path);
        }
    }

    #[test]
    fn cycle_is_broken_and_paths_recomputed() {
        let mut f = fixture(5);
        let [s, a, b, t1, t2] = [f.units[0], f.units[1], f.units[2], f.units[3], f.units[4]];
        let cm = CongestionManager::new(0.5, 2.0, 1.0);
        let mut conns = vec![
            conn(0, &steps(&[s, a, b, t1])),
            conn(1, &steps(&[s, b, a, t2])),
        ];
        install(&mut f, &cm, &conns);
        assert!(f.graph.unit(a).is_illegal());

        let outcome = repair_net(&mut f.graph, &cm, s, &mut conns).unwrap();
        assert_eq!(outcome.cycles_removed, 1);
        assert!(outcome.legal);
        assert_eq!(forward_units(&conns[0]), vec![s, b, t1]);
        assert_eq!(forward_units(&conns[1]), vec![s, a, t2]);
        assert!(cm.survey(&f.graph).is_converged());
    }

    #[test]
    fn multi_driver_unit_takes_longest_upstream() {
        let mut f = fixture(6);
        let [s, a, b, c, t1, t2] = [
            f.units[0], f.units[1], f.units[2], f.units[3], f.units[4], f.units[5],
        ];
        let cm = CongestionManager::new(0.5, 2.0, 1.0);
        let mut conns = vec![
            conn(0, &steps(&[s, a, c, t1])),
            conn(1, &steps(&[s, b, c, t2])),
        ];
        install(&mut f, &cm, &conns);
        assert!(f.graph.unit(c).is_illegal());

        let outcome = repair_net(&mut f.graph, &cm, s, &mut conns).unwrap();
        assert_eq!(outcome.cycles_removed, 0);
        assert_eq!(outcome.grafts, 1);
        assert!(outcome.legal);
        assert_eq!(forward_units(&conns[1]), vec![s, a, c, t2]);
        assert_eq!(f.graph.unit(b).usage().occupancy(), 0);
        assert_eq!(f.graph.unit(c).usage().parent_count(), 1);
    }

    #[test]
    fn shared_entry_with_two_drivers_is_regrafted() {
        // s -> x -> a -(e)-> g1 -> t1
        // s -> b -(e)-> g2 -> t2
        // s -> x -> a -(e)-> g3 -> t3
        let mut f = fixture(11);
        let u = f.units.clone();
        let [s, x, a, b, g1, g2, g3, t1, t2, t3] =
            [u[0], u[1], u[2], u[3], u[4], u[5], u[6], u[7], u[8], u[9]];
        let entry_node = f.fabric.node_by_name("n10").unwrap();
        let e = f.graph.get_or_create_entry(&f.fabric, entry_node);
        let via = |unit| PathStep {
            unit,
            entry: Some(e),
        };

        let cm = CongestionManager::new(0.5, 2.0, 1.0);
        let p = PathStep::unit;
        let mut conns = vec![
            conn(0, &[p(s), p(x), p(a), via(g1), p(t1)]),
            conn(1, &[p(s), p(b), via(g2), p(t2)]),
            conn(2, &[p(s), p(x), p(a), via(g3), p(t3)]),
        ];
        install(&mut f, &cm, &conns);
        assert_eq!(f.graph.entry(e).usage().parent_count(), 2);
        assert!(!cm.survey(&f.graph).is_converged());

        let outcome = repair_net(&mut f.graph, &cm, s, &mut conns).unwrap();
        assert!(outcome.legal);
        assert_eq!(outcome.grafts, 1);
        assert_eq!(
            conns[1].forward_path().collect::<Vec<_>>(),
            vec![p(s), p(x), p(a), via(g2), p(t2)]
        );
        assert_eq!(f.graph.entry(e).usage().parent_count(), 1);
        assert_eq!(f.graph.unit(b).usage().occupancy(), 0);
        assert!(cm.survey(&f.graph).is_converged());
    }

    #[test]
    fn legal_net_is_unchanged() {
        let mut f = fixture(4);
        let [s, a, t1, t2] = [f.units[0], f.units[1], f.units[2], f.units[3]];
        let cm = CongestionManager::new(0.5, 2.0, 1.0);
        let mut conns = vec![
            conn(0, &steps(&[s, a, t1])),
            conn(1, &steps(&[s, a, t2])),
        ];
        install(&mut f, &cm, &conns);
        let before: Vec<_> = f.graph.units().map(|u| u.usage().clone()).collect();

        let outcome = repair_net(&mut f.graph, &cm, s, &mut conns).unwrap();
        assert_eq!(
            outcome,
            RepairOutcome {
                cycles_removed: 0,
                grafts: 0,
                legal: true
            }
        );
        let after: Vec<_> = f.graph.units().map(|u| u.usage().clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn back_edge_removal_terminates_on_dense_cycles() {
        let ids: Vec<UnitId> = (0..4).map(UnitId::from_raw).collect();
        let mut g = NetGraph::new();
        for &a in &ids {
            for &b in &ids {
                if a != b {
                    g.add_edge(a, b, None);
                }
            }
        }
        let protected = HashSet::from([ids[0], ids[3]]);
        let removed = remove_cycles(&mut g, ids[0], &protected);
        assert!(removed > 0);
        assert!(find_back_edge(&g, ids[0]).is_none());
    }

    #[test]
    fn loops_are_erased_keeping_first_visit() {
        let u: Vec<UnitId> = (0..5).map(UnitId::from_raw).collect();
        let mut path = steps(&[u[0], u[1], u[2], u[1], u[3]]);
        erase_loops(&mut path);
        assert_eq!(path, steps(&[u[0], u[1], u[3]]));
    }
}
