//! Physical routing results: route trees and switch-point translation.
//!
//! A [`RouteTree`] describes the fabric resources of one net from its driver
//! to every sink. [`translate_net`] turns the net's unit paths into the
//! ordered set of PIPs that realizes them.

use crate::connection::{Connection, PathStep};
use crate::error::RouteError;
use crate::graph::{RoutingGraph, UnitKey};
use crate::ids::{NetId, UnitId};
use crate::net::NetWrapper;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strand_fabric::{Element, Fabric, NodeId, PipId, WireId};

/// The routed wiring of a single net, rooted at the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTree {
    /// The driver-side root.
    pub root: RouteNode,
}

impl RouteTree {
    /// Creates a route tree with the given root node.
    pub fn new(root: RouteNode) -> Self {
        Self { root }
    }

    /// Returns the total number of resources in the tree.
    pub fn resource_count(&self) -> usize {
        self.root.subtree_size()
    }

    /// Returns the longest driver-to-leaf chain, counted in resources.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Returns the number of leaves, one per distinct sink.
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// Returns every wire resource in the tree.
    pub fn wires_used(&self) -> Vec<WireId> {
        let mut wires = Vec::new();
        self.root.collect(&mut |r| {
            if let RouteResource::Wire(w) = r {
                wires.push(w);
            }
        });
        wires
    }

    /// Returns every node resource in the tree.
    pub fn nodes_used(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        self.root.collect(&mut |r| {
            if let RouteResource::Node(n) = r {
                nodes.push(n);
            }
        });
        nodes
    }

    /// Adds one driver-first resource chain, sharing any common prefix.
    ///
    /// The chain must start at the root's resource.
    fn insert(&mut self, chain: &[RouteResource]) {
        let mut node = &mut self.root;
        for &resource in chain.iter().skip(1) {
            let idx = match node.children.iter().position(|c| c.resource == resource) {
                Some(i) => i,
                None => {
                    node.children.push(RouteNode::leaf(resource));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx];
        }
    }
}

/// One resource of a route tree and its downstream branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNode {
    /// The resource used at this point.
    pub resource: RouteResource,
    /// Downstream branches.
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    /// A node without branches.
    pub fn leaf(resource: RouteResource) -> Self {
        Self {
            resource,
            children: Vec::new(),
        }
    }

    /// Returns the number of nodes in this subtree, including self.
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| c.subtree_size())
            .sum::<usize>()
    }

    /// Returns the longest chain from self to a leaf.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(|c| c.leaf_count()).sum()
        }
    }

    fn collect(&self, f: &mut impl FnMut(RouteResource)) {
        f(self.resource);
        for child in &self.children {
            child.collect(f);
        }
    }
}

/// A fabric resource held by a route tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteResource {
    /// A wire segment (wire granularity).
    Wire(WireId),
    /// A whole node (node and node-group granularity).
    Node(NodeId),
}

impl From<Element> for RouteResource {
    fn from(element: Element) -> Self {
        match element {
            Element::Wire(w) => RouteResource::Wire(w),
            Element::Node(n) => RouteResource::Node(n),
        }
    }
}

/// The output for one net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedNet {
    /// The net's router ID.
    pub net: NetId,
    /// The net's name.
    pub name: String,
    /// Switch points to enable, in first-use order without duplicates.
    pub pips: Vec<PipId>,
    /// The fabric resources from the driver to every sink.
    pub tree: RouteTree,
}

/// The fabric elements a path step passes through, entry first.
fn step_elements(graph: &RoutingGraph, step: PathStep) -> (Option<Element>, Element) {
    let entry = step
        .entry
        .map(|e| Element::Node(graph.entry(e).node()));
    (entry, graph.unit(step.unit).key().element())
}

fn pip_between<F: Fabric + ?Sized>(
    fabric: &F,
    from: Element,
    to: Element,
    units: (UnitId, UnitId),
) -> Result<PipId, RouteError> {
    fabric
        .find_pip_between(from, to)
        .ok_or(RouteError::MissingSwitchPoint {
            from: units.0,
            to: units.1,
        })
}

fn is_sibling_hop(graph: &RoutingGraph, (from, to): (UnitId, UnitId)) -> bool {
    let (from, to) = (graph.unit(from), graph.unit(to));
    matches!((from.key(), to.key()), (UnitKey::Wire(_), UnitKey::Wire(_)))
        && from.node() == to.node()
}

/// Translates a net's connection paths into its switch points and route
/// tree.
///
/// Fails with [`RouteError::MissingSwitchPoint`] if two consecutive units
/// have no PIP between them, which means the router produced an
/// inconsistent path.
pub fn translate_net<F: Fabric + ?Sized>(
    fabric: &F,
    graph: &RoutingGraph,
    net: &NetWrapper,
    connections: &[Connection],
) -> Result<RoutedNet, RouteError> {
    let root: RouteResource = graph.unit(net.source()).key().element().into();
    let mut tree = RouteTree::new(RouteNode::leaf(root));
    let mut pips = Vec::new();
    let mut seen: HashSet<PipId> = HashSet::new();

    for conn in connections {
        let forward: Vec<PathStep> = conn.forward_path().collect();
        let mut chain = vec![root];
        for pair in forward.windows(2) {
            let (prev, step) = (pair[0], pair[1]);
            let from = graph.unit(prev.unit).key().element();
            let (entry, to) = step_elements(graph, step);
            let units = (prev.unit, step.unit);
            let hops: Vec<PipId> = match entry {
                Some(via) => vec![
                    pip_between(fabric, from, via, units)?,
                    pip_between(fabric, via, to, units)?,
                ],
                // sibling wires of one node are joined without a PIP
                None if is_sibling_hop(graph, units) => Vec::new(),
                None => vec![pip_between(fabric, from, to, units)?],
            };
            for pip in hops {
                if seen.insert(pip) {
                    pips.push(pip);
                }
            }
            chain.extend(entry.map(RouteResource::from));
            chain.push(to.into());
        }
        tree.insert(&chain);
    }

    Ok(RoutedNet {
        net: net.id(),
        name: net.name().to_string(),
        pips,
        tree,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Expander, UnitKey};
    use crate::ids::ConnectionId;
    use strand_common::Rect;
    use strand_config::Granularity;
    use strand_fabric::{ElementKind, FabricBuilder};

    #[test]
    fn tree_shares_common_prefix() {
        let n = NodeId::from_raw;
        let mut tree = RouteTree::new(RouteNode::leaf(RouteResource::Node(n(0))));
        tree.insert(&[
            RouteResource::Node(n(0)),
            RouteResource::Node(n(1)),
            RouteResource::Node(n(2)),
        ]);
        tree.insert(&[
            RouteResource::Node(n(0)),
            RouteResource::Node(n(1)),
            RouteResource::Node(n(3)),
        ]);
        assert_eq!(tree.resource_count(), 4);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.nodes_used(), vec![n(0), n(1), n(2), n(3)]);
        assert!(tree.wires_used().is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let tree = RouteTree::new(RouteNode {
            resource: RouteResource::Wire(WireId::from_raw(42)),
            children: vec![RouteNode::leaf(RouteResource::Node(NodeId::from_raw(7)))],
        });
        let json = serde_json::to_string(&tree).unwrap();
        let restored: RouteTree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tree);
    }

    fn net_for(graph: &RoutingGraph, source: UnitId, src: NodeId) -> NetWrapper {
        NetWrapper::new(
            NetId::from_raw(0),
            "n".into(),
            0,
            (source, src),
            &[graph.unit(source).bounds()],
        )
    }

    fn routed(
        graph: &RoutingGraph,
        source: (UnitId, NodeId),
        sink: (UnitId, NodeId),
        forward: Vec<PathStep>,
    ) -> Connection {
        let mut c = Connection::new(
            ConnectionId::from_raw(0),
            NetId::from_raw(0),
            (source.0, source.1, graph.unit(source.0).bounds()),
            (sink.0, sink.1, graph.unit(sink.0).bounds()),
            (0, 0),
        );
        c.path = forward.into_iter().rev().collect();
        c
    }

    #[test]
    fn node_path_translates_to_pips() {
        let mut b = FabricBuilder::new();
        let src = b.add_node("src", ElementKind::OutputPin, Rect::tile(0, 0));
        let mid = b.add_node("mid", ElementKind::Interconnect, Rect::tile(1, 0));
        let dst = b.add_node("dst", ElementKind::InputPin, Rect::tile(2, 0));
        let p1 = b.connect(src, mid);
        let p2 = b.connect(mid, dst);
        let fabric = b.build();

        let mut graph = RoutingGraph::new();
        let us = graph.get_or_create_unit(&fabric, UnitKey::Node(src));
        let um = graph.get_or_create_unit(&fabric, UnitKey::Node(mid));
        let ud = graph.get_or_create_unit(&fabric, UnitKey::Node(dst));
        let conn = routed(
            &graph,
            (us, src),
            (ud, dst),
            vec![PathStep::unit(us), PathStep::unit(um), PathStep::unit(ud)],
        );
        let net = net_for(&graph, us, src);

        let out = translate_net(&fabric, &graph, &net, &[conn]).unwrap();
        assert_eq!(out.pips, vec![p1, p2]);
        assert_eq!(out.tree.nodes_used(), vec![src, mid, dst]);
    }

    #[test]
    fn entry_crossing_emits_two_pips() {
        let mut b = FabricBuilder::new();
        let src = b.add_node("src", ElementKind::OutputPin, Rect::tile(0, 0));
        let e = b.add_node("e", ElementKind::Interconnect, Rect::tile(1, 0));
        let dst = b.add_node("dst", ElementKind::InputPin, Rect::tile(1, 0));
        b.mark_group_entry(e);
        let p1 = b.connect(src, e);
        let p2 = b.connect(e, dst);
        let fabric = b.build();

        let expander = Expander::new(&fabric, Granularity::NodeGroup, HashSet::new());
        let mut graph = RoutingGraph::new();
        let us = expander.unit_for_node(&mut graph, src).unwrap();
        let children = expander.expand(&mut graph, us);
        assert_eq!(children.len(), 1);
        let ud = children[0].unit;
        let conn = routed(
            &graph,
            (us, src),
            (ud, dst),
            vec![
                PathStep::unit(us),
                PathStep {
                    unit: ud,
                    entry: children[0].entry,
                },
            ],
        );
        let net = net_for(&graph, us, src);

        let out = translate_net(&fabric, &graph, &net, &[conn]).unwrap();
        assert_eq!(out.pips, vec![p1, p2]);
        assert_eq!(out.tree.nodes_used(), vec![src, e, dst]);
    }

    #[test]
    fn sibling_wire_hop_needs_no_pip() {
        let mut b = FabricBuilder::new();
        let src = b.add_node("src", ElementKind::OutputPin, Rect::tile(0, 0));
        let mid = b.add_node("mid", ElementKind::Interconnect, Rect::tile(1, 0));
        let mid_1 = b.add_wire(mid, "mid_1", Rect::tile(2, 0));
        let dst = b.add_node("dst", ElementKind::InputPin, Rect::tile(3, 0));
        let p1 = b.connect(src, mid);
        let p2 = b.connect(mid, dst);
        let fabric = b.build();
        let mid_0 = fabric.node_wires(mid)[0];

        let mut graph = RoutingGraph::new();
        let wire =
            |graph: &mut RoutingGraph, w| graph.get_or_create_unit(&fabric, UnitKey::Wire(w));
        let us = wire(&mut graph, fabric.node_wires(src)[0]);
        let um0 = wire(&mut graph, mid_0);
        let um1 = wire(&mut graph, mid_1);
        let ud = wire(&mut graph, fabric.node_wires(dst)[0]);
        let conn = routed(
            &graph,
            (us, src),
            (ud, dst),
            [us, um0, um1, ud].into_iter().map(PathStep::unit).collect(),
        );
        let net = net_for(&graph, us, src);

        let out = translate_net(&fabric, &graph, &net, &[conn]).unwrap();
        assert_eq!(out.pips, vec![p1, p2]);
        assert_eq!(
            out.tree.wires_used(),
            vec![fabric.node_wires(src)[0], mid_0, mid_1, fabric.node_wires(dst)[0]]
        );
    }

    #[test]
    fn missing_pip_is_reported_with_both_units() {
        let mut b = FabricBuilder::new();
        let src = b.add_node("src", ElementKind::OutputPin, Rect::tile(0, 0));
        let dst = b.add_node("dst", ElementKind::InputPin, Rect::tile(1, 0));
        let fabric = b.build();

        let mut graph = RoutingGraph::new();
        let us = graph.get_or_create_unit(&fabric, UnitKey::Node(src));
        let ud = graph.get_or_create_unit(&fabric, UnitKey::Node(dst));
        let conn = routed(
            &graph,
            (us, src),
            (ud, dst),
            vec![PathStep::unit(us), PathStep::unit(ud)],
        );
        let net = net_for(&graph, us, src);

        match translate_net(&fabric, &graph, &net, &[conn]) {
            Err(RouteError::MissingSwitchPoint { from, to }) => {
                assert_eq!((from, to), (us, ud));
            }
            other => panic!("expected a missing switch point, got {other:?}"),
        }
    }
}
