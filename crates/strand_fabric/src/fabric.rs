//! The read-only fabric oracle queried by the router.

use crate::ids::{NodeId, PipId, WireId};
use crate::types::{ElementKind, NodeInfo, Pip, Wire};
use serde::{Deserialize, Serialize};
use strand_common::Rect;

/// A fabric element at either wire or node level.
///
/// Elements are canonical: the same physical element always compares and
/// hashes equal, so they double as cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    /// A single wire segment.
    Wire(WireId),
    /// A whole node.
    Node(NodeId),
}

/// A pure, side-effect-free query interface over a device's interconnect.
///
/// Implementors provide the five primitive lookups; adjacency, route-through
/// detection, geometry, and switch-point lookup are derived from them.
/// Implementations must be safe to share for reads across threads.
pub trait Fabric {
    /// Returns the wire with the given ID.
    fn wire(&self, wire: WireId) -> &Wire;

    /// Returns the wires making up a node, in a stable order.
    ///
    /// A well-formed fabric never returns an empty slice, but a decoded one
    /// may, so callers must not index it blindly.
    fn node_wires(&self, node: NodeId) -> &[WireId];

    /// Returns the metadata of a node.
    fn node_info(&self, node: NodeId) -> &NodeInfo;

    /// Returns the PIPs driven by a wire, in a stable order.
    fn downhill_pips(&self, wire: WireId) -> &[PipId];

    /// Returns the PIP with the given ID.
    fn pip(&self, pip: PipId) -> &Pip;

    /// Returns the node a wire belongs to.
    fn node_of(&self, wire: WireId) -> NodeId {
        self.wire(wire).node
    }

    /// Returns the other wires of `wire`'s node, in node order.
    ///
    /// Sibling wires are one electrical conductor, so moving between them
    /// crosses no PIP.
    fn sibling_wires(&self, wire: WireId) -> Vec<WireId> {
        self.node_wires(self.node_of(wire))
            .iter()
            .copied()
            .filter(|&w| w != wire)
            .collect()
    }

    /// Returns the node an element belongs to.
    fn canonical_node(&self, element: Element) -> NodeId {
        match element {
            Element::Wire(w) => self.node_of(w),
            Element::Node(n) => n,
        }
    }

    /// Returns the usage class of an element.
    fn kind(&self, element: Element) -> ElementKind {
        self.node_info(self.canonical_node(element)).kind
    }

    /// Returns the tiles covered by an element.
    fn bounds(&self, element: Element) -> Rect {
        match element {
            Element::Wire(w) => self.wire(w).bounds,
            Element::Node(n) => self.node_info(n).bounds,
        }
    }

    /// Returns the elements reachable through one PIP, in first-seen order.
    ///
    /// Wires map to wires and nodes to nodes; a node never lists itself.
    /// A wire only lists the destinations of its own PIPs, not its
    /// [siblings](Fabric::sibling_wires).
    fn neighbors(&self, element: Element) -> Vec<Element> {
        let mut out: Vec<Element> = Vec::new();
        match element {
            Element::Wire(w) => {
                for &pip in self.downhill_pips(w) {
                    let next = Element::Wire(self.pip(pip).dst_wire);
                    if !out.contains(&next) {
                        out.push(next);
                    }
                }
            }
            Element::Node(n) => {
                for &w in self.node_wires(n) {
                    for &pip in self.downhill_pips(w) {
                        let dst = self.node_of(self.pip(pip).dst_wire);
                        let next = Element::Node(dst);
                        if dst != n && !out.contains(&next) {
                            out.push(next);
                        }
                    }
                }
            }
        }
        out
    }

    /// Returns every PIP leading from `from` into `to`.
    fn pips_between(&self, from: Element, to: Element) -> Vec<PipId> {
        let sources: Vec<WireId> = match from {
            Element::Wire(w) => vec![w],
            Element::Node(n) => self.node_wires(n).to_vec(),
        };
        let mut out = Vec::new();
        for w in sources {
            for &pip in self.downhill_pips(w) {
                let dst = self.pip(pip).dst_wire;
                let hit = match to {
                    Element::Wire(t) => dst == t,
                    Element::Node(t) => self.node_of(dst) == t,
                };
                if hit {
                    out.push(pip);
                }
            }
        }
        out
    }

    /// Returns whether `from` only reaches `to` through site route-throughs.
    ///
    /// Elements that are not adjacent at all are not route-throughs.
    fn is_route_through(&self, from: Element, to: Element) -> bool {
        let pips = self.pips_between(from, to);
        !pips.is_empty() && pips.iter().all(|&p| self.pip(p).route_through)
    }

    /// Returns the switch point joining two adjacent elements.
    ///
    /// Regular PIPs are preferred over route-throughs; among equals the
    /// lowest ID wins so the choice is deterministic.
    fn find_pip_between(&self, from: Element, to: Element) -> Option<PipId> {
        let pips = self.pips_between(from, to);
        pips.iter()
            .copied()
            .filter(|&p| !self.pip(p).route_through)
            .min()
            .or_else(|| pips.iter().copied().min())
    }
}
