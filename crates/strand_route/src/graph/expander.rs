//! On-demand discovery of a unit's downstream neighbours.

use super::unit::{Child, UnitKey};
use super::RoutingGraph;
use crate::ids::UnitId;
use std::collections::HashSet;
use strand_common::{InternalError, StrandResult};
use strand_config::Granularity;
use strand_fabric::{Element, Fabric, NodeId};

/// Grows the resource graph from the fabric oracle.
///
/// Expansion is idempotent: a unit's child list is computed once and then
/// served from the arena. Reserved nodes and route-through-only hops are
/// never materialized as children.
pub struct Expander<'f, F: Fabric + ?Sized> {
    fabric: &'f F,
    granularity: Granularity,
    reserved: HashSet<NodeId>,
}

impl<'f, F: Fabric + ?Sized> Expander<'f, F> {
    /// Creates an expander over `fabric` that skips `reserved` nodes.
    pub fn new(fabric: &'f F, granularity: Granularity, reserved: HashSet<NodeId>) -> Self {
        Self {
            fabric,
            granularity,
            reserved,
        }
    }

    /// The fabric oracle.
    pub fn fabric(&self) -> &'f F {
        self.fabric
    }

    /// The configured granularity.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Returns whether a node is off limits to this run.
    pub fn is_reserved(&self, node: NodeId) -> bool {
        self.reserved.contains(&node)
    }

    /// The unit key standing for a pin node at the configured granularity.
    ///
    /// In wire mode a pin is represented by its node's first wire; a node
    /// without wires cannot be a pin there.
    pub fn key_for_node(&self, node: NodeId) -> StrandResult<UnitKey> {
        Ok(match self.granularity {
            Granularity::Wire => {
                let wire = self.fabric.node_wires(node).first().copied().ok_or_else(|| {
                    InternalError::new(format!("pin node {node} has no wires"))
                })?;
                UnitKey::Wire(wire)
            }
            Granularity::Node => UnitKey::Node(node),
            Granularity::NodeGroup => UnitKey::NodeGroup(node),
        })
    }

    /// Materializes the unit for a pin node.
    pub fn unit_for_node(&self, graph: &mut RoutingGraph, node: NodeId) -> StrandResult<UnitId> {
        let key = self.key_for_node(node)?;
        Ok(graph.get_or_create_unit(self.fabric, key))
    }

    /// Returns the children of `unit`, discovering them on first call.
    pub fn expand(&self, graph: &mut RoutingGraph, unit: UnitId) -> Vec<Child> {
        if let Some(children) = graph.unit(unit).children() {
            return children.to_vec();
        }
        let children = match graph.unit(unit).key() {
            UnitKey::NodeGroup(exit) => self.expand_group(graph, exit),
            key => self.expand_plain(graph, key.element()),
        };
        graph.unit_mut(unit).children = Some(children.clone());
        children
    }

    fn admissible(&self, from: Element, to: Element) -> bool {
        !self.is_reserved(self.fabric.canonical_node(to)) && !self.fabric.is_route_through(from, to)
    }

    /// A wire also reaches the other wires of its node without crossing a
    /// PIP; those come first.
    fn expand_plain(&self, graph: &mut RoutingGraph, element: Element) -> Vec<Child> {
        let mut children = Vec::new();
        if let Element::Wire(w) = element {
            if !self.is_reserved(self.fabric.node_of(w)) {
                for sibling in self.fabric.sibling_wires(w) {
                    children.push(Child {
                        unit: graph.get_or_create_unit(self.fabric, UnitKey::Wire(sibling)),
                        entry: None,
                    });
                }
            }
        }
        for next in self.fabric.neighbors(element) {
            if !self.admissible(element, next) {
                continue;
            }
            let key = match next {
                Element::Wire(w) => UnitKey::Wire(w),
                Element::Node(n) => UnitKey::Node(n),
            };
            let child = Child {
                unit: graph.get_or_create_unit(self.fabric, key),
                entry: None,
            };
            if !children.contains(&child) {
                children.push(child);
            }
        }
        children
    }

    /// Groups are keyed by their exit node. A neighbour flagged as a group
    /// entry is not a unit of its own: the search crosses it into every
    /// exit it fans out to, and all of those sibling groups share one entry
    /// sub-node.
    fn expand_group(&self, graph: &mut RoutingGraph, exit: NodeId) -> Vec<Child> {
        let from = Element::Node(exit);
        let mut children = Vec::new();
        for next in self.fabric.neighbors(from) {
            if !self.admissible(from, next) {
                continue;
            }
            let node = self.fabric.canonical_node(next);
            if !self.fabric.node_info(node).group_entry {
                let child = Child {
                    unit: graph.get_or_create_unit(self.fabric, UnitKey::NodeGroup(node)),
                    entry: None,
                };
                if !children.contains(&child) {
                    children.push(child);
                }
                continue;
            }
            let entry = graph.get_or_create_entry(self.fabric, node);
            for sibling in self.fabric.neighbors(next) {
                if !self.admissible(next, sibling) {
                    continue;
                }
                let sibling_node = self.fabric.canonical_node(sibling);
                if sibling_node == exit {
                    continue;
                }
                let unit = graph.get_or_create_unit(self.fabric, UnitKey::NodeGroup(sibling_node));
                graph.attach_entry(unit, entry);
                let child = Child {
                    unit,
                    entry: Some(entry),
                };
                if !children.contains(&child) {
                    children.push(child);
                }
            }
        }
        children
    }
}
