//! The lazily materialized resource graph.
//!
//! Routing units and entry sub-nodes live in one arena per run and refer to
//! each other by [`UnitId`]/[`EntryId`]. Units are created on first
//! discovery and never torn down; their per-search scratch state is reset
//! through a touched list after each connection.

pub mod expander;
pub mod unit;

pub use expander::Expander;
pub use unit::{base_cost, Child, EntryNode, RoutingUnit, UnitKey, UnitKind, Usage};

use crate::ids::{EntryId, UnitId};
use std::collections::HashMap;
use strand_fabric::{Direction, Element, Fabric, NodeId};
use unit::SearchState;

/// Arena of routing units and entry sub-nodes, keyed by canonical fabric key.
#[derive(Debug, Default)]
pub struct RoutingGraph {
    units: Vec<RoutingUnit>,
    entries: Vec<EntryNode>,
    unit_cache: HashMap<UnitKey, UnitId>,
    entry_cache: HashMap<NodeId, EntryId>,
}

impl RoutingGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of materialized units.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Returns the number of materialized entry sub-nodes.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns a unit by ID.
    pub fn unit(&self, id: UnitId) -> &RoutingUnit {
        &self.units[id.index()]
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> &mut RoutingUnit {
        &mut self.units[id.index()]
    }

    /// Returns an entry sub-node by ID.
    pub fn entry(&self, id: EntryId) -> &EntryNode {
        &self.entries[id.index()]
    }

    pub(crate) fn entry_mut(&mut self, id: EntryId) -> &mut EntryNode {
        &mut self.entries[id.index()]
    }

    /// Iterates all units in creation order.
    pub fn units(&self) -> impl Iterator<Item = &RoutingUnit> {
        self.units.iter()
    }

    /// Iterates all entry sub-nodes in creation order.
    pub fn entries(&self) -> impl Iterator<Item = &EntryNode> {
        self.entries.iter()
    }

    pub(crate) fn units_mut(&mut self) -> impl Iterator<Item = &mut RoutingUnit> {
        self.units.iter_mut()
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut EntryNode> {
        self.entries.iter_mut()
    }

    /// Looks up an already materialized unit.
    pub fn find_unit(&self, key: UnitKey) -> Option<UnitId> {
        self.unit_cache.get(&key).copied()
    }

    /// Looks up an already materialized entry sub-node.
    pub fn find_entry(&self, node: NodeId) -> Option<EntryId> {
        self.entry_cache.get(&node).copied()
    }

    /// Returns the unit for `key`, creating it from fabric metadata on first
    /// use.
    pub fn get_or_create_unit<F: Fabric + ?Sized>(&mut self, fabric: &F, key: UnitKey) -> UnitId {
        if let Some(&id) = self.unit_cache.get(&key) {
            return id;
        }
        let element = key.element();
        let node = fabric.canonical_node(element);
        let info = fabric.node_info(node);
        let kind = UnitKind::from_element(info.kind);
        let bounds = fabric.bounds(element);
        let (length, direction) = match element {
            Element::Wire(_) => (bounds.half_perimeter() as u32, Direction::of(&bounds)),
            Element::Node(_) => (info.length, info.direction),
        };
        // sibling wires of one node are a single electrical resource
        let shared = match element {
            Element::Wire(_) if fabric.node_wires(node).len() > 1 => {
                Some(self.get_or_create_entry(fabric, node))
            }
            _ => None,
        };
        let id = UnitId::from_index(self.units.len());
        self.units.push(RoutingUnit {
            id,
            key,
            node,
            kind,
            capacity: 1,
            base_cost: base_cost(kind, length, direction),
            bounds,
            length,
            delay: info.delay.max_ns,
            entries: Vec::new(),
            shared,
            children: None,
            usage: Usage::default(),
            search: SearchState::default(),
        });
        self.unit_cache.insert(key, id);
        id
    }

    /// Returns the shared entry sub-node for a fabric node, creating it on
    /// first use. Every sibling group reached through `node`, and every wire
    /// of a multi-wire `node`, resolves to the same entry.
    pub fn get_or_create_entry<F: Fabric + ?Sized>(&mut self, fabric: &F, node: NodeId) -> EntryId {
        if let Some(&id) = self.entry_cache.get(&node) {
            return id;
        }
        let id = EntryId::from_index(self.entries.len());
        self.entries.push(EntryNode {
            id,
            node,
            bounds: fabric.node_info(node).bounds,
            capacity: 1,
            usage: Usage::default(),
        });
        self.entry_cache.insert(node, id);
        id
    }

    /// Records that `unit` has been reached through `entry`.
    pub(crate) fn attach_entry(&mut self, unit: UnitId, entry: EntryId) {
        let entries = &mut self.units[unit.index()].entries;
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    pub(crate) fn search_state(&self, id: UnitId) -> &SearchState {
        &self.units[id.index()].search
    }

    pub(crate) fn search_state_mut(&mut self, id: UnitId) -> &mut SearchState {
        &mut self.units[id.index()].search
    }

    /// Clears the scratch state of the given units.
    pub(crate) fn reset_search(&mut self, touched: &[UnitId]) {
        for &id in touched {
            self.units[id.index()].search = SearchState::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_common::Rect;
    use strand_fabric::{ElementKind, FabricBuilder};

    #[test]
    fn units_are_cached_by_key() {
        let mut b = FabricBuilder::new();
        let a = b.add_node("a", ElementKind::Interconnect, Rect::new(0, 0, 0, 4));
        let fabric = b.build();

        let mut graph = RoutingGraph::new();
        let first = graph.get_or_create_unit(&fabric, UnitKey::Node(a));
        let again = graph.get_or_create_unit(&fabric, UnitKey::Node(a));
        assert_eq!(first, again);
        assert_eq!(graph.unit_count(), 1);

        let unit = graph.unit(first);
        assert_eq!(unit.kind(), UnitKind::Interconnect);
        assert_eq!(unit.length(), 4);
        assert_eq!(unit.capacity(), 1);
        assert!(unit.children().is_none());
        // vertical, longer than one tile
        assert!((unit.base_cost() - 0.8 * 1.2).abs() < 1e-12);
    }

    #[test]
    fn granularities_get_distinct_units() {
        let mut b = FabricBuilder::new();
        let a = b.add_node("a", ElementKind::Interconnect, Rect::tile(0, 0));
        let fabric = b.build();
        let w = fabric.node_wires(a)[0];

        let mut graph = RoutingGraph::new();
        let by_node = graph.get_or_create_unit(&fabric, UnitKey::Node(a));
        let by_group = graph.get_or_create_unit(&fabric, UnitKey::NodeGroup(a));
        let by_wire = graph.get_or_create_unit(&fabric, UnitKey::Wire(w));
        assert_ne!(by_node, by_group);
        assert_ne!(by_node, by_wire);
        assert_eq!(graph.find_unit(UnitKey::Wire(w)), Some(by_wire));
    }

    #[test]
    fn entries_are_shared_per_node() {
        let mut b = FabricBuilder::new();
        let e = b.add_node("e", ElementKind::Interconnect, Rect::tile(1, 1));
        let fabric = b.build();

        let mut graph = RoutingGraph::new();
        let first = graph.get_or_create_entry(&fabric, e);
        assert_eq!(graph.get_or_create_entry(&fabric, e), first);
        assert_eq!(graph.entry(first).node(), e);
        assert_eq!(graph.entry(first).bounds(), Rect::tile(1, 1));
    }

    #[test]
    fn sibling_wires_share_node_occupancy() {
        let mut b = FabricBuilder::new();
        let a = b.add_node("a", ElementKind::Interconnect, Rect::tile(0, 0));
        let w1 = b.add_wire(a, "a_1", Rect::tile(0, 1));
        let single = b.add_node("s", ElementKind::Interconnect, Rect::tile(2, 2));
        let fabric = b.build();
        let w0 = fabric.node_wires(a)[0];

        let mut graph = RoutingGraph::new();
        let u0 = graph.get_or_create_unit(&fabric, UnitKey::Wire(w0));
        let u1 = graph.get_or_create_unit(&fabric, UnitKey::Wire(w1));
        let shared = graph.unit(u0).shared().unwrap();
        assert_eq!(graph.unit(u1).shared(), Some(shared));
        assert_eq!(graph.entry(shared).node(), a);
        assert_eq!(graph.unit(u1).node(), a);

        let lone = graph.get_or_create_unit(&fabric, UnitKey::Wire(fabric.node_wires(single)[0]));
        assert_eq!(graph.unit(lone).shared(), None);
        let by_node = graph.get_or_create_unit(&fabric, UnitKey::Node(a));
        assert_eq!(graph.unit(by_node).shared(), None);
    }

    #[test]
    fn reset_clears_touched_state() {
        let mut b = FabricBuilder::new();
        let a = b.add_node("a", ElementKind::Interconnect, Rect::tile(0, 0));
        let fabric = b.build();
        let mut graph = RoutingGraph::new();
        let id = graph.get_or_create_unit(&fabric, UnitKey::Node(a));
        graph.search_state_mut(id).touched = true;
        graph.search_state_mut(id).partial_cost = 3.0;
        graph.reset_search(&[id]);
        assert!(!graph.search_state(id).touched);
        assert_eq!(graph.search_state(id).partial_cost, 0.0);
    }
}
