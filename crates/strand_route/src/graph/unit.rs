//! Routing units, entry sub-nodes, and their occupancy bookkeeping.

use crate::ids::{EntryId, UnitId};
use std::collections::BTreeMap;
use strand_common::Rect;
use strand_fabric::{Direction, Element, ElementKind, NodeId, WireId};

/// Canonical identity of a routing unit, derived from the fabric element(s)
/// it wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitKey {
    /// One wire segment.
    Wire(WireId),
    /// One node.
    Node(NodeId),
    /// A node group, keyed by its exit node.
    NodeGroup(NodeId),
}

impl UnitKey {
    /// The fabric element the unit ends on.
    pub fn element(self) -> Element {
        match self {
            UnitKey::Wire(w) => Element::Wire(w),
            UnitKey::Node(n) | UnitKey::NodeGroup(n) => Element::Node(n),
        }
    }
}

/// What a routing unit is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A net's driver pin.
    SourcePin,
    /// A connection's sink pin.
    SinkPin,
    /// General interconnect.
    Interconnect,
    /// A site pin usable to turn around next to the sink.
    PinBounce,
    /// Never entered by the search.
    Reserved,
}

impl UnitKind {
    /// Maps a fabric element class to a unit kind.
    pub fn from_element(kind: ElementKind) -> Self {
        match kind {
            ElementKind::OutputPin => UnitKind::SourcePin,
            ElementKind::InputPin => UnitKind::SinkPin,
            ElementKind::Interconnect => UnitKind::Interconnect,
            ElementKind::Bounce => UnitKind::PinBounce,
            ElementKind::Blocked => UnitKind::Reserved,
        }
    }
}

const PIN_BASE_COST: f64 = 1.0;
const BOUNCE_BASE_COST: f64 = 0.5;
const WIRE_BASE_COST: f64 = 0.4;
const WIRE_COST_PER_TILE: f64 = 0.1;
const LONG_VERTICAL_PENALTY: f64 = 1.2;

/// Base cost of a unit from its kind, length, and direction.
pub fn base_cost(kind: UnitKind, length: u32, direction: Direction) -> f64 {
    match kind {
        UnitKind::SourcePin | UnitKind::SinkPin => PIN_BASE_COST,
        UnitKind::PinBounce => BOUNCE_BASE_COST,
        UnitKind::Reserved => f64::INFINITY,
        UnitKind::Interconnect => {
            let cost = WIRE_BASE_COST + WIRE_COST_PER_TILE * length as f64;
            if direction == Direction::Vertical && length > 1 {
                cost * LONG_VERTICAL_PENALTY
            } else {
                cost
            }
        }
    }
}

/// Occupancy and congestion-cost state shared by routing units and entry
/// sub-nodes.
///
/// Users are counted per connection source: occupancy is the number of
/// distinct sources, while the per-source count records how many
/// connections of that source pass through. Parents are counted the same
/// way so rip-up is an exact inverse of add.
#[derive(Debug, Clone, PartialEq)]
pub struct Usage {
    users: BTreeMap<UnitId, u32>,
    parents: BTreeMap<UnitId, u32>,
    /// Present-congestion cost.
    pub present_cost: f64,
    /// Historical-congestion cost.
    pub historical_cost: f64,
}

impl Default for Usage {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            parents: BTreeMap::new(),
            present_cost: 1.0,
            historical_cost: 1.0,
        }
    }
}

impl Usage {
    /// Number of distinct connection sources using this resource.
    pub fn occupancy(&self) -> u32 {
        self.users.len() as u32
    }

    /// How many connections of `source` use this resource.
    pub fn user_count(&self, source: UnitId) -> u32 {
        self.users.get(&source).copied().unwrap_or(0)
    }

    /// Number of distinct parent units driving this resource.
    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    /// The distinct parent units, in index order.
    pub fn parents(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.parents.keys().copied()
    }

    /// `occupancy - capacity`.
    pub fn overuse(&self, capacity: u32) -> i64 {
        self.occupancy() as i64 - capacity as i64
    }

    /// Returns whether more sources use the resource than it can carry.
    pub fn is_overused(&self, capacity: u32) -> bool {
        self.occupancy() > capacity
    }

    /// Returns whether the resource has more than one distinct driver.
    pub fn is_illegal(&self) -> bool {
        self.parents.len() > 1
    }

    pub(crate) fn add_user(&mut self, source: UnitId, parent: Option<UnitId>) {
        *self.users.entry(source).or_insert(0) += 1;
        if let Some(p) = parent {
            *self.parents.entry(p).or_insert(0) += 1;
        }
    }

    pub(crate) fn remove_user(&mut self, source: UnitId, parent: Option<UnitId>) {
        decrement(&mut self.users, source);
        if let Some(p) = parent {
            decrement(&mut self.parents, p);
        }
    }
}

fn decrement(map: &mut BTreeMap<UnitId, u32>, key: UnitId) {
    if let Some(count) = map.get_mut(&key) {
        *count -= 1;
        if *count == 0 {
            map.remove(&key);
        }
    }
}

/// Per-search scratch state. Reset after every connection search.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct SearchState {
    pub touched: bool,
    pub visited: bool,
    pub partial_cost: f64,
    pub partial_delay: f64,
    pub total_cost: f64,
    pub prev: Option<UnitId>,
    pub prev_entry: Option<EntryId>,
    pub depth: u32,
}

/// A downstream neighbour of a unit, with the entry sub-node crossed to
/// reach it under node-group granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Child {
    /// The child unit.
    pub unit: UnitId,
    /// The shared entry sub-node between parent and child, if any.
    pub entry: Option<EntryId>,
}

/// A vertex of the resource graph.
#[derive(Debug, Clone)]
pub struct RoutingUnit {
    pub(crate) id: UnitId,
    pub(crate) key: UnitKey,
    pub(crate) node: NodeId,
    pub(crate) kind: UnitKind,
    pub(crate) capacity: u32,
    pub(crate) base_cost: f64,
    pub(crate) bounds: Rect,
    pub(crate) length: u32,
    pub(crate) delay: f64,
    pub(crate) entries: Vec<EntryId>,
    pub(crate) shared: Option<EntryId>,
    pub(crate) children: Option<Vec<Child>>,
    pub(crate) usage: Usage,
    pub(crate) search: SearchState,
}

impl RoutingUnit {
    /// The arena index.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// The canonical key.
    pub fn key(&self) -> UnitKey {
        self.key
    }

    /// The electrical node the unit belongs to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Usage class.
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// How many sources may share the unit legally.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Cost before congestion scaling.
    pub fn base_cost(&self) -> f64 {
        self.base_cost
    }

    /// Tiles covered.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Length in tiles.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Intrinsic propagation delay in nanoseconds.
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Entry sub-nodes through which this unit has been reached.
    pub fn entries(&self) -> &[EntryId] {
        &self.entries
    }

    /// Occupancy tracker of the whole electrical node, set for wire units
    /// whose node has sibling wires.
    pub fn shared(&self) -> Option<EntryId> {
        self.shared
    }

    /// Cached children, or `None` if the unit has not been expanded.
    pub fn children(&self) -> Option<&[Child]> {
        self.children.as_deref()
    }

    /// Occupancy and cost state.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Returns whether more sources use the unit than it can carry.
    pub fn is_overused(&self) -> bool {
        self.usage.is_overused(self.capacity)
    }

    /// Returns whether the unit has more than one distinct driver.
    pub fn is_illegal(&self) -> bool {
        self.usage.is_illegal()
    }
}

/// A fabric node whose occupancy is shared by several units.
///
/// Under node-group granularity it is the entry point of sibling groups;
/// under wire granularity it is the electrical node behind sibling wires.
/// Its congestion belongs to the shared node, so it carries its own usage
/// independent of the units.
#[derive(Debug, Clone)]
pub struct EntryNode {
    pub(crate) id: EntryId,
    pub(crate) node: NodeId,
    pub(crate) bounds: Rect,
    pub(crate) capacity: u32,
    pub(crate) usage: Usage,
}

impl EntryNode {
    /// The arena index.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The fabric node this entry stands for.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Tiles covered.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// How many sources may share the entry legally.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Occupancy and cost state.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Returns whether more sources use the entry than it can carry.
    pub fn is_overused(&self) -> bool {
        self.usage.is_overused(self.capacity)
    }

    /// Returns whether the entry has more than one distinct driver.
    pub fn is_illegal(&self) -> bool {
        self.usage.is_illegal()
    }
}
