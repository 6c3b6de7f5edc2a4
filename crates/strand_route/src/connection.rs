//! Driver-to-sink connections and their discovered paths.

use crate::ids::{ConnectionId, EntryId, NetId, UnitId};
use serde::{Deserialize, Serialize};
use strand_common::Rect;
use strand_fabric::NodeId;

/// One hop of a discovered path: the unit entered and, under node-group
/// granularity, the entry sub-node crossed to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    /// The unit entered.
    pub unit: UnitId,
    /// The shared entry sub-node crossed on the way in.
    pub entry: Option<EntryId>,
}

impl PathStep {
    /// A step that crosses no entry sub-node.
    pub fn unit(unit: UnitId) -> Self {
        Self { unit, entry: None }
    }
}

/// One driver-to-sink requirement of a net.
#[derive(Debug, Clone)]
pub struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) net: NetId,
    pub(crate) source: UnitId,
    pub(crate) sink: UnitId,
    pub(crate) source_node: NodeId,
    pub(crate) sink_node: NodeId,
    pub(crate) bbox: Rect,
    pub(crate) hpwl: i32,
    pub(crate) criticality: f64,
    /// Sink first, source last.
    pub(crate) path: Vec<PathStep>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        net: NetId,
        (source, source_node, source_bounds): (UnitId, NodeId, Rect),
        (sink, sink_node, sink_bounds): (UnitId, NodeId, Rect),
        margin: (i32, i32),
    ) -> Self {
        let span = source_bounds.union(&sink_bounds);
        Self {
            id,
            net,
            source,
            sink,
            source_node,
            sink_node,
            bbox: span.expand(margin.0, margin.1),
            hpwl: span.half_perimeter(),
            criticality: 0.0,
            path: Vec::new(),
        }
    }

    /// The connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The owning net.
    pub fn net(&self) -> NetId {
        self.net
    }

    /// The driver's unit.
    pub fn source(&self) -> UnitId {
        self.source
    }

    /// The sink pin's unit.
    pub fn sink(&self) -> UnitId {
        self.sink
    }

    /// The driver pin node.
    pub fn source_node(&self) -> NodeId {
        self.source_node
    }

    /// The sink pin node.
    pub fn sink_node(&self) -> NodeId {
        self.sink_node
    }

    /// Source and sink bounds grown by the configured margin.
    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    /// Half-perimeter of the source/sink span.
    pub fn hpwl(&self) -> i32 {
        self.hpwl
    }

    /// Current timing criticality in `[0, 1]`.
    pub fn criticality(&self) -> f64 {
        self.criticality
    }

    /// The discovered path, sink first. Empty when unrouted.
    pub fn path(&self) -> &[PathStep] {
        &self.path
    }

    /// The discovered path, source first.
    pub fn forward_path(&self) -> impl Iterator<Item = PathStep> + '_ {
        self.path.iter().rev().copied()
    }

    /// Returns whether the connection currently holds a path.
    pub fn is_routed(&self) -> bool {
        !self.path.is_empty()
    }

    /// Returns whether `unit` appears on the path.
    pub fn uses_unit(&self, unit: UnitId) -> bool {
        self.path.iter().any(|s| s.unit == unit)
    }

    /// Returns whether `entry` is crossed on the path.
    pub fn uses_entry(&self, entry: EntryId) -> bool {
        self.path.iter().any(|s| s.entry == Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        Connection::new(
            ConnectionId::from_raw(0),
            NetId::from_raw(0),
            (UnitId::from_raw(0), NodeId::from_raw(0), Rect::tile(1, 1)),
            (UnitId::from_raw(1), NodeId::from_raw(5), Rect::tile(4, 3)),
            (2, 1),
        )
    }

    #[test]
    fn bbox_covers_pins_plus_margin() {
        let c = conn();
        assert_eq!(c.bbox(), Rect::new(-1, 6, 0, 4));
        assert_eq!(c.hpwl(), 5);
        assert!(!c.is_routed());
    }

    #[test]
    fn forward_path_reverses_storage() {
        let mut c = conn();
        c.path = vec![
            PathStep::unit(UnitId::from_raw(1)),
            PathStep::unit(UnitId::from_raw(7)),
            PathStep::unit(UnitId::from_raw(0)),
        ];
        let forward: Vec<u32> = c.forward_path().map(|s| s.unit.as_raw()).collect();
        assert_eq!(forward, vec![0, 7, 1]);
        assert!(c.uses_unit(UnitId::from_raw(7)));
        assert!(!c.uses_entry(EntryId::from_raw(0)));
    }
}
