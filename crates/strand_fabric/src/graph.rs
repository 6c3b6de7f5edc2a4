//! An in-memory fabric graph and the builder that assembles it.

use crate::fabric::Fabric;
use crate::ids::{NodeId, PipId, WireId};
use crate::types::{Delay, Direction, ElementKind, NodeInfo, Pip, Wire};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strand_common::Rect;

/// A node and the wires that make it up.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeEntry {
    info: NodeInfo,
    wires: Vec<WireId>,
}

/// A complete device interconnect held in memory.
///
/// Wires, nodes, and PIPs are stored in ID order. The per-wire downhill index
/// and the name index are derived data, skipped by serde and rebuilt with
/// [`rebuild_indices`](Self::rebuild_indices).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FabricGraph {
    wires: Vec<Wire>,
    nodes: Vec<NodeEntry>,
    pips: Vec<Pip>,
    #[serde(skip)]
    downhill: Vec<Vec<PipId>>,
    #[serde(skip)]
    node_by_name: HashMap<String, NodeId>,
}

impl FabricGraph {
    /// Returns the number of wires.
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of PIPs.
    pub fn pip_count(&self) -> usize {
        self.pips.len()
    }

    /// Looks a node up by name.
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_by_name.get(name).copied()
    }

    /// Rebuilds the downhill and name indices after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.downhill = vec![Vec::new(); self.wires.len()];
        for pip in &self.pips {
            self.downhill[pip.src_wire.index()].push(pip.id);
        }
        self.node_by_name = self
            .nodes
            .iter()
            .map(|n| (n.info.name.clone(), n.info.id))
            .collect();
    }
}

impl Fabric for FabricGraph {
    fn wire(&self, wire: WireId) -> &Wire {
        &self.wires[wire.index()]
    }

    fn node_wires(&self, node: NodeId) -> &[WireId] {
        &self.nodes[node.index()].wires
    }

    fn node_info(&self, node: NodeId) -> &NodeInfo {
        &self.nodes[node.index()].info
    }

    fn downhill_pips(&self, wire: WireId) -> &[PipId] {
        self.downhill
            .get(wire.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn pip(&self, pip: PipId) -> &Pip {
        &self.pips[pip.index()]
    }
}

/// Incrementally assembles a [`FabricGraph`].
///
/// Every node is created with one wire named after it; further wires can be
/// attached with [`add_wire`](Self::add_wire).
#[derive(Debug, Default)]
pub struct FabricBuilder {
    graph: FabricGraph,
}

impl FabricBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with a single wire and returns its ID.
    ///
    /// Length and direction are derived from `bounds`.
    pub fn add_node(&mut self, name: impl Into<String>, kind: ElementKind, bounds: Rect) -> NodeId {
        let name = name.into();
        let id = NodeId::from_raw(self.graph.nodes.len() as u32);
        self.graph.nodes.push(NodeEntry {
            info: NodeInfo {
                id,
                name: name.clone(),
                kind,
                bounds,
                length: bounds.half_perimeter() as u32,
                direction: Direction::of(&bounds),
                delay: Delay::ZERO,
                group_entry: false,
            },
            wires: Vec::new(),
        });
        self.graph.node_by_name.insert(name.clone(), id);
        self.add_wire(id, name, bounds);
        id
    }

    /// Attaches another wire to an existing node.
    pub fn add_wire(&mut self, node: NodeId, name: impl Into<String>, bounds: Rect) -> WireId {
        let id = WireId::from_raw(self.graph.wires.len() as u32);
        self.graph.wires.push(Wire {
            id,
            name: name.into(),
            node,
            bounds,
        });
        self.graph.downhill.push(Vec::new());
        self.graph.nodes[node.index()].wires.push(id);
        id
    }

    /// Returns the first wire of a node.
    pub fn first_wire(&self, node: NodeId) -> WireId {
        self.graph.nodes[node.index()].wires[0]
    }

    /// Returns the last wire of a node.
    pub fn last_wire(&self, node: NodeId) -> WireId {
        let wires = &self.graph.nodes[node.index()].wires;
        wires[wires.len() - 1]
    }

    /// Marks a node as the shared entry point of a node group.
    pub fn mark_group_entry(&mut self, node: NodeId) {
        self.graph.nodes[node.index()].info.group_entry = true;
    }

    /// Sets the propagation delay of a node.
    pub fn set_delay(&mut self, node: NodeId, delay: Delay) {
        self.graph.nodes[node.index()].info.delay = delay;
    }

    /// Adds a regular PIP between two wires.
    pub fn add_pip(&mut self, src: WireId, dst: WireId) -> PipId {
        self.push_pip(src, dst, false)
    }

    /// Adds a site route-through PIP between two wires.
    pub fn add_route_through_pip(&mut self, src: WireId, dst: WireId) -> PipId {
        self.push_pip(src, dst, true)
    }

    /// Connects the last wire of `src` to the first wire of `dst`.
    pub fn connect(&mut self, src: NodeId, dst: NodeId) -> PipId {
        let (s, d) = (self.last_wire(src), self.first_wire(dst));
        self.add_pip(s, d)
    }

    /// Connects two nodes in both directions.
    pub fn connect_both(&mut self, a: NodeId, b: NodeId) {
        self.connect(a, b);
        self.connect(b, a);
    }

    fn push_pip(&mut self, src: WireId, dst: WireId, route_through: bool) -> PipId {
        let id = PipId::from_raw(self.graph.pips.len() as u32);
        self.graph.pips.push(Pip {
            id,
            src_wire: src,
            dst_wire: dst,
            delay: Delay::ZERO,
            route_through,
        });
        self.graph.downhill[src.index()].push(id);
        id
    }

    /// Finishes the graph.
    pub fn build(self) -> FabricGraph {
        self.graph
    }
}
