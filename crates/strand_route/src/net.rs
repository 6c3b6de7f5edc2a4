//! Per-net aggregates used for cost biasing and batch ordering.

use crate::ids::{ConnectionId, NetId, UnitId};
use std::ops::Range;
use strand_common::{Point, Rect};
use strand_fabric::NodeId;

/// A routed net: its connections plus geometry cached at construction.
#[derive(Debug, Clone)]
pub struct NetWrapper {
    pub(crate) id: NetId,
    pub(crate) name: String,
    pub(crate) design_index: usize,
    pub(crate) source: UnitId,
    pub(crate) source_node: NodeId,
    pub(crate) connections: Vec<ConnectionId>,
    pub(crate) bbox: Rect,
    pub(crate) hpwl: i32,
    pub(crate) centroid: Point,
    pub(crate) relaxed: bool,
}

impl NetWrapper {
    /// Builds the wrapper from the bounds of every pin, driver first.
    pub(crate) fn new(
        id: NetId,
        name: String,
        design_index: usize,
        (source, source_node): (UnitId, NodeId),
        pin_bounds: &[Rect],
    ) -> Self {
        let bbox = pin_bounds
            .iter()
            .skip(1)
            .fold(pin_bounds[0], |acc, r| acc.union(r));
        let n = pin_bounds.len() as f64;
        let (sx, sy) = pin_bounds.iter().fold((0.0, 0.0), |(x, y), r| {
            let c = r.center();
            (x + c.x, y + c.y)
        });
        Self {
            id,
            name,
            design_index,
            source,
            source_node,
            connections: Vec::new(),
            bbox,
            hpwl: bbox.half_perimeter(),
            centroid: Point { x: sx / n, y: sy / n },
            relaxed: false,
        }
    }

    /// The net's ID.
    pub fn id(&self) -> NetId {
        self.id
    }

    /// The net's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the net in the input design.
    pub fn design_index(&self) -> usize {
        self.design_index
    }

    /// The driver's unit, shared by every connection.
    pub fn source(&self) -> UnitId {
        self.source
    }

    /// The driver pin node actually used.
    pub fn source_node(&self) -> NodeId {
        self.source_node
    }

    /// The net's connections in sink order.
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Arena indices of the net's connections, which are allocated
    /// contiguously.
    pub(crate) fn connection_range(&self) -> Range<usize> {
        match self.connections.first() {
            Some(first) => first.index()..first.index() + self.connections.len(),
            None => 0..0,
        }
    }

    /// Number of sinks.
    pub fn fanout(&self) -> usize {
        self.connections.len()
    }

    /// Bounding box of all pins.
    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    /// Half-perimeter wirelength of the pin bounding box.
    pub fn hpwl(&self) -> i32 {
        self.hpwl
    }

    /// Twice the half-perimeter, the normalizer of the centroid bias.
    pub fn double_hpwl(&self) -> f64 {
        2.0 * self.hpwl as f64
    }

    /// Average of the pin centers.
    pub fn centroid(&self) -> Point {
        self.centroid
    }

    /// Returns whether searches for this net ignore bounding boxes.
    pub fn is_relaxed(&self) -> bool {
        self.relaxed
    }

    /// Drops the bounding-box restriction for the rest of the run.
    pub(crate) fn relax(&mut self) {
        self.relaxed = true;
    }
}
