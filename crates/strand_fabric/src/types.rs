//! Fabric element metadata: kinds, geometry, delays, wires, and PIPs.

use crate::ids::{NodeId, PipId, WireId};
use serde::{Deserialize, Serialize};
use strand_common::Rect;

/// What a node is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// A site output pin, the start of a net.
    OutputPin,
    /// A site input pin, the end of a connection.
    InputPin,
    /// A general-purpose routing node.
    Interconnect,
    /// A site pin that may be bounced through to turn back into the fabric.
    Bounce,
    /// An element the device does not allow routing through.
    Blocked,
}

/// The dominant orientation of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Confined to a single tile.
    Local,
    /// Spans columns.
    Horizontal,
    /// Spans rows.
    Vertical,
}

impl Direction {
    /// Derives a direction from the tiles a node covers.
    pub fn of(bounds: &Rect) -> Self {
        let width = bounds.x_hi - bounds.x_lo;
        let height = bounds.y_hi - bounds.y_lo;
        if width == 0 && height == 0 {
            Direction::Local
        } else if height >= width {
            Direction::Vertical
        } else {
            Direction::Horizontal
        }
    }
}

/// A timing delay with min/typical/max corners, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delay {
    /// Minimum delay (fast corner).
    pub min_ns: f64,
    /// Typical delay (nominal corner).
    pub typ_ns: f64,
    /// Maximum delay (slow corner).
    pub max_ns: f64,
}

impl Delay {
    /// A zero delay.
    pub const ZERO: Self = Self {
        min_ns: 0.0,
        typ_ns: 0.0,
        max_ns: 0.0,
    };

    /// Creates a new delay with the given min/typ/max values.
    pub fn new(min_ns: f64, typ_ns: f64, max_ns: f64) -> Self {
        Self {
            min_ns,
            typ_ns,
            max_ns,
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Metadata describing one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// The node's ID.
    pub id: NodeId,
    /// Human-readable name (e.g. `"INT_X3Y4/EE2_0"`).
    pub name: String,
    /// Usage class.
    pub kind: ElementKind,
    /// Tiles spanned by the node.
    pub bounds: Rect,
    /// Length in tiles.
    pub length: u32,
    /// Orientation.
    pub direction: Direction,
    /// Propagation delay through the node.
    pub delay: Delay,
    /// Entry point of a node group: a switchbox input that fans out to
    /// several sibling exit nodes.
    pub group_entry: bool,
}

/// A tile-local wire segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    /// The wire's ID.
    pub id: WireId,
    /// Human-readable name.
    pub name: String,
    /// The node this wire belongs to.
    pub node: NodeId,
    /// The tile(s) the wire sits in.
    pub bounds: Rect,
}

/// A programmable interconnect point connecting two wires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pip {
    /// The PIP's ID.
    pub id: PipId,
    /// The wire driving the PIP.
    pub src_wire: WireId,
    /// The wire the PIP drives.
    pub dst_wire: WireId,
    /// Delay through the PIP when enabled.
    pub delay: Delay,
    /// Whether the PIP passes through a site (a route-through), which the
    /// router must not use for interconnect.
    pub route_through: bool,
}
