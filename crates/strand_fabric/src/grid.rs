//! A synthetic island-style fabric for tests and experiments.
//!
//! Every tile `(x, y)` holds one output pin, `inputs` input pins, `tracks`
//! interconnect tracks, and optionally one bounce pin. Track `t` of a tile
//! drives track `t` of each orthogonal neighbour; the output pin drives every
//! track of its tile and every track drives every input pin of its tile. A
//! bounce pin is driven by and drives back into the tile's tracks.

use crate::graph::{FabricBuilder, FabricGraph};
use crate::ids::NodeId;
use crate::types::ElementKind;
use strand_common::Rect;

/// Dimensions of a generated grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    /// Number of tile columns.
    pub width: i32,
    /// Number of tile rows.
    pub height: i32,
    /// Interconnect tracks per tile.
    pub tracks: usize,
    /// Input pins per tile.
    pub inputs: usize,
    /// Whether each tile gets a bounce pin.
    pub bounce: bool,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: 4,
            height: 4,
            tracks: 2,
            inputs: 2,
            bounce: false,
        }
    }
}

/// A generated grid together with pin lookups.
#[derive(Debug, Clone)]
pub struct GridFabric {
    /// The underlying fabric.
    pub graph: FabricGraph,
    spec: GridSpec,
    outputs: Vec<NodeId>,
    inputs: Vec<NodeId>,
    tracks: Vec<NodeId>,
    bounces: Vec<NodeId>,
}

impl GridFabric {
    fn tile_index(&self, x: i32, y: i32) -> usize {
        assert!(
            (0..self.spec.width).contains(&x) && (0..self.spec.height).contains(&y),
            "tile ({x}, {y}) outside a {}x{} grid",
            self.spec.width,
            self.spec.height
        );
        (y * self.spec.width + x) as usize
    }

    /// The dimensions this grid was generated with.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// The output pin of a tile.
    pub fn output_pin(&self, x: i32, y: i32) -> NodeId {
        self.outputs[self.tile_index(x, y)]
    }

    /// Input pin `i` of a tile.
    pub fn input_pin(&self, x: i32, y: i32, i: usize) -> NodeId {
        self.inputs[self.tile_index(x, y) * self.spec.inputs + i]
    }

    /// Track `t` of a tile.
    pub fn track(&self, x: i32, y: i32, t: usize) -> NodeId {
        self.tracks[self.tile_index(x, y) * self.spec.tracks + t]
    }

    /// The bounce pin of a tile, if the grid has them.
    pub fn bounce_pin(&self, x: i32, y: i32) -> Option<NodeId> {
        if self.spec.bounce {
            Some(self.bounces[self.tile_index(x, y)])
        } else {
            None
        }
    }
}

/// Generates a grid fabric.
pub fn grid_fabric(spec: &GridSpec) -> GridFabric {
    let mut b = FabricBuilder::new();
    let mut outputs = Vec::new();
    let mut inputs = Vec::new();
    let mut tracks = Vec::new();
    let mut bounces = Vec::new();

    for y in 0..spec.height {
        for x in 0..spec.width {
            let tile = Rect::tile(x, y);
            let out = b.add_node(format!("X{x}Y{y}/OUT"), ElementKind::OutputPin, tile);
            outputs.push(out);
            let first_track = tracks.len();
            for t in 0..spec.tracks {
                let track = b.add_node(format!("X{x}Y{y}/T{t}"), ElementKind::Interconnect, tile);
                b.connect(out, track);
                tracks.push(track);
            }
            for i in 0..spec.inputs {
                let input = b.add_node(format!("X{x}Y{y}/IN{i}"), ElementKind::InputPin, tile);
                for &track in &tracks[first_track..] {
                    b.connect(track, input);
                }
                inputs.push(input);
            }
            if spec.bounce {
                let bounce = b.add_node(format!("X{x}Y{y}/BOUNCE"), ElementKind::Bounce, tile);
                for &track in &tracks[first_track..] {
                    b.connect_both(track, bounce);
                }
                bounces.push(bounce);
            }
        }
    }

    let at = |x: i32, y: i32, t: usize| tracks[((y * spec.width + x) as usize) * spec.tracks + t];
    for y in 0..spec.height {
        for x in 0..spec.width {
            for t in 0..spec.tracks {
                if x + 1 < spec.width {
                    b.connect_both(at(x, y, t), at(x + 1, y, t));
                }
                if y + 1 < spec.height {
                    b.connect_both(at(x, y, t), at(x, y + 1, t));
                }
            }
        }
    }

    GridFabric {
        graph: b.build(),
        spec: *spec,
        outputs,
        inputs,
        tracks,
        bounces,
    }
}
