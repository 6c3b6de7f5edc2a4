//! Device interconnect model consumed by the Strand router.
//!
//! The router never looks inside a device database; it asks the [`Fabric`]
//! oracle for adjacency, geometry, and the switch point (PIP) joining two
//! elements. This crate defines that oracle, the opaque IDs it speaks, an
//! in-memory [`FabricGraph`] implementation assembled with a
//! [`FabricBuilder`], and a synthetic [`grid_fabric`] generator.
//!
//! # Element levels
//!
//! - **Wire**: a tile-local segment, the endpoint of PIPs.
//! - **Node**: an electrically connected set of wires.
//! - **PIP**: a directed, configurable wire-to-wire switch.

#![warn(missing_docs)]

pub mod fabric;
pub mod graph;
pub mod grid;
pub mod ids;
pub mod types;

pub use fabric::{Element, Fabric};
pub use graph::{FabricBuilder, FabricGraph};
pub use grid::{grid_fabric, GridFabric, GridSpec};
pub use ids::{NodeId, PipId, WireId};
pub use types::{Delay, Direction, ElementKind, NodeInfo, Pip, Wire};
