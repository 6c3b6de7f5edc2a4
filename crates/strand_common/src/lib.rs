//! Shared foundational types used across the Strand routing workspace.
//!
//! This crate provides the internal-error result type and the integer tile
//! geometry (rectangles, points, Manhattan distances) that the fabric model
//! and the router both speak.

#![warn(missing_docs)]

pub mod geometry;
pub mod result;

pub use geometry::{Point, Rect};
pub use result::{InternalError, StrandResult};
