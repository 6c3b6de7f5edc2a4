//! Integer tile geometry for distance estimation and bounding boxes.
//!
//! Coordinates are tile columns (`x`) and rows (`y`). A [`Rect`] is an
//! inclusive box; a single tile is a rect with `lo == hi` on both axes.

use serde::{Deserialize, Serialize};

/// An inclusive axis-aligned box of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Lowest column covered.
    pub x_lo: i32,
    /// Highest column covered.
    pub x_hi: i32,
    /// Lowest row covered.
    pub y_lo: i32,
    /// Highest row covered.
    pub y_hi: i32,
}

impl Rect {
    /// Creates a rect, normalizing the corner order.
    pub fn new(x_lo: i32, x_hi: i32, y_lo: i32, y_hi: i32) -> Self {
        Self {
            x_lo: x_lo.min(x_hi),
            x_hi: x_lo.max(x_hi),
            y_lo: y_lo.min(y_hi),
            y_hi: y_lo.max(y_hi),
        }
    }

    /// A rect covering exactly one tile.
    pub fn tile(x: i32, y: i32) -> Self {
        Self {
            x_lo: x,
            x_hi: x,
            y_lo: y,
            y_hi: y,
        }
    }

    /// Returns the smallest rect covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x_lo: self.x_lo.min(other.x_lo),
            x_hi: self.x_hi.max(other.x_hi),
            y_lo: self.y_lo.min(other.y_lo),
            y_hi: self.y_hi.max(other.y_hi),
        }
    }

    /// Returns this rect grown by `dx` columns and `dy` rows on every side.
    pub fn expand(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x_lo: self.x_lo - dx,
            x_hi: self.x_hi + dx,
            y_lo: self.y_lo - dy,
            y_hi: self.y_hi + dy,
        }
    }

    /// Returns whether the two rects share at least one tile.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x_lo <= other.x_hi
            && other.x_lo <= self.x_hi
            && self.y_lo <= other.y_hi
            && other.y_lo <= self.y_hi
    }

    /// Column and row gaps between two rects (zero when they overlap on that axis).
    pub fn gaps(&self, other: &Rect) -> (i32, i32) {
        let dx = (other.x_lo - self.x_hi).max(self.x_lo - other.x_hi).max(0);
        let dy = (other.y_lo - self.y_hi).max(self.y_lo - other.y_hi).max(0);
        (dx, dy)
    }

    /// Manhattan distance between the nearest tiles of two rects.
    pub fn distance(&self, other: &Rect) -> i32 {
        let (dx, dy) = self.gaps(other);
        dx + dy
    }

    /// Half-perimeter of the rect (width + height, in tiles).
    pub fn half_perimeter(&self) -> i32 {
        (self.x_hi - self.x_lo) + (self.y_hi - self.y_lo)
    }

    /// The center of the rect.
    pub fn center(&self) -> Point {
        Point {
            x: (self.x_lo + self.x_hi) as f64 / 2.0,
            y: (self.y_lo + self.y_hi) as f64 / 2.0,
        }
    }
}

/// A fractional position, used for net centroids.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column coordinate.
    pub x: f64,
    /// Row coordinate.
    pub y: f64,
}

impl Point {
    /// Manhattan distance between two points.
    pub fn manhattan(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}
