// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! World-space primitives and the procedural generators for wafer, die map
//! and point cloud geometry.
//!
//! World coordinates are unitless with the Y axis pointing up.

use serde::{Deserialize, Serialize};

pub mod die_map;
pub mod points;
pub mod wafer;

pub use die_map::{
    create_rectangles, generate_die_map, ColorFn, DiagonalGradient, Die, DieColorSource, DieGrid,
    DieMap, DieStyle, EdgeClip, ImageFragment,
};
pub use points::{
    create_points, generate_grid_points, generate_points, generate_points_seeded, PointSampler,
};
pub use wafer::{generate_wafer_shape, notch_rotation};

/// A point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle in world coordinates: `(x, y)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WorldRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `size` centered on the world origin.
    pub fn centered_square(size: f64) -> Self {
        Self::new(-size / 2.0, -size / 2.0, size, size)
    }

    /// True when the rectangle has no drawable area.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            left: self.x,
            right: self.x + self.width,
            bottom: self.y,
            top: self.y + self.height,
        }
    }
}

/// Edges of an axis-aligned world rectangle (`top` is the larger Y).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Bounds {
    pub const ZERO: Self = Self {
        left: 0.0,
        right: 0.0,
        top: 0.0,
        bottom: 0.0,
    };

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> WorldPoint {
        WorldPoint::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }

    pub fn to_rect(&self) -> WorldRect {
        WorldRect::new(self.left, self.bottom, self.width(), self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_bounds_round_trip() {
        let rect = WorldRect::new(-10.0, 5.0, 20.0, 30.0);
        let bounds = rect.bounds();
        assert_eq!(bounds.left, -10.0);
        assert_eq!(bounds.right, 10.0);
        assert_eq!(bounds.bottom, 5.0);
        assert_eq!(bounds.top, 35.0);
        assert_eq!(bounds.to_rect(), rect);
    }

    #[test]
    fn test_empty_rect() {
        assert!(WorldRect::new(0.0, 0.0, 0.0, 10.0).is_empty());
        assert!(WorldRect::new(0.0, 0.0, 10.0, -1.0).is_empty());
        assert!(!WorldRect::centered_square(302.0).is_empty());
    }
}
