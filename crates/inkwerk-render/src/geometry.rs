// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry kernel — points, rectangles, and highlight quad points.
//
// All values are immutable; every operation returns a new value.

use inkwerk_core::error::{InkwerkError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_list(&self) -> [f32; 2] {
        [self.x, self.y]
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle given by its lower-left and upper-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub ll: Point,
    pub ur: Point,
}

impl Rect {
    pub const fn new(ll: Point, ur: Point) -> Self {
        Self { ll, ur }
    }

    /// Rectangle spanning two arbitrary corners.
    pub fn spanning(a: Point, b: Point) -> Self {
        Self {
            ll: Point::new(a.x.min(b.x), a.y.min(b.y)),
            ur: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Square of side `side` centred on `center`.
    pub fn square_around(center: Point, side: f32) -> Self {
        let half = side / 2.0;
        Self {
            ll: Point::new(center.x - half, center.y - half),
            ur: Point::new(center.x + half, center.y + half),
        }
    }

    /// Parse `[llx, lly, urx, ury]`.
    pub fn from_list(list: &[f32]) -> Result<Self> {
        match list {
            [llx, lly, urx, ury] => Ok(Self::new(Point::new(*llx, *lly), Point::new(*urx, *ury))),
            _ => Err(InkwerkError::InvalidGeometry(format!(
                "rect list must contain exactly 4 elements, got {}",
                list.len()
            ))),
        }
    }

    pub fn to_list(&self) -> [f32; 4] {
        [self.ll.x, self.ll.y, self.ur.x, self.ur.y]
    }

    pub fn width(&self) -> f32 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> f32 {
        self.ur.y - self.ll.y
    }

    /// Zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.ll.x == self.ur.x || self.ll.y == self.ur.y
    }

    /// Strict overlap test; touching edges do not intersect and degenerate
    /// rectangles never intersect anything.
    ///
    /// The horizontal check compares each lower-left X against the other
    /// rectangle's upper-right Y. Existing exports were grouped with this
    /// exact predicate, so it is kept as is.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }

        if self.ll.x >= other.ur.y || other.ll.x >= self.ur.y {
            return false;
        }

        if self.ur.y <= other.ll.y || other.ur.y <= self.ll.y {
            return false;
        }

        true
    }

    /// Bounding box of both rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            ll: Point::new(self.ll.x.min(other.ll.x), self.ll.y.min(other.ll.y)),
            ur: Point::new(self.ur.x.max(other.ur.x), self.ur.y.max(other.ur.y)),
        }
    }

    /// Quad points in annotation order: top-left, top-right, bottom-left,
    /// bottom-right.
    pub fn to_quad_points(&self) -> QuadPoints {
        QuadPoints(vec![
            Point::new(self.ll.x, self.ur.y),
            Point::new(self.ur.x, self.ur.y),
            Point::new(self.ll.x, self.ll.y),
            Point::new(self.ur.x, self.ll.y),
        ])
    }
}

/// Polygon description accompanying a highlight, four points per quad.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuadPoints(pub Vec<Point>);

impl QuadPoints {
    /// Parse an interleaved `x, y, x, y, …` list.
    pub fn from_list(list: &[f32]) -> Result<Self> {
        if list.len() % 2 != 0 {
            return Err(InkwerkError::InvalidGeometry(format!(
                "quad point list has odd length {}",
                list.len()
            )));
        }
        Ok(Self(
            list.chunks_exact(2)
                .map(|pair| Point::new(pair[0], pair[1]))
                .collect(),
        ))
    }

    pub fn to_list(&self) -> Vec<f32> {
        self.0.iter().flat_map(Point::to_list).collect()
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &QuadPoints) -> QuadPoints {
        let mut points = Vec::with_capacity(self.0.len() + other.0.len());
        points.extend_from_slice(&self.0);
        points.extend_from_slice(&other.0);
        QuadPoints(points)
    }

    /// Apply `f` to every point.
    pub fn map(&self, f: impl Fn(Point) -> Point) -> QuadPoints {
        QuadPoints(self.0.iter().copied().map(f).collect())
    }
}
