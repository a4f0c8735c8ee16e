//! Axis-aligned rectangle algebra
//!
//! The rectangle is the workhorse value type of the planning subsystem.
//! It carries no coordinate system of its own; pairing one with a
//! `CoordinateSystem` happens at the `Extent` level. A rectangle with a
//! negative width or height is treated as the canonical empty rectangle,
//! which lets set operations stay total.

use super::point::Point;

/// An axis-aligned rectangle described by its lower-left corner and size
///
/// All operations are pure and return new instances; rectangles are never
/// mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// X coordinate of the lower-left corner
    pub x: f64,
    /// Y coordinate of the lower-left corner
    pub y: f64,
    /// Width, >= 0 for a non-empty rectangle
    pub w: f64,
    /// Height, >= 0 for a non-empty rectangle
    pub h: f64,
}

/// The canonical empty rectangle
const EMPTY: Rectangle = Rectangle { x: 0.0, y: 0.0, w: -1.0, h: -1.0 };

impl Rectangle {
    /// Create a rectangle from origin and size
    ///
    /// A non-positive-area specification collapses to the canonical empty
    /// rectangle so that all downstream algebra behaves uniformly.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        if w < 0.0 || h < 0.0 {
            return EMPTY;
        }
        Rectangle { x, y, w, h }
    }

    /// The canonical empty rectangle
    pub fn empty() -> Self {
        EMPTY
    }

    /// Create a rectangle from per-axis minimum and maximum values
    pub fn from_min_max(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Rectangle::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Create the smallest rectangle containing both points
    pub fn from_points(a: Point, b: Point) -> Self {
        Rectangle::from_min_max(a.x.min(b.x), a.x.max(b.x), a.y.min(b.y), a.y.max(b.y))
    }

    /// Check whether this is the empty rectangle
    pub fn is_empty(&self) -> bool {
        self.w < 0.0 || self.h < 0.0
    }

    /// Minimum X coordinate
    pub fn min_x(&self) -> f64 {
        self.x
    }

    /// Maximum X coordinate
    pub fn max_x(&self) -> f64 {
        self.x + self.w
    }

    /// Minimum Y coordinate
    pub fn min_y(&self) -> f64 {
        self.y
    }

    /// Maximum Y coordinate
    pub fn max_y(&self) -> f64 {
        self.y + self.h
    }

    /// Area of the rectangle, 0 when empty
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.w * self.h
    }

    /// Corner points in counter-clockwise order starting at the lower left
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x(), self.min_y()),
            Point::new(self.max_x(), self.min_y()),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.min_x(), self.max_y()),
        ]
    }

    /// Upper-left and lower-right corners, the order raster engines expect
    /// for window specifications
    pub fn window_corners(&self) -> (Point, Point) {
        (
            Point::new(self.min_x(), self.max_y()),
            Point::new(self.max_x(), self.min_y()),
        )
    }

    /// Smallest rectangle containing both operands
    ///
    /// Union with the empty rectangle yields the other operand unchanged.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rectangle::from_min_max(
            self.min_x().min(other.min_x()),
            self.max_x().max(other.max_x()),
            self.min_y().min(other.min_y()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Largest rectangle contained in both operands
    ///
    /// Intersection with the empty rectangle yields empty; disjoint
    /// operands also yield empty.
    pub fn intersect(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() || other.is_empty() {
            return EMPTY;
        }
        let min_x = self.min_x().max(other.min_x());
        let max_x = self.max_x().min(other.max_x());
        let min_y = self.min_y().max(other.min_y());
        let max_y = self.max_y().min(other.max_y());
        if max_x < min_x || max_y < min_y {
            return EMPTY;
        }
        Rectangle::from_min_max(min_x, max_x, min_y, max_y)
    }

    /// Snap edges outward onto the grid defined by an origin and pixel size
    ///
    /// The result always contains the input. `pixel_size` components are
    /// taken by absolute value, so the usual negative north-up Y pixel
    /// size can be passed through directly.
    pub fn align(&self, grid_origin: Point, pixel_size: (f64, f64)) -> Rectangle {
        if self.is_empty() {
            return EMPTY;
        }
        let step_x = pixel_size.0.abs();
        let step_y = pixel_size.1.abs();
        if step_x <= 0.0 || step_y <= 0.0 {
            return *self;
        }
        let min_x = grid_origin.x + ((self.min_x() - grid_origin.x) / step_x).floor() * step_x;
        let max_x = grid_origin.x + ((self.max_x() - grid_origin.x) / step_x).ceil() * step_x;
        let min_y = grid_origin.y + ((self.min_y() - grid_origin.y) / step_y).floor() * step_y;
        let max_y = grid_origin.y + ((self.max_y() - grid_origin.y) / step_y).ceil() * step_y;
        Rectangle::from_min_max(min_x, max_x, min_y, max_y)
    }

    /// Convert a geometric extent to an integer pixel count per axis,
    /// rounding outward so the grid covers the full extent
    pub fn to_pixel_grid(&self, pixel_size: (f64, f64)) -> (u64, u64) {
        if self.is_empty() {
            return (0, 0);
        }
        let step_x = pixel_size.0.abs();
        let step_y = pixel_size.1.abs();
        if step_x <= 0.0 || step_y <= 0.0 {
            return (0, 0);
        }
        let cols = (self.w / step_x).ceil().max(0.0) as u64;
        let rows = (self.h / step_y).ceil().max(0.0) as u64;
        (cols, rows)
    }

    /// Split into an n x n grid of equal sub-rectangles, row-major from
    /// the top-left cell
    pub fn partition(&self, n: u32) -> Vec<Rectangle> {
        if self.is_empty() || n == 0 {
            return Vec::new();
        }
        let cell_w = self.w / n as f64;
        let cell_h = self.h / n as f64;
        let mut cells = Vec::with_capacity((n as usize) * (n as usize));
        for row in 0..n {
            // Rows count down from the top so the output order matches how
            // rasters are read.
            let top = self.max_y() - row as f64 * cell_h;
            for col in 0..n {
                let left = self.min_x() + col as f64 * cell_w;
                cells.push(Rectangle::new(left, top - cell_h, cell_w, cell_h));
            }
        }
        cells
    }
}
