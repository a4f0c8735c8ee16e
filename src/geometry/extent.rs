//! Extent handling and sampling-based extent transformation
//!
//! Reprojecting a bounding box by transforming its four corners is
//! generically wrong: under a nonlinear transform the extrema of the
//! mapped region need not lie on mapped corners. The transformer here
//! walks a dense regular grid over the rectangle instead and accumulates
//! the bounds of every sample that survives the transform.

use log::warn;

use super::crs::CoordinateSystem;
use super::point::Point;
use super::rect::Rectangle;
use super::transform::{CrsTransform, PointTransform};
use crate::errors::TranscodeResult;

/// A rectangle tied to a specific coordinate system
///
/// Two extents are only comparable or combinable once one has been
/// transformed into the other's coordinate system.
#[derive(Debug, Clone, Copy)]
pub struct Extent {
    /// Coordinate system the rectangle is expressed in
    pub crs: CoordinateSystem,
    /// The bounding rectangle
    pub rect: Rectangle,
}

impl Extent {
    /// Create a new extent
    pub fn new(crs: CoordinateSystem, rect: Rectangle) -> Self {
        Extent { crs, rect }
    }

    /// Express this extent in another coordinate system
    ///
    /// # Arguments
    /// * `target` - Coordinate system to transform into
    /// * `sample_count` - Approximate number of grid samples to use
    ///
    /// # Returns
    /// The transformed extent, which may carry an empty rectangle if the
    /// region lies entirely outside the target transform's domain
    pub fn transformed_to(&self, target: CoordinateSystem, sample_count: usize) -> TranscodeResult<Extent> {
        let transform = CrsTransform::between(self.crs, target)?;
        let transformer = ExtentTransformer::new(sample_count);
        Ok(Extent::new(target, transformer.transform(&self.rect, &transform)))
    }
}

/// Sampling-based rectangle transformer
pub struct ExtentTransformer {
    /// Approximate number of sample points to distribute over the region
    sample_count: usize,
}

impl ExtentTransformer {
    /// Create a transformer using roughly the given number of samples
    pub fn new(sample_count: usize) -> Self {
        ExtentTransformer {
            sample_count: sample_count.max(1),
        }
    }

    /// Map a rectangle through a point transform
    ///
    /// Walks a regular grid over `[min_y, max_y] x [min_x, max_x)`,
    /// transforms each sample and returns the bounds of the finite
    /// results. Samples whose transformed coordinates are non-finite fall
    /// outside the transform's domain of validity and are discarded.
    ///
    /// # Arguments
    /// * `rect` - Rectangle to transform
    /// * `transform` - Point transform to map samples through
    ///
    /// # Returns
    /// Bounds of the transformed region, or the empty rectangle when the
    /// input is empty or degenerate or no sample survived the transform
    pub fn transform(&self, rect: &Rectangle, transform: &dyn PointTransform) -> Rectangle {
        if transform.is_identity() {
            return *rect;
        }
        if rect.is_empty() || rect.area() <= 0.0 {
            return Rectangle::empty();
        }

        let (dx, dy, steps_x, steps_y) = grid_steps(rect, self.sample_count);

        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;
        let mut survived = 0usize;

        // Y runs inclusive of the top edge, X exclusive of the right edge,
        // matching the grid the resolution estimator walks.
        for j in 0..=steps_y {
            let y = rect.min_y() + j as f64 * dy;
            for i in 0..steps_x {
                let x = rect.min_x() + i as f64 * dx;
                let mapped = transform.apply(Point::new(x, y));
                if mapped.x.is_finite() {
                    min_x = min_x.min(mapped.x);
                    max_x = max_x.max(mapped.x);
                }
                if mapped.y.is_finite() {
                    min_y = min_y.min(mapped.y);
                    max_y = max_y.max(mapped.y);
                }
                if mapped.is_finite() {
                    survived += 1;
                }
            }
        }

        if survived == 0 || min_x > max_x || min_y > max_y {
            warn!("No sample point survived the extent transform");
            return Rectangle::empty();
        }

        Rectangle::from_min_max(min_x, max_x, min_y, max_y)
    }
}

/// Derive grid steps so a sample budget is roughly honored
///
/// A first-pass step is the square root of the per-sample cell area; each
/// axis is then re-divided by the number of whole steps that fit so the
/// grid lands exactly on the rectangle edges. The resolution estimator
/// walks the same grid.
pub(crate) fn grid_steps(rect: &Rectangle, sample_count: usize) -> (f64, f64, usize, usize) {
    let cell_area = rect.area() / sample_count as f64;
    let step = cell_area.sqrt();

    let steps_x = (rect.w / step).floor().max(1.0) as usize;
    let steps_y = (rect.h / step).floor().max(1.0) as usize;

    let dx = rect.w / steps_x as f64;
    let dy = rect.h / steps_y as f64;
    (dx, dy, steps_x, steps_y)
}
