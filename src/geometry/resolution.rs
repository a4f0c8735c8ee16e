//! Representative output resolution estimation
//!
//! A pixel's ground size is not invariant under reprojection; it varies
//! with position, and near singular regions (poles, the antimeridian, a
//! box straddling the equator in some projections) a handful of samples
//! can be wildly off. The estimator therefore measures the local scale at
//! many points by finite forward differencing through the transform and
//! picks the median of the distribution, which a few extreme samples
//! cannot drag around the way a mean can.

use log::debug;

use super::extent::grid_steps;
use super::point::Point;
use super::rect::Rectangle;
use super::transform::PointTransform;

/// Estimator deriving an output pixel size after a coordinate change
pub struct ResolutionEstimator {
    /// Approximate number of grid samples to measure at
    sample_count: usize,
    /// Extra samples along y = 0 when the extent straddles it, 0 disables
    equator_band_samples: usize,
    /// Significant digits kept in the returned resolution
    significant_digits: u32,
}

impl ResolutionEstimator {
    /// Create an estimator
    ///
    /// # Arguments
    /// * `sample_count` - Approximate number of measurement points
    /// * `equator_band_samples` - Extra samples on the y = 0 line for
    ///   extents that straddle it (0 to disable)
    /// * `significant_digits` - Rounding applied to the chosen value,
    ///   which keeps derived file names stable across runs
    pub fn new(sample_count: usize, equator_band_samples: usize, significant_digits: u32) -> Self {
        ResolutionEstimator {
            sample_count: sample_count.max(1),
            equator_band_samples,
            significant_digits: significant_digits.max(1),
        }
    }

    /// Estimate the output resolution for a transformed raster
    ///
    /// Samples `extent` (expressed in the transform's input space) on a
    /// regular grid; at each point the ground distance of one input pixel
    /// step through the transform is measured by forward differencing.
    /// The median measurement per axis becomes the representative value.
    ///
    /// # Arguments
    /// * `input_resolution` - Source pixel size as (x, y); y is typically
    ///   negative for north-up rasters
    /// * `transform` - Transform from the input space to the output space
    /// * `extent` - Sampled region in the transform's input space
    /// * `anisotropic` - Measure the X axis independently instead of
    ///   reusing the Y measurement for square output pixels
    ///
    /// # Returns
    /// Output (x, y) resolution; y carries the sign of the input Y
    /// resolution. Identity transforms return the input unchanged.
    pub fn estimate(
        &self,
        input_resolution: (f64, f64),
        transform: &dyn PointTransform,
        extent: &Rectangle,
        anisotropic: bool,
    ) -> (f64, f64) {
        if transform.is_identity() {
            return input_resolution;
        }
        if extent.is_empty() || extent.area() <= 0.0 {
            return input_resolution;
        }

        let step_x = input_resolution.0.abs();
        let step_y = input_resolution.1.abs();

        let mut samples_y: Vec<f64> = Vec::new();
        let mut samples_x: Vec<f64> = Vec::new();

        let mut measure = |point: Point| {
            let here = transform.apply(point);
            if !here.is_finite() {
                return;
            }
            let up = transform.apply(Point::new(point.x, point.y + step_y));
            if up.is_finite() {
                let d = here.distance_to(&up);
                if d.is_finite() && d > 0.0 {
                    samples_y.push(d);
                }
            }
            if anisotropic {
                let right = transform.apply(Point::new(point.x + step_x, point.y));
                if right.is_finite() {
                    let d = here.distance_to(&right);
                    if d.is_finite() && d > 0.0 {
                        samples_x.push(d);
                    }
                }
            }
        };

        let (dx, dy, steps_x, steps_y) = grid_steps(extent, self.sample_count);
        for j in 0..=steps_y {
            let y = extent.min_y() + j as f64 * dy;
            for i in 0..steps_x {
                let x = extent.min_x() + i as f64 * dx;
                measure(Point::new(x, y));
            }
        }

        // A box straddling y = 0 gets an extra sample row right on the
        // discontinuity, where some transforms concentrate distortion.
        if self.equator_band_samples > 0 && extent.min_y() < 0.0 && extent.max_y() > 0.0 {
            let band_dx = extent.w / self.equator_band_samples as f64;
            for i in 0..self.equator_band_samples {
                measure(Point::new(extent.min_x() + i as f64 * band_dx, 0.0));
            }
        }

        if samples_y.is_empty() {
            debug!("No resolution sample survived the transform, keeping input resolution");
            return input_resolution;
        }

        let res_y = round_significant(median(&mut samples_y), self.significant_digits);
        let res_x = if anisotropic && !samples_x.is_empty() {
            round_significant(median(&mut samples_x), self.significant_digits)
        } else {
            res_y
        };

        (
            res_x.copysign(input_resolution.0),
            res_y.copysign(input_resolution.1),
        )
    }
}

/// Median of an unsorted sample list
fn median(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    samples[samples.len() / 2]
}

/// Round to the given number of significant digits
fn round_significant(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor();
    let factor = 10f64.powf(digits as f64 - 1.0 - magnitude);
    (value * factor).round() / factor
}
