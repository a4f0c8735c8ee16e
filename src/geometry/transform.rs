//! Point-wise coordinate transformation functionality
//!
//! Transforms are deliberately total functions over points: a point
//! outside a projection's domain of validity comes back with non-finite
//! coordinates instead of an error, so the sampling algorithms in
//! `extent` and `resolution` can walk dense grids and simply discard
//! unusable samples.

use std::f64::consts::PI;

use super::crs::CoordinateSystem;
use super::point::Point;
use crate::errors::{TranscodeError, TranscodeResult};

/// Highest latitude representable in Web Mercator
const WEB_MERCATOR_MAX_LAT: f64 = 85.05112877980659;

/// WGS 84 semi-major axis in meters
const WGS84_SEMI_MAJOR: f64 = 6378137.0;
/// WGS 84 flattening
const WGS84_FLATTENING: f64 = 1.0 / 298.257223563;
/// UTM central scale factor
const UTM_SCALE: f64 = 0.9996;
/// UTM false easting in meters
const UTM_FALSE_EASTING: f64 = 500000.0;
/// UTM false northing for the southern hemisphere in meters
const UTM_FALSE_NORTHING: f64 = 10000000.0;

/// A point-wise coordinate transform
///
/// Implementations may be nonlinear and may be undefined for some inputs,
/// in which case they return non-finite coordinates.
pub trait PointTransform {
    /// Apply the transform to a point
    fn apply(&self, point: Point) -> Point;

    /// True when the transform maps every point to itself
    fn is_identity(&self) -> bool {
        false
    }
}

/// The identity transform
pub struct IdentityTransform;

impl PointTransform for IdentityTransform {
    fn apply(&self, point: Point) -> Point {
        point
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Transform between two known coordinate systems
///
/// Conversions are routed through WGS 84 as a hub, so any supported pair
/// composes from the analytic forward/inverse projections below.
pub struct CrsTransform {
    from: CoordinateSystem,
    to: CoordinateSystem,
}

impl CrsTransform {
    /// Create a transform between two coordinate systems
    ///
    /// # Arguments
    /// * `from` - Source coordinate system
    /// * `to` - Target coordinate system
    ///
    /// # Returns
    /// The transform, or an error if either side is an EPSG code without
    /// a built-in projection
    pub fn between(from: CoordinateSystem, to: CoordinateSystem) -> TranscodeResult<Self> {
        if from != to {
            for side in [&from, &to] {
                if let CoordinateSystem::Other(_) = side {
                    return Err(TranscodeError::UnsupportedTransform(
                        from.description(),
                        to.description(),
                    ));
                }
            }
        }
        Ok(CrsTransform { from, to })
    }

    /// The transform mapping in the opposite direction
    pub fn inverse(&self) -> CrsTransform {
        CrsTransform { from: self.to, to: self.from }
    }

    /// Source coordinate system
    pub fn source(&self) -> CoordinateSystem {
        self.from
    }

    /// Target coordinate system
    pub fn target(&self) -> CoordinateSystem {
        self.to
    }

    fn to_wgs84(point: Point, from: &CoordinateSystem) -> Point {
        match from {
            CoordinateSystem::WGS84 => point,
            CoordinateSystem::WebMercator => web_mercator_to_wgs84(point),
            CoordinateSystem::UTM(zone, is_northern) => utm_to_wgs84(point, *zone, *is_northern),
            CoordinateSystem::Other(_) => Point::new(f64::NAN, f64::NAN),
        }
    }

    fn from_wgs84(point: Point, to: &CoordinateSystem) -> Point {
        match to {
            CoordinateSystem::WGS84 => point,
            CoordinateSystem::WebMercator => wgs84_to_web_mercator(point),
            CoordinateSystem::UTM(zone, is_northern) => wgs84_to_utm(point, *zone, *is_northern),
            CoordinateSystem::Other(_) => Point::new(f64::NAN, f64::NAN),
        }
    }
}

impl PointTransform for CrsTransform {
    fn apply(&self, point: Point) -> Point {
        if self.from == self.to {
            return point;
        }
        let geographic = Self::to_wgs84(point, &self.from);
        if !geographic.is_finite() {
            return geographic;
        }
        Self::from_wgs84(geographic, &self.to)
    }

    fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

/// Convert from WGS 84 to Web Mercator
///
/// Latitudes beyond the projection's limit yield non-finite output.
fn wgs84_to_web_mercator(point: Point) -> Point {
    if point.y.abs() > WEB_MERCATOR_MAX_LAT {
        return Point::new(f64::NAN, f64::NAN);
    }
    let x = point.x * WGS84_SEMI_MAJOR * PI / 180.0;
    let y = f64::ln(f64::tan((90.0 + point.y) * PI / 360.0)) * WGS84_SEMI_MAJOR;
    Point::new(x, y)
}

/// Convert from Web Mercator to WGS 84
fn web_mercator_to_wgs84(point: Point) -> Point {
    let lon = point.x * 180.0 / (WGS84_SEMI_MAJOR * PI);
    let lat = 180.0 / PI * (2.0 * f64::atan(f64::exp(point.y / WGS84_SEMI_MAJOR)) - PI / 2.0);
    Point::new(lon, lat)
}

/// Central meridian of a UTM zone in degrees
fn utm_central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

/// Convert from WGS 84 to UTM using the transverse Mercator series
///
/// The series stays finite well outside the nominal 6-degree zone, which
/// is what the extent sampler needs; accuracy simply degrades away from
/// the central meridian. The poles themselves are singular.
fn wgs84_to_utm(point: Point, zone: u8, is_northern: bool) -> Point {
    if point.y.abs() >= 90.0 {
        return Point::new(f64::NAN, f64::NAN);
    }

    let e2 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);
    let ep2 = e2 / (1.0 - e2);

    let lat = point.y.to_radians();
    let dlon = (point.x - utm_central_meridian(zone)).to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = WGS84_SEMI_MAJOR / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = ep2 * cos_lat * cos_lat;
    let a = cos_lat * dlon;

    let m = WGS84_SEMI_MAJOR
        * ((1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e2 * e2 / 32.0 + 45.0 * e2 * e2 * e2 / 1024.0) * (2.0 * lat).sin()
            + (15.0 * e2 * e2 / 256.0 + 45.0 * e2 * e2 * e2 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e2 * e2 * e2 / 3072.0) * (6.0 * lat).sin());

    let easting = UTM_SCALE
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;

    let mut northing = UTM_SCALE
        * (m + n
            * tan_lat
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

    if !is_northern {
        northing += UTM_FALSE_NORTHING;
    }

    Point::new(easting, northing)
}

/// Convert from UTM to WGS 84
fn utm_to_wgs84(point: Point, zone: u8, is_northern: bool) -> Point {
    let e2 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);
    let ep2 = e2 / (1.0 - e2);

    let x = point.x - UTM_FALSE_EASTING;
    let y = if is_northern { point.y } else { point.y - UTM_FALSE_NORTHING };

    let m = y / UTM_SCALE;
    let mu = m / (WGS84_SEMI_MAJOR
        * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));

    let sqrt_1me2 = (1.0 - e2).sqrt();
    let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);

    // Footpoint latitude
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = WGS84_SEMI_MAJOR / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = WGS84_SEMI_MAJOR * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * UTM_SCALE);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lon = utm_central_meridian(zone).to_radians()
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos_phi1;

    Point::new(lon.to_degrees(), lat.to_degrees())
}
