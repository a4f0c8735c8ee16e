//! Raster handle metadata
//!
//! A handle is the engine's view of one opened raster: enough structural
//! metadata to plan geometry and layout without touching pixel data. The
//! handle is a plain value; exclusive ownership by the call that opened
//! it is expressed through ordinary move semantics, and a handle must be
//! dropped before the same path is reopened in a different access mode.

use std::path::PathBuf;

use crate::geometry::{CoordinateSystem, Rectangle};

/// Access mode for an opened raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access
    Read,
    /// Read-write access, required for in-place pyramid embedding
    Update,
}

/// Structural metadata of an opened raster
#[derive(Debug, Clone)]
pub struct RasterHandle {
    /// Path the handle was opened from
    pub path: PathBuf,
    /// Access mode the handle was opened with
    pub mode: AccessMode,
    /// Raster size as (columns, rows)
    pub raster_size: (u64, u64),
    /// Number of bands
    pub band_count: u32,
    /// Pixel data type name of the first band, e.g. "Byte" or "Float32"
    pub band_type: String,
    /// Affine geotransform: origin x, pixel width, row rotation,
    /// origin y, column rotation, pixel height (negative for north-up)
    pub geotransform: [f64; 6],
    /// Coordinate system of the raster
    pub crs: CoordinateSystem,
    /// No-data value of the first band, if declared
    pub nodata: Option<f64>,
    /// Number of overview levels present
    pub overview_count: u32,
    /// Size of the backing file in bytes
    pub file_size: u64,
    /// Which overview level this handle exposes, 0 for the base raster
    pub overview_index: u32,
}

impl RasterHandle {
    /// Geographic extent covered by the raster
    pub fn extent(&self) -> Rectangle {
        let origin_x = self.geotransform[0];
        let origin_y = self.geotransform[3];
        let pixel_w = self.geotransform[1];
        let pixel_h = self.geotransform[5];

        let far_x = origin_x + pixel_w * self.raster_size.0 as f64;
        let far_y = origin_y + pixel_h * self.raster_size.1 as f64;

        Rectangle::from_min_max(
            origin_x.min(far_x),
            origin_x.max(far_x),
            origin_y.min(far_y),
            origin_y.max(far_y),
        )
    }

    /// Pixel size as (x, y); y keeps the geotransform sign convention
    pub fn resolution(&self) -> (f64, f64) {
        (self.geotransform[1], self.geotransform[5])
    }
}
