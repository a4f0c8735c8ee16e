//! Raster engine abstraction
//!
//! The orchestrator never touches pixels itself; everything that reads,
//! resamples or writes raster data goes through the `RasterEngine` trait.
//! The shipped implementation drives the GDAL command-line tools, and the
//! integration tests substitute an in-memory recording engine.

pub mod handle;
pub mod options;
pub mod shell;

pub use handle::{AccessMode, RasterHandle};
pub use options::{EngineConfig, MosaicOptions, ResamplingAlg, Setting, TranscodeOptions};
pub use shell::ShellEngine;

use std::path::{Path, PathBuf};

use crate::errors::TranscodeResult;

/// Receiver for engine progress reports
///
/// Fractions are in `[0, 1]` and monotonically non-decreasing within a
/// single operation. The sink is display-only; it never influences
/// control flow.
pub trait ProgressSink {
    /// Report progress of the running operation
    fn report(&self, fraction: f64, message: &str);
}

/// Abstract raster-processing engine
///
/// One engine instance serves a whole orchestration run; each method call
/// is synchronous and blocks until the underlying operation completes.
/// Operation failure is reported as `Ok(false)` so callers can decide
/// how fatal it is for their level of a recursive build; `Err` is
/// reserved for conditions that make the engine unusable or the request
/// nonsensical.
pub trait RasterEngine {
    /// Open a raster and read its structural metadata
    ///
    /// # Arguments
    /// * `path` - Path to the raster file
    /// * `mode` - Read-only or update access
    /// * `overview_index` - When `Some(k)` with k > 0, expose the k-th
    ///   overview level as if it were the full-resolution raster
    fn open(&self, path: &Path, mode: AccessMode, overview_index: Option<u32>)
        -> TranscodeResult<RasterHandle>;

    /// Crop, resample, reproject and recompress a raster in one pass
    ///
    /// # Returns
    /// `true` when the destination was produced, `false` when the engine
    /// reported failure
    fn transcode(
        &self,
        dst_path: &Path,
        src: &RasterHandle,
        options: &TranscodeOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> TranscodeResult<bool>;

    /// Build overview levels for an already-produced raster
    ///
    /// # Arguments
    /// * `handle` - Raster to build the pyramid for; must be open in
    ///   update mode when `external` is false
    /// * `levels` - Decimation factors, e.g. `[2, 4, 8]`
    /// * `external` - Write a sidecar overview file instead of embedding
    fn build_overviews(
        &self,
        handle: &RasterHandle,
        levels: &[u32],
        resampling: ResamplingAlg,
        external: bool,
        progress: Option<&dyn ProgressSink>,
    ) -> TranscodeResult<bool>;

    /// Produce a human-readable metadata dump for a raster
    fn describe(&self, handle: &RasterHandle) -> TranscodeResult<String>;

    /// Combine several rasters into one logical mosaic
    fn build_virtual_mosaic(
        &self,
        paths: &[PathBuf],
        options: &MosaicOptions,
    ) -> TranscodeResult<RasterHandle>;
}
