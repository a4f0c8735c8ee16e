//! The immutable transcode request
//!
//! One request value describes everything a single orchestration call is
//! allowed to do. Recursive sub-builds never mutate a shared request;
//! they copy the parent's request through `rebuild()` and override the
//! handful of fields that differ, so every level of a recursion tree can
//! be reproduced and tested in isolation.

use std::path::PathBuf;

use super::overview_plan::OverviewPlan;
use crate::engine::{EngineConfig, ResamplingAlg, Setting};
use crate::errors::{TranscodeError, TranscodeResult};
use crate::geometry::{CoordinateSystem, Extent};

/// What to do when the final target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingTargetPolicy {
    /// Keep the existing file and record it as the result
    Skip,
    /// Replace the existing file
    Overwrite,
    /// Treat the existing file as an error
    Fail,
}

/// Name-to-strategy dispatch table for the existing-target policy
const EXISTING_TARGET_NAMES: &[(&str, ExistingTargetPolicy)] = &[
    ("skip", ExistingTargetPolicy::Skip),
    ("overwrite", ExistingTargetPolicy::Overwrite),
    ("fail", ExistingTargetPolicy::Fail),
];

impl ExistingTargetPolicy {
    /// Caller-facing name of the strategy
    pub fn name(&self) -> &'static str {
        match self {
            ExistingTargetPolicy::Skip => "skip",
            ExistingTargetPolicy::Overwrite => "overwrite",
            ExistingTargetPolicy::Fail => "fail",
        }
    }

    /// Look up a strategy by name
    pub fn from_name(name: &str) -> TranscodeResult<Self> {
        let wanted = name.to_lowercase();
        EXISTING_TARGET_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == wanted)
            .map(|(_, policy)| *policy)
            .ok_or_else(|| TranscodeError::GenericError(format!("Unknown existing-target policy: {}", name)))
    }
}

/// Input of a transcode run
#[derive(Debug, Clone)]
pub enum Source {
    /// A single raster file
    Path(PathBuf),
    /// Several rasters treated as one logical mosaic
    Mosaic(Vec<PathBuf>),
}

impl Source {
    /// The primary path, used for naming derived outputs
    pub fn primary_path(&self) -> Option<&PathBuf> {
        match self {
            Source::Path(path) => Some(path),
            Source::Mosaic(paths) => paths.first(),
        }
    }
}

/// Full parameter set of one planned orchestration call
///
/// Immutable by convention: the orchestrator only reads it, and derived
/// requests are made through `rebuild()`.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Input raster(s)
    pub source: Source,
    /// Overview level of the source to read as if it were the base
    pub source_overview: Option<u32>,
    /// Explicit final output path; None derives a name from the request
    pub output: Option<PathBuf>,
    /// Directory for derived output names; None uses the source's
    pub output_dir: Option<PathBuf>,
    /// Crop window, in its own coordinate system
    pub crop: Option<Extent>,
    /// Target coordinate system; None keeps the source system
    pub target_crs: Option<CoordinateSystem>,
    /// Target resolution; Unset lets the estimator choose when needed
    pub resolution: Setting<(f64, f64)>,
    /// Estimate X resolution independently of Y
    pub anisotropic_resolution: bool,
    /// Resampling algorithm handed to the engine
    pub resampling: ResamplingAlg,
    /// Compression directive handed to the engine
    pub compression: Setting<String>,
    /// Destination no-data value
    pub nodata: Setting<f64>,
    /// Overview construction strategy
    pub overview_plan: OverviewPlan,
    /// Overview level count; negative means "the last N source levels"
    pub dst_ovr_count: Option<i32>,
    /// Base overview index for level reuse
    pub base_overview_index: Option<u32>,
    /// Produce a cloud-optimized layout
    pub cloud_optimized: bool,
    /// What to do when the final target already exists
    pub existing_target: ExistingTargetPolicy,
    /// Snap the target extent outward onto the resolution grid
    pub align_to_grid: bool,
    /// Fan the target extent out into an n x n grid of outputs
    pub split: Option<u32>,
    /// Write .info and run-log sidecars next to the primary output
    pub write_sidecars: bool,
    /// Per-call engine configuration
    pub engine_config: EngineConfig,
}

impl TranscodeRequest {
    /// Create a request with neutral defaults for a single source file
    pub fn new(source: PathBuf) -> Self {
        TranscodeRequest {
            source: Source::Path(source),
            source_overview: None,
            output: None,
            output_dir: None,
            crop: None,
            target_crs: None,
            resolution: Setting::Unset,
            anisotropic_resolution: false,
            resampling: ResamplingAlg::Nearest,
            compression: Setting::Unset,
            nodata: Setting::Unset,
            overview_plan: OverviewPlan::AutoSelect,
            dst_ovr_count: None,
            base_overview_index: None,
            cloud_optimized: false,
            existing_target: ExistingTargetPolicy::Skip,
            align_to_grid: false,
            split: None,
            write_sidecars: true,
            engine_config: EngineConfig::default(),
        }
    }

    /// Start a derived request that copies this one
    pub fn rebuild(&self) -> TranscodeRequestBuilder {
        TranscodeRequestBuilder { inner: self.clone() }
    }
}

/// Copy-with-overrides builder for derived requests
pub struct TranscodeRequestBuilder {
    inner: TranscodeRequest,
}

impl TranscodeRequestBuilder {
    /// Replace the source with a single file
    pub fn source(mut self, path: PathBuf) -> Self {
        self.inner.source = Source::Path(path);
        self
    }

    /// Read this overview level of the source as the base raster
    pub fn source_overview(mut self, index: Option<u32>) -> Self {
        self.inner.source_overview = index;
        self
    }

    /// Set the explicit output path
    pub fn output(mut self, path: PathBuf) -> Self {
        self.inner.output = Some(path);
        self
    }

    /// Replace the overview strategy
    pub fn overview_plan(mut self, plan: OverviewPlan) -> Self {
        self.inner.overview_plan = plan;
        self
    }

    /// Replace the overview level count
    pub fn dst_ovr_count(mut self, count: Option<i32>) -> Self {
        self.inner.dst_ovr_count = count;
        self
    }

    /// Replace the base overview index
    pub fn base_overview_index(mut self, index: Option<u32>) -> Self {
        self.inner.base_overview_index = index;
        self
    }

    /// Replace the target resolution
    pub fn resolution(mut self, resolution: Setting<(f64, f64)>) -> Self {
        self.inner.resolution = resolution;
        self
    }

    /// Replace the crop window
    pub fn crop(mut self, crop: Option<Extent>) -> Self {
        self.inner.crop = crop;
        self
    }

    /// Replace the target coordinate system
    pub fn target_crs(mut self, crs: Option<CoordinateSystem>) -> Self {
        self.inner.target_crs = crs;
        self
    }

    /// Turn the cloud-optimized layout on or off
    pub fn cloud_optimized(mut self, enabled: bool) -> Self {
        self.inner.cloud_optimized = enabled;
        self
    }

    /// Replace the split fan-out factor
    pub fn split(mut self, split: Option<u32>) -> Self {
        self.inner.split = split;
        self
    }

    /// Turn sidecar generation on or off
    pub fn write_sidecars(mut self, enabled: bool) -> Self {
        self.inner.write_sidecars = enabled;
        self
    }

    /// Finish the derived request
    pub fn build(self) -> TranscodeRequest {
        self.inner
    }
}
