//! Option bags passed to engine operations
//!
//! Parameters with three meaningful states are modeled as an explicit
//! `Setting` value instead of an overloaded `Option`: leaving a knob
//! untouched, asking for the engine's built-in default, and forcing a
//! concrete value are different requests and stay distinguishable all the
//! way down to the spawned engine invocation.

use crate::errors::{TranscodeError, TranscodeResult};
use crate::geometry::{CoordinateSystem, Rectangle};

/// Three-state parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting<T> {
    /// The caller said nothing; planning may fill this in
    Unset,
    /// Explicitly defer to the engine's default behavior
    EngineDefault,
    /// Use this concrete value
    Value(T),
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Unset
    }
}

impl<T> Setting<T> {
    /// The concrete value, if one was set
    pub fn value(&self) -> Option<&T> {
        match self {
            Setting::Value(v) => Some(v),
            _ => None,
        }
    }

    /// True when a concrete value was set
    pub fn is_value(&self) -> bool {
        matches!(self, Setting::Value(_))
    }
}

/// Resampling algorithm passed through to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplingAlg {
    Nearest,
    Bilinear,
    Cubic,
    CubicSpline,
    Average,
    Mode,
    Lanczos,
}

impl ResamplingAlg {
    /// Engine-facing name of the algorithm
    pub fn name(&self) -> &'static str {
        match self {
            ResamplingAlg::Nearest => "nearest",
            ResamplingAlg::Bilinear => "bilinear",
            ResamplingAlg::Cubic => "cubic",
            ResamplingAlg::CubicSpline => "cubicspline",
            ResamplingAlg::Average => "average",
            ResamplingAlg::Mode => "mode",
            ResamplingAlg::Lanczos => "lanczos",
        }
    }

    /// Parse an algorithm name
    pub fn from_name(name: &str) -> TranscodeResult<Self> {
        match name.to_lowercase().as_str() {
            "nearest" | "near" => Ok(ResamplingAlg::Nearest),
            "bilinear" => Ok(ResamplingAlg::Bilinear),
            "cubic" => Ok(ResamplingAlg::Cubic),
            "cubicspline" => Ok(ResamplingAlg::CubicSpline),
            "average" => Ok(ResamplingAlg::Average),
            "mode" => Ok(ResamplingAlg::Mode),
            "lanczos" => Ok(ResamplingAlg::Lanczos),
            _ => Err(TranscodeError::GenericError(format!("Unknown resampling algorithm: {}", name))),
        }
    }
}

/// Explicit per-call engine configuration
///
/// Passed into every engine invocation and applied only for the duration
/// of that invocation (per-spawn environment for the shell engine); the
/// process environment is never mutated.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Worker thread count for operations that can parallelize
    pub num_threads: Option<u32>,
    /// Block cache budget in megabytes
    pub cache_max_mb: Option<u32>,
    /// Additional raw configuration pairs
    pub extra: Vec<(String, String)>,
}

impl EngineConfig {
    /// Render the configuration as environment variable pairs
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let mut vars = Vec::new();
        if let Some(threads) = self.num_threads {
            vars.push(("GDAL_NUM_THREADS".to_string(), threads.to_string()));
        }
        if let Some(cache) = self.cache_max_mb {
            vars.push(("GDAL_CACHEMAX".to_string(), cache.to_string()));
        }
        vars.extend(self.extra.iter().cloned());
        vars
    }
}

/// Options for one transcode operation
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// Target window in the target coordinate system; None keeps the
    /// source extent
    pub extent: Option<Rectangle>,
    /// Target coordinate system; None keeps the source system
    pub target_crs: Option<CoordinateSystem>,
    /// Target pixel size as (x, y)
    pub resolution: Setting<(f64, f64)>,
    /// Resampling algorithm
    pub resampling: ResamplingAlg,
    /// Compression directive, e.g. "DEFLATE" or "JPEG"
    pub compression: Setting<String>,
    /// No-data value for the destination
    pub nodata: Setting<f64>,
    /// Ask the engine to assemble a cloud-optimized layout directly
    pub cloud_optimized: bool,
    /// Per-call engine configuration
    pub config: EngineConfig,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        TranscodeOptions {
            extent: None,
            target_crs: None,
            resolution: Setting::Unset,
            resampling: ResamplingAlg::Nearest,
            compression: Setting::Unset,
            nodata: Setting::Unset,
            cloud_optimized: false,
            config: EngineConfig::default(),
        }
    }
}

/// Options for building a virtual mosaic
#[derive(Debug, Clone, Default)]
pub struct MosaicOptions {
    /// Explicit path for the mosaic definition file; None derives one
    /// next to the first input
    pub mosaic_path: Option<std::path::PathBuf>,
    /// Resolution handling for heterogeneous inputs
    pub resolution: Setting<(f64, f64)>,
    /// No-data value applied across inputs
    pub nodata: Setting<f64>,
    /// Per-call engine configuration
    pub config: EngineConfig,
}
