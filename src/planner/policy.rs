//! Build policy constants
//!
//! Several thresholds in the planning logic are empirically tuned rather
//! than derived, so they live here as named, overridable values instead
//! of inline literals. A TOML file can override any of them at runtime.

use std::fs;

use lazy_static::lazy_static;

use crate::errors::{TranscodeError, TranscodeResult};

/// Tunable constants steering the planning subsystem
#[derive(Debug, Clone)]
pub struct BuildPolicy {
    /// Approximate sample count for extent and resolution estimation
    pub sample_count: usize,
    /// Extra resolution samples along y = 0 for straddling extents,
    /// 0 disables the band
    pub equator_band_samples: usize,
    /// Significant digits kept in estimated resolutions
    pub resolution_digits: u32,
    /// Source size in bytes above which external overviews are chained
    /// across multiple files instead of combined into one
    pub multi_file_threshold: u64,
    /// Overview levels generated when the caller does not say
    pub default_overview_count: u32,
    /// Suffix of external overview files
    pub overview_suffix: String,
    /// Suffix of the metadata sidecar
    pub info_suffix: String,
    /// Suffix of the run-log sidecar
    pub run_log_suffix: String,
    /// Stem suffix of intermediate files in two-phase builds
    pub temp_suffix: String,
}

impl Default for BuildPolicy {
    fn default() -> Self {
        BuildPolicy {
            sample_count: 1000,
            equator_band_samples: 100,
            resolution_digits: 3,
            multi_file_threshold: 1024 * 1024 * 1024,
            default_overview_count: 10,
            overview_suffix: ".ovr".to_string(),
            info_suffix: ".info".to_string(),
            run_log_suffix: ".spec".to_string(),
            temp_suffix: "_tmp".to_string(),
        }
    }
}

lazy_static! {
    /// Process-wide default policy
    pub static ref DEFAULT_POLICY: BuildPolicy = BuildPolicy::default();
}

impl BuildPolicy {
    /// Parse policy overrides from a TOML string
    ///
    /// Unknown keys are ignored; absent keys keep their defaults.
    pub fn from_toml_str(content: &str) -> TranscodeResult<Self> {
        let toml_value: toml::Value = content
            .parse()
            .map_err(|e| TranscodeError::GenericError(format!("Failed to parse policy TOML: {}", e)))?;

        let mut policy = BuildPolicy::default();

        if let Some(v) = toml_value.get("sample_count").and_then(|v| v.as_integer()) {
            policy.sample_count = v.max(1) as usize;
        }
        if let Some(v) = toml_value.get("equator_band_samples").and_then(|v| v.as_integer()) {
            policy.equator_band_samples = v.max(0) as usize;
        }
        if let Some(v) = toml_value.get("resolution_digits").and_then(|v| v.as_integer()) {
            policy.resolution_digits = v.max(1) as u32;
        }
        if let Some(v) = toml_value.get("multi_file_threshold").and_then(|v| v.as_integer()) {
            policy.multi_file_threshold = v.max(0) as u64;
        }
        if let Some(v) = toml_value.get("default_overview_count").and_then(|v| v.as_integer()) {
            policy.default_overview_count = v.max(1) as u32;
        }
        if let Some(v) = toml_value.get("overview_suffix").and_then(|v| v.as_str()) {
            policy.overview_suffix = v.to_string();
        }
        if let Some(v) = toml_value.get("info_suffix").and_then(|v| v.as_str()) {
            policy.info_suffix = v.to_string();
        }
        if let Some(v) = toml_value.get("run_log_suffix").and_then(|v| v.as_str()) {
            policy.run_log_suffix = v.to_string();
        }
        if let Some(v) = toml_value.get("temp_suffix").and_then(|v| v.as_str()) {
            policy.temp_suffix = v.to_string();
        }

        Ok(policy)
    }

    /// Load policy overrides from a TOML file
    pub fn from_file(path: &str) -> TranscodeResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => return Err(TranscodeError::IoError(e)),
        };
        Self::from_toml_str(&contents)
    }
}
