//! Deterministic output naming
//!
//! Every produced file name is derived from the primary output path by
//! plain suffix concatenation, so a rerun of the same request always
//! addresses the same files and sidecars can be located without any
//! registry.

use std::path::{Path, PathBuf};

use crate::engine::Setting;
use crate::geometry::CoordinateSystem;

/// Pieces of a request that show up in a derived output name
pub struct NameParams<'a> {
    /// Target coordinate system when it differs from the source
    pub target_crs: Option<CoordinateSystem>,
    /// Resolved target resolution
    pub resolution: &'a Setting<(f64, f64)>,
    /// Whether the output is cropped
    pub cropped: bool,
    /// Whether the output is cloud-optimized
    pub cloud_optimized: bool,
}

/// Derive the output file name for a request without an explicit path
///
/// The name is the source stem plus one suffix per non-default geometric
/// or format parameter, which keeps distinct outcomes of the same source
/// from colliding on disk.
pub fn derive_output_name(source: &Path, params: &NameParams) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let mut name = stem;
    if let Some(crs) = params.target_crs {
        name.push_str(&format!("_{}", crs.epsg_code()));
    }
    if let Setting::Value((res_x, _)) = params.resolution {
        name.push_str(&format!("_res{}", format_resolution(*res_x)));
    }
    if params.cropped {
        name.push_str("_crop");
    }
    if params.cloud_optimized {
        name.push_str("_cog");
    }
    name.push_str(".tif");
    name
}

/// Format a resolution value for use inside a file name
///
/// Trailing zeros are trimmed and the decimal point becomes an
/// underscore-free token, e.g. 152.874 -> "152p874", 10.0 -> "10".
pub fn format_resolution(resolution: f64) -> String {
    let text = format!("{}", resolution.abs());
    text.replace('.', "p")
}

/// Append a sidecar suffix to a path, keeping the full original name
pub fn sidecar_path(primary: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", primary.display(), suffix))
}

/// Path of the k-th chained overview file
///
/// Repetition 1 is `primary.ovr`, repetition 2 `primary.ovr.ovr` and so
/// on; multi-file pyramids address each level this way.
pub fn overview_chain_path(primary: &Path, repetitions: u32, suffix: &str) -> PathBuf {
    let mut name = primary.display().to_string();
    for _ in 0..repetitions {
        name.push_str(suffix);
    }
    PathBuf::from(name)
}

/// Path of one cell in a split-grid fan-out
///
/// The cell tag lands before the extension: `out.tif` -> `out_r1_c2.tif`.
pub fn partition_path(primary: &Path, row: u32, col: u32) -> PathBuf {
    let stem = primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = primary
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let file_name = format!("{}_r{}_c{}{}", stem, row, col, extension);
    primary.with_file_name(file_name)
}

/// Path of the intermediate file a two-phase build writes first
///
/// The marker lands before the extension so the intermediate stays
/// recognizable as a raster: `out.tif` -> `out_tmp.tif`.
pub fn temp_path(primary: &Path, temp_suffix: &str) -> PathBuf {
    let stem = primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = primary
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let file_name = format!("{}{}{}", stem, temp_suffix, extension);
    primary.with_file_name(file_name)
}
