//! GDAL command-line engine
//!
//! Drives the stock GDAL tools (`gdalinfo`, `gdal_translate`, `gdalwarp`,
//! `gdaladdo`, `gdalbuildvrt`) as child processes. Keeping the engine out
//! of process means the orchestrator stays a pure planner and any GDAL
//! build the host has on PATH can do the pixel work.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use lazy_static::lazy_static;
use log::{debug, error};
use regex::Regex;

use super::handle::{AccessMode, RasterHandle};
use super::options::{MosaicOptions, ResamplingAlg, Setting, TranscodeOptions};
use super::{ProgressSink, RasterEngine};
use crate::errors::{TranscodeError, TranscodeResult};
use crate::geometry::CoordinateSystem;

lazy_static! {
    static ref SIZE_RE: Regex = Regex::new(r"Size is (\d+), (\d+)").unwrap();
    static ref ORIGIN_RE: Regex = Regex::new(r"Origin = \(([-\d.eE+]+),([-\d.eE+]+)\)").unwrap();
    static ref PIXEL_SIZE_RE: Regex = Regex::new(r"Pixel Size = \(([-\d.eE+]+),([-\d.eE+]+)\)").unwrap();
    static ref EPSG_RE: Regex = Regex::new(r#"(?:ID\["EPSG",(\d+)\]|AUTHORITY\["EPSG","(\d+)"\])"#).unwrap();
    static ref BAND_RE: Regex = Regex::new(r"(?m)^Band (\d+) .*Type=(\w+)").unwrap();
    static ref NODATA_RE: Regex = Regex::new(r"NoData Value=([-\w.+]+)").unwrap();
    static ref OVERVIEWS_RE: Regex = Regex::new(r"(?m)^\s*Overviews: (.+)$").unwrap();
}

/// Raster engine backed by the GDAL command-line tools
pub struct ShellEngine {
    /// Directory holding the GDAL binaries; None searches PATH
    tool_dir: Option<PathBuf>,
}

impl ShellEngine {
    /// Create an engine using the GDAL tools found on PATH
    pub fn new() -> Self {
        ShellEngine { tool_dir: None }
    }

    /// Create an engine using GDAL tools from a specific directory
    pub fn with_tool_dir(dir: &Path) -> Self {
        ShellEngine { tool_dir: Some(dir.to_path_buf()) }
    }

    fn tool(&self, name: &str) -> Command {
        match &self.tool_dir {
            Some(dir) => Command::new(dir.join(name)),
            None => Command::new(name),
        }
    }

    /// Run a tool and capture its stdout; a nonzero exit is fatal here
    /// because callers of this path need the output to proceed at all
    fn run_capture(&self, mut cmd: Command, label: &str) -> TranscodeResult<String> {
        debug!("Running {:?}", cmd);
        let output = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| TranscodeError::EngineUnavailable(format!("{}: {}", label, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::GenericError(format!(
                "{} failed with {}: {}",
                label,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a tool, streaming its textual progress into the sink
    ///
    /// Operation failure is downgraded to `Ok(false)`; only an engine
    /// that cannot be spawned at all is an error.
    fn run_with_progress(
        &self,
        mut cmd: Command,
        label: &str,
        progress: Option<&dyn ProgressSink>,
    ) -> TranscodeResult<bool> {
        debug!("Running {:?}", cmd);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| TranscodeError::EngineUnavailable(format!("{}: {}", label, e)))?;

        // GDAL tools draw progress as "0...10...20...100 - done.": each
        // dot or decade number is one mark worth 2.5%.
        if let Some(mut stdout) = child.stdout.take() {
            let mut marks = 0u32;
            let mut in_digits = false;
            let mut buf = [0u8; 256];
            loop {
                let n = match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(_) => break,
                };
                for &byte in &buf[..n] {
                    match byte {
                        b'.' => {
                            in_digits = false;
                            marks += 1;
                        }
                        b'0'..=b'9' => {
                            if !in_digits {
                                marks += 1;
                                in_digits = true;
                            }
                        }
                        _ => in_digits = false,
                    }
                }
                if let Some(sink) = progress {
                    let fraction = (marks.saturating_sub(1) as f64 * 0.025).min(1.0);
                    sink.report(fraction, label);
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| TranscodeError::EngineUnavailable(format!("{}: {}", label, e)))?;

        if output.status.success() {
            if let Some(sink) = progress {
                sink.report(1.0, label);
            }
            Ok(true)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("{} failed with {}: {}", label, output.status, stderr.trim());
            Ok(false)
        }
    }

    /// Build a handle from `gdalinfo` text output
    fn parse_info(
        text: &str,
        path: &Path,
        mode: AccessMode,
        overview_index: u32,
    ) -> TranscodeResult<RasterHandle> {
        let size = SIZE_RE
            .captures(text)
            .ok_or_else(|| TranscodeError::GenericError(format!("No raster size in metadata for {}", path.display())))?;
        let raster_size = (
            size[1].parse::<u64>().unwrap_or(0),
            size[2].parse::<u64>().unwrap_or(0),
        );

        let origin = ORIGIN_RE
            .captures(text)
            .map(|c| (c[1].parse::<f64>().unwrap_or(0.0), c[2].parse::<f64>().unwrap_or(0.0)))
            .unwrap_or((0.0, 0.0));
        let pixel = PIXEL_SIZE_RE
            .captures(text)
            .map(|c| (c[1].parse::<f64>().unwrap_or(1.0), c[2].parse::<f64>().unwrap_or(-1.0)))
            .unwrap_or((1.0, -1.0));

        // The authority id of the dataset CRS is the last EPSG reference
        // in the WKT dump; earlier ones belong to nested components.
        let crs = EPSG_RE
            .captures_iter(text)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .filter_map(|m| m.as_str().parse::<u32>().ok())
            .last()
            .map(|code| match code {
                4326 => CoordinateSystem::WGS84,
                3857 => CoordinateSystem::WebMercator,
                32601..=32660 => CoordinateSystem::UTM((code - 32600) as u8, true),
                32701..=32760 => CoordinateSystem::UTM((code - 32700) as u8, false),
                other => CoordinateSystem::Other(other),
            })
            // Ungeoreferenced input; reprojection requests against it
            // will be rejected when the transform is built.
            .unwrap_or(CoordinateSystem::Other(0));

        let bands: Vec<_> = BAND_RE.captures_iter(text).collect();
        let band_count = bands.len() as u32;
        let band_type = bands
            .first()
            .map(|c| c[2].to_string())
            .unwrap_or_else(|| "Byte".to_string());

        let nodata = NODATA_RE
            .captures(text)
            .and_then(|c| c[1].parse::<f64>().ok());

        let overview_count = OVERVIEWS_RE
            .captures(text)
            .map(|c| c[1].split(',').count() as u32)
            .unwrap_or(0);

        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        Ok(RasterHandle {
            path: path.to_path_buf(),
            mode,
            raster_size,
            band_count,
            band_type,
            geotransform: [origin.0, pixel.0, 0.0, origin.1, 0.0, pixel.1],
            crs,
            nodata,
            overview_count,
            file_size,
            overview_index,
        })
    }
}

impl Default for ShellEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterEngine for ShellEngine {
    fn open(&self, path: &Path, mode: AccessMode, overview_index: Option<u32>)
        -> TranscodeResult<RasterHandle> {
        if !path.is_file() {
            return Err(TranscodeError::SourceNotFound(path.display().to_string()));
        }

        let index = overview_index.unwrap_or(0);
        let mut cmd = self.tool("gdalinfo");
        if index > 0 {
            // GDAL counts overview open-option levels from 0 = first
            // overview, while index 0 here means the base raster.
            cmd.arg("-oo").arg(format!("OVERVIEW_LEVEL={}", index - 1));
        }
        cmd.arg(path);

        let text = self.run_capture(cmd, "gdalinfo")?;
        Self::parse_info(&text, path, mode, index)
    }

    fn transcode(
        &self,
        dst_path: &Path,
        src: &RasterHandle,
        options: &TranscodeOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> TranscodeResult<bool> {
        let target_crs = match options.target_crs {
            Some(crs) if crs != src.crs => Some(crs),
            _ => None,
        };
        let reproject = target_crs.is_some();

        let mut cmd = if reproject {
            self.tool("gdalwarp")
        } else {
            self.tool("gdal_translate")
        };
        for (key, value) in options.config.env_vars() {
            cmd.env(key, value);
        }

        if src.overview_index > 0 {
            cmd.arg("-oo").arg(format!("OVERVIEW_LEVEL={}", src.overview_index - 1));
        }

        cmd.args(["-of", if options.cloud_optimized { "COG" } else { "GTiff" }]);
        cmd.args(["-r", options.resampling.name()]);

        if let Setting::Value(compression) = &options.compression {
            cmd.arg("-co").arg(format!("COMPRESS={}", compression));
        }
        if let Setting::Value(nodata) = options.nodata {
            cmd.arg(if reproject { "-dstnodata" } else { "-a_nodata" })
                .arg(nodata.to_string());
        }
        if let Setting::Value((res_x, res_y)) = options.resolution {
            cmd.arg("-tr")
                .arg(res_x.abs().to_string())
                .arg(res_y.abs().to_string());
        }
        if let Some(extent) = options.extent {
            if reproject {
                cmd.arg("-te")
                    .arg(extent.min_x().to_string())
                    .arg(extent.min_y().to_string())
                    .arg(extent.max_x().to_string())
                    .arg(extent.max_y().to_string());
            } else {
                // Window corners, upper-left then lower-right
                cmd.arg("-projwin")
                    .arg(extent.min_x().to_string())
                    .arg(extent.max_y().to_string())
                    .arg(extent.max_x().to_string())
                    .arg(extent.min_y().to_string());
            }
        }
        if let Some(crs) = target_crs {
            cmd.arg("-t_srs").arg(format!("EPSG:{}", crs.epsg_code()));
            cmd.arg("-overwrite");
        }

        cmd.arg(&src.path);
        cmd.arg(dst_path);

        self.run_with_progress(cmd, if reproject { "gdalwarp" } else { "gdal_translate" }, progress)
    }

    fn build_overviews(
        &self,
        handle: &RasterHandle,
        levels: &[u32],
        resampling: ResamplingAlg,
        external: bool,
        progress: Option<&dyn ProgressSink>,
    ) -> TranscodeResult<bool> {
        if !external && handle.mode != AccessMode::Update {
            return Err(TranscodeError::GenericError(format!(
                "Embedding a pyramid requires update access to {}",
                handle.path.display()
            )));
        }

        let mut cmd = self.tool("gdaladdo");
        cmd.args(["-r", resampling.name()]);
        if external {
            cmd.arg("-ro");
        }
        cmd.arg(&handle.path);
        for level in levels {
            cmd.arg(level.to_string());
        }

        self.run_with_progress(cmd, "gdaladdo", progress)
    }

    fn describe(&self, handle: &RasterHandle) -> TranscodeResult<String> {
        let mut cmd = self.tool("gdalinfo");
        cmd.arg(&handle.path);
        self.run_capture(cmd, "gdalinfo")
    }

    fn build_virtual_mosaic(
        &self,
        paths: &[PathBuf],
        options: &MosaicOptions,
    ) -> TranscodeResult<RasterHandle> {
        let first = paths
            .first()
            .ok_or_else(|| TranscodeError::GenericError("Mosaic needs at least one input".to_string()))?;
        let mosaic_path = options
            .mosaic_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.vrt", first.display())));

        let mut cmd = self.tool("gdalbuildvrt");
        for (key, value) in options.config.env_vars() {
            cmd.env(key, value);
        }
        if let Setting::Value((res_x, res_y)) = options.resolution {
            cmd.args(["-resolution", "user"]);
            cmd.arg("-tr")
                .arg(res_x.abs().to_string())
                .arg(res_y.abs().to_string());
        }
        if let Setting::Value(nodata) = options.nodata {
            cmd.arg("-vrtnodata").arg(nodata.to_string());
        }
        cmd.arg(&mosaic_path);
        for path in paths {
            cmd.arg(path);
        }

        if !self.run_with_progress(cmd, "gdalbuildvrt", None)? {
            return Err(TranscodeError::GenericError(format!(
                "Failed to assemble virtual mosaic at {}",
                mosaic_path.display()
            )));
        }
        self.open(&mosaic_path, AccessMode::Read, None)
    }
}
