//! CLI command implementations
//!
//! This module contains implementations of various commands
//! supported by the CLI application using the Command pattern.

pub mod command_traits;
pub mod plan_command;
pub mod transcode_command;
pub mod pyramid_command;

pub use command_traits::{Command, CommandFactory};
pub use plan_command::PlanCommand;
pub use transcode_command::TranscodeCommand;
pub use pyramid_command::PyramidCommand;

use std::path::PathBuf;

use clap::ArgMatches;

use crate::engine::{EngineConfig, ResamplingAlg, Setting};
use crate::errors::{TranscodeError, TranscodeResult};
use crate::geometry::{CoordinateSystemFactory, Extent, Rectangle};
use crate::planner::overview_plan::OverviewPlan;
use crate::planner::request::{ExistingTargetPolicy, Source, TranscodeRequest};
use crate::utils::logger::Logger;

/// Factory for creating command instances based on CLI arguments
///
/// This factory examines the command-line arguments and creates
/// the appropriate command instance for execution.
pub struct PyramidkitCommandFactory;

impl PyramidkitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        PyramidkitCommandFactory
    }
}

impl Default for PyramidkitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for PyramidkitCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> TranscodeResult<Box<dyn Command + 'a>> {
        // Determine which command to run based on args
        if args.get_flag("run") {
            Ok(Box::new(TranscodeCommand::new(args, logger)?))
        } else if args.get_flag("pyramid") {
            Ok(Box::new(PyramidCommand::new(args, logger)?))
        } else {
            // Default to printing the resolved plan
            Ok(Box::new(PlanCommand::new(args, logger)?))
        }
    }
}

/// Parse a bounding box given as "minx,miny,maxx,maxy"
pub fn parse_bbox(bbox_str: &str) -> TranscodeResult<Rectangle> {
    let parts: Vec<&str> = bbox_str.split(',').collect();
    if parts.len() != 4 {
        return Err(TranscodeError::GenericError(
            "Bounding box must have 4 comma-separated values".to_string(),
        ));
    }

    let mut values = [0.0f64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part.trim().parse::<f64>().map_err(|_| {
            TranscodeError::GenericError(format!("Invalid bounding box value: {}", part))
        })?;
    }

    Ok(Rectangle::from_min_max(values[0], values[2], values[1], values[3]))
}

/// Parse a resolution given as "res" or "xres,yres"
pub fn parse_resolution(res_str: &str) -> TranscodeResult<(f64, f64)> {
    let parts: Vec<&str> = res_str.split(',').collect();
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| TranscodeError::GenericError(format!("Invalid resolution value: {}", s)))
    };
    match parts.as_slice() {
        [single] => {
            let value = parse(single)?;
            Ok((value, -value.abs()))
        }
        [x, y] => Ok((parse(x)?, parse(y)?)),
        _ => Err(TranscodeError::GenericError(
            "Resolution must be one value or \"xres,yres\"".to_string(),
        )),
    }
}

/// Build a transcode request from the shared CLI arguments
pub fn request_from_args(args: &ArgMatches) -> TranscodeResult<TranscodeRequest> {
    let inputs: Vec<&String> = args
        .get_many::<String>("input")
        .map(|v| v.collect())
        .unwrap_or_default();
    if inputs.is_empty() {
        return Err(TranscodeError::GenericError("Missing input file".to_string()));
    }

    let mut request = TranscodeRequest::new(PathBuf::from(inputs[0]));
    if inputs.len() > 1 {
        request.source = Source::Mosaic(inputs.iter().map(PathBuf::from).collect());
    }

    if let Some(output) = args.get_one::<String>("output") {
        request.output = Some(PathBuf::from(output));
    }
    if let Some(dir) = args.get_one::<String>("output-dir") {
        request.output_dir = Some(PathBuf::from(dir));
    }

    if let Some(bbox_str) = args.get_one::<String>("bbox") {
        let rect = parse_bbox(bbox_str)?;
        let crs_str = args
            .get_one::<String>("bbox-crs")
            .map(|s| s.as_str())
            .unwrap_or("4326");
        let crs = CoordinateSystemFactory::from_string(crs_str)?;
        request.crop = Some(Extent::new(crs, rect));
    }

    if let Some(crs_str) = args.get_one::<String>("t-srs") {
        request.target_crs = Some(CoordinateSystemFactory::from_string(crs_str)?);
    }

    if let Some(res_str) = args.get_one::<String>("tr") {
        request.resolution = Setting::Value(parse_resolution(res_str)?);
    }
    request.anisotropic_resolution = args.get_flag("anisotropic");

    if let Some(alg) = args.get_one::<String>("resampling") {
        request.resampling = ResamplingAlg::from_name(alg)?;
    }
    if let Some(compression) = args.get_one::<String>("compression") {
        request.compression = Setting::Value(compression.to_uppercase());
    }
    if let Some(nodata) = args.get_one::<String>("nodata") {
        request.nodata = if nodata.eq_ignore_ascii_case("default") {
            Setting::EngineDefault
        } else {
            Setting::Value(nodata.parse::<f64>().map_err(|_| {
                TranscodeError::GenericError(format!("Invalid nodata value: {}", nodata))
            })?)
        };
    }

    if let Some(plan) = args.get_one::<String>("overviews") {
        request.overview_plan = OverviewPlan::from_name(plan)?;
    }
    if let Some(count) = args.get_one::<String>("ovr-count") {
        request.dst_ovr_count = Some(count.parse::<i32>().map_err(|_| {
            TranscodeError::GenericError(format!("Invalid overview count: {}", count))
        })?);
    }
    if let Some(base) = args.get_one::<String>("base-level") {
        request.base_overview_index = Some(base.parse::<u32>().map_err(|_| {
            TranscodeError::GenericError(format!("Invalid base level: {}", base))
        })?);
    }

    request.cloud_optimized = args.get_flag("cog");
    request.align_to_grid = args.get_flag("align");
    request.write_sidecars = !args.get_flag("no-sidecars");

    if let Some(policy) = args.get_one::<String>("if-exists") {
        request.existing_target = ExistingTargetPolicy::from_name(policy)?;
    }
    if args.get_flag("overwrite") {
        request.existing_target = ExistingTargetPolicy::Overwrite;
    }

    if let Some(split) = args.get_one::<String>("split") {
        let n = split.parse::<u32>().map_err(|_| {
            TranscodeError::GenericError(format!("Invalid split factor: {}", split))
        })?;
        if n == 0 {
            return Err(TranscodeError::GenericError("Split factor must be at least 1".to_string()));
        }
        request.split = Some(n);
    }

    let mut config = EngineConfig::default();
    if let Some(threads) = args.get_one::<String>("threads") {
        config.num_threads = Some(threads.parse::<u32>().map_err(|_| {
            TranscodeError::GenericError(format!("Invalid thread count: {}", threads))
        })?);
    }
    if let Some(cache) = args.get_one::<String>("cache-mb") {
        config.cache_max_mb = Some(cache.parse::<u32>().map_err(|_| {
            TranscodeError::GenericError(format!("Invalid cache size: {}", cache))
        })?);
    }
    request.engine_config = config;

    Ok(request)
}
