//! Metadata and run-log sidecars
//!
//! Every successful top-level build leaves two auxiliary files next to
//! the primary output: an engine metadata dump and a run log capturing
//! the resolved parameters and orchestrator version, so any output file
//! can be traced back to the request that made it.

use std::fs;
use std::path::Path;

use log::warn;

use crate::engine::{AccessMode, RasterEngine, Setting};
use crate::planner::naming;
use crate::planner::policy::BuildPolicy;
use crate::planner::request::{Source, TranscodeRequest};
use crate::planner::BuildLedger;

/// Write the .info and run-log sidecars for a produced output
///
/// Sidecar trouble never fails a build that already succeeded; problems
/// are logged and the affected sidecar is skipped. Existing sidecars are
/// kept untouched when the run is not overwriting, so an idempotent
/// rerun stays free of engine work.
pub fn write_sidecars<E: RasterEngine>(
    engine: &E,
    policy: &BuildPolicy,
    request: &TranscodeRequest,
    primary: &Path,
    ledger: &mut BuildLedger,
) {
    let info_path = naming::sidecar_path(primary, &policy.info_suffix);
    if info_path.exists() && request.existing_target == crate::planner::ExistingTargetPolicy::Skip {
        ledger.record_auxiliary(&info_path);
    } else {
        match engine
            .open(primary, AccessMode::Read, None)
            .and_then(|handle| engine.describe(&handle))
        {
            Ok(text) => match fs::write(&info_path, text) {
                Ok(()) => ledger.record_auxiliary(&info_path),
                Err(e) => warn!("Could not write {}: {}", info_path.display(), e),
            },
            Err(e) => warn!("Could not describe {}: {}", primary.display(), e),
        }
    }

    let log_path = naming::sidecar_path(primary, &policy.run_log_suffix);
    if log_path.exists() && request.existing_target == crate::planner::ExistingTargetPolicy::Skip {
        ledger.record_auxiliary(&log_path);
        return;
    }
    match fs::write(&log_path, render_run_log(request, primary)) {
        Ok(()) => ledger.record_auxiliary(&log_path),
        Err(e) => warn!("Could not write {}: {}", log_path.display(), e),
    }
}

/// Render the resolved request as a reproducible run log
fn render_run_log(request: &TranscodeRequest, primary: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "produced_by = \"{} {}\"\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    out.push_str(&format!("output = \"{}\"\n", primary.display()));

    match &request.source {
        Source::Path(path) => out.push_str(&format!("source = \"{}\"\n", path.display())),
        Source::Mosaic(paths) => {
            let joined: Vec<String> = paths.iter().map(|p| format!("\"{}\"", p.display())).collect();
            out.push_str(&format!("source = [{}]\n", joined.join(", ")));
        }
    }

    if let Some(crs) = request.target_crs {
        out.push_str(&format!("target_crs = \"EPSG:{}\"\n", crs.epsg_code()));
    }
    if let Some(crop) = &request.crop {
        out.push_str(&format!(
            "crop = [{}, {}, {}, {}] # EPSG:{}\n",
            crop.rect.min_x(),
            crop.rect.min_y(),
            crop.rect.max_x(),
            crop.rect.max_y(),
            crop.crs.epsg_code()
        ));
    }
    if let Setting::Value((res_x, res_y)) = request.resolution {
        out.push_str(&format!("resolution = [{}, {}]\n", res_x, res_y));
    }
    out.push_str(&format!("resampling = \"{}\"\n", request.resampling.name()));
    if let Setting::Value(compression) = &request.compression {
        out.push_str(&format!("compression = \"{}\"\n", compression));
    }
    if let Setting::Value(nodata) = request.nodata {
        out.push_str(&format!("nodata = {}\n", nodata));
    }
    out.push_str(&format!("overview_plan = \"{}\"\n", request.overview_plan.name()));
    if let Some(count) = request.dst_ovr_count {
        out.push_str(&format!("dst_ovr_count = {}\n", count));
    }
    if let Some(base) = request.base_overview_index {
        out.push_str(&format!("base_overview_index = {}\n", base));
    }
    out.push_str(&format!("cloud_optimized = {}\n", request.cloud_optimized));
    out.push_str(&format!("existing_target = \"{}\"\n", request.existing_target.name()));
    out
}
