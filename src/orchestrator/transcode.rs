//! The recursive transcode driver

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::engine::{
    AccessMode, MosaicOptions, ProgressSink, RasterEngine, RasterHandle, Setting, TranscodeOptions,
};
use crate::errors::{TranscodeError, TranscodeResult};
use crate::geometry::{
    CoordinateSystem, CrsTransform, Extent, ExtentTransformer, Point, Rectangle, ResolutionEstimator,
};
use crate::planner::naming;
use crate::planner::overview_plan::{CogMode, OverviewPlan, OverviewPlanner, PlanContext, ResolvedPlan};
use crate::planner::policy::BuildPolicy;
use crate::planner::request::{ExistingTargetPolicy, Source, TranscodeRequest};
use crate::planner::BuildLedger;

use super::sidecars;

/// Result of one orchestration run
#[derive(Debug)]
pub struct BuildOutcome {
    /// Whether every planned output was produced and verified
    pub success: bool,
    /// The primary output path, when the run got that far
    pub primary: Option<PathBuf>,
    /// Everything the run produced or touched
    pub ledger: BuildLedger,
}

/// Geometry of a request after planning
///
/// Everything the engine needs to know about the output shape, computed
/// once per call so recursion and naming agree on the same numbers.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedGeometry {
    /// Target coordinate system when it differs from the source
    pub(crate) target_crs: Option<CoordinateSystem>,
    /// Output window in the target system; None keeps the source extent
    pub(crate) extent: Option<Rectangle>,
    /// Output resolution, concrete when explicit or estimated
    pub(crate) resolution: Setting<(f64, f64)>,
    /// Whether a crop window restricted the output
    pub(crate) cropped: bool,
    /// Whether any crop, reprojection or resample happens at all
    pub(crate) nontrivial: bool,
}

/// Drives engine invocations for one request tree
pub struct TranscodeOrchestrator<'a, E: RasterEngine> {
    pub(crate) engine: &'a E,
    pub(crate) policy: &'a BuildPolicy,
    pub(crate) progress: Option<&'a dyn ProgressSink>,
}

impl<'a, E: RasterEngine> TranscodeOrchestrator<'a, E> {
    /// Create an orchestrator over an engine and a policy
    pub fn new(engine: &'a E, policy: &'a BuildPolicy) -> Self {
        TranscodeOrchestrator { engine, policy, progress: None }
    }

    /// Attach a progress sink forwarded into every engine operation
    pub fn with_progress(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Run a request tree to completion
    ///
    /// Fatal planning conditions surface as `Err`. An engine operation
    /// reporting failure does not; the run completes what it can and
    /// comes back with `success == false` and the partial ledger intact
    /// for diagnosis.
    pub fn run(&self, request: &TranscodeRequest) -> TranscodeResult<BuildOutcome> {
        let mut ledger = BuildLedger::new();
        let primary = self.execute(request, &mut ledger, 0)?;

        if request.write_sidecars {
            if let Some(path) = &primary {
                sidecars::write_sidecars(self.engine, self.policy, request, path, &mut ledger);
            }
        }

        let verified = ledger.finalize();
        let success = primary.is_some() && verified;
        Ok(BuildOutcome { success, primary, ledger })
    }

    /// Describe what a request would do, without any build work
    ///
    /// Opens the source read-only, fixes geometry and collapses the
    /// overview plan exactly as `run` would, then renders the decisions
    /// as a report instead of acting on them.
    pub fn plan_summary(&self, request: &TranscodeRequest) -> TranscodeResult<String> {
        let mut scratch = BuildLedger::new();
        let src = self.open_source(request, &mut scratch)?;
        let geometry = self.resolve_geometry(request, &src)?;
        self.validate(request, &src, &geometry)?;
        let primary = self.resolve_output_path(request, &src, &geometry)?;

        let planner = OverviewPlanner::new(self.policy);
        let resolved = planner.resolve(
            request.overview_plan,
            &PlanContext {
                existing_overview_count: src.overview_count,
                base_overview_index: request.base_overview_index,
                cloud_optimized: request.cloud_optimized,
                source_file_size: src.file_size,
                nontrivial_transform: geometry.nontrivial,
            },
        );

        let mut report = String::new();
        report.push_str(&format!("Source: {}\n", src.path.display()));
        report.push_str(&format!("  Size: {}x{} pixels, {} band(s) of {}\n",
                                 src.raster_size.0, src.raster_size.1,
                                 src.band_count, src.band_type));
        report.push_str(&format!("  Coordinate system: {}\n", src.crs.description()));
        report.push_str(&format!("  Existing overview levels: {}\n", src.overview_count));

        report.push_str(&format!("Output: {}\n", primary.display()));
        if let Some(crs) = geometry.target_crs {
            report.push_str(&format!("  Reproject to: {}\n", crs.description()));
        }
        if let Some(extent) = geometry.extent {
            report.push_str(&format!("  Window: {} {} {} {}\n",
                                     extent.min_x(), extent.min_y(),
                                     extent.max_x(), extent.max_y()));
            if let Setting::Value(res) = geometry.resolution {
                let (cols, rows) = extent.to_pixel_grid(res);
                report.push_str(&format!("  Output grid: {}x{} pixels\n", cols, rows));
            }
        }
        if let Setting::Value((res_x, res_y)) = geometry.resolution {
            report.push_str(&format!("  Resolution: {} x {}\n", res_x, res_y));
        }
        report.push_str(&format!("  Overview strategy: {} (base level {})\n",
                                 resolved.plan.name(), resolved.base_index));
        match resolved.cog_mode {
            Some(CogMode::SinglePass) => {
                report.push_str("  Cloud-optimized: single pass\n");
            }
            Some(CogMode::TwoPhase) => {
                report.push_str(&format!(
                    "  Cloud-optimized: two phases via {}\n",
                    naming::temp_path(&primary, &self.policy.temp_suffix).display()
                ));
            }
            None => {}
        }
        if let Some(n) = request.split {
            report.push_str(&format!("  Split into {}x{} grid\n", n, n));
        }
        Ok(report)
    }

    /// Execute one call of the recursion tree
    ///
    /// Returns the call's primary output path, or None when the engine
    /// reported failure for it.
    pub(crate) fn execute(
        &self,
        request: &TranscodeRequest,
        ledger: &mut BuildLedger,
        depth: usize,
    ) -> TranscodeResult<Option<PathBuf>> {
        debug!("Executing request at depth {}", depth);

        // An explicit target that already exists short-circuits the whole
        // call before any engine work, source access included.
        if let Some(output) = &request.output {
            if let Some(kept) = self.check_existing_target(request, output, ledger)? {
                return Ok(Some(kept));
            }
        }

        let src = self.open_source(request, ledger)?;
        let geometry = self.resolve_geometry(request, &src)?;
        self.validate(request, &src, &geometry)?;

        let primary = self.resolve_output_path(request, &src, &geometry)?;
        if request.output.is_none() {
            if let Some(kept) = self.check_existing_target(request, &primary, ledger)? {
                return Ok(Some(kept));
            }
        }

        if let Some(n) = request.split {
            return self.execute_split(request, &geometry, &src, &primary, n, ledger, depth);
        }

        let planner = OverviewPlanner::new(self.policy);
        let resolved = planner.resolve(
            request.overview_plan,
            &PlanContext {
                existing_overview_count: src.overview_count,
                base_overview_index: request.base_overview_index,
                cloud_optimized: request.cloud_optimized,
                source_file_size: src.file_size,
                nontrivial_transform: geometry.nontrivial,
            },
        );

        if request.cloud_optimized {
            return match resolved.cog_mode {
                Some(CogMode::TwoPhase) => {
                    self.build_cog_two_phase(request, &resolved, &primary, ledger, depth)
                }
                _ => self.transcode_single(request, &src, &geometry, &primary, true, ledger),
            };
        }

        match resolved.plan {
            OverviewPlan::ExistingReuse => {
                self.reuse_existing_levels(request, &src, &geometry, &resolved, &primary, ledger, depth)
            }
            OverviewPlan::NoOverviews => {
                self.transcode_single(request, &src, &geometry, &primary, false, ledger)
            }
            plan => {
                let result = self.transcode_single(request, &src, &geometry, &primary, false, ledger)?;
                if result.is_some() {
                    self.create_fresh_overviews(request, plan, &primary, ledger)?;
                }
                Ok(result)
            }
        }
    }

    /// Apply the existing-target policy to a path that is already there
    ///
    /// Returns `Some(path)` when the call should stop and keep the file.
    fn check_existing_target(
        &self,
        request: &TranscodeRequest,
        target: &Path,
        ledger: &mut BuildLedger,
    ) -> TranscodeResult<Option<PathBuf>> {
        if !target.exists() {
            return Ok(None);
        }
        match request.existing_target {
            ExistingTargetPolicy::Skip => {
                info!("Target {} already exists, keeping it", target.display());
                ledger.record_final(target);
                Ok(Some(target.to_path_buf()))
            }
            ExistingTargetPolicy::Fail => {
                Err(TranscodeError::TargetExists(target.display().to_string()))
            }
            ExistingTargetPolicy::Overwrite => Ok(None),
        }
    }

    /// Open the request's source as a single raster handle
    fn open_source(
        &self,
        request: &TranscodeRequest,
        ledger: &mut BuildLedger,
    ) -> TranscodeResult<RasterHandle> {
        match &request.source {
            Source::Path(path) => {
                if path.is_dir() {
                    return Err(TranscodeError::SourceNotFound(format!(
                        "{} is a directory",
                        path.display()
                    )));
                }
                self.engine.open(path, AccessMode::Read, request.source_overview)
            }
            Source::Mosaic(paths) => {
                let options = MosaicOptions {
                    nodata: request.nodata,
                    ..MosaicOptions::default()
                };
                let handle = self.engine.build_virtual_mosaic(paths, &options)?;
                // The mosaic definition is scaffolding, not a product
                ledger.record_temporary(&handle.path);
                Ok(handle)
            }
        }
    }

    /// Fix the output geometry for this call
    fn resolve_geometry(
        &self,
        request: &TranscodeRequest,
        src: &RasterHandle,
    ) -> TranscodeResult<ResolvedGeometry> {
        let reproject = match request.target_crs {
            Some(crs) if crs != src.crs => Some(crs),
            _ => None,
        };
        let target = reproject.unwrap_or(src.crs);
        let transformer = ExtentTransformer::new(self.policy.sample_count);
        let src_rect = src.extent();

        // Source coverage expressed in the target system
        let coverage = if let Some(target_crs) = reproject {
            let transform = CrsTransform::between(src.crs, target_crs)?;
            let mapped = transformer.transform(&src_rect, &transform);
            if mapped.is_empty() {
                return Err(TranscodeError::EmptyExtent(format!(
                    "{} has no coverage in {}",
                    src.path.display(),
                    target_crs.description()
                )));
            }
            mapped
        } else {
            src_rect
        };

        let mut extent = None;
        let mut cropped = false;
        if let Some(crop) = &request.crop {
            let crop_rect = if crop.crs != target {
                let transform = CrsTransform::between(crop.crs, target)?;
                let mapped = transformer.transform(&crop.rect, &transform);
                if mapped.is_empty() {
                    return Err(TranscodeError::EmptyExtent(
                        "crop window has no coverage in the target system".to_string(),
                    ));
                }
                mapped
            } else {
                crop.rect
            };

            let clipped = crop_rect.intersect(&coverage);
            if clipped.is_empty() {
                return Err(TranscodeError::EmptyExtent(format!(
                    "crop window does not overlap {}",
                    src.path.display()
                )));
            }
            extent = Some(clipped);
            cropped = true;
        } else if reproject.is_some() {
            extent = Some(coverage);
        }

        let resolution = match request.resolution {
            Setting::Value(value) => Setting::Value(value),
            other => {
                if let Some(target_crs) = reproject {
                    let transform = CrsTransform::between(src.crs, target_crs)?;
                    let estimator = ResolutionEstimator::new(
                        self.policy.sample_count,
                        if src.crs.is_geographic() { self.policy.equator_band_samples } else { 0 },
                        self.policy.resolution_digits,
                    );
                    Setting::Value(estimator.estimate(
                        src.resolution(),
                        &transform,
                        &src_rect,
                        request.anisotropic_resolution,
                    ))
                } else {
                    other
                }
            }
        };

        if request.align_to_grid {
            if let (Some(window), Setting::Value(res)) = (extent, &resolution) {
                extent = Some(window.align(Point::new(0.0, 0.0), *res));
            }
        }

        let nontrivial = cropped || reproject.is_some() || request.resolution.is_value();
        Ok(ResolvedGeometry {
            target_crs: reproject,
            extent,
            resolution,
            cropped,
            nontrivial,
        })
    }

    /// Reject parameter combinations that would silently corrupt output
    fn validate(
        &self,
        request: &TranscodeRequest,
        src: &RasterHandle,
        geometry: &ResolvedGeometry,
    ) -> TranscodeResult<()> {
        if geometry.target_crs.is_some() && src.band_count == 4 {
            if let Some(compression) = request.compression.value() {
                if compression.to_uppercase().contains("JPEG") {
                    return Err(TranscodeError::UnsupportedCombination(format!(
                        "reprojecting 4-band {} with {} compression would drop the alpha band",
                        src.path.display(),
                        compression
                    )));
                }
            }
        }
        Ok(())
    }

    /// Final output path for this call
    fn resolve_output_path(
        &self,
        request: &TranscodeRequest,
        src: &RasterHandle,
        geometry: &ResolvedGeometry,
    ) -> TranscodeResult<PathBuf> {
        if let Some(output) = &request.output {
            return Ok(output.clone());
        }

        let source_path = request
            .source
            .primary_path()
            .cloned()
            .unwrap_or_else(|| src.path.clone());
        let dir = request
            .output_dir
            .clone()
            .or_else(|| source_path.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        let name = naming::derive_output_name(
            &source_path,
            &naming::NameParams {
                target_crs: geometry.target_crs,
                resolution: &geometry.resolution,
                cropped: geometry.cropped,
                cloud_optimized: request.cloud_optimized,
            },
        );
        Ok(dir.join(name))
    }

    /// One engine transcode producing one file
    pub(crate) fn transcode_single(
        &self,
        request: &TranscodeRequest,
        src: &RasterHandle,
        geometry: &ResolvedGeometry,
        dst: &Path,
        cloud_optimized: bool,
        ledger: &mut BuildLedger,
    ) -> TranscodeResult<Option<PathBuf>> {
        if let Some(kept) = self.check_existing_target(request, dst, ledger)? {
            return Ok(Some(kept));
        }

        let options = TranscodeOptions {
            extent: geometry.extent,
            target_crs: geometry.target_crs,
            resolution: geometry.resolution,
            resampling: request.resampling,
            compression: request.compression.clone(),
            nodata: request.nodata,
            cloud_optimized,
            config: request.engine_config.clone(),
        };

        info!(
            "Transcoding {} -> {}{}",
            src.path.display(),
            dst.display(),
            if cloud_optimized { " (cloud-optimized)" } else { "" }
        );

        if self.engine.transcode(dst, src, &options, self.progress)? {
            ledger.record_final(dst);
            Ok(Some(dst.to_path_buf()))
        } else {
            warn!("Engine did not produce {}", dst.display());
            Ok(None)
        }
    }

    /// Two-phase cloud-optimized build
    ///
    /// Phase 1 runs the ordinary (possibly reprojected and cropped)
    /// build into an intermediate next to the final path and gives it
    /// the pyramid the resolved plan calls for. Phase 2 re-enters the
    /// orchestration with that intermediate as a geometry-identity
    /// source, which collapses to a single repackaging pass into the
    /// true final path. Everything phase 1 made is an intermediate of
    /// this run and gets cleaned up only at top level.
    pub(crate) fn build_cog_two_phase(
        &self,
        request: &TranscodeRequest,
        resolved: &ResolvedPlan,
        primary: &Path,
        ledger: &mut BuildLedger,
        depth: usize,
    ) -> TranscodeResult<Option<PathBuf>> {
        let intermediate = naming::temp_path(primary, &self.policy.temp_suffix);
        info!(
            "Two-phase cloud-optimized build via {}",
            intermediate.display()
        );

        let phase1 = request
            .rebuild()
            .output(intermediate.clone())
            .cloud_optimized(false)
            .overview_plan(resolved.plan)
            .base_overview_index(Some(resolved.base_index))
            .write_sidecars(false)
            .build();

        let mut phase1_ledger = BuildLedger::new();
        let phase1_result = self.execute(&phase1, &mut phase1_ledger, depth + 1)?;
        ledger.merge_as_temporary(phase1_ledger);

        if phase1_result.is_none() {
            warn!("First build phase produced nothing, skipping repackage");
            return Ok(None);
        }

        let phase2 = request
            .rebuild()
            .source(intermediate)
            .source_overview(None)
            .output(primary.to_path_buf())
            .crop(None)
            .target_crs(None)
            .resolution(Setting::Unset)
            .overview_plan(OverviewPlan::ExistingReuse)
            .base_overview_index(Some(0))
            .dst_ovr_count(None)
            .cloud_optimized(true)
            .write_sidecars(false)
            .build();

        let mut phase2_ledger = BuildLedger::new();
        let result = self.execute(&phase2, &mut phase2_ledger, depth + 1)?;
        if phase2_ledger.final_files.len() != 1 {
            error!(
                "Repackage phase yielded {} final file(s) instead of one",
                phase2_ledger.final_files.len()
            );
        }
        ledger.merge(phase2_ledger);
        Ok(result)
    }

    /// Fan the request out over an n x n grid of crop windows
    #[allow(clippy::too_many_arguments)]
    fn execute_split(
        &self,
        request: &TranscodeRequest,
        geometry: &ResolvedGeometry,
        src: &RasterHandle,
        primary: &Path,
        n: u32,
        ledger: &mut BuildLedger,
        depth: usize,
    ) -> TranscodeResult<Option<PathBuf>> {
        let target = geometry.target_crs.unwrap_or(src.crs);
        let full = geometry.extent.unwrap_or_else(|| src.extent());
        let cells = full.partition(n);
        if cells.is_empty() {
            return Err(TranscodeError::EmptyExtent("nothing to split".to_string()));
        }

        info!("Splitting {} into a {}x{} grid", primary.display(), n, n);

        let mut all_ok = true;
        let mut first: Option<PathBuf> = None;
        for (index, cell) in cells.iter().enumerate() {
            let row = index as u32 / n;
            let col = index as u32 % n;
            let cell_path = naming::partition_path(primary, row, col);

            let child = request
                .rebuild()
                .split(None)
                .crop(Some(Extent::new(target, *cell)))
                .output(cell_path)
                .write_sidecars(false)
                .build();

            let mut child_ledger = BuildLedger::new();
            let result = self.execute(&child, &mut child_ledger, depth + 1)?;
            ledger.merge(child_ledger);

            match result {
                Some(path) => {
                    if first.is_none() {
                        first = Some(path);
                    }
                }
                None => {
                    warn!("Grid cell r{} c{} was not produced", row, col);
                    all_ok = false;
                }
            }
        }

        Ok(if all_ok { first } else { None })
    }
}
