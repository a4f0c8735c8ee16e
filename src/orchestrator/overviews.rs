//! Overview pyramid construction
//!
//! Two very different ways to end up with a pyramid: re-transcoding the
//! levels a source already has (one engine pass per level, coarsest
//! first), or asking the engine to generate fresh levels for a finished
//! output (embedded, one combined sidecar, or a chain of sidecars for
//! sources too large for a single combined file).

use std::path::Path;

use log::{error, info, warn};

use crate::engine::{AccessMode, RasterEngine, Setting};
use crate::errors::TranscodeResult;
use crate::planner::naming;
use crate::planner::overview_plan::{resolve_base_and_count, OverviewPlan, ResolvedPlan};
use crate::planner::request::TranscodeRequest;
use crate::planner::BuildLedger;

use super::transcode::{ResolvedGeometry, TranscodeOrchestrator};

impl<'a, E: RasterEngine> TranscodeOrchestrator<'a, E> {
    /// Rebuild a pyramid by re-transcoding the source's existing levels
    ///
    /// Levels run from the coarsest required down to the base. Each level
    /// is one recursive call that must yield exactly one final file; a
    /// level that yields zero or several is a consistency error, logged
    /// and skipped while its siblings still run. The base level routes
    /// to the final ledger, everything coarser to the overview ledger.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn reuse_existing_levels(
        &self,
        request: &TranscodeRequest,
        src: &crate::engine::RasterHandle,
        geometry: &ResolvedGeometry,
        resolved: &ResolvedPlan,
        primary: &Path,
        ledger: &mut BuildLedger,
        depth: usize,
    ) -> TranscodeResult<Option<std::path::PathBuf>> {
        let (base, count) = resolve_base_and_count(
            request.dst_ovr_count,
            src.overview_count,
            Some(resolved.base_index),
        );
        info!(
            "Rebuilding {} pyramid level(s) above base {} from {}",
            count,
            base,
            src.path.display()
        );

        let mut produced_primary = None;
        for offset in (0..=count).rev() {
            let level = base + offset;
            let level_path = naming::overview_chain_path(primary, offset, &self.policy.overview_suffix);

            // Reading level k through the engine already decimates by
            // 2^k, so an explicit base resolution scales along with it.
            let level_resolution = match geometry.resolution {
                Setting::Value((res_x, res_y)) => {
                    let factor = (1u64 << offset) as f64;
                    Setting::Value((res_x * factor, res_y * factor))
                }
                other => other,
            };

            let child = request
                .rebuild()
                .source_overview(if level == 0 { None } else { Some(level) })
                .output(level_path)
                .overview_plan(OverviewPlan::NoOverviews)
                .dst_ovr_count(None)
                .base_overview_index(None)
                .resolution(level_resolution)
                .cloud_optimized(false)
                .split(None)
                .write_sidecars(false)
                .build();

            let mut child_ledger = BuildLedger::new();
            let result = self.execute(&child, &mut child_ledger, depth + 1)?;

            if child_ledger.final_files.len() != 1 {
                error!(
                    "Level {} build yielded {} final file(s) instead of one",
                    level,
                    child_ledger.final_files.len()
                );
            }

            if offset == 0 {
                produced_primary = result;
                ledger.merge(child_ledger);
            } else {
                // Coarser levels are pyramid material, not results
                for file in child_ledger.final_files.drain(..) {
                    ledger.record_overview(&file);
                }
                ledger.merge(child_ledger);
            }
        }

        Ok(produced_primary)
    }

    /// Generate a fresh pyramid for an already-produced output
    pub(crate) fn create_fresh_overviews(
        &self,
        request: &TranscodeRequest,
        plan: OverviewPlan,
        primary: &Path,
        ledger: &mut BuildLedger,
    ) -> TranscodeResult<()> {
        let count = request
            .dst_ovr_count
            .map(|c| c.max(0) as u32)
            .unwrap_or(self.policy.default_overview_count);
        if count == 0 {
            return Ok(());
        }

        let levels: Vec<u32> = (1..=count).map(|i| 2u32.pow(i)).collect();

        match plan {
            OverviewPlan::CreateInternal => {
                info!(
                    "Embedding a {}-level pyramid into {}",
                    levels.len(),
                    primary.display()
                );
                let handle = self.engine.open(primary, AccessMode::Update, None)?;
                if !self
                    .engine
                    .build_overviews(&handle, &levels, request.resampling, false, self.progress)?
                {
                    warn!("Pyramid embedding failed for {}", primary.display());
                }
            }
            OverviewPlan::CreateExternalSingle => {
                info!(
                    "Building a combined {}-level overview file for {}",
                    levels.len(),
                    primary.display()
                );
                let sidecar = naming::sidecar_path(primary, &self.policy.overview_suffix);
                if sidecar.exists() {
                    error!(
                        "Unexpected leftover overview file {}",
                        sidecar.display()
                    );
                }
                let handle = self.engine.open(primary, AccessMode::Read, None)?;
                if self
                    .engine
                    .build_overviews(&handle, &levels, request.resampling, true, self.progress)?
                {
                    if sidecar.exists() {
                        ledger.record_overview(&sidecar);
                    } else {
                        error!(
                            "Overview build reported success but {} is missing",
                            sidecar.display()
                        );
                    }
                } else {
                    warn!("Overview build failed for {}", primary.display());
                }
            }
            OverviewPlan::CreateExternalMulti => {
                info!(
                    "Chaining {} overview file(s) for {}",
                    count,
                    primary.display()
                );
                // One decimation step per file: each sidecar is the
                // factor-2 overview of the previous one, so the chain
                // reaches the same depth as the combined layout without
                // any single file growing unwieldy.
                let mut current = primary.to_path_buf();
                for step in 1..=count {
                    let handle = self.engine.open(&current, AccessMode::Read, None)?;
                    let produced = self
                        .engine
                        .build_overviews(&handle, &[2], request.resampling, true, self.progress)?;
                    let next = naming::sidecar_path(&current, &self.policy.overview_suffix);
                    if !produced || !next.exists() {
                        warn!(
                            "Overview chain for {} stopped after {} level(s)",
                            primary.display(),
                            step - 1
                        );
                        break;
                    }
                    ledger.record_overview(&next);
                    current = next;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
