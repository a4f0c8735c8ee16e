use std::path::{Path, PathBuf};

use log::info;

use crate::engine::{AccessMode, RasterEngine, ShellEngine};
use crate::errors::{TranscodeError, TranscodeResult};
use crate::orchestrator::{BuildOutcome, TranscodeOrchestrator};
use crate::planner::overview_plan::OverviewPlan;
use crate::planner::policy::{BuildPolicy, DEFAULT_POLICY};
use crate::planner::request::TranscodeRequest;
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;

/// Main interface to the PyramidKit library
pub struct PyramidKit {
    logger: Logger,
    policy: BuildPolicy,
    engine: ShellEngine,
}

impl PyramidKit {
    /// Create a new PyramidKit instance
    ///
    /// # Arguments
    /// * `log_file` - Optional path to log file, defaults to "pyramidkit.log"
    ///
    /// # Returns
    /// A PyramidKit instance or an error if initialization fails
    pub fn new(log_file: Option<&str>) -> TranscodeResult<Self> {
        let log_path = log_file.unwrap_or("pyramidkit.log");
        let logger = Logger::new(log_path)?;
        Ok(PyramidKit {
            logger,
            policy: DEFAULT_POLICY.clone(),
            engine: ShellEngine::new(),
        })
    }

    /// Replace the planning policy, e.g. from a TOML override file
    pub fn with_policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Describe what a request would do without running any build work
    ///
    /// # Arguments
    /// * `request` - The request to plan
    ///
    /// # Returns
    /// Human-readable report of the resolved plan
    pub fn plan(&self, request: &TranscodeRequest) -> TranscodeResult<String> {
        let orchestrator = TranscodeOrchestrator::new(&self.engine, &self.policy);
        orchestrator.plan_summary(request)
    }

    /// Run a transcode request to completion
    ///
    /// # Arguments
    /// * `request` - The request to execute
    /// * `show_progress` - Display a progress bar while the engine works
    ///
    /// # Returns
    /// The outcome with the produced file sets
    pub fn transcode(&self, request: &TranscodeRequest, show_progress: bool) -> TranscodeResult<BuildOutcome> {
        let outcome = if show_progress {
            let tracker = ProgressTracker::new("Transcoding");
            let orchestrator = TranscodeOrchestrator::new(&self.engine, &self.policy)
                .with_progress(&tracker);
            let outcome = orchestrator.run(request)?;
            tracker.finish();
            outcome
        } else {
            TranscodeOrchestrator::new(&self.engine, &self.policy).run(request)?
        };

        self.logger.log(&format!(
            "Build {}: {} final, {} overview, {} auxiliary, {} temporary file(s)",
            if outcome.success { "succeeded" } else { "failed" },
            outcome.ledger.final_files.len(),
            outcome.ledger.overview_files.len(),
            outcome.ledger.auxiliary_files.len(),
            outcome.ledger.temporary_files.len()
        ))?;
        Ok(outcome)
    }

    /// Build an overview pyramid for an existing raster
    ///
    /// # Arguments
    /// * `input_path` - Raster to build the pyramid for
    /// * `plan` - Overview strategy; automatic variants are resolved
    /// * `count` - Level count; negative reuses the last N source levels
    ///
    /// # Returns
    /// The outcome with the produced file sets
    pub fn build_pyramid(
        &self,
        input_path: &str,
        plan: OverviewPlan,
        count: Option<i32>,
    ) -> TranscodeResult<BuildOutcome> {
        info!("Building pyramid for {}", input_path);

        if matches!(plan, OverviewPlan::ExistingReuse | OverviewPlan::NoOverviews) {
            return Err(TranscodeError::GenericError(
                "Pyramid build needs a creation strategy (single, multi or internal)".to_string(),
            ));
        }

        let mut request = TranscodeRequest::new(PathBuf::from(input_path));
        request.output = Some(PathBuf::from(input_path));
        request.overview_plan = plan;
        request.dst_ovr_count = count;
        request.write_sidecars = false;

        let orchestrator = TranscodeOrchestrator::new(&self.engine, &self.policy);
        let src = self.engine.open(Path::new(input_path), AccessMode::Read, None)?;
        let mut ledger = crate::planner::BuildLedger::new();
        ledger.record_final(&src.path);

        orchestrator.create_fresh_overviews(
            &request,
            match plan {
                OverviewPlan::AutoSelect | OverviewPlan::CreateExternalAuto => {
                    let planner = crate::planner::OverviewPlanner::new(&self.policy);
                    planner
                        .resolve(
                            OverviewPlan::CreateExternalAuto,
                            &crate::planner::PlanContext {
                                existing_overview_count: src.overview_count,
                                base_overview_index: None,
                                cloud_optimized: false,
                                source_file_size: src.file_size,
                                nontrivial_transform: false,
                            },
                        )
                        .plan
                }
                concrete => concrete,
            },
            &src.path,
            &mut ledger,
        )?;

        let success = ledger.finalize();
        Ok(BuildOutcome {
            success,
            primary: Some(src.path),
            ledger,
        })
    }

    /// Read and return a raster's metadata dump
    ///
    /// # Arguments
    /// * `input_path` - Path to the raster to inspect
    ///
    /// # Returns
    /// String containing the engine's metadata description
    pub fn info(&self, input_path: &str) -> TranscodeResult<String> {
        let handle = self.engine.open(Path::new(input_path), AccessMode::Read, None)?;
        self.engine.describe(&handle)
    }
}
