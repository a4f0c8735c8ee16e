//! Pyramid-only command
//!
//! Builds an overview pyramid for a raster that already exists, without
//! any transcode of the base imagery.

use clap::ArgMatches;
use log::info;

use crate::api::PyramidKit;
use crate::commands::command_traits::Command;
use crate::errors::{TranscodeError, TranscodeResult};
use crate::planner::overview_plan::OverviewPlan;
use crate::planner::policy::BuildPolicy;
use crate::utils::logger::Logger;

/// Command for building a pyramid on an existing raster
pub struct PyramidCommand<'a> {
    /// Raster to build the pyramid for
    input_file: String,
    /// Overview strategy
    plan: OverviewPlan,
    /// Level count
    count: Option<i32>,
    /// Policy override file, if given
    policy_file: Option<String>,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> PyramidCommand<'a> {
    /// Create a new pyramid command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Logger for recording operations
    ///
    /// # Returns
    /// A new PyramidCommand instance or an error
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> TranscodeResult<Self> {
        let input_file = args
            .get_many::<String>("input")
            .and_then(|mut v| v.next())
            .ok_or_else(|| TranscodeError::GenericError("Missing input file".to_string()))?
            .clone();

        let plan = match args.get_one::<String>("overviews") {
            Some(name) => OverviewPlan::from_name(name)?,
            None => OverviewPlan::CreateExternalAuto,
        };

        let count = match args.get_one::<String>("ovr-count") {
            Some(text) => Some(text.parse::<i32>().map_err(|_| {
                TranscodeError::GenericError(format!("Invalid overview count: {}", text))
            })?),
            None => None,
        };

        Ok(PyramidCommand {
            input_file,
            plan,
            count,
            policy_file: args.get_one::<String>("policy").cloned(),
            logger,
        })
    }
}

impl<'a> Command for PyramidCommand<'a> {
    fn execute(&self) -> TranscodeResult<()> {
        let mut kit = PyramidKit::new(None)?;
        if let Some(path) = &self.policy_file {
            kit = kit.with_policy(BuildPolicy::from_file(path)?);
        }

        let outcome = kit.build_pyramid(&self.input_file, self.plan, self.count)?;
        for path in &outcome.ledger.overview_files {
            info!("Overview: {}", path.display());
        }

        if !outcome.success {
            return Err(TranscodeError::GenericError("Pyramid build did not complete".to_string()));
        }

        info!("Pyramid build successful");
        self.logger.log("Pyramid build successful")?;
        Ok(())
    }
}
