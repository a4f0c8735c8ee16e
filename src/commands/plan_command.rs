//! Plan inspection command
//!
//! The default CLI action: resolve the request exactly as a build would
//! and print the decisions without invoking any build work.

use clap::ArgMatches;
use log::info;

use crate::api::PyramidKit;
use crate::commands::command_traits::Command;
use crate::commands::request_from_args;
use crate::errors::TranscodeResult;
use crate::planner::policy::BuildPolicy;
use crate::planner::request::TranscodeRequest;
use crate::utils::logger::Logger;

/// Command printing the resolved plan for a request
pub struct PlanCommand<'a> {
    /// The parsed request to plan
    request: TranscodeRequest,
    /// Policy override file, if given
    policy_file: Option<String>,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> PlanCommand<'a> {
    /// Create a new plan command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Logger for recording operations
    ///
    /// # Returns
    /// A new PlanCommand instance or an error
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> TranscodeResult<Self> {
        Ok(PlanCommand {
            request: request_from_args(args)?,
            policy_file: args.get_one::<String>("policy").cloned(),
            logger,
        })
    }
}

impl<'a> Command for PlanCommand<'a> {
    fn execute(&self) -> TranscodeResult<()> {
        let mut kit = PyramidKit::new(None)?;
        if let Some(path) = &self.policy_file {
            kit = kit.with_policy(BuildPolicy::from_file(path)?);
        }

        info!("Planning only, no build work will run");
        let report = kit.plan(&self.request)?;
        println!("{}", report);
        self.logger.log("Plan rendered")?;
        Ok(())
    }
}
