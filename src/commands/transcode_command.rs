//! Transcode execution command
//!
//! This module implements the command that actually runs a build:
//! single transcodes, pyramid reuse, fresh pyramids and cloud-optimized
//! outputs all funnel through here.

use clap::ArgMatches;
use log::{error, info};

use crate::api::PyramidKit;
use crate::commands::command_traits::Command;
use crate::commands::request_from_args;
use crate::errors::{TranscodeError, TranscodeResult};
use crate::planner::policy::BuildPolicy;
use crate::planner::request::TranscodeRequest;
use crate::utils::logger::Logger;

/// Command for running a transcode request
pub struct TranscodeCommand<'a> {
    /// The parsed request to execute
    request: TranscodeRequest,
    /// Policy override file, if given
    policy_file: Option<String>,
    /// Whether to show a progress bar
    show_progress: bool,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> TranscodeCommand<'a> {
    /// Create a new transcode command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Logger for recording operations
    ///
    /// # Returns
    /// A new TranscodeCommand instance or an error
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> TranscodeResult<Self> {
        Ok(TranscodeCommand {
            request: request_from_args(args)?,
            policy_file: args.get_one::<String>("policy").cloned(),
            show_progress: !args.get_flag("quiet"),
            logger,
        })
    }
}

impl<'a> Command for TranscodeCommand<'a> {
    fn execute(&self) -> TranscodeResult<()> {
        let mut kit = PyramidKit::new(None)?;
        if let Some(path) = &self.policy_file {
            kit = kit.with_policy(BuildPolicy::from_file(path)?);
        }

        let outcome = kit.transcode(&self.request, self.show_progress)?;

        for path in &outcome.ledger.final_files {
            info!("Final: {}", path.display());
        }
        for path in &outcome.ledger.overview_files {
            info!("Overview: {}", path.display());
        }
        for path in &outcome.ledger.auxiliary_files {
            info!("Auxiliary: {}", path.display());
        }

        if !outcome.success {
            error!("Build did not complete");
            return Err(TranscodeError::GenericError("Build did not complete".to_string()));
        }

        self.logger.log("Transcode completed")?;
        Ok(())
    }
}
