//! File-set bookkeeping across a recursive build
//!
//! One ledger is created per top-level orchestration call and threaded
//! by mutable reference through the whole recursion tree. Children
//! accumulate into their own ledgers, which the parent merges; nothing
//! is deleted until the entire tree has completed and the final outputs
//! have been verified on disk, so no sibling step can lose a file a
//! later step still needs.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, warn};

/// Accumulated file sets of one orchestration run
#[derive(Debug, Default, Clone)]
pub struct BuildLedger {
    /// Primary outputs
    pub final_files: Vec<PathBuf>,
    /// Overview sidecar files
    pub overview_files: Vec<PathBuf>,
    /// Auxiliary sidecars such as metadata dumps and run logs
    pub auxiliary_files: Vec<PathBuf>,
    /// Intermediates to delete once the run has been verified
    pub temporary_files: Vec<PathBuf>,
}

impl BuildLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        BuildLedger::default()
    }

    /// Record a primary output
    pub fn record_final(&mut self, path: &Path) {
        self.final_files.push(path.to_path_buf());
    }

    /// Record an overview file
    pub fn record_overview(&mut self, path: &Path) {
        self.overview_files.push(path.to_path_buf());
    }

    /// Record an auxiliary sidecar
    pub fn record_auxiliary(&mut self, path: &Path) {
        self.auxiliary_files.push(path.to_path_buf());
    }

    /// Record a temporary intermediate
    pub fn record_temporary(&mut self, path: &Path) {
        self.temporary_files.push(path.to_path_buf());
    }

    /// Merge a child invocation's ledger into this one, list by list
    pub fn merge(&mut self, child: BuildLedger) {
        self.final_files.extend(child.final_files);
        self.overview_files.extend(child.overview_files);
        self.auxiliary_files.extend(child.auxiliary_files);
        self.temporary_files.extend(child.temporary_files);
    }

    /// Merge a child ledger whose every output is an intermediate of
    /// this run, as in the first phase of a two-phase build
    pub fn merge_as_temporary(&mut self, child: BuildLedger) {
        self.temporary_files.extend(child.final_files);
        self.temporary_files.extend(child.overview_files);
        self.temporary_files.extend(child.auxiliary_files);
        self.temporary_files.extend(child.temporary_files);
    }

    /// Verify finals and clean up intermediates
    ///
    /// Runs once, at the end of the top-level call. When a registered
    /// final output is missing on disk the run is reported failed and
    /// the intermediates are kept as debugging evidence. Deletion
    /// failures are warnings; the run itself already succeeded.
    ///
    /// # Returns
    /// Whether every registered final output exists
    pub fn finalize(&mut self) -> bool {
        let missing: Vec<&PathBuf> = self
            .final_files
            .iter()
            .filter(|path| !path.exists())
            .collect();

        if !missing.is_empty() {
            for path in &missing {
                error!("Registered final output is missing: {}", path.display());
            }
            warn!(
                "Keeping {} temporary file(s) for inspection",
                self.temporary_files.len()
            );
            return false;
        }

        for path in &self.temporary_files {
            if !path.exists() {
                continue;
            }
            if let Err(e) = fs::remove_file(path) {
                warn!("Could not delete temporary file {}: {}", path.display(), e);
            }
        }
        true
    }
}
