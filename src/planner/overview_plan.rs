//! Overview construction strategy selection
//!
//! The planner is a small state machine over the `OverviewPlan` variants.
//! The automatic variants exist only on the request side; resolution
//! collapses them to a concrete strategy in one fixed order, and nothing
//! downstream ever substitutes one strategy for another on its own.

use log::info;

use super::policy::BuildPolicy;
use crate::errors::{TranscodeError, TranscodeResult};

/// How the output raster gets its overview pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewPlan {
    /// Let the planner decide from the source and the request
    AutoSelect,
    /// Produce no overviews at all
    NoOverviews,
    /// Re-transcode the source's existing levels one by one
    ExistingReuse,
    /// Freshly generate external overviews; layout decided by file size
    CreateExternalAuto,
    /// Freshly generate one external overview file with all levels
    CreateExternalSingle,
    /// Freshly generate a chain of external overview files, one level each
    CreateExternalMulti,
    /// Freshly generate the pyramid inside the output file
    CreateInternal,
}

impl OverviewPlan {
    /// True once no automatic variant remains
    pub fn is_concrete(&self) -> bool {
        !matches!(self, OverviewPlan::AutoSelect | OverviewPlan::CreateExternalAuto)
    }

    /// Caller-facing name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            OverviewPlan::AutoSelect => "auto",
            OverviewPlan::NoOverviews => "none",
            OverviewPlan::ExistingReuse => "existing",
            OverviewPlan::CreateExternalAuto => "external",
            OverviewPlan::CreateExternalSingle => "single",
            OverviewPlan::CreateExternalMulti => "multi",
            OverviewPlan::CreateInternal => "internal",
        }
    }

    /// Parse a variant name as used on the command line
    pub fn from_name(name: &str) -> TranscodeResult<Self> {
        match name.to_lowercase().as_str() {
            "auto" => Ok(OverviewPlan::AutoSelect),
            "none" => Ok(OverviewPlan::NoOverviews),
            "existing" => Ok(OverviewPlan::ExistingReuse),
            "external" => Ok(OverviewPlan::CreateExternalAuto),
            "single" => Ok(OverviewPlan::CreateExternalSingle),
            "multi" => Ok(OverviewPlan::CreateExternalMulti),
            "internal" => Ok(OverviewPlan::CreateInternal),
            _ => Err(TranscodeError::GenericError(format!("Unknown overview plan: {}", name))),
        }
    }
}

/// How a cloud-optimized output is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CogMode {
    /// The engine builds the optimized layout while transcoding
    SinglePass,
    /// Build into a temporary file first, then repackage
    TwoPhase,
}

/// Facts about the source and request the planner decides from
#[derive(Debug, Clone, Copy)]
pub struct PlanContext {
    /// Overview levels already present in the source
    pub existing_overview_count: u32,
    /// Explicit base level supplied by the caller, if any
    pub base_overview_index: Option<u32>,
    /// Whether a cloud-optimized output was requested
    pub cloud_optimized: bool,
    /// Source file size in bytes
    pub source_file_size: u64,
    /// Whether the request crops, reprojects or resamples
    pub nontrivial_transform: bool,
}

/// A fully resolved strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlan {
    /// Concrete overview strategy
    pub plan: OverviewPlan,
    /// Base overview index for level reuse
    pub base_index: u32,
    /// Assembly mode when a cloud-optimized output was requested
    pub cog_mode: Option<CogMode>,
}

/// Decision procedure collapsing automatic plan variants
pub struct OverviewPlanner<'a> {
    policy: &'a BuildPolicy,
}

impl<'a> OverviewPlanner<'a> {
    /// Create a planner using the given policy constants
    pub fn new(policy: &'a BuildPolicy) -> Self {
        OverviewPlanner { policy }
    }

    /// Resolve a requested plan against the source facts
    ///
    /// Evaluated once per request, in a fixed order:
    /// 1. `AutoSelect` becomes `ExistingReuse` when the source has levels
    ///    and the caller named a base index, or when a cloud-optimized
    ///    output is requested; otherwise `CreateExternalAuto`.
    /// 2. `CreateExternalAuto` becomes `CreateExternalMulti` above the
    ///    size threshold, `CreateExternalSingle` below it.
    /// 3. `ExistingReuse` without a base index defaults to the full
    ///    source pyramid, base 0.
    /// 4. A cloud-optimized output is two-phase exactly when the
    ///    transform is non-trivial and the pyramid comes from existing
    ///    levels; otherwise the engine assembles it in a single pass.
    pub fn resolve(&self, requested: OverviewPlan, ctx: &PlanContext) -> ResolvedPlan {
        let mut plan = requested;

        if plan == OverviewPlan::AutoSelect {
            let has_usable_levels = ctx.existing_overview_count >= 1 && ctx.base_overview_index.is_some();
            plan = if has_usable_levels || ctx.cloud_optimized {
                OverviewPlan::ExistingReuse
            } else {
                OverviewPlan::CreateExternalAuto
            };
        }

        if plan == OverviewPlan::CreateExternalAuto {
            plan = if ctx.source_file_size > self.policy.multi_file_threshold {
                OverviewPlan::CreateExternalMulti
            } else {
                OverviewPlan::CreateExternalSingle
            };
        }

        let base_index = match plan {
            OverviewPlan::ExistingReuse => ctx.base_overview_index.unwrap_or(0),
            _ => 0,
        };

        let cog_mode = if ctx.cloud_optimized {
            if ctx.nontrivial_transform && plan == OverviewPlan::ExistingReuse {
                Some(CogMode::TwoPhase)
            } else {
                Some(CogMode::SinglePass)
            }
        } else {
            None
        };

        let resolved = ResolvedPlan { plan, base_index, cog_mode };
        info!(
            "Overview plan {} resolved to {} (base level {}, cog {:?})",
            requested.name(),
            resolved.plan.name(),
            resolved.base_index,
            resolved.cog_mode
        );
        resolved
    }
}

/// Resolve a possibly-negative overview count against the levels a
/// source actually has
///
/// A negative count means "the last N levels" and re-resolves the base
/// index; a positive count is clamped to what exists above the base. No
/// count at all uses everything above the base.
pub fn resolve_base_and_count(count: Option<i32>, available: u32, base: Option<u32>) -> (u32, u32) {
    match count {
        Some(c) if c < 0 => {
            let take = (-c) as u32;
            let base = available.saturating_sub(take);
            (base, available - base)
        }
        Some(c) => {
            let base = base.unwrap_or(0).min(available);
            let usable = available - base;
            (base, (c as u32).min(usable))
        }
        None => {
            let base = base.unwrap_or(0).min(available);
            (base, available - base)
        }
    }
}
