//! Build orchestration
//!
//! The orchestrator turns one resolved request into the sequence of
//! engine invocations that realizes it: a single transcode for the easy
//! case, a per-level recursion when an existing pyramid is reused, a
//! build-then-repackage pair for cloud-optimized outputs with non-trivial
//! geometry, and a fan-out when the caller asked for a tile grid. All of
//! it runs strictly sequentially on the calling thread.

pub mod transcode;
pub mod overviews;
pub mod sidecars;

pub use transcode::{BuildOutcome, TranscodeOrchestrator};
