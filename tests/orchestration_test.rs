//! Integration tests for the build orchestrator
//!
//! These tests drive the orchestrator against a recording mock engine
//! that materializes real files in a scratch directory, so idempotence,
//! ledger routing and temp-file cleanup are exercised against the actual
//! filesystem.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use pyramidkit::engine::{
    AccessMode, MosaicOptions, ProgressSink, RasterEngine, RasterHandle, ResamplingAlg, Setting,
    TranscodeOptions,
};
use pyramidkit::errors::{TranscodeError, TranscodeResult};
use pyramidkit::geometry::{CoordinateSystem, Extent, Rectangle};
use pyramidkit::orchestrator::TranscodeOrchestrator;
use pyramidkit::planner::request::ExistingTargetPolicy;
use pyramidkit::planner::{BuildPolicy, OverviewPlan, TranscodeRequest};

/// In-memory engine that records every invocation and creates real
/// files where the real engine would
struct MockEngine {
    /// Operation log, one entry per engine call
    calls: RefCell<Vec<String>>,
    /// Existing overview level count per source path
    overview_counts: RefCell<HashMap<PathBuf, u32>>,
    /// Levels embedded in-place per path
    embedded: RefCell<HashMap<PathBuf, Vec<u32>>>,
    /// Destination paths whose transcode should report failure
    fail_transcodes: RefCell<HashSet<PathBuf>>,
    /// Band count reported for every opened raster
    band_count: u32,
}

impl MockEngine {
    fn new() -> Self {
        MockEngine {
            calls: RefCell::new(Vec::new()),
            overview_counts: RefCell::new(HashMap::new()),
            embedded: RefCell::new(HashMap::new()),
            fail_transcodes: RefCell::new(HashSet::new()),
            band_count: 1,
        }
    }

    fn with_band_count(band_count: u32) -> Self {
        MockEngine { band_count, ..Self::new() }
    }

    fn set_overview_count(&self, path: &Path, count: u32) {
        self.overview_counts.borrow_mut().insert(path.to_path_buf(), count);
    }

    fn fail_transcode_to(&self, path: &Path) {
        self.fail_transcodes.borrow_mut().insert(path.to_path_buf());
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn calls_named(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl RasterEngine for MockEngine {
    fn open(&self, path: &Path, mode: AccessMode, overview_index: Option<u32>)
        -> TranscodeResult<RasterHandle> {
        if !path.is_file() {
            return Err(TranscodeError::SourceNotFound(path.display().to_string()));
        }
        self.calls.borrow_mut().push(format!("open:{}", path.display()));

        let index = overview_index.unwrap_or(0);
        let scale = 1u64 << index;
        let pixel = scale as f64;

        Ok(RasterHandle {
            path: path.to_path_buf(),
            mode,
            raster_size: (1024 / scale, 1024 / scale),
            band_count: self.band_count,
            band_type: "Byte".to_string(),
            geotransform: [0.0, pixel, 0.0, 1024.0, 0.0, -pixel],
            crs: CoordinateSystem::WebMercator,
            nodata: None,
            overview_count: *self.overview_counts.borrow().get(path).unwrap_or(&0),
            file_size: fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            overview_index: index,
        })
    }

    fn transcode(
        &self,
        dst_path: &Path,
        src: &RasterHandle,
        options: &TranscodeOptions,
        _progress: Option<&dyn ProgressSink>,
    ) -> TranscodeResult<bool> {
        self.calls.borrow_mut().push(format!(
            "transcode:{}->{}{}",
            src.path.display(),
            dst_path.display(),
            if options.cloud_optimized { ":cog" } else { "" }
        ));

        if self.fail_transcodes.borrow().contains(dst_path) {
            return Ok(false);
        }
        fs::write(dst_path, b"raster").map_err(TranscodeError::from)?;
        Ok(true)
    }

    fn build_overviews(
        &self,
        handle: &RasterHandle,
        levels: &[u32],
        _resampling: ResamplingAlg,
        external: bool,
        _progress: Option<&dyn ProgressSink>,
    ) -> TranscodeResult<bool> {
        self.calls.borrow_mut().push(format!(
            "addo:{}:{:?}:{}",
            handle.path.display(),
            levels,
            if external { "external" } else { "internal" }
        ));

        if external {
            let sidecar = PathBuf::from(format!("{}.ovr", handle.path.display()));
            fs::write(&sidecar, b"overview").map_err(TranscodeError::from)?;
        } else {
            self.embedded
                .borrow_mut()
                .entry(handle.path.to_path_buf())
                .or_default()
                .extend_from_slice(levels);
        }
        Ok(true)
    }

    fn describe(&self, handle: &RasterHandle) -> TranscodeResult<String> {
        self.calls.borrow_mut().push(format!("describe:{}", handle.path.display()));
        Ok(format!("Mock raster {}", handle.path.display()))
    }

    fn build_virtual_mosaic(
        &self,
        paths: &[PathBuf],
        _options: &MosaicOptions,
    ) -> TranscodeResult<RasterHandle> {
        let first = paths.first().expect("mosaic needs inputs");
        let mosaic = PathBuf::from(format!("{}.vrt", first.display()));
        fs::write(&mosaic, b"mosaic").map_err(TranscodeError::from)?;
        self.calls.borrow_mut().push(format!("vrt:{}", mosaic.display()));
        self.open(&mosaic, AccessMode::Read, None)
    }
}

fn make_source(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"source").unwrap();
    path
}

fn base_request(source: &Path, output: &Path) -> TranscodeRequest {
    let mut request = TranscodeRequest::new(source.to_path_buf());
    request.output = Some(output.to_path_buf());
    request.write_sidecars = false;
    request
}

#[test]
fn test_plain_transcode_produces_one_final() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::NoOverviews;

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.primary.as_deref(), Some(output.as_path()));
    assert_eq!(outcome.ledger.final_files, vec![output.clone()]);
    assert!(outcome.ledger.overview_files.is_empty());
    assert!(outcome.ledger.temporary_files.is_empty());
    assert!(output.exists());
    assert_eq!(engine.calls_named("transcode:"), 1);
}

#[test]
fn test_existing_reuse_builds_n_plus_one_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    engine.set_overview_count(&source, 3);
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::ExistingReuse;

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);

    // One base plus three pyramid levels
    assert_eq!(outcome.ledger.final_files, vec![output.clone()]);
    assert_eq!(outcome.ledger.overview_files.len(), 3);

    // The k-th overview carries exactly k suffix repetitions, coarsest
    // level built first
    let expected: Vec<PathBuf> = [3u32, 2, 1]
        .iter()
        .map(|k| {
            let mut name = output.display().to_string();
            for _ in 0..*k {
                name.push_str(".ovr");
            }
            PathBuf::from(name)
        })
        .collect();
    assert_eq!(outcome.ledger.overview_files, expected);
    for path in &expected {
        assert!(path.exists(), "{} missing", path.display());
    }
    assert_eq!(engine.calls_named("transcode:"), 4);
}

#[test]
fn test_negative_count_reuses_last_levels() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    engine.set_overview_count(&source, 5);
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::ExistingReuse;
    request.dst_ovr_count = Some(-2);

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.ledger.final_files.len(), 1);
    assert_eq!(outcome.ledger.overview_files.len(), 2);
}

#[test]
fn test_external_multi_builds_sidecar_chain() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::CreateExternalMulti;
    request.dst_ovr_count = Some(3);

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);

    let ovr1 = PathBuf::from(format!("{}.ovr", output.display()));
    let ovr2 = PathBuf::from(format!("{}.ovr", ovr1.display()));
    let ovr3 = PathBuf::from(format!("{}.ovr", ovr2.display()));
    assert_eq!(outcome.ledger.overview_files, vec![ovr1.clone(), ovr2.clone(), ovr3.clone()]);
    for path in [&ovr1, &ovr2, &ovr3] {
        assert!(path.exists(), "{} missing", path.display());
    }

    // Each chain step asks for a single factor-2 level, and nothing is
    // embedded in the base file
    assert_eq!(engine.calls_named("addo:"), 3);
    assert!(engine.embedded.borrow().get(&output).is_none());
}

#[test]
fn test_external_single_builds_one_combined_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::CreateExternalSingle;
    request.dst_ovr_count = Some(4);

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);

    let sidecar = PathBuf::from(format!("{}.ovr", output.display()));
    assert_eq!(outcome.ledger.overview_files, vec![sidecar]);

    // All levels go into one engine request
    let calls = engine.calls.borrow();
    let addo: Vec<&String> = calls.iter().filter(|c| c.starts_with("addo:")).collect();
    assert_eq!(addo.len(), 1);
    assert!(addo[0].contains("[2, 4, 8, 16]"), "was {}", addo[0]);
}

#[test]
fn test_internal_pyramid_is_embedded() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::CreateInternal;
    request.dst_ovr_count = Some(2);

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);
    assert!(outcome.ledger.overview_files.is_empty());
    assert_eq!(engine.embedded.borrow().get(&output), Some(&vec![2, 4]));
}

#[test]
fn test_two_phase_cog_build_and_idempotent_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    // A crop makes the transform non-trivial; with a cloud-optimized
    // target the pyramid comes from existing levels, forcing two phases
    let mut request = base_request(&source, &output);
    request.cloud_optimized = true;
    request.crop = Some(Extent::new(
        CoordinateSystem::WebMercator,
        Rectangle::from_min_max(100.0, 600.0, 100.0, 600.0),
    ));

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.ledger.final_files, vec![output.clone()]);

    // Exactly one intermediate, registered as temporary and cleaned up
    // after the finals were verified
    assert_eq!(outcome.ledger.temporary_files.len(), 1);
    let intermediate = &outcome.ledger.temporary_files[0];
    assert!(!intermediate.exists());
    assert!(output.exists());

    // The repackaging pass is the one that asked for the optimized
    // layout
    assert_eq!(engine.calls_named("transcode:"), 2);
    let calls = engine.calls.borrow();
    let cog_calls: Vec<&String> = calls.iter().filter(|c| c.ends_with(":cog")).collect();
    assert_eq!(cog_calls.len(), 1);
    assert!(cog_calls[0].contains(&format!("{}->", intermediate.display())));
    drop(calls);

    // Rerunning the identical request touches nothing
    let before = engine.call_count();
    let rerun = orchestrator.run(&request).unwrap();
    assert!(rerun.success);
    assert_eq!(rerun.primary.as_deref(), Some(output.as_path()));
    assert_eq!(rerun.ledger.final_files, vec![output.clone()]);
    assert!(rerun.ledger.overview_files.is_empty());
    assert!(rerun.ledger.temporary_files.is_empty());
    assert_eq!(engine.call_count(), before);
}

#[test]
fn test_skip_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::NoOverviews;

    let first = orchestrator.run(&request).unwrap();
    assert!(first.success);

    let before = engine.call_count();
    let second = orchestrator.run(&request).unwrap();
    assert!(second.success);
    assert_eq!(second.ledger.final_files, first.ledger.final_files);
    assert!(second.ledger.overview_files.is_empty());
    assert!(second.ledger.temporary_files.is_empty());
    assert_eq!(engine.call_count(), before);
}

#[test]
fn test_overwrite_replaces_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");
    fs::write(&output, b"stale").unwrap();

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::NoOverviews;
    request.existing_target = ExistingTargetPolicy::Overwrite;

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);
    assert_eq!(engine.calls_named("transcode:"), 1);
}

#[test]
fn test_fail_policy_rejects_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");
    fs::write(&output, b"already here").unwrap();

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.existing_target = ExistingTargetPolicy::Fail;

    match orchestrator.run(&request) {
        Err(TranscodeError::TargetExists(_)) => {}
        other => panic!("expected TargetExists, got {:?}", other.map(|o| o.success)),
    }
}

#[test]
fn test_missing_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let request = base_request(&dir.path().join("nope.tif"), &dir.path().join("out.tif"));
    assert!(matches!(
        orchestrator.run(&request),
        Err(TranscodeError::SourceNotFound(_))
    ));
}

#[test]
fn test_engine_failure_is_falsy_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    engine.fail_transcode_to(&output);
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::NoOverviews;

    let outcome = orchestrator.run(&request).unwrap();
    assert!(!outcome.success);
    assert!(outcome.primary.is_none());
    assert!(outcome.ledger.final_files.is_empty());
}

#[test]
fn test_failing_level_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    engine.set_overview_count(&source, 2);
    // The middle level refuses to build
    engine.fail_transcode_to(&PathBuf::from(format!("{}.ovr", output.display())));

    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::ExistingReuse;

    let outcome = orchestrator.run(&request).unwrap();
    // The base and the other level were still attempted and produced
    assert_eq!(outcome.ledger.final_files, vec![output.clone()]);
    assert_eq!(outcome.ledger.overview_files.len(), 1);
    assert!(outcome.ledger.overview_files[0]
        .display()
        .to_string()
        .ends_with(".ovr.ovr"));
    assert_eq!(engine.calls_named("transcode:"), 3);
}

#[test]
fn test_four_band_jpeg_reprojection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::with_band_count(4);
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.target_crs = Some(CoordinateSystem::WGS84);
    request.compression = Setting::Value("JPEG".to_string());

    assert!(matches!(
        orchestrator.run(&request),
        Err(TranscodeError::UnsupportedCombination(_))
    ));
}

#[test]
fn test_split_grid_fans_out_cells() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::NoOverviews;
    request.split = Some(2);

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.ledger.final_files.len(), 4);

    for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        let cell = dir.path().join(format!("out_r{}_c{}.tif", row, col));
        assert!(cell.exists(), "{} missing", cell.display());
        assert!(outcome.ledger.final_files.contains(&cell));
    }
}

#[test]
fn test_mosaic_definition_is_temporary_scaffolding() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_source(dir.path(), "a.tif");
    let b = make_source(dir.path(), "b.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::default();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&a, &output);
    request.source = pyramidkit::planner::Source::Mosaic(vec![a.clone(), b.clone()]);
    request.overview_plan = OverviewPlan::NoOverviews;

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.ledger.final_files, vec![output.clone()]);

    // The mosaic definition was registered as temporary and cleaned up
    let mosaic = PathBuf::from(format!("{}.vrt", a.display()));
    assert!(outcome.ledger.temporary_files.contains(&mosaic));
    assert!(!mosaic.exists());
    // The inputs themselves are untouched
    assert!(a.exists() && b.exists());
}

#[test]
fn test_default_fresh_count_follows_policy() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_source(dir.path(), "in.tif");
    let output = dir.path().join("out.tif");

    let engine = MockEngine::new();
    let policy = BuildPolicy::from_toml_str("default_overview_count = 3").unwrap();
    let orchestrator = TranscodeOrchestrator::new(&engine, &policy);

    let mut request = base_request(&source, &output);
    request.overview_plan = OverviewPlan::CreateExternalSingle;

    let outcome = orchestrator.run(&request).unwrap();
    assert!(outcome.success);

    let calls = engine.calls.borrow();
    let addo: Vec<&String> = calls.iter().filter(|c| c.starts_with("addo:")).collect();
    assert_eq!(addo.len(), 1);
    assert!(addo[0].contains("[2, 4, 8]"), "was {}", addo[0]);
}
