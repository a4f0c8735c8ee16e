//! Tests for build ledger bookkeeping

use std::fs;
use std::path::Path;

use crate::planner::ledger::BuildLedger;

#[test]
fn test_merge_keeps_lists_separate() {
    let mut parent = BuildLedger::new();
    parent.record_final(Path::new("base.tif"));

    let mut child = BuildLedger::new();
    child.record_final(Path::new("level1.tif"));
    child.record_overview(Path::new("level1.tif.ovr"));
    child.record_temporary(Path::new("scratch.tif"));

    parent.merge(child);
    assert_eq!(parent.final_files.len(), 2);
    assert_eq!(parent.overview_files.len(), 1);
    assert_eq!(parent.temporary_files.len(), 1);
    assert!(parent.auxiliary_files.is_empty());
}

#[test]
fn test_merge_as_temporary_demotes_everything() {
    let mut parent = BuildLedger::new();

    let mut child = BuildLedger::new();
    child.record_final(Path::new("phase1.tif"));
    child.record_overview(Path::new("phase1.tif.ovr"));
    child.record_auxiliary(Path::new("phase1.tif.info"));
    child.record_temporary(Path::new("scratch.tif"));

    parent.merge_as_temporary(child);
    assert!(parent.final_files.is_empty());
    assert!(parent.overview_files.is_empty());
    assert!(parent.auxiliary_files.is_empty());
    assert_eq!(parent.temporary_files.len(), 4);
}

#[test]
fn test_finalize_deletes_temps_when_finals_exist() {
    let dir = tempfile::tempdir().unwrap();
    let final_path = dir.path().join("out.tif");
    let temp_path = dir.path().join("out_tmp.tif");
    fs::write(&final_path, b"final").unwrap();
    fs::write(&temp_path, b"temp").unwrap();

    let mut ledger = BuildLedger::new();
    ledger.record_final(&final_path);
    ledger.record_temporary(&temp_path);

    assert!(ledger.finalize());
    assert!(final_path.exists());
    assert!(!temp_path.exists());
}

#[test]
fn test_missing_final_suppresses_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let temp_path = dir.path().join("out_tmp.tif");
    fs::write(&temp_path, b"temp").unwrap();

    let mut ledger = BuildLedger::new();
    ledger.record_final(&dir.path().join("never_written.tif"));
    ledger.record_temporary(&temp_path);

    assert!(!ledger.finalize());
    // The intermediate survives as debugging evidence
    assert!(temp_path.exists());
}
