//! End-to-end runs of the `opfcost` binary against the repository fixtures.

use assert_cmd::cargo::cargo_bin_cmd;
use opfcost_dist::load_cost_manifest;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

/// Empty config file so a developer's ~/.opfcost/config.toml is ignored.
fn empty_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, "").unwrap();
    path
}

#[test]
fn plan_prints_counts_and_offsets() {
    let tmp = tempdir().unwrap();
    let config = empty_config(tmp.path());
    cargo_bin_cmd!("opfcost")
        .args(["--config", config.to_str().unwrap()])
        .args(["plan", "--scenarios", "10", "--workers", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RANK"))
        .stdout(predicate::str::is_match(r"1\s+3\s+4").unwrap())
        .stdout(predicate::str::is_match(r"2\s+3\s+7").unwrap());
}

#[test]
fn plan_rejects_zero_workers() {
    cargo_bin_cmd!("opfcost")
        .args(["plan", "--scenarios", "10", "--workers", "0"])
        .assert()
        .failure();
}

#[test]
fn inspect_lists_wind_units() {
    let tmp = tempdir().unwrap();
    let config = empty_config(tmp.path());
    cargo_bin_cmd!("opfcost")
        .args(["--config", config.to_str().unwrap(), "inspect"])
        .arg(repo_path("test_data/matpower/case5_wind.m"))
        .assert()
        .success()
        .stdout(predicate::str::contains("4_Wind_2"))
        .stdout(predicate::str::contains("genfuel"));
}

#[test]
fn roundtrip_writes_a_parsable_case() {
    let tmp = tempdir().unwrap();
    let config = empty_config(tmp.path());
    let out = tmp.path().join("case5_copy.m");
    cargo_bin_cmd!("opfcost")
        .args(["--config", config.to_str().unwrap(), "roundtrip"])
        .arg(repo_path("test_data/matpower/case5_wind.m"))
        .arg(&out)
        .assert()
        .success();
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("function mpc = case5_wind"));
    assert!(text.contains("mpc.genfuel = {"));
}

#[test]
fn cost_writes_manifest_on_two_workers() {
    let tmp = tempdir().unwrap();
    let config = empty_config(tmp.path());
    let manifest = tmp.path().join("costs.json");
    cargo_bin_cmd!("opfcost")
        .args(["--config", config.to_str().unwrap(), "cost"])
        .arg(repo_path("test_data/matpower/case5_wind.m"))
        .arg("--deviations")
        .arg(repo_path("test_data/scenarios/case5_deviations.csv"))
        .arg("--reference")
        .arg(repo_path("test_data/scenarios/case5_reference.csv"))
        .args(["--workers", "2", "--threads", "1", "--manifest"])
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("base cost 15500.0000"));

    let loaded = load_cost_manifest(&manifest).unwrap();
    assert_eq!(loaded.workers, 2);
    assert_eq!(loaded.scenarios.len(), 10);
    assert_eq!(loaded.scenarios[6].cost, Some(100_000.0));
    assert_eq!(loaded.max, Some(100_000.0));
}

#[test]
fn cost_rejects_oversized_request() {
    let tmp = tempdir().unwrap();
    let config = empty_config(tmp.path());
    cargo_bin_cmd!("opfcost")
        .args(["--config", config.to_str().unwrap(), "cost"])
        .arg(repo_path("test_data/matpower/case5_wind.m"))
        .arg("--deviations")
        .arg(repo_path("test_data/scenarios/case5_deviations.csv"))
        .arg("--reference")
        .arg(repo_path("test_data/scenarios/case5_reference.csv"))
        .args(["--scenarios", "50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("50 scenarios requested"));
}
