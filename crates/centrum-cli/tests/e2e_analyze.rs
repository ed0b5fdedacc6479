//! E2E tests for `centrum analyze` and `centrum metrics`.
//!
//! Each test runs the `centrum` binary as a subprocess in an isolated temp
//! directory with its own config home.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use zip::write::FileOptions;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn centrum_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("centrum").expect("centrum binary must exist");
    cmd.current_dir(dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env("CENTRUM_LOG", "error");
    cmd.env_remove("CENTRUM_TIMING");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// A 2x2 block of streets (a square with one diagonal) as a zipped GeoJSON.
fn write_archive(dir: &Path) -> PathBuf {
    let doc = json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "Marine Drive"},
             "geometry": {"type": "LineString", "coordinates": [[79.850, 6.900], [79.851, 6.900]]}},
            {"type": "Feature", "properties": {"name": "Station Road"},
             "geometry": {"type": "LineString", "coordinates": [[79.851, 6.900], [79.851, 6.901]]}},
            {"type": "Feature", "properties": {"name": "Temple Road"},
             "geometry": {"type": "LineString", "coordinates": [[79.851, 6.901], [79.850, 6.901]]}},
            {"type": "Feature", "properties": {"name": "Beach Road"},
             "geometry": {"type": "LineString", "coordinates": [[79.850, 6.901], [79.850, 6.900]]}},
            {"type": "Feature", "properties": {"name": "Cross Lane"},
             "geometry": {"type": "LineString", "coordinates": [[79.850, 6.900], [79.851, 6.901]]}}
        ]
    });

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("upload/streets.geojson", FileOptions::default())
        .expect("start");
    writer
        .write_all(doc.to_string().as_bytes())
        .expect("write");
    let bytes = writer.finish().expect("finish").into_inner();

    let path = dir.join("streets.zip");
    fs::write(&path, bytes).expect("write zip");
    path
}

fn write_road_network(dir: &Path) -> PathBuf {
    let doc = json!({
        "nodes": {
            "101": {"lat": 6.900, "lon": 79.850},
            "102": {"lat": 6.901, "lon": 79.850},
            "103": {"lat": 6.902, "lon": 79.850},
            "104": {"lat": 6.901, "lon": 79.851}
        },
        "edges": [
            {"u": 101, "v": 102, "length": 111.2},
            {"u": 102, "v": 103, "length": 111.2},
            {"u": 102, "v": 104, "length": 110.4}
        ]
    });
    let path = dir.join("network.json");
    fs::write(&path, doc.to_string()).expect("write network");
    path
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

#[test]
fn analyze_archive_emits_success_envelope() {
    let dir = TempDir::new().expect("tempdir");
    let archive = write_archive(dir.path());

    let output = centrum_cmd(dir.path())
        .args(["analyze", "--metric", "betweenness", "--archive"])
        .arg(&archive)
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let body = stdout_json(&output);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["type"], "FeatureCollection");
    let features = body["data"]["features"].as_array().expect("features");
    assert_eq!(features.len(), 5);
    for feature in features {
        assert_eq!(feature["geometry"]["type"], "LineString");
        assert!(feature["properties"]["value"].is_number());
        assert!(feature["properties"]["name"].is_string());
        assert!(feature["properties"]["weight"].as_f64().is_some_and(|w| w > 100.0));
    }
}

#[test]
fn analyze_node_granularity_to_file() {
    let dir = TempDir::new().expect("tempdir");
    let archive = write_archive(dir.path());
    let out = dir.path().join("result.json");

    centrum_cmd(dir.path())
        .args(["analyze", "-m", "connectivity", "-g", "node", "--pretty", "--archive"])
        .arg(&archive)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = fs::read_to_string(&out).expect("read output");
    assert!(text.contains("\n  \"status\": \"success\""));
    let body: Value = serde_json::from_str(&text).expect("json");
    let values: Vec<f64> = body["data"]["features"]
        .as_array()
        .expect("features")
        .iter()
        .map(|f| f["properties"]["value"].as_f64().expect("value"))
        .collect();
    // Corners on the diagonal have degree 3, the others 2.
    assert_eq!(values.len(), 4);
    assert_eq!(values.iter().filter(|v| (**v - 1.0).abs() < 1e-12).count(), 2);
    assert_eq!(values.iter().filter(|v| (**v - 2.0 / 3.0).abs() < 1e-12).count(), 2);
}

#[test]
fn analyze_road_network_defaults_to_nodes() {
    let dir = TempDir::new().expect("tempdir");
    let network = write_road_network(dir.path());

    let output = centrum_cmd(dir.path())
        .args(["analyze", "--metric", "Betweenness", "--road-network"])
        .arg(&network)
        .output()
        .expect("run");
    assert!(output.status.success());

    let body = stdout_json(&output);
    let features = body["data"]["features"].as_array().expect("features");
    assert_eq!(features.len(), 4);
    assert_eq!(features[1]["properties"]["id"], 102);
    assert_eq!(features[1]["properties"]["value"], 3.0);
    assert_eq!(features[1]["geometry"]["coordinates"], json!([79.850, 6.901]));
}

#[test]
fn unknown_metric_emits_error_envelope() {
    let dir = TempDir::new().expect("tempdir");
    let archive = write_archive(dir.path());

    let output = centrum_cmd(dir.path())
        .args(["analyze", "--metric", "pagerank", "--archive"])
        .arg(&archive)
        .output()
        .expect("run");
    assert!(!output.status.success());

    let body = stdout_json(&output);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "E2002");
    assert_eq!(body["message"], "unknown metric: pagerank");
    assert!(body.get("data").is_none());
}

#[test]
fn archive_without_lines_is_no_geometry() {
    let dir = TempDir::new().expect("tempdir");
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("readme.txt", FileOptions::default()).expect("start");
    writer.write_all(b"no streets here").expect("write");
    let path = dir.path().join("empty.zip");
    fs::write(&path, writer.finish().expect("finish").into_inner()).expect("write zip");

    centrum_cmd(dir.path())
        .args(["analyze", "--metric", "closeness", "--archive"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"code\":\"E1001\""));
}

#[test]
fn not_a_zip_is_malformed() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("roads.zip");
    fs::write(&path, "definitely not a zip").expect("write");

    centrum_cmd(dir.path())
        .args(["analyze", "--metric", "closeness", "--archive"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"code\":\"E1003\""));
}

#[test]
fn missing_archive_file_is_unreadable_input() {
    let dir = TempDir::new().expect("tempdir");

    let output = centrum_cmd(dir.path())
        .args(["analyze", "--metric", "closeness", "--archive", "no-such-upload.zip"])
        .output()
        .expect("run");
    assert!(!output.status.success());

    let body = stdout_json(&output);
    assert_eq!(body["code"], "E1005");
    assert!(body["hint"].as_str().is_some_and(|h| h.contains("path")));
}

#[test]
fn project_config_is_applied() {
    let dir = TempDir::new().expect("tempdir");
    let network = write_road_network(dir.path());
    fs::write(
        dir.path().join("centrum.toml"),
        "[centrality]\nnormalize_betweenness = true\nparallel = false\n",
    )
    .expect("write config");

    let output = centrum_cmd(dir.path())
        .args(["analyze", "--metric", "betweenness", "--road-network"])
        .arg(&network)
        .output()
        .expect("run");
    let body = stdout_json(&output);
    // Star with 4 nodes: raw 3 pairs through the hub, normalized by 3.
    assert_eq!(body["data"]["features"][1]["properties"]["value"], 1.0);
}

#[test]
fn invalid_config_fails_before_analysis() {
    let dir = TempDir::new().expect("tempdir");
    let network = write_road_network(dir.path());
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[graph]\nsnap_tolerance = \"wide\"\n").expect("write config");

    centrum_cmd(dir.path())
        .args(["analyze", "--metric", "closeness", "--road-network"])
        .arg(&network)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("bad.toml"));
}

#[test]
fn missing_input_flag_is_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    centrum_cmd(dir.path())
        .args(["analyze", "--metric", "closeness"])
        .assert()
        .code(2);
}

#[test]
fn timing_report_goes_to_stderr() {
    let dir = TempDir::new().expect("tempdir");
    let network = write_road_network(dir.path());

    let output = centrum_cmd(dir.path())
        .args(["--timing", "analyze", "-m", "closeness", "--road-network"])
        .arg(&network)
        .output()
        .expect("run");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pipeline.compute"), "{stderr}");
    assert_eq!(stdout_json(&output)["status"], "success");
}

// ---------------------------------------------------------------------------
// metrics
// ---------------------------------------------------------------------------

#[test]
fn metrics_lists_all_three() {
    let dir = TempDir::new().expect("tempdir");
    centrum_cmd(dir.path())
        .arg("metrics")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("betweenness")
                .and(predicate::str::contains("closeness"))
                .and(predicate::str::contains("connectivity")),
        );
}

#[test]
fn metrics_json() {
    let dir = TempDir::new().expect("tempdir");
    let output = centrum_cmd(dir.path())
        .args(["metrics", "--format", "json"])
        .output()
        .expect("run");
    let body = stdout_json(&output);
    let names: Vec<_> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|m| m["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, ["betweenness", "closeness", "connectivity"]);
}
