//! CLI commands run against a temporary on-disk tile mirror.

use clap::Parser;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tilesurf_cli::{run, Cli, CliError};
use tilesurf_region::{CancelToken, RegionError};

/// Write a 2x2 elevation tile at `{root}/dem/{z}/{x}/{y}.txt`.
fn write_dem_tile(root: &Path, z: u8, x: u32, y: u32, rows: &str) {
    let dir = root.join("dem").join(z.to_string()).join(x.to_string());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.txt", y)), rows).unwrap();
}

fn run_cli(args: &[&str]) -> Result<String, CliError> {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    run(&cli, &CancelToken::new(), &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

/// Two horizontally adjacent tiles forming a ramp that rises by 1 per column.
fn ramp_mirror() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_dem_tile(dir.path(), 5, 10, 12, "0,1\n0,1\n");
    write_dem_tile(dir.path(), 5, 11, 12, "2,3\n2,3\n");
    dir
}

#[test]
fn test_region_summary() {
    let mirror = ramp_mirror();
    let output = run_cli(&[
        "tilesurf",
        "region",
        "--from",
        "5/10/12",
        "--to",
        "5/11/12",
        "--tile-type",
        "dem",
        "--ext",
        "txt",
        "--tile-size",
        "2",
        "--tiles-dir",
        mirror.path().to_str().unwrap(),
    ])
    .unwrap();

    let summary: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(summary["shape"], serde_json::json!([2, 4]));
    assert_eq!(summary["rows"], 1);
    assert_eq!(summary["columns"], 2);
    assert_eq!(summary["fetched"], 2);
    assert_eq!(summary["fallbacks"].as_array().unwrap().len(), 0);
}

#[test]
fn test_region_missing_tile_is_reported() {
    let mirror = ramp_mirror();
    let output = run_cli(&[
        "tilesurf",
        "region",
        "--from",
        "5/10/12",
        "--to",
        "5/12/12",
        "--tile-type",
        "dem",
        "--ext",
        "txt",
        "--tile-size",
        "2",
        "--tiles-dir",
        mirror.path().to_str().unwrap(),
    ])
    .unwrap();

    let summary: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(summary["shape"], serde_json::json!([2, 6]));
    assert_eq!(summary["fetched"], 2);
    let fallbacks = summary["fallbacks"].as_array().unwrap();
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0]["tile"], "5/12/12");
    assert_eq!(fallbacks[0]["column"], 2);
}

#[test]
fn test_gradient_queries() {
    let mirror = ramp_mirror();
    let output = run_cli(&[
        "tilesurf",
        "gradient",
        "--from",
        "5/10/12",
        "--to",
        "5/11/12",
        "--tile-type",
        "dem",
        "--ext",
        "txt",
        "--tile-size",
        "2",
        "--tiles-dir",
        mirror.path().to_str().unwrap(),
        "--at",
        "0.25,0.25",
        "--at",
        "1.5,0.5",
        "--at",
        "3,0",
    ])
    .unwrap();

    let lines: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);

    assert_eq!(lines[0]["gx"], 1.0);
    assert_eq!(lines[0]["gy"], 0.0);
    assert_eq!(lines[0]["magnitude"], 1.0);
    assert_eq!(lines[0]["direction"], 0.0);

    // Across the seam between the two tiles
    assert_eq!(lines[1]["gx"], 1.0);

    // Last column has no right neighbor
    assert!(lines[2]["error"].is_string());
    assert!(lines[2].get("gx").is_none());
}

#[test]
fn test_tiles_without_fetching() {
    let output = run_cli(&[
        "tilesurf",
        "tiles",
        "--from",
        "9/454/201",
        "--zoom",
        "10",
        "--tile-type",
        "dem",
        "--ext",
        "txt",
        "--base-url",
        "http://tiles.invalid/xyz",
    ])
    .unwrap();

    let summary: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(summary["zoom"], 10);
    assert_eq!(
        summary["tiles"],
        serde_json::json!([["10/908/402", "10/909/402"], ["10/908/403", "10/909/403"]])
    );
    assert_eq!(summary["urls"][0], "http://tiles.invalid/xyz/dem/10/908/402.txt");
    assert_eq!(summary["urls"].as_array().unwrap().len(), 4);
}

#[test]
fn test_configuration_errors() {
    let coarser = run_cli(&["tilesurf", "tiles", "--from", "12/3638/1612", "--zoom", "11"]);
    assert!(matches!(
        coarser,
        Err(CliError::Region(RegionError::ZoomCoarserThanCorner { .. }))
    ));

    let format = run_cli(&["tilesurf", "tiles", "--from", "5/1/1", "--ext", "webp"]);
    assert!(matches!(
        format,
        Err(CliError::Region(RegionError::UnsupportedFormat(_)))
    ));
}

#[test]
fn test_config_file_overrides() {
    let mirror = ramp_mirror();
    let config = mirror.path().join("tilesurf.yaml");
    fs::write(&config, "tile_size: 2\nmax_zoom: 5\nthreads: 1\n").unwrap();

    let output = run_cli(&[
        "tilesurf",
        "region",
        "--from",
        "5/10/12",
        "--tile-type",
        "dem",
        "--ext",
        "txt",
        "--config",
        config.to_str().unwrap(),
        "--tiles-dir",
        mirror.path().to_str().unwrap(),
    ])
    .unwrap();
    let summary: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(summary["shape"], serde_json::json!([2, 2]));

    let too_fine = run_cli(&[
        "tilesurf",
        "tiles",
        "--from",
        "5/10/12",
        "--zoom",
        "6",
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(matches!(
        too_fine,
        Err(CliError::Region(RegionError::ZoomAboveMax { .. }))
    ));
}
