// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

use assert_cmd::{cargo_bin, prelude::*};
use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_atcocif2gtfs_create_directory() {
    let output_dir = TempDir::new().expect("create temp dir failed");
    Command::new(cargo_bin!("atcocif2gtfs"))
        .arg("../tests/fixtures/atcocif2gtfs/minimal")
        .arg("--gtfs")
        .arg(output_dir.path().to_str().unwrap())
        .assert()
        .success();
    assert!(output_dir.path().join("agency.txt").is_file());
    assert!(output_dir.path().join("stops.txt").is_file());
    assert!(output_dir.path().join("routes.txt").is_file());
    assert!(output_dir.path().join("trips.txt").is_file());
    assert!(output_dir.path().join("stop_times.txt").is_file());
    assert!(output_dir.path().join("calendar.txt").is_file());
    let agencies = std::fs::read_to_string(output_dir.path().join("agency.txt")).unwrap();
    assert!(agencies.contains("Big Bus Operator"));
}

#[test]
fn test_atcocif2gtfs_create_zip() {
    let output_dir = TempDir::new().expect("create temp dir failed");
    let gtfs_zip = output_dir.path().join("gtfs.zip");
    assert!(!gtfs_zip.exists());
    Command::new(cargo_bin!("atcocif2gtfs"))
        .arg("../tests/fixtures/atcocif2gtfs/minimal/example.cif")
        .arg("--gtfs")
        .arg(gtfs_zip.to_str().unwrap())
        .assert()
        .success();
    assert!(gtfs_zip.is_file());
}

#[test]
fn test_atcocif2gtfs_report() {
    let output_dir = TempDir::new().expect("create temp dir failed");
    let report_path = output_dir.path().join("report.json");
    Command::new(cargo_bin!("atcocif2gtfs"))
        .arg("../tests/fixtures/atcocif2gtfs/minimal")
        .arg("--gtfs")
        .arg(output_dir.path().join("gtfs.zip").to_str().unwrap())
        .arg("--report")
        .arg(report_path.to_str().unwrap())
        .assert()
        .success();
    let report = std::fs::read_to_string(report_path).unwrap();
    // No grid transform was configured so both stops stay at (0, 0).
    assert!(report.contains("ZeroCoordinates"));
}
