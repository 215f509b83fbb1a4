//! CLI surface smoke tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn capfor() -> Command {
    Command::cargo_bin("capfor").unwrap()
}

#[test]
fn help_lists_subcommands() {
    capfor()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("aggregate"))
        .stdout(predicate::str::contains("forecast"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("columns"));
}

#[test]
fn aggregate_fails_with_instructions_when_inputs_are_missing() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("capfor.toml");
    fs::write(
        &config,
        format!(
            r#"
[paths]
weather_grid = "{root}/no-such-grid.csv"
onshore_regions = "{root}/no-such-onshore.geojson"
offshore_regions = "{root}/no-such-offshore.geojson"
capacity_factors = "{root}/no-such-capfacts.csv"
regional_weather = "{root}/regional.csv"
output_dir = "{root}/results"
"#,
            root = dir.path().display()
        ),
    )
    .unwrap();

    capfor()
        .args(["--config", config.to_str().unwrap(), "aggregate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("missing input file"))
        .stdout(predicate::str::contains("no-such-grid.csv"));
}

#[test]
fn forecast_without_the_regional_dataset_points_at_aggregate() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("capfor.toml");
    fs::write(
        &config,
        format!(
            r#"
[paths]
regional_weather = "{root}/regional.csv"
capacity_factors = "{root}/capfacts.csv"
"#,
            root = dir.path().display()
        ),
    )
    .unwrap();

    capfor()
        .args(["--config", config.to_str().unwrap(), "forecast"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("capfor aggregate"));
}

#[test]
fn bad_config_is_rejected() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("capfor.toml");
    fs::write(&config, "[forecast]\ntest_fraction = 2.0\n").unwrap();

    capfor()
        .args(["--config", config.to_str().unwrap(), "aggregate"])
        .assert()
        .failure();
}
