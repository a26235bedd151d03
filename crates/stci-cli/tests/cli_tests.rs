use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ── Fixture helpers ────────────────────────────────────────────────────────

/// Create a data directory with the canned observation fixtures and a
/// methodology document.
///
/// Layout:
///   <tmp>/fixtures/observations.sample.json   (gpt-4o, claude-3.5-sonnet, gpt-4o-mini)
///   <tmp>/fixtures/methodology.json           (STCI-ALL + STCI-FRONTIER basket)
fn create_data_dir() -> TempDir {
    let tmp = TempDir::new().expect("failed to create temp dir");
    write_fixtures(tmp.path());
    tmp
}

fn write_fixtures(base: &Path) {
    let fixtures = base.join("fixtures");
    fs::create_dir_all(&fixtures).unwrap();

    let observation = |provider: &str, model: &str, input: f64, output: f64| {
        serde_json::json!({
            "observation_id": format!("obs-2025-06-01-{provider}-{}", model.replace('/', "-")),
            "schema_version": "1.0.0",
            "provider": provider,
            "model_id": model,
            "model_display_name": model,
            "input_rate_usd_per_1m": input,
            "output_rate_usd_per_1m": output,
            "effective_date": "2025-06-01",
            "collected_at": "2025-06-01T00:30:00Z",
            "source_url": "https://openrouter.ai/api/v1/models",
            "source_tier": "T1",
            "currency": "USD",
            "collection_method": "fixture",
            "confidence_level": "high"
        })
    };
    let observations = serde_json::json!([
        observation("openai", "openai/gpt-4o", 2.50, 10.00),
        observation("anthropic", "anthropic/claude-3.5-sonnet", 3.00, 15.00),
        observation("openai", "openai/gpt-4o-mini", 0.15, 0.60),
    ]);
    fs::write(
        fixtures.join("observations.sample.json"),
        serde_json::to_string_pretty(&observations).unwrap(),
    )
    .unwrap();

    let methodology = serde_json::json!({
        "methodology_version": "1.0.0",
        "output_ratio": 3.0,
        "min_basket_coverage": 0.5,
        "indices": {
            "STCI-ALL": { "description": "All eligible models" },
            "STCI-FRONTIER": {
                "models": ["openai/gpt-4o", "anthropic/claude-3.5-sonnet"]
            }
        }
    });
    fs::write(
        fixtures.join("methodology.json"),
        serde_json::to_string_pretty(&methodology).unwrap(),
    )
    .unwrap();
}

fn stci() -> Command {
    Command::cargo_bin("stci").expect("binary builds")
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    stci()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("collect"))
        .stdout(predicate::str::contains("index"))
        .stdout(predicate::str::contains("latest"));
}

#[test]
fn test_collect_fixtures_writes_observations_and_raw_archive() {
    let data = create_data_dir();

    stci()
        .args(["-d"])
        .arg(data.path())
        .args(["collect", "--fixtures", "--date", "2026-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Collection Complete"))
        .stdout(predicate::str::contains("Valid stored:    3"));

    let stored = fs::read_to_string(data.path().join("observations/2026-01-01.jsonl")).unwrap();
    assert_eq!(stored.lines().count(), 3);
    assert!(stored.contains("obs-2026-01-01-openai-openai-gpt-4o"));
    assert!(data.path().join("raw/fixture/2026-01-01.json").exists());
}

#[test]
fn test_collect_dry_run_writes_nothing() {
    let data = create_data_dir();

    stci()
        .args(["-d"])
        .arg(data.path())
        .args(["collect", "--fixtures", "--date", "2026-01-01", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run"));

    assert!(!data.path().join("observations/2026-01-01.jsonl").exists());
    assert!(!data.path().join("raw/fixture/2026-01-01.json").exists());
}

#[test]
fn test_collect_then_index_then_latest() {
    let data = create_data_dir();

    stci()
        .args(["-d"])
        .arg(data.path())
        .args(["collect", "--fixtures", "--date", "2026-01-01"])
        .assert()
        .success();

    let assert = stci()
        .args(["-d"])
        .arg(data.path())
        .args(["index", "--date", "2026-01-01", "--json"])
        .assert()
        .success();
    let output: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("index emits JSON");

    let all = &output["indices"]["STCI-ALL"];
    assert_eq!(all["model_count"], 3);
    assert_eq!(all["input_rate"], 1.88);
    assert_eq!(all["output_rate"], 8.53);
    assert_eq!(all["blended_rate"], 6.87);

    // Full basket present: the frontier index computes too.
    assert_eq!(output["indices"]["STCI-FRONTIER"]["model_count"], 2);
    assert_eq!(output["verification_hash"].as_str().unwrap().len(), 16);

    assert!(data.path().join("indices/2026-01-01.json").exists());

    let latest = stci()
        .args(["-d"])
        .arg(data.path())
        .args(["latest", "--json"])
        .assert()
        .success();
    let latest_output: serde_json::Value =
        serde_json::from_slice(&latest.get_output().stdout).unwrap();
    assert_eq!(latest_output["verification_hash"], output["verification_hash"]);
}

#[test]
fn test_index_without_observations_fails_naming_date() {
    let data = create_data_dir();

    stci()
        .args(["-d"])
        .arg(data.path())
        .args(["index", "--date", "2026-03-15"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2026-03-15"));
}

#[test]
fn test_latest_without_any_index_fails() {
    let data = create_data_dir();

    stci()
        .args(["-d"])
        .arg(data.path())
        .arg("latest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no computed index"));
}

#[test]
fn test_sqlite_backend_roundtrip() {
    let data = create_data_dir();

    stci()
        .args(["-d"])
        .arg(data.path())
        .args(["--storage", "sqlite"])
        .args(["collect", "--fixtures", "--date", "2026-01-01"])
        .assert()
        .success();

    // Observations live in the database, not the filesystem.
    assert!(!data.path().join("observations/2026-01-01.jsonl").exists());
    assert!(data.path().join("stci.sqlite").exists());

    stci()
        .args(["-d"])
        .arg(data.path())
        .args(["--storage", "sqlite"])
        .args(["index", "--date", "2026-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STCI-ALL"));
}
