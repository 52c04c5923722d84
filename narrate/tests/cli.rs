use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CATALOG: &str = r#"
[[tracks]]
name = "4-7-8 Breathing"
slug = "breath-01-478"
kind = "breathing"
engine = "neural"
segments = ["<speak>Breathe in.</speak>"]

[[tracks]]
name = "The Keeper of Tides"
slug = "01-keeper-of-tides"
kind = "story"
voice = "Danielle"
segments = [
    "<speak>one</speak>",
    "<speak>two</speak>",
    "<speak>three</speak>",
    "<speak>four</speak>",
]
"#;

fn narrate_cmd(home: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("narrate").into();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

fn write_catalog(temp_dir: &TempDir, content: &str) -> PathBuf {
    let path = temp_dir.path().join("catalog.toml");
    fs::write(&path, content).unwrap();
    path
}

fn config_file(temp_dir: &TempDir) -> PathBuf {
    temp_dir
        .path()
        .join(".config")
        .join("cli-programs")
        .join("narrate.toml")
}

// ============================================================================
// CLI Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    let temp_dir = TempDir::new().unwrap();
    narrate_cmd(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Synthesize SSML narration catalogs"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let temp_dir = TempDir::new().unwrap();
    narrate_cmd(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("narrate"));
}

// ============================================================================
// List Command Tests
// ============================================================================

#[test]
fn test_list_shows_tracks() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(&temp_dir, CATALOG);

    narrate_cmd(temp_dir.path())
        .args(["list", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("breath-01-478"))
        .stdout(predicate::str::contains("01-keeper-of-tides"))
        .stdout(predicate::str::contains("The Keeper of Tides"));
}

#[test]
fn test_list_filters_by_kind() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(&temp_dir, CATALOG);

    narrate_cmd(temp_dir.path())
        .args(["list", "--kind", "story", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("01-keeper-of-tides"))
        .stdout(predicate::str::contains("breath-01-478").not());
}

#[test]
fn test_list_without_catalog_fails() {
    let temp_dir = TempDir::new().unwrap();

    narrate_cmd(temp_dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No catalog given"));
}

#[test]
fn test_list_rejects_invalid_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(
        &temp_dir,
        r#"
[[tracks]]
name = "Escape"
slug = "../escape"
segments = ["<speak>x</speak>"]
"#,
    );

    narrate_cmd(temp_dir.path())
        .args(["list", "--catalog"])
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid catalog"));
}

#[test]
fn test_shipped_catalogs_are_valid() {
    let temp_dir = TempDir::new().unwrap();
    let shipped = [
        ("driftlab.toml", 4, "01-keeper-of-tides"),
        ("stories.toml", 20, "story-20-bookshop"),
        ("meditations.toml", 6, "med-06-arriving-rest"),
        ("breathing.toml", 4, "breath-02-box"),
    ];

    for (file, tracks, slug) in shipped {
        let catalog = Path::new(env!("CARGO_MANIFEST_DIR")).join("catalog").join(file);

        let output = narrate_cmd(temp_dir.path())
            .args(["list", "--catalog"])
            .arg(&catalog)
            .assert()
            .success()
            .stdout(predicate::str::contains(slug))
            .get_output()
            .stdout
            .clone();

        let listed = String::from_utf8(output).unwrap().lines().count();
        assert_eq!(listed, tracks, "{}", file);
    }
}

// ============================================================================
// Run Command Tests (dry run only; no provider calls)
// ============================================================================

#[test]
fn test_dry_run_prints_plan() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(&temp_dir, CATALOG);
    let output_dir = temp_dir.path().join("audio");

    narrate_cmd(temp_dir.path())
        .args(["run", "--dry-run", "--catalog"])
        .arg(&catalog)
        .arg("--output-dir")
        .arg(&output_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run: 2 tracks, 5 segments"))
        .stdout(predicate::str::contains("breath-01-478.mp3"))
        .stdout(predicate::str::contains("Danielle"))
        .stdout(predicate::str::contains("neural"));

    assert!(!output_dir.exists());
}

#[test]
fn test_dry_run_with_only() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(&temp_dir, CATALOG);

    narrate_cmd(temp_dir.path())
        .args(["run", "--dry-run", "--only", "01-keeper-of-tides", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run: 1 tracks, 4 segments"))
        .stdout(predicate::str::contains("breath-01-478").not());
}

#[test]
fn test_run_unknown_slug_fails() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(&temp_dir, CATALOG);

    narrate_cmd(temp_dir.path())
        .args(["run", "--dry-run", "--only", "nope", "--catalog"])
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown track slug: nope"));
}

#[test]
fn test_run_voice_override() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(&temp_dir, CATALOG);

    narrate_cmd(temp_dir.path())
        .args(["run", "--dry-run", "--voice", "Joanna", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("Joanna"))
        // Track-level voice still wins
        .stdout(predicate::str::contains("Danielle"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_show_defaults() {
    let temp_dir = TempDir::new().unwrap();

    narrate_cmd(temp_dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("voice = \"Ruth\""))
        .stdout(predicate::str::contains("inter_request_delay_ms = 1000"));
}

#[test]
fn test_config_set_voice_persists() {
    let temp_dir = TempDir::new().unwrap();

    narrate_cmd(temp_dir.path())
        .args(["config", "set-voice", "Danielle"])
        .assert()
        .success();

    let content = fs::read_to_string(config_file(&temp_dir)).unwrap();
    assert!(content.contains("voice = \"Danielle\""));
}

#[test]
fn test_config_set_catalog_then_list() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(&temp_dir, CATALOG);

    narrate_cmd(temp_dir.path())
        .args(["config", "set-catalog"])
        .arg(&catalog)
        .assert()
        .success();

    narrate_cmd(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("breath-01-478"));
}

#[test]
fn test_malformed_config_names_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = write_catalog(&temp_dir, CATALOG);
    let path = config_file(&temp_dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "voice = [\n").unwrap();

    narrate_cmd(temp_dir.path())
        .args(["run", "--dry-run", "--catalog"])
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"))
        .stderr(predicate::str::contains("narrate.toml"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let temp_dir = TempDir::new().unwrap();

    narrate_cmd(temp_dir.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config_file(&temp_dir).exists());

    narrate_cmd(temp_dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
