//! CLI-level checks of the operator-triggered commands named in spec.md
//! §6 ("photon init", "photon config", ...), run against the built binary
//! with `-C <path>` so tests can run in parallel without touching the
//! process's current directory.

use std::process::Command;

use tempfile::TempDir;

fn photon(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_photon"));
    cmd.arg("-C").arg(dir.path());
    cmd
}

#[test]
fn init_writes_photon_dir_and_default_settings() {
    let dir = TempDir::new().unwrap();
    let status = photon(&dir).arg("init").status().unwrap();
    assert!(status.success());

    let settings_path = dir.path().join(".photon/settings.toml");
    assert!(settings_path.exists());
    let content = std::fs::read_to_string(&settings_path).unwrap();
    assert!(content.contains("[indexing]"));
    assert!(content.contains("[tools]"));
}

#[test]
fn init_is_idempotent_and_preserves_edits() {
    let dir = TempDir::new().unwrap();
    assert!(photon(&dir).arg("init").status().unwrap().success());

    let settings_path = dir.path().join(".photon/settings.toml");
    let mut content = std::fs::read_to_string(&settings_path).unwrap();
    content.push_str("\n# operator note\n");
    std::fs::write(&settings_path, &content).unwrap();

    assert!(photon(&dir).arg("init").status().unwrap().success());
    let after = std::fs::read_to_string(&settings_path).unwrap();
    assert!(after.contains("# operator note"), "second init must not overwrite an existing settings file");
}

#[test]
fn config_prints_resolved_toml_with_env_override() {
    let dir = TempDir::new().unwrap();
    assert!(photon(&dir).arg("init").status().unwrap().success());

    let output = photon(&dir)
        .arg("config")
        .env("PHOTON_TOOLS__GREP_MAX_RESULTS", "7")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("grep_max_results"));
}

#[test]
fn undo_with_empty_stack_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    assert!(photon(&dir).arg("init").status().unwrap().success());
    let output = photon(&dir).arg("undo").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("nothing to undo"));
}

#[test]
fn attempt_get_on_a_fresh_project_is_empty() {
    let dir = TempDir::new().unwrap();
    assert!(photon(&dir).arg("init").status().unwrap().success());
    let output = photon(&dir).args(["attempt", "get"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert!(value.get("intent").is_none_or(|v| v.is_null()));
}

#[test]
fn index_then_retrieve_symbol_round_trips_through_the_cli() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("lib.rs"), "fn greet() {}\n").unwrap();
    assert!(photon(&dir).arg("index").status().unwrap().success());

    let output = photon(&dir).args(["retrieve", "symbol", "greet"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("greet"));
}
