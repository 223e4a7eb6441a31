use std::{path::PathBuf, process::Command};

fn asset(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join(name)
}

#[test]
fn bundled_demo_replays_to_completion() {
    let output = Command::new(env!("CARGO_BIN_EXE_rotation-assist"))
        .arg("--config")
        .arg(asset("demo_config.toml"))
        .arg("--scenario")
        .arg(asset("demo_scenario.toml"))
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run rotation-assist");

    assert!(
        output.status.success(),
        "demo replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout is utf-8");
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("tick 0: paused (loading)"));
    assert!(stdout.contains("paused (window unfocused)"));
    assert!(stdout.contains("paused (in town)"));
    assert!(
        stdout.contains("10 ticks, "),
        "summary counts every repeated frame:\n{stdout}"
    );
}

#[test]
fn missing_scenario_is_reported() {
    let output = Command::new(env!("CARGO_BIN_EXE_rotation-assist"))
        .arg("--scenario")
        .arg(asset("no_such_scenario.toml"))
        .output()
        .expect("failed to run rotation-assist");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no_such_scenario.toml"),
        "error names the scenario path: {stderr}"
    );
}
