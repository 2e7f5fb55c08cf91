#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::process::{Command, Stdio};

fn logfix() -> Command {
    Command::new(env!("CARGO_BIN_EXE_logfix"))
}

fn isolated(cmd: &mut Command, dir: &std::path::Path) {
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("USERPROFILE", dir)
        .env_remove("LOGPILOT_MODES")
        .env_remove("LOGPILOT_FIXES");
}

/// Scratch workspace with a `fixes/` tree holding two valid entries and one
/// incomplete one.
fn fixture_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let zephyr = dir.path().join("fixes/zephyr");
    std::fs::create_dir_all(&zephyr).unwrap();
    std::fs::write(
        zephyr.join("ord-undefined.yaml"),
        "pattern: \"undefined node 'ord,\"\n\
         regex: \"undefined node 'ord,[0-9]+'\"\n\
         tags: [zephyr, devicetree]\n\
         fix: |\n  Delete the build directory and rebuild with west build -p always\n\
         severity: error\n",
    )
    .unwrap();
    std::fs::write(
        zephyr.join("flash-overflow.yaml"),
        "pattern: \"region `FLASH' overflowed\"\n\
         tags: [zephyr, linker]\n\
         fix: Trim features or enable size optimizations\n\
         severity: error\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("fixes/incomplete.yaml"),
        "pattern: \"lonely pattern\"\n",
    )
    .unwrap();
    dir
}

#[test]
fn no_flags_prints_help() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Fix memory lookup/writer"));
}

#[test]
fn help_agent_prints_instructions() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd.args(["--help", "agent"]).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("AGENT SELF-UPDATE INSTRUCTIONS"));
    assert!(stdout.contains("fixes/{tag}/{short-description}.yaml"));
}

#[test]
fn query_finds_direct_substring_match() {
    let dir = fixture_workspace();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd
        .args(["--query", "devicetree error: undefined node 'ord,123'"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Pattern: undefined node 'ord,"), "out: {stdout}");
    assert!(stdout.contains("Tags: zephyr, devicetree"));
    assert!(stdout.contains("Delete the build directory"));
    assert!(stdout.contains("File: "));
}

#[test]
fn query_respects_tag_filter() {
    let dir = fixture_workspace();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd
        .args([
            "--query",
            "region `FLASH' overflowed by 512 bytes",
            "--tags",
            "devicetree",
        ])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    // The linker fix matches but carries no "devicetree" tag.
    assert!(!stdout.contains("Pattern: region `FLASH' overflowed"));
}

#[test]
fn check_scans_stdin_for_errors() {
    let dir = fixture_workspace();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let mut child = cmd
        .arg("--check")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(
            b"[LOGPARSE] mode: zephyr | 100 lines -> ~10 lines\n\
              [error] lines 40-41\n\
              devicetree error: undefined node 'ord,55'\n\
              all fine otherwise\n",
        )
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[LOGFIX CHECK]"), "out: {stdout}");
    assert!(stdout.contains("Pattern: undefined node 'ord,"));
}

#[test]
fn validate_reports_incomplete_entries() {
    let dir = fixture_workspace();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd.arg("--validate").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[LOGFIX VALIDATE] Checking 3 entries..."));
    assert!(stdout.contains("INVALID"));
    assert!(stdout.contains("missing required field: tags"));
}

#[test]
fn stats_summarizes_database() {
    let dir = fixture_workspace();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd.arg("--stats").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Total entries: 3"), "out: {stdout}");
    assert!(stdout.contains("Errors: 2"));
    assert!(stdout.contains("zephyr"));
    assert!(stdout.contains("linker"));
}

#[test]
fn stats_without_fixes_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd.arg("--stats").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no fixes directory found"));
}

#[test]
fn add_from_validates_and_reports() {
    let dir = fixture_workspace();
    std::fs::write(
        dir.path().join("new-fix.yaml"),
        "pattern: \"CONFIG_FOO undeclared\"\ntags: [kconfig]\nfix: enable CONFIG_FOO\n",
    )
    .unwrap();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd.args(["--add-from", "new-fix.yaml"]).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("loaded and validated"));
    assert!(stdout.contains("Pattern: CONFIG_FOO undeclared"));
    assert!(stdout.contains("Tags: kconfig"));
}

#[test]
fn add_from_rejects_invalid_entry() {
    let dir = fixture_workspace();
    std::fs::write(dir.path().join("broken.yaml"), "pattern: \"x\"\n").unwrap();
    let mut cmd = logfix();
    isolated(&mut cmd, dir.path());
    let output = cmd.args(["--add-from", "broken.yaml"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("validation failed"));
}

#[test]
fn env_fixes_dir_is_used_when_local_missing() {
    let work = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    std::fs::write(
        store.path().join("one.yaml"),
        "pattern: \"known error text\"\ntags: [misc]\nfix: do the fix\n",
    )
    .unwrap();
    let mut cmd = logfix();
    isolated(&mut cmd, work.path());
    let output = cmd
        .env("LOGPILOT_FIXES", store.path())
        .args(["--query", "hit the known error text here"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Pattern: known error text"), "out: {stdout}");
}
