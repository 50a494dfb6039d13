use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("bfvm").unwrap();
    cmd.env_remove("BFVM_EOF")
        .env_remove("BFVM_TAPE_SIZE")
        .env_remove("BFVM_MAX_STEPS")
        .timeout(Duration::from_secs(5));
    cmd
}

fn stdout_of(cmd: &mut Command) -> Vec<u8> {
    cmd.assert().success().get_output().stdout.clone()
}

#[test]
fn reads_from_stdin_and_echoes_byte() {
    let out = stdout_of(cargo_bin().args(["-p", ",."]).write_stdin("Z"));
    assert_eq!(out, b"Z\n");
}

#[test]
fn inline_input_is_echoed() {
    let out = stdout_of(cargo_bin().args(["-p", ",.", "-i", "X"]));
    assert_eq!(out, vec![88, b'\n']);
}

#[test]
fn empty_input_with_zero_policy_outputs_zero() {
    let out = stdout_of(cargo_bin().args(["-p", ",.", "-i", "", "-e", "1"]));
    assert_eq!(out, vec![0, b'\n']);
}

#[test]
fn default_policy_leaves_cell_unchanged() {
    let out = stdout_of(cargo_bin().args(["-p", "+++,.", "-i", ""]));
    assert_eq!(out, vec![3, b'\n']);
}

#[test]
fn max_policy_sets_255() {
    let out = stdout_of(cargo_bin().args(["-p", ",.", "-e", "2"]).write_stdin(""));
    assert_eq!(out, vec![255, b'\n']);
}

#[test]
fn env_supplies_policy_when_flag_missing() {
    let out = stdout_of(cargo_bin().env("BFVM_EOF", "2").args(["-p", ",.", "-i", ""]));
    assert_eq!(out, vec![255, b'\n']);
}

#[test]
fn flag_overrides_env_policy() {
    let out = stdout_of(cargo_bin().env("BFVM_EOF", "2").args(["-p", ",.", "-i", "", "-e", "1"]));
    assert_eq!(out, vec![0, b'\n']);
}

#[test]
fn invalid_policy_is_rejected() {
    cargo_bin()
        .args(["-p", ",.", "-e", "7"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid end-of-input policy '7'"));
}
