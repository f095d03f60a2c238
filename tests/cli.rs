use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn eval_prints_the_result() {
    let mut cmd = Command::cargo_bin("sorrel").expect("binary exists");
    cmd.arg("eval").arg("(+ 20 22)");
    cmd.assert().success().stdout("42\n");
}

#[test]
fn eval_suppresses_nil() {
    let mut cmd = Command::cargo_bin("sorrel").expect("binary exists");
    cmd.arg("eval").arg("; nothing here");
    cmd.assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn eval_reports_errors_on_stderr() {
    let mut cmd = Command::cargo_bin("sorrel").expect("binary exists");
    cmd.arg("eval").arg("(boom)");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("undefined symbol: boom"));
}

#[test]
fn run_executes_a_script_file() {
    let dir = tempdir().expect("create temp dir");
    let script_path = dir.path().join("greet.srl");
    fs::write(&script_path, "(printf \"hi %d\\n\" 42)\n(* 6 7)\n").expect("write script");

    let mut cmd = Command::cargo_bin("sorrel").expect("binary exists");
    cmd.arg("run").arg(&script_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("hi 42").and(predicate::str::contains("42\n")));
}

#[test]
fn run_attributes_errors_to_the_file() {
    let dir = tempdir().expect("create temp dir");
    let script_path = dir.path().join("bad.srl");
    fs::write(&script_path, "(var x 1)\n(missing-fn x)\n").expect("write script");

    let mut cmd = Command::cargo_bin("sorrel").expect("binary exists");
    cmd.arg("run").arg(&script_path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("undefined symbol: missing-fn"));
}

#[test]
fn run_rejects_a_missing_file() {
    let mut cmd = Command::cargo_bin("sorrel").expect("binary exists");
    cmd.arg("run").arg("no-such-file.srl");
    cmd.assert().failure();
}
