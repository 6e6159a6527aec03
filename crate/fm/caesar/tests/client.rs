//! `caesar-client` argument handling, without an HSM.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn client_cmd() -> Command {
    let mut cmd = Command::cargo_bin("caesar-client").unwrap();
    cmd.env_remove("MD_LIB").env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_an_operation_is_required() {
    client_cmd()
        .args(["0", "Hello", "--md-lib", "/nonexistent/libethsm.so"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("-E").and(predicate::str::contains("-D")));
}

#[test]
fn test_encrypt_and_decrypt_conflict() {
    client_cmd()
        .args(["0", "-E", "-D", "Hello", "--md-lib", "/nonexistent/libethsm.so"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_library_path_is_required() {
    client_cmd()
        .args(["0", "-E", "Hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--md-lib"));
}

#[test]
fn test_missing_library_from_env() {
    client_cmd()
        .env("MD_LIB", "/nonexistent/libethsm.so")
        .args(["0", "-E", "Hello World."])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "ERROR: Error loading the Message Dispatch library",
        ));
}
