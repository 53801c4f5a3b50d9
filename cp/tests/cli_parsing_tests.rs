//! CLI Argument Parsing Compatibility Tests for cp
//!
//! These tests verify that command-line arguments are parsed correctly and maintain
//! backward compatibility. The focus is on ensuring that flags and their aliases
//! continue to be accepted across versions.

use assert_cmd::Command;

/// Test that --help output is generated without errors
#[test]
fn test_help_runs() {
    Command::cargo_bin("cp")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

/// Test --version flag works
#[test]
fn test_version_runs() {
    Command::cargo_bin("cp")
        .unwrap()
        .arg("--version")
        .assert()
        .success();
}

// ============================================================================
// Recursive Flag Parsing Tests
// ============================================================================

#[test]
fn test_recursive_short() {
    Command::cargo_bin("cp")
        .unwrap()
        .args(["-r", "--help"])
        .assert()
        .success();
}

#[test]
fn test_recursive_short_uppercase_alias() {
    Command::cargo_bin("cp")
        .unwrap()
        .args(["-R", "--help"])
        .assert()
        .success();
}

#[test]
fn test_recursive_long() {
    Command::cargo_bin("cp")
        .unwrap()
        .args(["--recursive", "--help"])
        .assert()
        .success();
}

// ============================================================================
// Output Flag Parsing Tests
// ============================================================================

#[test]
fn test_verbose_levels() {
    for flag in ["-v", "-vv", "-vvv", "--verbose"] {
        Command::cargo_bin("cp")
            .unwrap()
            .args([flag, "--help"])
            .assert()
            .success();
    }
}

#[test]
fn test_quiet_and_summary() {
    Command::cargo_bin("cp")
        .unwrap()
        .args(["-q", "--summary", "--help"])
        .assert()
        .success();
}

/// Unknown flags are usage errors reported by the argument parser
#[test]
fn test_unknown_flag_rejected() {
    Command::cargo_bin("cp")
        .unwrap()
        .args(["--no-such-flag", "a", "b"])
        .assert()
        .failure();
}

/// `cp` has no append flag, that one belongs to `tee`
#[test]
fn test_append_flag_rejected() {
    Command::cargo_bin("cp")
        .unwrap()
        .args(["-a", "a", "b"])
        .assert()
        .failure();
}
