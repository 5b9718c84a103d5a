//! Launcher behavior tests: usage, environment, exit codes, cleanup.

use std::path::{Path, PathBuf};

use crate::common::*;

/// Print both toggles as `<chmod>|<mknod>`.
const SHOW_TOGGLES: &str = r#"printf '%s|%s' "$LIBEAT_FUNCTION_CHMOD" "$LIBEAT_FUNCTION_MKNOD""#;

/// Print the loader preload variable.
const SHOW_PRELOAD: &str = r#"printf %s "$LD_PRELOAD""#;

fn assert_no_leftovers(tmp: &Path) {
    let left = entries_of(tmp);
    assert!(left.is_empty(), "left behind: {:?}", left);
}

// ============================================================================
// Usage
// ============================================================================

#[test]
fn test_no_arguments_prints_usage_and_fails() {
    let output = run_nerfed::<&str>(&[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr_of(&output).contains("Usage"),
        "stderr: {}",
        stderr_of(&output)
    );
}

#[test]
fn test_options_without_command_fail() {
    let output = run_nerfed(&["-c", "-n"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_help_goes_to_stderr_and_fails() {
    for flag in ["-h", "--help"] {
        let output = run_nerfed(&[flag]);

        assert_eq!(output.status.code(), Some(1), "{}", flag);
        assert!(output.stdout.is_empty(), "{} wrote to stdout", flag);
        let stderr = stderr_of(&output);
        assert!(stderr.contains("LD_PRELOAD"), "stderr: {}", stderr);
        assert!(stderr.contains("--chmod"), "stderr: {}", stderr);
        assert!(stderr.contains("--mknod"), "stderr: {}", stderr);
    }
}

#[test]
fn test_help_does_not_run_command() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");

    let output = run_nerfed(&["--help", "touch", marker.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!marker.exists());
}

#[test]
fn test_unknown_option_fails() {
    let output = run_nerfed(&["-x", "true"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!stderr_of(&output).is_empty());
}

// ============================================================================
// Running the command
// ============================================================================

#[test]
fn test_command_found_on_path() {
    let output = run_nerfed(&["-c", "true"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
}

#[test]
fn test_exit_code_is_propagated() {
    let tmp = tempfile::tempdir().unwrap();

    let output = run_nerfed_with_tmpdir(tmp.path(), &["sh", "-c", "exit 42"]);
    assert_eq!(output.status.code(), Some(42));

    let output = run_nerfed_with_tmpdir(tmp.path(), &["false"]);
    assert_eq!(output.status.code(), Some(1));

    assert_no_leftovers(tmp.path());
}

#[test]
fn test_missing_command_exits_127_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();

    let output = run_nerfed_with_tmpdir(tmp.path(), &["-c", "/nonexistent/nerfed-no-such-command"]);

    assert_eq!(output.status.code(), Some(127));
    let stderr = stderr_of(&output);
    assert!(
        stderr.contains("nerfed: /nonexistent/nerfed-no-such-command"),
        "stderr: {}",
        stderr
    );
    assert_no_leftovers(tmp.path());
}

#[test]
fn test_signal_death_maps_to_128_plus_signal() {
    let tmp = tempfile::tempdir().unwrap();

    let output = run_nerfed_with_tmpdir(tmp.path(), &["sh", "-c", "kill -TERM $$"]);

    assert_eq!(output.status.code(), Some(128 + libc::SIGTERM));
    assert_no_leftovers(tmp.path());
}

// ============================================================================
// Environment
// ============================================================================

#[test]
fn test_chmod_option_sets_only_chmod_toggle() {
    for flag in ["-c", "--chmod"] {
        let output = run_nerfed(&[flag, "sh", "-c", SHOW_TOGGLES]);
        assert!(output.status.success(), "stderr: {}", stderr_of(&output));
        assert_eq!(stdout_of(&output), "1|", "{}", flag);
    }
}

#[test]
fn test_mknod_option_sets_only_mknod_toggle() {
    for flag in ["-n", "-m", "--mknod"] {
        let output = run_nerfed(&[flag, "sh", "-c", SHOW_TOGGLES]);
        assert!(output.status.success(), "stderr: {}", stderr_of(&output));
        assert_eq!(stdout_of(&output), "|1", "{}", flag);
    }
}

#[test]
fn test_combined_options_set_both_toggles() {
    let output = run_nerfed(&["-cn", "sh", "-c", SHOW_TOGGLES]);
    assert_eq!(stdout_of(&output), "1|1");
}

#[test]
fn test_no_options_set_no_toggles() {
    let output = run_nerfed(&["sh", "-c", SHOW_TOGGLES]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "|");
}

#[test]
fn test_options_after_command_belong_to_command() {
    let script = r#"printf '%s|%s|%s' "$1" "$LIBEAT_FUNCTION_CHMOD" "$LIBEAT_FUNCTION_MKNOD""#;
    let output = run_nerfed(&["sh", "-c", script, "sh", "--chmod"]);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "--chmod||");
}

#[test]
fn test_unrelated_environment_is_inherited() {
    let output = nerfed_command(&["sh", "-c", r#"printf %s "$NERFED_TEST_MARKER""#])
        .env("NERFED_TEST_MARKER", "kept")
        .output()
        .unwrap();

    assert_eq!(stdout_of(&output), "kept");
}

// ============================================================================
// Shim artifact
// ============================================================================

#[test]
#[cfg(target_os = "linux")]
fn test_embedded_shim_is_extracted_and_removed() {
    let tmp = tempfile::tempdir().unwrap();

    let output = run_nerfed_with_tmpdir(tmp.path(), &["sh", "-c", SHOW_PRELOAD]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    let preload = PathBuf::from(stdout_of(&output));
    assert_eq!(preload.parent(), Some(tmp.path()), "LD_PRELOAD={}", preload.display());
    let name = preload.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("libeat-function."), "{}", name);
    assert!(name.ends_with(".so"), "{}", name);

    assert!(!preload.exists(), "{} left behind", preload.display());
    assert_no_leftovers(tmp.path());
}

#[test]
#[cfg(target_os = "linux")]
fn test_extracted_shim_exists_while_command_runs() {
    let tmp = tempfile::tempdir().unwrap();

    let output = run_nerfed_with_tmpdir(tmp.path(), &["sh", "-c", r#"test -f "$LD_PRELOAD""#]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
}

#[test]
#[cfg(target_os = "linux")]
fn test_temp_dir_with_space_is_rejected_and_cleaned_up() {
    let parent = tempfile::tempdir().unwrap();
    let tmp = parent.path().join("a b");
    std::fs::create_dir(&tmp).unwrap();

    let output = run_nerfed_with_tmpdir(&tmp, &["-c", "true"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("list separator"), "stderr: {}", stderr);
    assert_no_leftovers(&tmp);
}

#[test]
#[cfg(target_os = "linux")]
fn test_override_library_is_used_in_place() {
    let Some(lib) = agent_library() else {
        println!("SKIPPED: nerfed-agent shim library not built");
        return;
    };
    let tmp = tempfile::tempdir().unwrap();

    let output = nerfed_command(&["-c", "sh", "-c", SHOW_PRELOAD])
        .env("NERFED_AGENT_LIB", &lib)
        .env("TMPDIR", tmp.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(PathBuf::from(stdout_of(&output)), lib.canonicalize().unwrap());
    assert!(lib.is_file());
    assert_no_leftovers(tmp.path());
}

#[test]
fn test_missing_override_library_fails() {
    let output = nerfed_command(&["true"])
        .env("NERFED_AGENT_LIB", "/nonexistent/libnerfed_agent.so")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr_of(&output).contains("NERFED_AGENT_LIB"),
        "stderr: {}",
        stderr_of(&output)
    );
}
