use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn demo() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cmdtree-demo"));
    cmd.env_remove("CMDTREE_DEMO_CONFIG");
    cmd
}

fn run(args: &[&str]) -> Output {
    demo().args(args).output().expect("failed to run cmdtree-demo")
}

fn run_with_config(config: &Path, args: &[&str]) -> Output {
    demo()
        .env("CMDTREE_DEMO_CONFIG", config)
        .args(args)
        .output()
        .expect("failed to run cmdtree-demo")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// Command resolution
// ============================================================================

#[test]
fn test_echo_prints_arguments() {
    let output = run(&["echo", "hello", "world"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "hello world\n");
}

#[test]
fn test_alias_resolves_to_echo() {
    let output = run(&["say", "-u", "hi"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "HI\n");
}

#[test]
fn test_nested_command_with_inherited_flag() {
    let output = run(&["echo", "times", "-t", "3", "--upper", "go"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "GO\nGO\nGO\n");
}

#[test]
fn test_unknown_command_suggests_and_fails() {
    let output = run(&["ecko", "x"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("unknown command \"ecko\" for \"cmdtree-demo\""), "{err}");
    assert!(err.contains("Did you mean this?\n\techo\n"), "{err}");
    assert!(err.contains("Run 'cmdtree-demo --help' for usage."), "{err}");
}

#[test]
fn test_print_collects_repeated_tags() {
    let output = run(&["print", "--tag", "a", "body", "--tag=b"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "[a,b] body\n");
}

// ============================================================================
// Validation errors
// ============================================================================

#[test]
fn test_greet_rejects_unknown_name() {
    let output = run(&["greet", "bobb"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("invalid argument \"bobb\" for \"cmdtree-demo greet\""), "{err}");
}

#[test]
fn test_missing_positional_prints_usage() {
    let output = run(&["print"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Error: requires at least 1 arg(s), only received 0"), "{err}");
    // Usage goes to stderr when no output stream is configured.
    assert!(err.contains("Usage:\n  cmdtree-demo print [string to print] [flags]"), "{err}");
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_invalid_log_level_is_reported() {
    let output = run(&["--log-level", "loud", "echo", "x"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid log level: loud"));
}

// ============================================================================
// Help, version and schema
// ============================================================================

#[test]
fn test_root_help_lists_commands() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Available Commands:"), "{out}");
    for name in ["echo", "greet", "print", "schema", "help", "completion"] {
        assert!(out.contains(&format!("  {name} ")), "missing {name} in {out}");
    }
    assert!(out.contains("--log-level"), "{out}");
}

#[test]
fn test_help_topic_for_nested_command() {
    let output = run(&["help", "echo", "times"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("cmdtree-demo echo times [# times] [string to echo] [flags]"), "{out}");
    assert!(out.contains("Global Flags:"), "{out}");
    assert!(out.contains("--upper"), "{out}");
}

#[test]
fn test_version_flag() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        format!("cmdtree-demo version {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn test_schema_json_describes_tree() {
    let output = run(&["schema"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("\"name\": \"cmdtree-demo\""), "{out}");
    assert!(out.contains("\"name\": \"times\""), "{out}");
    assert!(out.contains("\"name\": \"log-level\""), "{out}");
}

#[test]
fn test_schema_rejects_unknown_format() {
    let output = run(&["schema", "-f", "toml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unsupported format 'toml'"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_prefix_matching_enabled_by_config() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("demo.yaml");
    fs::write(&path, "enable_prefix_matching: true\n").expect("failed to write config");

    let output = run_with_config(&path, &["pri", "ok"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "ok\n");

    let output = run(&["pri", "ok"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_config_file_fails_early() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let output = run_with_config(&dir.path().join("absent.yaml"), &["echo", "x"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("failed to load"));
}

#[test]
fn test_debug_log_level_emits_diagnostics() {
    let output = run(&["echo", "--log-level", "debug", "x"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "x\n");
    assert!(stderr(&output).contains("logging initialized"));
}
