#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

/// Environment variables the binary reads; cleared so the host cannot leak in.
const TEMPCLEAN_ENV: &[&str] = &[
    "TEMPCLEAN_WATCH_DIRECTORY",
    "TEMPCLEAN_WATCH_PREFIX",
    "TEMPCLEAN_SCAN_INTERVAL_SECS",
    "TEMPCLEAN_TIMESTAMP_SOURCE",
    "TEMPCLEAN_DRY_RUN",
    "TEMPCLEAN_JSONL_ENABLED",
    "TEMPCLEAN_JSONL_LOG",
    "TEMPCLEAN_OUTPUT_FORMAT",
];

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_tempclean") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) {
        "tempclean.exe"
    } else {
        "tempclean"
    };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve tempclean binary path for integration test"),
    }
}

/// Run the binary with `home` as `$HOME`, so the default config path and the
/// default watch directory both live inside the test sandbox.
pub fn run_cli_case(case_name: &str, home: &Path, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, home, args, &[])
}

fn base_command(home: &Path, args: &[&str]) -> Command {
    let mut command = Command::new(resolve_bin_path());
    command.args(args).env("HOME", home).env("RUST_BACKTRACE", "1");
    for name in TEMPCLEAN_ENV {
        command.env_remove(name);
    }
    command
}

/// Start the binary in the background with piped stdout/stderr.
pub fn spawn_cli(home: &Path, args: &[&str]) -> Child {
    base_command(home, args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tempclean command")
}

pub fn run_cli_case_with_env(
    case_name: &str,
    home: &Path,
    args: &[&str],
    env: &[(&str, &str)],
) -> CmdResult {
    let root = std::env::temp_dir().join("tempclean-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = base_command(home, args);
    for (name, value) in env {
        command.env(name, value);
    }
    let output = command.output().expect("execute tempclean command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("env={env:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Parse every non-empty stdout line as JSON.
pub fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("bad JSON line {l:?}: {e}")))
        .collect()
}
