//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use temp_cleaner::core::config::{Config, validate_prefix};
use temp_cleaner::core::errors::CleanerError;
use temp_cleaner::daemon::loop_main::CleanerDaemon;
use temp_cleaner::daemon::signals::SignalHandler;
use temp_cleaner::logger::console::{ConsoleSink, LineFormat, Verbosity};
use temp_cleaner::logger::dual::{ActivityLogger, StopReason, rfc3339};
use temp_cleaner::logger::jsonl::JsonlConfig;
use temp_cleaner::scanner::naming::{NameMatch, NamingConvention};
use temp_cleaner::scanner::timestamps::TimestampSource;
use temp_cleaner::scanner::tracked::TrackedSet;
use temp_cleaner::scanner::walker::{DirectoryScanner, ScanOutcome};

/// tempclean: deletes entries named `temp<N><s|m|h>` once their time is up.
#[derive(Debug, Parser)]
#[command(
    name = "tempclean",
    author,
    version,
    about = "Self-expiring file and folder cleaner",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (warnings and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Watch the directory and delete entries as they expire.
    Run(RunArgs),
    /// List candidates and their expirations once, deleting nothing.
    Scan(ScanArgs),
    /// Check whether names follow the naming convention.
    Check(CheckArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Settings that `run` and `scan` can override on top of the config file.
#[derive(Debug, Clone, Args, Default)]
struct WatchOverrides {
    /// Directory to watch (default: ~/Desktop).
    #[arg(long, value_name = "PATH")]
    watch_dir: Option<PathBuf>,
    /// Name prefix that marks an entry as self-expiring.
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,
    /// Which timestamp counts as the entry's birth.
    #[arg(long, value_name = "SOURCE")]
    timestamp_source: Option<TimestampSource>,
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    #[command(flatten)]
    watch: WatchOverrides,
    /// Seconds to sleep between cycles.
    #[arg(long, value_name = "SECONDS")]
    interval: Option<f64>,
    /// Run a single scan + expire cycle and exit.
    #[arg(long)]
    once: bool,
    /// Report what would be deleted without deleting anything.
    #[arg(long)]
    dry_run: bool,
    /// Do not write the JSONL activity log even if enabled in config.
    #[arg(long)]
    no_jsonl: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ScanArgs {
    #[command(flatten)]
    watch: WatchOverrides,
}

#[derive(Debug, Clone, Args)]
struct CheckArgs {
    /// Names to check, e.g. `temp5m`.
    #[arg(value_name = "NAME", required = true)]
    names: Vec<String>,
    /// Prefix to check against (default: configured prefix).
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<CleanerError> for CliError {
    fn from(e: CleanerError) -> Self {
        match e {
            CleanerError::InvalidConfig { .. }
            | CleanerError::MissingConfig { .. }
            | CleanerError::ConfigParse { .. } => Self::User(e.to_string()),
            _ => Self::Runtime(e.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_daemon(cli, args),
        Command::Scan(args) => run_scan(cli, args),
        Command::Check(args) => run_check(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn run_daemon(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let mut config = Config::load_unvalidated(cli.config.as_deref())?;
    apply_watch_overrides(&mut config, &args.watch);
    if let Some(interval) = args.interval {
        config.schedule.scan_interval_secs = interval;
    }
    if args.dry_run {
        config.schedule.dry_run = true;
    }
    config.normalize_paths();
    config.validate()?;

    let console = ConsoleSink::stdout(verbosity(cli), line_format(cli));
    let jsonl = (config.logging.jsonl_enabled && !args.no_jsonl).then(|| JsonlConfig {
        path: config.logging.jsonl_log.clone(),
        max_size_bytes: config.logging.max_size_bytes,
        max_rotated_files: config.logging.max_rotated_files,
    });
    let logger = ActivityLogger::new(Some(console), jsonl);

    let mut daemon = CleanerDaemon::new(config, logger, SignalHandler::new())
        .with_max_cycles(args.once.then_some(1));

    // Ctrl+C is a normal way to end the loop: exit 0.
    let _: StopReason = daemon.run()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let mut config = Config::load_unvalidated(cli.config.as_deref())?;
    apply_watch_overrides(&mut config, &args.watch);
    config.normalize_paths();
    config.validate()?;

    let scanner = DirectoryScanner::new(
        NamingConvention::new(config.watch.prefix.clone()),
        config.watch.timestamp_source,
    );
    let mut tracked = TrackedSet::new();
    let report = scanner.scan_and_update(&mut tracked, &config.watch.directory)?;
    let now = SystemTime::now();

    match output_mode(cli) {
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{} {} for {}<N><s|m|h>",
                "Scanning".bold(),
                config.watch.directory.display(),
                config.watch.prefix
            )?;
            for outcome in &report.outcomes {
                match outcome {
                    ScanOutcome::Tracked {
                        name, expires_at, ..
                    } => {
                        let remaining = expires_at.duration_since(now).map_or_else(
                            |_| "expired".red().to_string(),
                            |d| format!("in {}s", d.as_secs()),
                        );
                        writeln!(out, "  {name:<24} expires {} ({remaining})", rfc3339(*expires_at))?;
                    }
                    ScanOutcome::InvalidName { name, rejection } => {
                        writeln!(out, "  {name:<24} {}", format!("invalid: {rejection}").yellow())?;
                    }
                    ScanOutcome::MetadataUnavailable { name, error } => {
                        writeln!(out, "  {name:<24} {}", format!("unreadable: {error}").yellow())?;
                    }
                    ScanOutcome::EntryUnreadable { error } => {
                        writeln!(out, "  {}", format!("unreadable entry: {error}").yellow())?;
                    }
                }
            }
            writeln!(
                out,
                "{} tracked, {} invalid, {} ignored",
                report.tracked_count(),
                report.invalid_names().count(),
                report.ignored
            )?;
        }
        OutputMode::Json => {
            let entries: Vec<Value> = report
                .outcomes
                .iter()
                .map(|outcome| match outcome {
                    ScanOutcome::Tracked {
                        name,
                        born_at,
                        duration_secs,
                        expires_at,
                    } => json!({
                        "name": name,
                        "status": "tracked",
                        "born_at": rfc3339(*born_at),
                        "duration_secs": duration_secs,
                        "expires_at": rfc3339(*expires_at),
                        "expired": *expires_at <= now,
                    }),
                    ScanOutcome::InvalidName { name, rejection } => json!({
                        "name": name,
                        "status": "invalid",
                        "reason": rejection.to_string(),
                    }),
                    ScanOutcome::MetadataUnavailable { name, error } => json!({
                        "name": name,
                        "status": "metadata_unavailable",
                        "error": error,
                    }),
                    ScanOutcome::EntryUnreadable { error } => json!({
                        "status": "unreadable",
                        "error": error,
                    }),
                })
                .collect();
            write_json_line(&json!({
                "command": "scan",
                "directory": config.watch.directory.to_string_lossy(),
                "prefix": config.watch.prefix,
                "entries_listed": report.entries_listed,
                "tracked": report.tracked_count(),
                "ignored": report.ignored,
                "entries": entries,
            }))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn run_check(cli: &Cli, args: &CheckArgs) -> Result<(), CliError> {
    let prefix = match &args.prefix {
        Some(prefix) => {
            validate_prefix(prefix)?;
            prefix.clone()
        }
        None => Config::load(cli.config.as_deref())?.watch.prefix,
    };
    let convention = NamingConvention::new(prefix);

    let mut invalid = 0_usize;
    let mut results = Vec::with_capacity(args.names.len());
    for name in &args.names {
        let result = match convention.parse(name) {
            NameMatch::Valid(parsed) => json!({
                "name": name,
                "status": "valid",
                "amount": parsed.amount,
                "unit": parsed.unit,
                "duration_secs": parsed.duration_secs,
            }),
            NameMatch::Invalid(rejection) => {
                invalid += 1;
                json!({
                    "name": name,
                    "status": "invalid",
                    "reason": rejection.to_string(),
                })
            }
            NameMatch::NotCandidate => {
                invalid += 1;
                json!({
                    "name": name,
                    "status": "not_candidate",
                })
            }
        };
        results.push(result);
    }

    match output_mode(cli) {
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            for result in &results {
                let name = result["name"].as_str().unwrap_or_default();
                let line = match result["status"].as_str() {
                    Some("valid") => format!(
                        "{name}: expires {}s after creation",
                        result["duration_secs"]
                    )
                    .green()
                    .to_string(),
                    Some("invalid") => format!(
                        "{name}: invalid ({})",
                        result["reason"].as_str().unwrap_or_default()
                    )
                    .yellow()
                    .to_string(),
                    _ => format!(
                        "{name}: not a candidate (no '{}' prefix)",
                        convention.prefix()
                    ),
                };
                writeln!(out, "{line}")?;
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "check",
                "prefix": convention.prefix(),
                "results": results,
            }))?;
        }
    }

    if invalid > 0 {
        return Err(CliError::User(format!(
            "{invalid} of {} name(s) would not be cleaned up",
            args.names.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => println!("{}", config.to_toml()?),
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": false,
                            "code": e.code(),
                            "error": e.to_string(),
                        }))?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn apply_watch_overrides(config: &mut Config, overrides: &WatchOverrides) {
    if let Some(dir) = &overrides.watch_dir {
        config.watch.directory.clone_from(dir);
    }
    if let Some(prefix) = &overrides.prefix {
        config.watch.prefix.clone_from(prefix);
    }
    if let Some(source) = overrides.timestamp_source {
        config.watch.timestamp_source = source;
    }
}

fn verbosity(cli: &Cli) -> Verbosity {
    if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// `run` is long-lived and usually redirected, so it stays human unless JSON
/// is asked for explicitly.
fn line_format(cli: &Cli) -> LineFormat {
    let env_mode = std::env::var("TEMPCLEAN_OUTPUT_FORMAT").ok();
    match resolve_run_output_mode(cli.json, env_mode.as_deref()) {
        OutputMode::Json => LineFormat::Json,
        OutputMode::Human if cli.no_color || !io::stdout().is_terminal() => LineFormat::Plain,
        OutputMode::Human => LineFormat::Colored,
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("TEMPCLEAN_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

/// Like `resolve_output_mode`, but a missing terminal never selects JSON.
fn resolve_run_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    resolve_output_mode(json_flag, env_mode, true)
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
