//! Patch Monitor Agent - Collection and Delivery CLI
//!
//! The main entry point for pm-agent, handling:
//! - Package manager detection and pending-update enumeration
//! - Security classification and reboot-required detection
//! - One-shot and daemon-mode delivery to the collector
//! - Configuration validation and environment checks

use clap::{Args, Parser, Subcommand};
use pm_common::error::{format_error_human, StructuredError};
use pm_common::{Error, OutputFormat, AGENT_VERSION};
use pm_config::{resolve_config, validate_settings, AgentSettings, ConfigPaths, SettingsFile};
use pm_core::collect::{
    collect_snapshot, detect, last_patch, CollectOptions, CommandRunner, RunnerConfig,
};
use pm_core::daemon::{self, DaemonEventType, DaemonState};
use pm_core::exit_codes::ExitCode;
use pm_core::logging::{init_logging, LogConfig, LogFormat, LogLevel, RunContext};
use pm_core::transport::{Collector, HttpCollector, TransportError};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Patch Monitor Agent - Pending-update collection and reporting
#[derive(Parser)]
#[command(name = "pm-agent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to agent.toml (overrides PM_CONFIG and well-known locations)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Per-command timeout for package manager invocations (seconds)
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect a patch snapshot and print it (no delivery)
    Collect(CollectArgs),

    /// Collect and deliver to the collector, once or on an interval
    Run(RunArgs),

    /// Validate configuration and probe the environment
    Check(CheckArgs),

    /// Print version information
    Version,
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct CollectArgs {
    /// Skip the package-list refresh before enumerating (APT only)
    #[arg(long)]
    no_refresh: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Collector base URL (e.g. https://patchmon.example.com)
    #[arg(long, env = "PM_SERVER_URL")]
    server_url: Option<String>,

    /// Agent API token for the collector
    #[arg(long, env = "PM_AGENT_TOKEN")]
    token: Option<String>,

    /// Seconds between collection cycles
    #[arg(long, env = "PM_INTERVAL_SECS")]
    interval: Option<u64>,

    /// Run a single collect-and-deliver cycle, then exit
    #[arg(long)]
    once: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Check agent.toml validity
    #[arg(long)]
    settings: bool,

    /// Check package manager detection
    #[arg(long)]
    managers: bool,

    /// Check all configuration and probes
    #[arg(long)]
    all: bool,
}

fn main() {
    let cli = Cli::parse();

    // -v/-q win; otherwise PM_LOG / RUST_LOG pick the level (default info).
    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };

    // JSONL logs on stderr when stdout carries JSON, so both streams stay
    // machine-parseable for supervisors.
    let log_format = if matches!(cli.global.format, OutputFormat::Json) {
        LogFormat::Jsonl
    } else {
        LogFormat::Human
    };

    let log_config = LogConfig::from_env(cli_level, Some(log_format));
    init_logging(&log_config);

    let exit_code = match cli.command {
        None => run_collect(&cli.global, &CollectArgs { no_refresh: false }),
        Some(Commands::Collect(args)) => run_collect(&cli.global, &args),
        Some(Commands::Run(args)) => run_run(&cli.global, &args),
        Some(Commands::Check(args)) => run_check(&cli.global, &args),
        Some(Commands::Version) => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

/// Resolve and load agent settings, applying global CLI overrides.
fn load_settings(global: &GlobalOpts) -> Result<(AgentSettings, ConfigPaths), Error> {
    let paths = resolve_config(global.config.as_deref());

    let mut settings = AgentSettings::default();
    if let Some(path) = &paths.settings {
        let file = SettingsFile::from_file(path).map_err(|e| Error::Config(e.to_string()))?;
        settings.merge_file(file);
    }

    if let Some(timeout) = global.timeout {
        settings.command_timeout_secs = timeout;
    }

    Ok((settings, paths))
}

fn collect_options(settings: &AgentSettings) -> CollectOptions {
    CollectOptions {
        runner: RunnerConfig::with_timeout(Duration::from_secs(settings.command_timeout_secs)),
        refresh_metadata: settings.refresh_metadata,
    }
}

/// Print an error on stderr in the requested format.
fn report_error(global: &GlobalOpts, err: &Error) {
    match global.format {
        OutputFormat::Json => {
            eprintln!("{}", StructuredError::from(err).to_json());
        }
        _ => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(err, use_color));
        }
    }
}

fn transport_error_to_common(err: &TransportError) -> Error {
    match err {
        TransportError::Network(e) => Error::Transport(e.to_string()),
        TransportError::Rejected { status, .. } => {
            if err.is_auth_failure() {
                Error::Unauthorized
            } else {
                Error::ServerRejected { status: *status }
            }
        }
    }
}

fn run_collect(global: &GlobalOpts, args: &CollectArgs) -> ExitCode {
    let ctx = RunContext::new();
    info!(run_id = %ctx.run_id, host_id = %ctx.host_id, "collect started");

    let (mut settings, _paths) = match load_settings(global) {
        Ok(loaded) => loaded,
        Err(e) => {
            report_error(global, &e);
            return ExitCode::ConfigError;
        }
    };

    if let Err(e) = validate_settings(&settings, false) {
        report_error(global, &Error::InvalidSettings(e.to_string()));
        return ExitCode::ConfigError;
    }

    if args.no_refresh {
        settings.refresh_metadata = false;
    }

    let options = collect_options(&settings);
    let collection = collect_snapshot(&options);
    let degraded = collection.is_degraded();

    match global.format {
        OutputFormat::Json => {
            let report = collection.into_report();
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
        }
        OutputFormat::Summary => {
            let snapshot = &collection.snapshot;
            println!(
                "{} pending ({} security), reboot {}, manager {}",
                snapshot.pending_count(),
                snapshot.security_count(),
                if snapshot.needs_reboot {
                    "required"
                } else {
                    "not required"
                },
                snapshot.manager
            );
        }
        OutputFormat::Human => {
            let snapshot = &collection.snapshot;
            println!("# Patch Snapshot");
            println!("Host: {}", collection.facts.hostname);
            println!(
                "OS: {} {} ({})",
                collection.facts.os_name,
                collection.facts.os_version,
                collection.facts.architecture
            );
            println!("Kernel: {}", snapshot.kernel_version);
            println!("Manager: {}", snapshot.manager);
            println!(
                "Pending updates: {} ({} security)",
                snapshot.pending_count(),
                snapshot.security_count()
            );
            println!(
                "Reboot required: {}",
                if snapshot.needs_reboot { "yes" } else { "no" }
            );
            match &snapshot.last_patch_time {
                Some(t) => println!("Last patch: {}", t.to_rfc3339()),
                None => println!("Last patch: unknown"),
            }
            println!();

            if !snapshot.pending_updates.is_empty() {
                println!(
                    "{:<30} {:<25} {:<25} TYPE",
                    "PACKAGE", "CURRENT", "AVAILABLE"
                );
                for update in snapshot.pending_updates.iter().take(20) {
                    println!(
                        "{:<30} {:<25} {:<25} {}",
                        update.package_name,
                        update.current_version,
                        update.available_version.as_deref().unwrap_or("-"),
                        update.update_type
                    );
                }
                if snapshot.pending_updates.len() > 20 {
                    println!("... and {} more", snapshot.pending_updates.len() - 20);
                }
            }

            if degraded {
                println!();
                for degradation in &collection.degradations {
                    println!("! degraded: {}", degradation);
                }
            }
        }
    }

    if degraded {
        ExitCode::Degraded
    } else {
        ExitCode::Clean
    }
}

fn run_run(global: &GlobalOpts, args: &RunArgs) -> ExitCode {
    let ctx = RunContext::new();
    info!(run_id = %ctx.run_id, host_id = %ctx.host_id, "run started");

    let (mut settings, paths) = match load_settings(global) {
        Ok(loaded) => loaded,
        Err(e) => {
            report_error(global, &e);
            return ExitCode::ConfigError;
        }
    };

    if args.server_url.is_some() {
        settings.server_url = args.server_url.clone();
    }
    if args.token.is_some() {
        settings.agent_token = args.token.clone();
    }
    if let Some(interval) = args.interval {
        settings.interval_secs = interval;
    }

    if let Err(e) = validate_settings(&settings, true) {
        report_error(global, &Error::InvalidSettings(e.to_string()));
        return ExitCode::ConfigError;
    }

    // Validation guarantees both are present when delivery is required.
    let server_url = settings.server_url.clone().unwrap_or_default();
    let token = settings.agent_token.clone().unwrap_or_default();

    let collector = match HttpCollector::new(&server_url, token) {
        Ok(collector) => collector,
        Err(e) => {
            report_error(global, &transport_error_to_common(&e));
            return ExitCode::ConfigError;
        }
    };

    let options = collect_options(&settings);

    if args.once {
        return run_once(global, &collector, &options);
    }

    info!(
        config_source = %paths.settings_source,
        interval_secs = settings.interval_secs,
        server_url = %server_url,
        "starting daemon"
    );

    daemon::clear_stop_request();
    daemon::install_signal_handlers();

    let mut state = DaemonState::new(settings.interval_secs);
    state.record_event(
        DaemonEventType::Started,
        &format!("agent {}", AGENT_VERSION),
    );

    let mut collect_fn = || collect_snapshot(&options);
    loop {
        let outcome = daemon::run_cycle(&mut state, &collector, &mut collect_fn);
        daemon::sleep_interruptibly(daemon::next_cycle_delay(&state, &outcome));
        if daemon::stop_requested() {
            break;
        }
    }

    state.record_event(DaemonEventType::Stopped, "stop signal received");
    info!(
        cycles = state.cycle_count,
        delivered = state.delivered_count,
        failed = state.failed_count,
        "daemon stopped"
    );
    ExitCode::Stopped
}

/// Single collect-and-deliver cycle for `run --once`.
fn run_once(global: &GlobalOpts, collector: &HttpCollector, options: &CollectOptions) -> ExitCode {
    let collection = collect_snapshot(options);
    let degraded = collection.is_degraded();
    let degradations = collection.degradations.clone();
    let report = collection.into_report();
    let pending = report.pending_updates.len();
    let security = report
        .pending_updates
        .iter()
        .filter(|u| u.is_security)
        .count();

    match collector.deliver(&report) {
        Ok(()) => {
            match global.format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "delivered": true,
                        "hostname": report.hostname,
                        "pending_updates": pending,
                        "security_updates": security,
                        "needs_reboot": report.needs_reboot,
                        "degradations": degradations,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                }
                OutputFormat::Summary => {
                    println!("delivered {} updates ({} security)", pending, security);
                }
                OutputFormat::Human => {
                    println!("# Delivery");
                    println!("Host: {}", report.hostname);
                    println!("Delivered: {} updates ({} security)", pending, security);
                    for degradation in &degradations {
                        println!("! degraded: {}", degradation);
                    }
                }
            }
            if degraded {
                ExitCode::Degraded
            } else {
                ExitCode::Clean
            }
        }
        Err(e) => {
            let auth = e.is_auth_failure();
            report_error(global, &transport_error_to_common(&e));
            if auth {
                ExitCode::AuthError
            } else {
                ExitCode::TransportError
            }
        }
    }
}

fn run_check(global: &GlobalOpts, args: &CheckArgs) -> ExitCode {
    let check_all = args.all || (!args.settings && !args.managers);

    let mut results: Vec<serde_json::Value> = Vec::new();
    let mut all_ok = true;

    // Check settings file
    if check_all || args.settings {
        let paths = resolve_config(global.config.as_deref());
        match load_settings(global) {
            Ok((settings, _)) => match validate_settings(&settings, false) {
                Ok(()) => {
                    results.push(serde_json::json!({
                        "check": "settings",
                        "status": "ok",
                        "source": paths.settings_source.to_string(),
                        "path": paths.settings.as_ref().map(|p| p.display().to_string()),
                    }));
                }
                Err(e) => {
                    all_ok = false;
                    results.push(serde_json::json!({
                        "check": "settings",
                        "status": "error",
                        "error": e.to_string(),
                    }));
                }
            },
            Err(e) => {
                all_ok = false;
                results.push(serde_json::json!({
                    "check": "settings",
                    "status": "error",
                    "error": e.to_string(),
                }));
            }
        }
    }

    // Check package manager detection and patch history
    if check_all || args.managers {
        let runner = CommandRunner::new(RunnerConfig::default());
        match detect(&runner) {
            Some(manager) => {
                let history = last_patch::history_path(manager.kind);
                let history_exists = history
                    .map(|p| std::path::Path::new(p).exists())
                    .unwrap_or(false);
                results.push(serde_json::json!({
                    "check": "manager",
                    "status": "ok",
                    "manager": manager.kind.to_string(),
                    "program": manager.program,
                    "history_path": history,
                    "history_present": history_exists,
                }));
            }
            None => {
                results.push(serde_json::json!({
                    "check": "manager",
                    "status": "info",
                    "note": "no supported package manager detected; snapshots will be empty",
                }));
            }
        }
    }

    let response = serde_json::json!({
        "agent_version": AGENT_VERSION,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "status": if all_ok { "ok" } else { "error" },
        "checks": results,
    });

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
        OutputFormat::Summary => {
            println!("check: {}", if all_ok { "OK" } else { "FAILED" });
        }
        OutputFormat::Human => {
            println!("# pm-agent check");
            println!();
            for result in &results {
                let check = result.get("check").and_then(|v| v.as_str()).unwrap_or("?");
                let status = result.get("status").and_then(|v| v.as_str()).unwrap_or("?");
                let symbol = match status {
                    "ok" => "✓",
                    "info" => "ℹ",
                    _ => "✗",
                };
                println!("{} {}: {}", symbol, check, status);
                if let Some(manager) = result.get("manager").and_then(|v| v.as_str()) {
                    println!("  manager: {}", manager);
                }
                if let Some(note) = result.get("note").and_then(|v| v.as_str()) {
                    println!("  {}", note);
                }
                if let Some(error) = result.get("error").and_then(|v| v.as_str()) {
                    println!("  Error: {}", error);
                }
            }
        }
    }

    if all_ok {
        ExitCode::Clean
    } else {
        ExitCode::ConfigError
    }
}

fn print_version(global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => {
            let version_info = serde_json::json!({
                "name": "pm-agent",
                "version": AGENT_VERSION,
            });
            println!("{}", serde_json::to_string_pretty(&version_info).unwrap());
        }
        _ => {
            println!("pm-agent {}", AGENT_VERSION);
        }
    }
}
