//! proxy-rotator
//!
//! Keeps a service reachable through a proxy by probing it on a fixed cadence
//! and rotating the active node of a controller-managed proxy group when the
//! probe fails.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                        proxy-rotator                          │
//!   │                                                               │
//!   │  ┌───────────┐   tick    ┌────────────────┐   probe           │
//!   │  │ scheduler │──────────▶│ RotationEngine │──────────────────┼──▶ service (via HTTP proxy)
//!   │  │ (1 loop   │           │  per task      │   current/list/   │
//!   │  │  per task)│◀──────────│                │   select          │
//!   │  └─────┬─────┘  report   └───────┬────────┘──────────────────┼──▶ Clash controller
//!   │        │                         │ record / rank              │
//!   │        ▼                         ▼                            │
//!   │  ┌───────────┐           ┌────────────────┐                   │
//!   │  │ TaskBoard │           │   StatStore    │──▶ node_stats.json │
//!   │  └─────┬─────┘           └───────┬────────┘                   │
//!   │        └──────────┬──────────────┘                            │
//!   │                   ▼                                           │
//!   │             admin API (opt-in)                                │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use proxy_rotator::config::loader::{load_config, write_template, ConfigError};
use proxy_rotator::config::{paths, ObservabilityConfig, RotatorConfig};
use proxy_rotator::controller::{ClashController, ProxyController};
use proxy_rotator::lifecycle::{signals, startup, Shutdown};
use proxy_rotator::observability::logging;
use proxy_rotator::resilience::timeouts::with_deadline;
use proxy_rotator::stats::report;
use proxy_rotator::stats::ReliabilityStore;

#[derive(Parser)]
#[command(name = "proxy-rotator", version)]
#[command(about = "Keep services reachable by rotating proxy nodes", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform data directory).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor and rotate (default)
    Run {
        /// Stop once every task has been healthy
        #[arg(long)]
        once: bool,
    },
    /// Show node statistics
    Stats {
        #[arg(requires = "service")]
        group: Option<String>,
        service: Option<String>,
    },
    /// Write all statistics to a JSON file
    Export {
        #[arg(short, long, default_value = "node_stats_export.json")]
        output: PathBuf,
    },
    /// Delete all statistics
    ClearStats {
        #[arg(long)]
        yes: bool,
    },
    /// Print the resolved configuration
    ShowConfig,
    /// Write a configuration template
    GenerateConfig {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(paths::default_config_path);

    match cli.command.unwrap_or(Commands::Run { once: false }) {
        Commands::Run { once } => run(&config_path, once).await,
        Commands::Stats { group, service } => {
            stats(&config_path, group.zip(service)).await
        }
        Commands::Export { output } => export(&config_path, &output),
        Commands::ClearStats { yes } => clear_stats(&config_path, yes),
        Commands::ShowConfig => show_config(&config_path),
        Commands::GenerateConfig { force } => generate_config(&config_path, force),
    }
}

fn fail(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("error: {}", message);
    ExitCode::FAILURE
}

/// Config for commands that only need storage settings.
fn load_or_default(path: &Path) -> Result<RotatorConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::NotFound(_)) => Ok(RotatorConfig::default()),
        other => other,
    }
}

fn quiet_logging() {
    logging::init_logging(&ObservabilityConfig {
        log_level: "warn".into(),
        ..Default::default()
    });
}

async fn run(config_path: &Path, once: bool) -> ExitCode {
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => return fail(e),
    };
    config.monitoring.once |= once;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        tasks = config.enabled_tasks().count(),
        interval_sec = config.monitoring.interval_sec,
        max_rotations = config.monitoring.max_rotations,
        once = config.monitoring.once,
        "proxy-rotator starting"
    );

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown.clone());

    let runtime = match startup::start(&config, &shutdown).await {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return fail(e);
        }
    };

    let summary = runtime.scheduler.run(stop).await;

    shutdown.trigger();
    if let Some(admin) = runtime.admin {
        let grace = Duration::from_secs(config.monitoring.shutdown_grace_secs);
        if tokio::time::timeout(grace, admin).await.is_err() {
            tracing::warn!("Admin API did not stop in time");
        }
    }

    tracing::info!(run_id = %summary.run_id, "Shutdown complete");
    if summary.interrupted {
        ExitCode::from(signals::INTERRUPTED_EXIT_CODE)
    } else if !summary.failed_tasks.is_empty() {
        tracing::error!(failed = ?summary.failed_tasks, "Some task loops crashed");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn stats(config_path: &Path, target: Option<(String, String)>) -> ExitCode {
    let config = match load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => return fail(e),
    };
    quiet_logging();
    let store = match startup::open_store(&config) {
        Ok(store) => store,
        Err(e) => return fail(e),
    };

    let Some((group, service)) = target else {
        let services = report::list_services(&store);
        if services.is_empty() {
            println!("No statistics recorded yet.");
            return ExitCode::SUCCESS;
        }
        println!(
            "{:<24} {:<16} {:>6} {:>8} {:>8}  {}",
            "GROUP", "SERVICE", "NODES", "CHECKS", "SUCCESS", "BEST"
        );
        for overview in services {
            let summary = &overview.summary;
            println!(
                "{:<24} {:<16} {:>6} {:>8} {:>7.1}%  {}",
                overview.group,
                overview.service,
                summary.node_count,
                summary.total_checks,
                summary.overall_success_rate * 100.0,
                summary.best_node.as_deref().unwrap_or("-"),
            );
        }
        return ExitCode::SUCCESS;
    };

    let current = current_node(&config, &group).await;
    let summary = report::get_summary(&store, &group, &service);
    if summary.node_count == 0 {
        println!("No statistics for {} / {}.", group, service);
        return ExitCode::SUCCESS;
    }

    println!("{} / {}", group, service);
    println!(
        "  nodes: {}  checks: {}  success: {:.1}%  last successful: {}",
        summary.node_count,
        summary.total_checks,
        summary.overall_success_rate * 100.0,
        summary.last_successful_node.as_deref().unwrap_or("-"),
    );
    println!();
    println!("  {:<3} {:<40} {:>6} {:>8} {:>7}", "", "NODE", "SCORE", "SUCCESS", "CHECKS");
    for entry in report::get_ranking(&store, &group, &service, current.as_deref()) {
        println!(
            "  {:<3} {:<40} {:>6.3} {:>7.1}% {:>7}",
            if entry.is_current { "*" } else { "" },
            entry.node_id,
            entry.score,
            entry.success_rate * 100.0,
            entry.checks,
        );
    }
    if current.is_none() {
        println!();
        println!("  (controller unreachable, current node unknown)");
    }
    ExitCode::SUCCESS
}

/// Best-effort lookup of the active node; `None` when the controller is down.
async fn current_node(config: &RotatorConfig, group: &str) -> Option<String> {
    let controller = ClashController::new(&config.controller).ok()?;
    let limit = Duration::from_secs(config.controller.timeout_secs);
    match with_deadline("current_node", limit, controller.current_node(group)).await {
        Ok(Ok(node)) => Some(node),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Could not resolve current node");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not resolve current node");
            None
        }
    }
}

fn export(config_path: &Path, output: &Path) -> ExitCode {
    let config = match load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => return fail(e),
    };
    quiet_logging();
    let store = match startup::open_store(&config) {
        Ok(store) => store,
        Err(e) => return fail(e),
    };
    match store.export(output) {
        Ok(count) => {
            println!("Exported {} entries to {}", count, output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn clear_stats(config_path: &Path, yes: bool) -> ExitCode {
    if !yes {
        return fail("refusing to delete statistics without --yes");
    }
    let config = match load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => return fail(e),
    };
    quiet_logging();
    let store = match startup::open_store(&config) {
        Ok(store) => store,
        Err(e) => return fail(e),
    };
    let count = store.len();
    match store.clear_all() {
        Ok(()) => {
            println!("Cleared {} entries", count);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn show_config(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => return fail(e),
    };
    match toml::to_string_pretty(&config) {
        Ok(text) => {
            println!("# {}", config_path.display());
            println!("# statistics: {}", startup::stats_path(&config).display());
            println!();
            print!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn generate_config(config_path: &Path, force: bool) -> ExitCode {
    match write_template(config_path, force) {
        Ok(()) => {
            println!("Wrote configuration template to {}", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
