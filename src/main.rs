use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use wxalert_service::config;
use wxalert_service::ingest::weatherbit::WeatherbitClient;
use wxalert_service::logging::{DebugLog, LogLevel};
use wxalert_service::monitor::{Monitor, RunError};
use wxalert_service::notify::pushover::{ConsoleNotifier, Notifier, PushoverNotifier};

/// Check the forecast once and send any new weather alerts.
#[derive(Debug, Parser)]
#[command(name = "wxalert", version)]
struct Cli {
    /// Path to a TOML config file (defaults to $WXALERT_CONFIG or ./wxalert.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print notifications instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Echo debug-level events to the console
    #[arg(long, short)]
    verbose: bool,
}

const EXIT_FORECAST_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_ALERT_LOG: u8 = 3;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let console_level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    let debug = DebugLog::new(Some(config.files.debug_log.clone()), console_level);

    let pushover;
    let notifier: &dyn Notifier = if cli.dry_run {
        &ConsoleNotifier
    } else {
        pushover = match PushoverNotifier::new(&config, &debug) {
            Ok(n) => n,
            Err(e) => {
                debug.error(&e.to_string());
                return ExitCode::from(EXIT_CONFIG);
            }
        };
        &pushover
    };

    let source = match WeatherbitClient::new(&config, &debug) {
        Ok(s) => s,
        Err(e) => {
            debug.error(&e.to_string());
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let monitor = Monitor::new(&config, notifier, &debug);
    match monitor.run_check_at(&source, Local::now().naive_local()) {
        Ok(summary) => {
            debug.debug(&format!(
                "{} days processed, {} alerts sent, {} suppressed, {} send failures",
                summary.days_processed,
                summary.alerts_sent,
                summary.alerts_suppressed,
                summary.send_failures
            ));
            ExitCode::SUCCESS
        }
        Err(RunError::Forecast(_)) => ExitCode::from(EXIT_FORECAST_FAILED),
        Err(e @ RunError::AlertLog(_)) => {
            debug.error(&e.to_string());
            ExitCode::from(EXIT_ALERT_LOG)
        }
    }
}
