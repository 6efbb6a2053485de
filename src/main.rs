//! `inventory-diff` — group monitored hosts by identical package-inventory changes.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load and validate the config ([`config::load_config`]); CLI flags override it.
//! 3. Log in to the monitoring server ([`zabbix`]).
//! 4. Run the engine ([`engine::pipeline::run`]): change events → inventory
//!    items → history → verified snapshot pairs → diffs → groups.
//! 5. Render the requested report ([`report`]).
//! 6. Exit `0` on success or when no change events were found, `1` on any
//!    fatal error (short history, misaligned joins, API failures).

mod cli;
mod config;
mod engine;
mod error;
mod models;
mod report;
mod zabbix;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, ReportFormat};
use config::{load_config, Config};
use engine::pipeline::{run, RunOutcome};
use models::{UnchangedPolicy, WindowingKind};
use zabbix::client::ZabbixClient;
use zabbix::source::ZabbixSource;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cwd = std::env::current_dir()?;
    let mut config = load_config(&cwd, cli.config.as_deref())?;
    apply_overrides(&cli, &mut config);
    config.validate()?;
    let settings = config.engine_settings()?;

    let spinner = if !cli.quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Querying {}", config.server.url));
        Some(pb)
    } else {
        None
    };

    let outcome = with_spinner(spinner, async {
        let mut client = ZabbixClient::new(
            &config.server.url,
            Duration::from_secs(config.server.timeout_secs),
            config.server.legacy_auth,
        )?;
        client
            .login(&config.credentials.login, &config.credentials.password)
            .await?;

        let source = ZabbixSource::new(client, &config.inventory);
        run(&source, &settings, Local::now().timestamp()).await
    })
    .await;

    let report = match outcome.context("Run aborted, no report written")? {
        RunOutcome::NoEvents { window } => {
            if !cli.quiet {
                println!(
                    "No package change events between {} and {}",
                    report::format_time(window.from),
                    report::format_time(window.till)
                );
            }
            return Ok(());
        }
        RunOutcome::Report(report) => report,
    };

    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(&report, cli.verbose, cli.quiet)?;
        }
        ReportFormat::Text => {
            let path = cli.output.unwrap_or_else(|| PathBuf::from("output.txt"));
            report::text::render(&report, &path)?;
        }
        ReportFormat::Table => {
            let path = cli
                .output
                .unwrap_or_else(|| PathBuf::from("output-table.txt"));
            report::table::render(&report, &path)?;
        }
        ReportFormat::Xlsx => {
            let path = cli.output.unwrap_or_else(|| PathBuf::from("output.xlsx"));
            report::xlsx::render(&report, &path)?;
        }
        ReportFormat::Json => {
            let json = report::to_json(&report)?;
            match &cli.output {
                Some(path) => std::fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

/// Await `work`, clearing the spinner whether it succeeds or fails.
async fn with_spinner<T>(
    spinner: Option<ProgressBar>,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    let result = work.await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result
}

/// CLI flags take precedence over the config file.
fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(group_by) = &cli.group_by {
        config.engine.group_by = group_by.into();
    }
    if let (Some(from), Some(till)) = (&cli.from, &cli.till) {
        config.window.from = Some(from.clone());
        config.window.till = Some(till.clone());
        config.engine.windowing = WindowingKind::Range;
    }
    if let Some(windowing) = &cli.windowing {
        config.engine.windowing = windowing.into();
    }
    if let Some(policy) = &cli.missing_hosts {
        config.engine.missing_hosts = policy.into();
    }
    if cli.include_unchanged {
        config.engine.unchanged_hosts = UnchangedPolicy::Include;
    }
    if let Some(order) = &cli.order {
        config.engine.order = order.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupBy, HostOrder};

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "inventory-diff",
            "--from",
            "25.05.2022 17:20",
            "--till",
            "26.05.2022 17:20",
            "--group-by",
            "inventory",
            "--include-unchanged",
            "--order",
            "name",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.engine.windowing, WindowingKind::Range);
        assert_eq!(config.engine.group_by, GroupBy::Inventory);
        assert_eq!(config.engine.unchanged_hosts, UnchangedPolicy::Include);
        assert_eq!(config.engine.order, HostOrder::Name);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_spinner_cleared_on_failure() {
        let pb = ProgressBar::hidden();
        let result: Result<()> =
            with_spinner(Some(pb.clone()), async { anyhow::bail!("login failed") }).await;
        assert!(result.is_err());
        assert!(pb.is_finished());
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::try_parse_from(["inventory-diff"]).unwrap();
        let mut config = Config::default();
        apply_overrides(&cli, &mut config);
        assert_eq!(config.engine.windowing, WindowingKind::EventDriven);
        assert_eq!(config.engine.unchanged_hosts, UnchangedPolicy::Exclude);
    }
}
