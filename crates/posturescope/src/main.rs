//! `pscope` - CLI for posturescope
//!
//! This binary provides the command-line interface for watching the live
//! measurement stream, capturing snapshots, exporting history, and managing
//! server-side settings.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use tokio::sync::mpsc;

use posturescope::api::{report_filename, ApiClient};
use posturescope::capture::TickOutcome;
use posturescope::cli::{
    CaptureCommand, Cli, ClearHistoryCommand, Command, ConfigCommand, ExportCommand,
    ReportCommand, ThresholdsCommand, WatchCommand,
};
use posturescope::measurement::{gauge_percent, AngleKind, GaugeZone, Measurement, Thresholds};
use posturescope::viz::{export_csv, export_filename};
use posturescope::{
    CaptureWorkflow, ClientEvent, Config, ConnectionState, DashboardState, ReconnectPolicy,
    StreamReducer, init_logging,
};
use posturescope::connection::ConnectionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Watch(watch_cmd) => handle_watch(&config, &watch_cmd).await,
        Command::Capture(capture_cmd) => handle_capture(&config, &capture_cmd).await,
        Command::Export(export_cmd) => handle_export(&config, export_cmd).await,
        Command::Thresholds(thresholds_cmd) => handle_thresholds(&config, thresholds_cmd).await,
        Command::Report(report_cmd) => handle_report(&config, report_cmd).await,
        Command::ClearHistory(clear_cmd) => handle_clear_history(&config, &clear_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

/// Build the reconnect policy from configuration.
fn reconnect_policy(config: &Config) -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: config.reconnect_delay(),
        max_delay: config.reconnect_delay_max(),
        max_attempts: config.connection.max_attempts,
    }
}

/// Spawn the connection loop, returning the event receiver.
fn spawn_connection(config: &Config) -> anyhow::Result<mpsc::Receiver<ClientEvent>> {
    let manager = ConnectionManager::new(
        config.socket_url()?,
        reconnect_policy(config),
        config.connect_timeout(),
    );
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(async move {
        if let Err(e) = manager.run(tx).await {
            tracing::error!("connection loop ended: {e}");
        }
    });
    Ok(rx)
}

fn print_state(state: ConnectionState, attempts: u32, max_attempts: u32) {
    match state {
        ConnectionState::Connecting => println!("Connecting to server..."),
        ConnectionState::Connected => println!("Connected."),
        ConnectionState::Disconnected => {
            println!("Connection lost. Reconnecting... ({attempts}/{max_attempts})");
        }
        ConnectionState::Failed => {
            println!("Unable to connect. Please check the server and run again.");
        }
    }
}

fn print_gauges(measurement: &Measurement, thresholds: &Thresholds) {
    for kind in AngleKind::ALL {
        let value = measurement.angle(kind);
        let zone = GaugeZone::classify(value, thresholds.for_angle(kind));
        let tag = match zone {
            GaugeZone::Ok => "ok",
            GaugeZone::Warn => "warn",
            GaugeZone::Alert => "alert",
        };
        println!(
            "  {kind:>8}: {value:6.1}°  [{tag:<5}] {:3.0}%",
            gauge_percent(value)
        );
    }
}

fn print_stats(dashboard: &DashboardState) {
    let stats = dashboard.stats();
    println!();
    println!(
        "Statistics over {} ({} samples)",
        dashboard.range(),
        stats.sample_count
    );
    for kind in AngleKind::ALL {
        let angle = stats.for_angle(kind);
        println!(
            "  {kind:>8}: avg {:5.1}°  {} {}",
            angle.average,
            angle.trend.glyph(),
            angle.trend.label()
        );
    }
    println!("  posture score: {}%", stats.posture_score);
    println!();
}

async fn handle_watch(config: &Config, cmd: &WatchCommand) -> anyhow::Result<()> {
    let api = ApiClient::new(config.base_url()?);
    let mut dashboard = DashboardState::new(config.history.capacity);
    dashboard.set_range(cmd.range.into(), Utc::now());

    // Thresholds are fetched once at startup; defaults cover a failure.
    match api.fetch_thresholds().await {
        Ok(thresholds) => dashboard.set_thresholds(thresholds, Utc::now()),
        Err(e) => {
            tracing::warn!("failed to load thresholds, using defaults: {e}");
        }
    }

    let mut rx = spawn_connection(config)?;
    let mut last_state = ConnectionState::Connecting;

    while let Some(event) = rx.recv().await {
        match event {
            ClientEvent::StateChanged { state, attempts } => {
                print_state(state, attempts, config.connection.max_attempts);
                last_state = state;
            }
            ClientEvent::Sample(sample) => {
                if let Some(measurement) = dashboard.on_sample(sample, Utc::now()) {
                    print_gauges(&measurement, &dashboard.thresholds());
                    let accepted = dashboard.reducer().accepted_count();
                    if cmd.stats_every > 0 && accepted % cmd.stats_every == 0 {
                        print_stats(&dashboard);
                    }
                }
            }
        }
    }

    if last_state == ConnectionState::Failed {
        bail!("connection failed after {} attempts", config.connection.max_attempts);
    }
    Ok(())
}

async fn handle_capture(config: &Config, cmd: &CaptureCommand) -> anyhow::Result<()> {
    let api = ApiClient::new(config.base_url()?);
    let countdown = cmd.countdown.unwrap_or(config.capture.countdown_secs);
    let mut workflow = CaptureWorkflow::new(countdown);
    let mut reducer = StreamReducer::new(config.history.capacity);

    let mut rx = spawn_connection(config)?;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await; // consume the immediate first tick

    println!("Capturing in {countdown}...");
    workflow.start_countdown()?;

    let snapshot = loop {
        tokio::select! {
            maybe_event = rx.recv() => match maybe_event {
                Some(ClientEvent::Sample(sample)) => {
                    reducer.ingest(sample, Utc::now());
                }
                Some(ClientEvent::StateChanged { state, attempts }) => {
                    print_state(state, attempts, config.connection.max_attempts);
                }
                None => bail!("connection closed before the countdown finished"),
            },
            _ = ticker.tick() => match workflow.tick(reducer.latest()) {
                TickOutcome::Counting { remaining } => println!("{remaining}..."),
                TickOutcome::Captured(measurement) => break measurement,
                TickOutcome::NothingToCapture => {
                    println!("No measurements received; nothing to capture.");
                    return Ok(());
                }
                TickOutcome::NotCounting => {}
            },
        }
    };
    drop(rx);

    println!("Captured:");
    print_gauges(&snapshot, &Thresholds::default());

    if cmd.no_save {
        workflow.discard()?;
        println!("Snapshot discarded (--no-save).");
        return Ok(());
    }

    match workflow.save(&api).await {
        Ok(_) => println!("Measurement saved successfully!"),
        Err(e) => {
            // Snapshot is retained for retry, but this invocation is over.
            bail!("failed to save measurement: {e}");
        }
    }
    Ok(())
}

async fn handle_export(config: &Config, cmd: ExportCommand) -> anyhow::Result<()> {
    let mut reducer = StreamReducer::new(config.history.capacity);
    let mut rx = spawn_connection(config)?;

    println!("Recording for {}s...", cmd.duration);
    let deadline = tokio::time::sleep(Duration::from_secs(cmd.duration));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            maybe_event = rx.recv() => match maybe_event {
                Some(ClientEvent::Sample(sample)) => {
                    reducer.ingest(sample, Utc::now());
                }
                Some(ClientEvent::StateChanged { state, attempts }) => {
                    print_state(state, attempts, config.connection.max_attempts);
                }
                None => break,
            },
        }
    }
    drop(rx);

    let csv = export_csv(&reducer.history().as_slice());
    let path = cmd
        .output
        .unwrap_or_else(|| PathBuf::from(export_filename(Utc::now())));
    std::fs::write(&path, csv).with_context(|| format!("writing {}", path.display()))?;
    println!(
        "Exported {} records to {}",
        reducer.history().len(),
        path.display()
    );
    Ok(())
}

async fn handle_thresholds(config: &Config, cmd: ThresholdsCommand) -> anyhow::Result<()> {
    let api = ApiClient::new(config.base_url()?);
    match cmd {
        ThresholdsCommand::Show { json } => {
            let thresholds = api.fetch_thresholds().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&thresholds)?);
            } else {
                println!("Current thresholds");
                println!("  shoulder: ±{}°", thresholds.shoulder_threshold);
                println!("  hip:      ±{}°", thresholds.hip_threshold);
                println!("  tilt:     ±{}°", thresholds.tilt_threshold);
            }
        }
        ThresholdsCommand::Set {
            shoulder,
            hip,
            tilt,
        } => {
            let stored = api
                .update_thresholds(&Thresholds {
                    shoulder_threshold: shoulder,
                    hip_threshold: hip,
                    tilt_threshold: tilt,
                })
                .await?;
            println!(
                "Thresholds updated: shoulder ±{}°, hip ±{}°, tilt ±{}°",
                stored.shoulder_threshold, stored.hip_threshold, stored.tilt_threshold
            );
        }
    }
    Ok(())
}

async fn handle_report(config: &Config, cmd: ReportCommand) -> anyhow::Result<()> {
    let api = ApiClient::new(config.base_url()?);
    println!("Generating report...");
    let bytes = api.generate_report().await?;
    let path = cmd
        .output
        .unwrap_or_else(|| PathBuf::from(report_filename(Utc::now())));
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    println!("Report saved to {}", path.display());
    Ok(())
}

async fn handle_clear_history(config: &Config, cmd: &ClearHistoryCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This will delete all stored measurements on the server.");
        println!("Use --yes to confirm.");
        return Ok(());
    }
    let api = ApiClient::new(config.base_url()?);
    api.clear_history().await?;
    println!("History cleared.");
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Base URL:           {}", config.server.base_url);
                println!("  Socket path:        {}", config.server.socket_path);
                println!();
                println!("[Connection]");
                println!("  Max attempts:       {}", config.connection.max_attempts);
                println!(
                    "  Reconnect delay:    {}ms (max {}ms)",
                    config.connection.reconnect_delay_ms, config.connection.reconnect_delay_max_ms
                );
                println!(
                    "  Connect timeout:    {}s",
                    config.connection.connect_timeout_secs
                );
                println!();
                println!("[History]");
                println!("  Capacity:           {}", config.history.capacity);
                println!();
                println!("[Capture]");
                println!("  Countdown:          {}s", config.capture.countdown_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
