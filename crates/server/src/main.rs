mod bootstrap;
mod calendar;
mod health;

use std::time::Duration;

use anyhow::Result;
use prwatch_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use prwatch_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap(config)?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        health::HealthState {
            commands: app.dispatcher.command_count(),
            integrations: app.config.enabled_integrations(),
            calendars: app.config.calendars.len(),
        },
    )
    .await?;

    if !app.config.calendars.is_empty() {
        let poller = calendar::CalendarPoller::new(
            &app.config.calendars,
            app.http.clone(),
            app.dispatcher.clone(),
            app.chat.clone(),
            Duration::from_secs(app.config.calendar.poll_interval_secs),
        )?;
        poller.spawn();
        tracing::info!(
            event_name = "system.server.calendar_poller_started",
            correlation_id = "bootstrap",
            calendars = app.config.calendars.len(),
            poll_interval_secs = app.config.calendar.poll_interval_secs,
            "calendar poller started"
        );
    }

    let slack_runner = app.slack_runner;
    tokio::spawn(async move {
        if let Err(error) = slack_runner.start().await {
            tracing::error!(
                event_name = "system.server.slack_runner_failed",
                correlation_id = "socket",
                error = %error,
                "slack socket mode runner stopped"
            );
        }
    });
    tracing::info!(
        event_name = "system.server.slack_transport_mode",
        transport_mode = "socket_mode",
        correlation_id = "bootstrap",
        "slack runner started"
    );

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        commands = app.dispatcher.command_count(),
        "prwatch-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "prwatch-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
