use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use size_watcher::config::{LoggingConfig, MetricsConfig};
use size_watcher::{AppConfig, PollLoop, PollScheduler};

#[derive(Debug, Parser)]
#[command(name = "size-watcher", version, about = "Watch vendor pages for shoe size restocks")]
struct Cli {
    /// Config file, with or without extension (TOML or JSON)
    #[arg(short, long, default_value = "config/default")]
    config: String,

    /// Run a single poll cycle, wait for notifications, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; credentials may come from the config file.
    let _ = dotenvy::dotenv();

    let config = AppConfig::load(&cli.config).with_context(|| format!("failed to load config '{}'", cli.config))?;
    let _guard = init_tracing(&config.logging)?;

    info!("Starting Size Watcher...");
    info!(
        products = config.products.len(),
        pairings = config.pairing_count(),
        interval_seconds = config.poll_interval_seconds,
        "Loaded configuration from {}",
        cli.config
    );

    if config.metrics.enabled {
        init_metrics(&config.metrics)?;
    }

    let mut poll_loop = PollLoop::from_config(&config).context("failed to set up poll loop")?;

    if cli.once {
        let report = poll_loop.run_cycle().await;
        let (checked, failed, events) = (report.checked, report.failed, report.events);
        let results = report.wait_for_deliveries().await;

        info!(
            checked,
            failed,
            events,
            delivered = results.iter().filter(|r| r.success).count(),
            "Single cycle complete"
        );
        return Ok(());
    }

    let mut scheduler = PollScheduler::new(poll_loop, config.poll_interval()).await?;
    scheduler.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    let stats = scheduler.get_stats().await;
    scheduler.shutdown().await?;
    info!(
        cycles = stats.cycles,
        completed_runs = stats.completed_runs,
        failed_runs = stats.failed_runs,
        events = stats.events_emitted,
        "Stopped"
    );

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive("size_watcher=info".parse()?);

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
            Ok(None)
        }
    }
}

fn init_metrics(metrics: &MetricsConfig) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], metrics.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
