use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dispatcher::NotificationDispatcher;
use crate::fetcher::HttpFetcher;
use crate::models::{FirstPollPolicy, Product, ProviderKind};
use crate::plugins::traits::NotificationResult;
use crate::provider::Provider;
use crate::tracker::AvailabilityTracker;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingStats {
    pub product: String,
    pub provider: ProviderKind,
    pub url: String,
    pub status: PairingStatus,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub events_emitted: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PairingStatus {
    Active,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub pairings: usize,
    pub failing_pairings: usize,
    pub cycles: u64,
    pub completed_runs: u64,
    pub failed_runs: u64,
    pub events_emitted: u64,
    pub uptime_seconds: u64,
}

/// One (product, provider) combination and its availability memory.
pub struct Pairing {
    provider: Provider,
    tracker: AvailabilityTracker,
    stats: PairingStats,
}

impl Pairing {
    pub fn new(provider: Provider, tracker: AvailabilityTracker) -> Self {
        let stats = PairingStats {
            product: tracker.product().title.clone(),
            provider: provider.id(),
            url: provider.url().to_string(),
            status: PairingStatus::Active,
            last_run: None,
            run_count: 0,
            success_count: 0,
            error_count: 0,
            events_emitted: 0,
            last_error: None,
        };

        Self {
            provider,
            tracker,
            stats,
        }
    }

    pub fn tracker(&self) -> &AvailabilityTracker {
        &self.tracker
    }

    pub fn stats(&self) -> &PairingStats {
        &self.stats
    }
}

/// Outcome of one pass over every pairing.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub checked: usize,
    pub failed: usize,
    pub events: usize,
    pub deliveries: Vec<JoinHandle<Vec<NotificationResult>>>,
}

impl CycleReport {
    /// Wait for every notification started during the cycle.
    pub async fn wait_for_deliveries(self) -> Vec<NotificationResult> {
        join_all(self.deliveries)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(results) => Some(results),
                Err(e) => {
                    tracing::error!("Notification task failed: {}", e);
                    None
                }
            })
            .flatten()
            .collect()
    }
}

/// Sequentially polls every pairing: extractor, then tracker, then dispatcher.
pub struct PollLoop {
    pairings: Vec<Pairing>,
    dispatcher: Arc<NotificationDispatcher>,
    cycles: u64,
}

impl PollLoop {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            pairings: Vec::new(),
            dispatcher,
            cycles: 0,
        }
    }

    pub fn add_pairing(&mut self, pairing: Pairing) {
        self.pairings.push(pairing);
    }

    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        config.validate()?;

        let fetcher = HttpFetcher::new(&config.http)?;
        let dispatcher = NotificationDispatcher::from_config(config, fetcher.clone())?;
        let mut poll_loop = Self::new(Arc::new(dispatcher));

        for product_config in &config.products {
            let product = Arc::new(Product::new(product_config.title.clone(), product_config.image.clone()));

            for provider_config in &product_config.providers {
                let provider = Provider::from_config(provider_config, &fetcher);
                let tracker = AvailabilityTracker::new(
                    Arc::clone(&product),
                    provider.id(),
                    provider.url(),
                    product_config.sizes.iter().map(|s| s.trim().to_string()),
                    config.first_poll,
                );
                poll_loop.add_pairing(Pairing::new(provider, tracker));
            }
        }

        tracing::info!(
            pairings = poll_loop.pairings.len(),
            channels = ?poll_loop.dispatcher.channel_types(),
            first_poll = ?config.first_poll,
            "Poll loop configured"
        );

        Ok(poll_loop)
    }

    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn stats(&self) -> Vec<PairingStats> {
        self.pairings.iter().map(|p| p.stats.clone()).collect()
    }

    /// Poll every pairing once.
    ///
    /// A failed fetch or extraction is logged and leaves that pairing's state
    /// untouched; the next cycle is its retry. Notifications are started but not
    /// awaited.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let cycle = self.cycles;
        let mut report = CycleReport::default();

        tracing::debug!(cycle, pairings = self.pairings.len(), "Starting poll cycle");

        for pairing in &mut self.pairings {
            let start_time = tokio::time::Instant::now();
            let provider = pairing.provider.id();
            let product = pairing.stats.product.clone();

            report.checked += 1;
            pairing.stats.run_count += 1;
            pairing.stats.last_run = Some(Utc::now());
            metrics::counter!("size_watcher_polls_total", "provider" => provider.as_str()).increment(1);

            let observed = match pairing.provider.fetch_availability().await {
                Ok(observed) => observed,
                Err(e) => {
                    if e.is_poll_failure() {
                        tracing::warn!(%product, %provider, url = pairing.provider.url(), "Poll failed: {}", e);
                    } else {
                        tracing::error!(%product, %provider, url = pairing.provider.url(), "Poll failed: {}", e);
                    }
                    metrics::counter!("size_watcher_poll_failures_total", "provider" => provider.as_str()).increment(1);

                    report.failed += 1;
                    pairing.stats.error_count += 1;
                    pairing.stats.last_error = Some(e.to_string());
                    pairing.stats.status = PairingStatus::Error;
                    continue;
                }
            };

            let events = pairing.tracker.diff(&observed);

            pairing.stats.success_count += 1;
            pairing.stats.last_error = None;
            pairing.stats.status = PairingStatus::Active;
            pairing.stats.events_emitted += events.len() as u64;

            let watched = pairing.tracker.available_sizes();
            if watched.is_empty() {
                tracing::info!(
                    %product,
                    %provider,
                    in_stock = %observed.available_labels().join(", "),
                    "Watched sizes out of stock"
                );
            } else {
                tracing::info!(%product, %provider, "Watched sizes available: {}", watched.join(", "));
            }

            tracing::debug!(
                %product,
                %provider,
                events = events.len(),
                "Checked in {}ms",
                start_time.elapsed().as_millis()
            );

            report.events += events.len();
            for event in events {
                report.deliveries.push(self.dispatcher.fan_out(event));
            }
        }

        tracing::debug!(
            cycle,
            checked = report.checked,
            failed = report.failed,
            events = report.events,
            "Poll cycle finished"
        );

        report
    }
}

/// Drives a [`PollLoop`] on a fixed interval.
pub struct PollScheduler {
    scheduler: JobScheduler,
    poll_loop: Arc<Mutex<PollLoop>>,
    interval: Duration,
    job_id: Option<Uuid>,
    start_time: DateTime<Utc>,
}

impl PollScheduler {
    pub async fn new(poll_loop: PollLoop, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(anyhow::anyhow!("Poll interval must be greater than 0"));
        }

        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            poll_loop: Arc::new(Mutex::new(poll_loop)),
            interval,
            job_id: None,
            start_time: Utc::now(),
        })
    }

    /// Run one cycle right away, then schedule the rest.
    pub async fn start(&mut self) -> Result<()> {
        {
            let mut poll_loop = self.poll_loop.lock().await;
            poll_loop.run_cycle().await;
        }

        let poll_loop = Arc::clone(&self.poll_loop);
        let job = Job::new_repeated_async(self.interval, move |_uuid, _l| {
            let poll_loop = Arc::clone(&poll_loop);

            Box::pin(async move {
                // Cycles are serialized; a tick that lands mid-cycle is dropped.
                match poll_loop.try_lock() {
                    Ok(mut poll_loop) => {
                        poll_loop.run_cycle().await;
                    }
                    Err(_) => tracing::warn!("Previous poll cycle still running, skipping this tick"),
                }
            })
        })?;

        self.job_id = Some(self.scheduler.add(job).await?);
        self.scheduler.start().await?;

        tracing::info!("Poll scheduler started, polling every {}s", self.interval.as_secs());
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(job_id) = self.job_id.take() {
            self.scheduler.remove(&job_id).await?;
        }

        self.scheduler.shutdown().await?;
        tracing::info!("Poll scheduler shutdown");
        Ok(())
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        let poll_loop = self.poll_loop.lock().await;
        let pairings = poll_loop.stats();
        let uptime = Utc::now().signed_duration_since(self.start_time);

        SchedulerStats {
            pairings: pairings.len(),
            failing_pairings: pairings.iter().filter(|p| p.status == PairingStatus::Error).count(),
            cycles: poll_loop.cycles(),
            completed_runs: pairings.iter().map(|p| p.success_count).sum(),
            failed_runs: pairings.iter().map(|p| p.error_count).sum(),
            events_emitted: pairings.iter().map(|p| p.events_emitted).sum(),
            uptime_seconds: uptime.num_seconds().max(0) as u64,
        }
    }
}
