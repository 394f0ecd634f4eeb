pub mod config;
pub mod models;
pub mod processor;
pub mod workers;

use anyhow::{bail, Context, Result};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::reflection::ReflectionProber;
use crate::url_crawler::RedirectResolver;
use config::ScanConfig;
use models::{ProbeOutcome, ProbeTask};
use processor::{prepare_task, probe_task};
use workers::start_workers;

/// Counters for a finished scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub tasks: usize,
    pub hits: usize,
    pub failures: usize,
}

impl ScanSummary {
    fn record(&mut self, outcome: &ProbeOutcome) {
        self.tasks += 1;
        if outcome.is_hit() {
            self.hits += 1;
        }
        if outcome.is_failure() {
            self.failures += 1;
        }
    }
}

/// Drives a whole scan: reads targets, resolves them one by one, probes them
/// on the worker pool and hands every outcome to a single consumer
pub struct Scanner {
    config: ScanConfig,
    resolver: RedirectResolver,
    prober: Arc<ReflectionProber>,
}

impl Scanner {
    /// Builds the resolver and prober clients from `config`
    pub fn new(config: ScanConfig) -> Result<Self> {
        let resolver = RedirectResolver::new(&config)?;
        let prober = Arc::new(ReflectionProber::new(&config)?);
        Ok(Self {
            config,
            resolver,
            prober,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scans every non-blank line of `input`
    ///
    /// Redirect resolution runs sequentially on the calling task while up to
    /// `workers` probes run in parallel. `on_outcome` is called once per
    /// target, in completion order, always from the calling task. Lines that
    /// are not valid UTF-8 are decoded lossily and scanned like any other.
    /// Fails only when the input cannot be read or holds no target at all.
    pub async fn run<R, F>(&self, mut input: R, mut on_outcome: F) -> Result<ScanSummary>
    where
        R: AsyncBufRead + Unpin,
        F: FnMut(&ProbeOutcome),
    {
        let (task_tx, task_rx) = mpsc::channel::<ProbeTask>(self.config.queue_size);

        let prober = self.prober.clone();
        let mut pool = start_workers(task_rx, self.config.workers, move |task: ProbeTask| {
            let prober = prober.clone();
            async move { probe_task(&prober, task).await }
        });

        let resolver = &self.resolver;
        let produce = async move {
            let mut buf = Vec::new();
            let mut queued = 0usize;
            loop {
                buf.clear();
                let read = input
                    .read_until(b'\n', &mut buf)
                    .await
                    .context("Failed to read input")?;
                if read == 0 {
                    break;
                }

                let line = String::from_utf8_lossy(&buf);
                if let Cow::Owned(_) = line {
                    debug!("Input line is not valid UTF-8, decoded as {:?}", line.trim());
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let task = prepare_task(resolver, line).await;
                debug!("Queueing {} (final URL {})", task.original_url, task.final_url);
                task_tx
                    .send(task)
                    .await
                    .context("Worker pool stopped accepting tasks")?;
                queued += 1;
            }
            Ok::<usize, anyhow::Error>(queued)
        };

        let consume = async {
            let mut summary = ScanSummary::default();
            while let Some(outcome) = pool.next_result().await {
                summary.record(&outcome);
                on_outcome(&outcome);
            }
            summary
        };

        let (queued, summary) = tokio::join!(produce, consume);
        let handled = pool.join().await?;
        let queued = queued?;

        if queued == 0 {
            bail!("No input provided");
        }
        debug!("Queued {} tasks, workers handled {}", queued, handled);
        info!(
            "Scan finished: {} targets, {} reflections, {} failures",
            summary.tasks, summary.hits, summary.failures
        );

        Ok(summary)
    }
}
