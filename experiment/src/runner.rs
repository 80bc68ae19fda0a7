//! Sweep execution.
//!
//! A sweep is a sequence of batches. For every processing-delay ceiling, the
//! Flood batch runs first, then one batch per Wave level; a batch runs every
//! configured network size concurrently and waits for all of them before
//! the next batch starts. Each run generates its own topology, broadcasts
//! once and appends one [`NetworkMetric`] to the sink.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn, Instrument};

use floodbench_network::broadcast as propagate;
use floodbench_types::{BroadcastStrategy, Delay};
use floodbench_utils::format_elapsed;

use crate::shutdown::{self, ShutdownController};
use crate::tracing_spans::{broadcast_span, generate_span, run_span};
use crate::{ExperimentConfig, ExperimentError, JsonlSink, NetworkMetric};

/// Parameters of a single run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunPlan {
    pub node_count: usize,
    pub strategy: BroadcastStrategy,
    pub max_node_delay: Delay,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub completed: usize,
    pub failed: usize,
    /// Set when a shutdown stopped the sweep before its last batch.
    pub interrupted: bool,
    pub elapsed: Duration,
}

/// Generate a topology for `plan`, broadcast over it and measure the result.
pub async fn run_once(
    config: &ExperimentConfig,
    plan: RunPlan,
) -> Result<NetworkMetric, ExperimentError> {
    let topology_config = config.topology_config(plan.node_count, plan.max_node_delay);
    let span = generate_span(plan.node_count, config.mean_degree);
    let topology =
        tokio::task::spawn_blocking(move || span.in_scope(|| topology_config.generate()))
            .await??;
    let topology = Arc::new(topology);

    let message = config.message_id();
    let outcome = propagate(
        Arc::clone(&topology),
        config.originator_id(),
        message,
        plan.strategy,
    )
    .instrument(broadcast_span(plan.strategy, topology.len()))
    .await?;

    Ok(NetworkMetric::measure(
        &topology,
        message,
        plan.strategy,
        plan.max_node_delay,
        outcome.elapsed,
    ))
}

/// A configured sweep bound to its results file and a stop signal.
pub struct Sweep {
    config: Arc<ExperimentConfig>,
    sink: Arc<JsonlSink>,
    stop: broadcast::Receiver<()>,
}

impl Sweep {
    /// Validate `config` and open its output file.
    ///
    /// Shutdowns triggered on `shutdown` from here on stop the sweep at the
    /// next batch boundary.
    pub fn new(
        config: ExperimentConfig,
        shutdown: &ShutdownController,
    ) -> Result<Self, ExperimentError> {
        config.validate()?;
        let sink = JsonlSink::open(&config.output)?;
        Ok(Self {
            config: Arc::new(config),
            sink: Arc::new(sink),
            stop: shutdown.subscribe(),
        })
    }

    pub fn batches(&self) -> Vec<Vec<RunPlan>> {
        let sizes = self.config.network_sizes();
        let strategies = self.config.strategies();
        let mut batches = Vec::with_capacity(self.config.node_delays.len() * strategies.len());
        for &ceiling in &self.config.node_delays {
            for &strategy in &strategies {
                let batch = sizes
                    .iter()
                    .map(|&node_count| RunPlan {
                        node_count,
                        strategy,
                        max_node_delay: Delay::from_millis(ceiling),
                    })
                    .collect();
                batches.push(batch);
            }
        }
        batches
    }

    pub async fn run(mut self) -> SweepSummary {
        let started = Instant::now();
        let batches = self.batches();
        let total: usize = batches.iter().map(Vec::len).sum();
        info!(
            batches = batches.len(),
            runs = total,
            output = %self.sink.path().display(),
            "sweep started"
        );

        let mut summary = SweepSummary::default();
        for batch in batches {
            if shutdown::requested(&mut self.stop) {
                summary.interrupted = true;
                warn!(
                    remaining = total - summary.completed - summary.failed,
                    "sweep stopped before completion"
                );
                break;
            }

            let mut runs = JoinSet::new();
            for plan in batch {
                let config = Arc::clone(&self.config);
                let sink = Arc::clone(&self.sink);
                let span = run_span(plan.node_count, plan.strategy, plan.max_node_delay);
                runs.spawn(record_run(config, sink, plan).instrument(span));
            }

            while let Some(joined) = runs.join_next().await {
                match joined {
                    Ok(true) => summary.completed += 1,
                    Ok(false) => summary.failed += 1,
                    Err(e) => {
                        warn!("run task aborted: {e}");
                        summary.failed += 1;
                    }
                }
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            completed = summary.completed,
            failed = summary.failed,
            interrupted = summary.interrupted,
            elapsed = %format_elapsed(summary.elapsed),
            "sweep finished"
        );
        summary
    }
}

/// Run and record `plan`; returns whether a metric was written.
async fn record_run(config: Arc<ExperimentConfig>, sink: Arc<JsonlSink>, plan: RunPlan) -> bool {
    let metric = match run_once(&config, plan).await {
        Ok(metric) => metric,
        Err(e) => {
            warn!("run failed: {e}");
            return false;
        }
    };
    if let Err(e) = sink.append(&metric) {
        warn!("cannot record run: {e}");
        return false;
    }
    info!(
        avg_degree = metric.avg_degree,
        duplicate_rate = metric.duplicate_rate,
        receiving_rate = metric.receiving_rate,
        elapsed = %format_elapsed(Duration::from_millis(metric.elapsed_ms)),
        "run recorded"
    );
    true
}
