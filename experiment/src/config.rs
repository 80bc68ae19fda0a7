//! Sweep configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use floodbench_network::{RemovalPolicy, TopologyConfig};
use floodbench_types::{BroadcastStrategy, Delay, DelayRange, MessageId, NodeId};
use floodbench_utils::LogFormat;

use crate::ExperimentError;

/// Configuration of one experiment sweep.
///
/// Can be loaded from a TOML file via [`ExperimentConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file reproduces the reference sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Network sizes are `node_step, 2 * node_step, ..., node_steps * node_step`.
    #[serde(default = "default_node_step")]
    pub node_step: usize,

    #[serde(default = "default_node_steps")]
    pub node_steps: usize,

    /// Target degree `D`; the degree band is `D ± degree_margin`.
    #[serde(default = "default_mean_degree")]
    pub mean_degree: usize,

    #[serde(default = "default_degree_margin")]
    pub degree_margin: usize,

    #[serde(default)]
    pub removal: RemovalPolicy,

    /// Processing-delay ceilings in milliseconds. Each entry is one sweep
    /// round; peers draw their delay from `0..=ceiling`.
    #[serde(default = "default_node_delays")]
    pub node_delays: Vec<u64>,

    /// Whether each round starts with a Flood batch.
    #[serde(default = "default_true")]
    pub include_flood: bool,

    /// Wave levels are `step, 2 * step, ...` up to 100. Zero disables Wave.
    #[serde(default = "default_wave_level_step")]
    pub wave_level_step: u8,

    #[serde(default = "default_message")]
    pub message: u64,

    #[serde(default)]
    pub originator: u64,

    /// Base seed; each run derives its own from it. Unset means unseeded.
    #[serde(default)]
    pub seed: Option<u64>,

    /// JSONL results file, appended to.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_link_delay")]
    pub link_delay: DelayRange,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_node_step() -> usize {
    1000
}

fn default_node_steps() -> usize {
    10
}

fn default_mean_degree() -> usize {
    40
}

fn default_degree_margin() -> usize {
    2
}

fn default_node_delays() -> Vec<u64> {
    vec![100]
}

fn default_true() -> bool {
    true
}

fn default_wave_level_step() -> u8 {
    5
}

fn default_message() -> u64 {
    1
}

fn default_output() -> PathBuf {
    PathBuf::from("results/network_metric.jsonl")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_link_delay() -> DelayRange {
    DelayRange::fixed(Delay::from_millis(1))
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ExperimentConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ExperimentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExperimentError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ExperimentError> {
        toml::from_str(s).map_err(|e| ExperimentError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ExperimentError> {
        toml::to_string_pretty(self).map_err(|e| ExperimentError::Config(e.to_string()))
    }

    pub fn network_sizes(&self) -> Vec<usize> {
        (1..=self.node_steps).map(|i| i * self.node_step).collect()
    }

    pub fn wave_levels(&self) -> Vec<u8> {
        if self.wave_level_step == 0 {
            return Vec::new();
        }
        (self.wave_level_step..=100)
            .step_by(self.wave_level_step as usize)
            .collect()
    }

    /// Strategies in batch order: Flood first, then Wave by ascending level.
    pub fn strategies(&self) -> Vec<BroadcastStrategy> {
        let flood = self.include_flood.then_some(BroadcastStrategy::Flood);
        flood
            .into_iter()
            .chain(
                self.wave_levels()
                    .into_iter()
                    .map(|level| BroadcastStrategy::Wave { level }),
            )
            .collect()
    }

    pub fn message_id(&self) -> MessageId {
        MessageId::new(self.message)
    }

    pub fn originator_id(&self) -> NodeId {
        NodeId::new(self.originator)
    }

    /// Degree-bounded topology for one run.
    ///
    /// Runs of the same size and delay ceiling share a derived seed, so every
    /// strategy in a round is measured on the same wiring.
    pub fn topology_config(&self, node_count: usize, max_node_delay: Delay) -> TopologyConfig {
        let d = self.mean_degree;
        let config = TopologyConfig::degree_bounded(
            node_count,
            d,
            d.saturating_sub(self.degree_margin),
            d + self.degree_margin,
        )
        .with_removal(self.removal)
        .with_node_delay(DelayRange::new(Delay::ZERO, max_node_delay))
        .with_link_delay(self.link_delay);

        match self.seed {
            Some(seed) => config.with_seed(derive_seed(seed, node_count, max_node_delay)),
            None => config,
        }
    }

    /// Reject sweeps that cannot produce a single meaningful run.
    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.node_step == 0 || self.node_steps == 0 {
            return Err(ExperimentError::Config(
                "node_step and node_steps must be positive".to_string(),
            ));
        }
        if self.node_delays.is_empty() {
            return Err(ExperimentError::Config(
                "node_delays must list at least one ceiling".to_string(),
            ));
        }
        if self.wave_level_step > 100 {
            return Err(ExperimentError::Config(format!(
                "wave_level_step {} exceeds 100",
                self.wave_level_step
            )));
        }
        if self.strategies().is_empty() {
            return Err(ExperimentError::Config(
                "no strategies selected: enable flood or set wave_level_step".to_string(),
            ));
        }
        if self.originator as usize >= self.node_step {
            return Err(ExperimentError::Config(format!(
                "originator {} is outside the smallest network of {} peers",
                self.originator, self.node_step
            )));
        }
        self.log_format
            .parse::<LogFormat>()
            .map_err(ExperimentError::Config)?;
        self.topology_config(self.node_step, Delay::ZERO)
            .validate()
            .map_err(|e| ExperimentError::Config(e.to_string()))
    }
}

fn derive_seed(base: u64, node_count: usize, max_node_delay: Delay) -> u64 {
    base.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((node_count as u64) << 20)
        .wrapping_add(max_node_delay.as_millis())
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            node_step: default_node_step(),
            node_steps: default_node_steps(),
            mean_degree: default_mean_degree(),
            degree_margin: default_degree_margin(),
            removal: RemovalPolicy::default(),
            node_delays: default_node_delays(),
            include_flood: default_true(),
            wave_level_step: default_wave_level_step(),
            message: default_message(),
            originator: 0,
            seed: None,
            output: default_output(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            link_delay: default_link_delay(),
        }
    }
}
