//! floodbench: broadcast propagation benchmarks over synthetic P2P topologies.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use floodbench_experiment::{
    ExperimentConfig, JsonlSink, NetworkMetric, PropagationRoutes, PropagationTree,
    ShutdownController, Sweep, TopologyListing,
};
use floodbench_network::{broadcast, RemovalPolicy, Topology, TopologyConfig};
use floodbench_types::{BroadcastStrategy, Delay, DelayRange, MessageId, NodeId};
use floodbench_utils::{format_elapsed, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "floodbench", about = "P2P broadcast propagation benchmark")]
struct Cli {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// Sweeps default to the config file's value.
    #[arg(long, global = true, env = "FLOODBENCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "FLOODBENCH_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the size × delay × strategy sweep and append metrics to a JSONL file.
    Sweep(SweepArgs),
    /// Generate one topology, broadcast once and print the metric.
    Run(RunArgs),
    /// Generate one topology and print it.
    Topology(TopologyArgs),
}

#[derive(Args)]
struct SweepArgs {
    /// Path to a TOML sweep configuration. If provided, file settings are
    /// used as the base; flags and env vars override them.
    #[arg(long, env = "FLOODBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// JSONL results file.
    #[arg(long, env = "FLOODBENCH_OUTPUT")]
    output: Option<PathBuf>,

    /// Base seed for reproducible topologies.
    #[arg(long, env = "FLOODBENCH_SEED")]
    seed: Option<u64>,

    /// Network size increment.
    #[arg(long)]
    node_step: Option<usize>,

    /// Number of network sizes.
    #[arg(long)]
    node_steps: Option<usize>,

    /// Processing-delay ceilings in ms (comma-separated: "0,50,100").
    #[arg(long, value_delimiter = ',')]
    node_delays: Vec<u64>,

    /// Wave level increment; 0 disables Wave runs.
    #[arg(long)]
    wave_level_step: Option<u8>,

    /// Skip the Flood batches.
    #[arg(long)]
    no_flood: bool,
}

impl SweepArgs {
    fn load_config(&self) -> anyhow::Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_toml_file(path)
                .with_context(|| format!("loading sweep config {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(step) = self.node_step {
            config.node_step = step;
        }
        if let Some(steps) = self.node_steps {
            config.node_steps = steps;
        }
        if !self.node_delays.is_empty() {
            config.node_delays = self.node_delays.clone();
        }
        if let Some(step) = self.wave_level_step {
            config.wave_level_step = step;
        }
        if self.no_flood {
            config.include_flood = false;
        }
        Ok(config)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Removal {
    RandomTarget,
    Neighbor,
}

impl From<Removal> for RemovalPolicy {
    fn from(removal: Removal) -> Self {
        match removal {
            Removal::RandomTarget => RemovalPolicy::RandomTarget,
            Removal::Neighbor => RemovalPolicy::Neighbor,
        }
    }
}

/// Topology generation flags shared by `run` and `topology`.
#[derive(Args)]
struct GenerateArgs {
    /// Number of peers.
    #[arg(long, short = 'n', default_value_t = 1000)]
    nodes: usize,

    /// Wire exactly this many random edges instead of degree bounding.
    #[arg(long)]
    edges: Option<usize>,

    /// Target degree D for degree bounding.
    #[arg(long, default_value_t = 40)]
    degree: usize,

    /// Degree band half-width: peers aim for D ± margin.
    #[arg(long, default_value_t = 2)]
    margin: usize,

    /// How over-connected peers shed links.
    #[arg(long, value_enum, default_value_t = Removal::RandomTarget)]
    removal: Removal,

    /// Processing-delay ceiling in ms; peers draw from 0..=max.
    #[arg(long, default_value_t = 100)]
    max_delay: u64,

    /// Link delay range in ms.
    #[arg(long, default_value_t = 1)]
    min_link_delay: u64,

    #[arg(long, default_value_t = 1)]
    max_link_delay: u64,

    /// Seed for reproducible wiring.
    #[arg(long, env = "FLOODBENCH_SEED")]
    seed: Option<u64>,
}

impl GenerateArgs {
    fn topology_config(&self) -> anyhow::Result<TopologyConfig> {
        let config = match self.edges {
            Some(edges) => TopologyConfig::random(self.nodes, edges),
            None => TopologyConfig::degree_bounded(
                self.nodes,
                self.degree,
                self.degree.saturating_sub(self.margin),
                self.degree + self.margin,
            )
            .with_removal(self.removal.into()),
        }
        .with_node_delay(DelayRange::from_millis(0, self.max_delay))
        .with_link_delay(DelayRange::from_millis(self.min_link_delay, self.max_link_delay));
        let config = match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        };
        config.validate()?;
        Ok(config)
    }

    async fn generate(&self) -> anyhow::Result<Topology> {
        let config = self.topology_config()?;
        let topology = tokio::task::spawn_blocking(move || config.generate()).await??;
        tracing::info!(
            peers = topology.len(),
            edges = topology.edge_count(),
            avg_degree = topology.avg_degree(),
            "topology generated"
        );
        Ok(topology)
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    generate: GenerateArgs,

    /// Forwarding strategy: "flood" or "wave-<level>".
    #[arg(long, short = 's', default_value = "flood")]
    strategy: BroadcastStrategy,

    #[arg(long, default_value_t = 0)]
    originator: u64,

    #[arg(long, default_value_t = 1)]
    message: u64,

    /// Also append the metric to this JSONL file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print each receiver's first sender.
    #[arg(long)]
    routes: bool,

    /// Print the propagation tree rooted at the originator.
    #[arg(long)]
    tree: bool,
}

#[derive(Args)]
struct TopologyArgs {
    #[command(flatten)]
    generate: GenerateArgs,

    /// Print a JSON snapshot instead of the text listing.
    #[arg(long)]
    json: bool,
}

fn init_cli_logging(
    cli_format: Option<LogFormat>,
    cli_level: Option<&str>,
    config: &ExperimentConfig,
) {
    let format = cli_format
        .or_else(|| config.log_format.parse().ok())
        .unwrap_or_default();
    let level = cli_level.unwrap_or(&config.log_level);
    init_logging(format, level);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref();

    match cli.command {
        Command::Sweep(args) => {
            let config = args.load_config()?;
            init_cli_logging(cli.log_format, level, &config);
            sweep(config).await
        }
        Command::Run(args) => {
            init_cli_logging(cli.log_format, level, &ExperimentConfig::default());
            run(args).await
        }
        Command::Topology(args) => {
            init_cli_logging(cli.log_format, level, &ExperimentConfig::default());
            topology(args).await
        }
    }
}

async fn sweep(config: ExperimentConfig) -> anyhow::Result<()> {
    let controller = Arc::new(ShutdownController::new());
    let sweep = Sweep::new(config, &controller)?;

    let signals = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.wait_for_signal().await })
    };
    let summary = sweep.run().await;
    signals.abort();

    println!(
        "{} runs recorded, {} failed in {}{}",
        summary.completed,
        summary.failed,
        format_elapsed(summary.elapsed),
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    if summary.failed > 0 {
        anyhow::bail!("{} sweep runs failed", summary.failed);
    }
    Ok(())
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let topology = Arc::new(args.generate.generate().await?);
    let originator = NodeId::new(args.originator);
    let message = MessageId::new(args.message);

    let outcome = broadcast(Arc::clone(&topology), originator, message, args.strategy).await?;
    let metric = NetworkMetric::measure(
        &topology,
        message,
        args.strategy,
        Delay::from_millis(args.generate.max_delay),
        outcome.elapsed,
    );
    tracing::info!(
        forwards = outcome.forwards,
        duplicates = outcome.duplicates,
        reached = outcome.reached,
        "broadcast finished"
    );

    println!("{}", serde_json::to_string(&metric)?);
    if let Some(path) = &args.output {
        JsonlSink::open(path)?.append(&metric)?;
    }
    if args.routes {
        println!("Propagation Route:");
        print!("{}", PropagationRoutes { topology: &topology, message });
    }
    if args.tree {
        println!("Propagation Tree:");
        print!(
            "{}",
            PropagationTree {
                topology: &topology,
                message,
                root: originator,
            }
        );
    }
    Ok(())
}

async fn topology(args: TopologyArgs) -> anyhow::Result<()> {
    let topology = args.generate.generate().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&topology.snapshot())?);
    } else {
        print!("{}", TopologyListing(&topology));
    }
    Ok(())
}
