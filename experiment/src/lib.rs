//! Experiment layer over the propagation engine.
//!
//! Sweeps network sizes, processing-delay ceilings and forwarding strategies,
//! turns every finished broadcast into a [`NetworkMetric`] and appends it to
//! a JSONL results file. Also renders topologies and propagation trees for
//! inspection.

pub mod config;
pub mod error;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod shutdown;
pub mod sink;
pub mod tracing_spans;

pub use config::ExperimentConfig;
pub use error::ExperimentError;
pub use metrics::{result_label, DeliveryCounts, NetworkMetric};
pub use report::{PropagationRoutes, PropagationTree, TopologyListing};
pub use runner::{run_once, RunPlan, Sweep, SweepSummary};
pub use shutdown::ShutdownController;
pub use sink::JsonlSink;
