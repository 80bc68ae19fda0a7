use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] floodbench_network::NetworkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("experiment task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
