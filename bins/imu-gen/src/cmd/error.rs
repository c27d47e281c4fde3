use imu_api::ApiError;
use pipeline::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum ImuGenError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),

    #[error("publisher task: {0}")]
    Task(#[from] tokio::task::JoinError),
}
