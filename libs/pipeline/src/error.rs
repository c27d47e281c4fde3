#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid config ({field}): {detail}")]
    InvalidConfig { field: &'static str, detail: String },

    #[error("{0}")]
    Api(#[from] imu_api::ApiError),
}
