pub mod config;
pub mod error;
mod generator;
mod mqtt;
mod paced;
mod pacer;
mod publish;

pub use config::{MqttSettings, RunConfig};
pub use error::PipelineError;
pub use generator::ReadingGenerator;
pub use mqtt::MqttPublisher;
pub use paced::{RunStats, run_paced, spawn_paced_publisher};
pub use pacer::Pacer;
pub use publish::{Publish, StdoutPublisher};
