use std::time::Duration;

use crate::PipelineError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "aaac/campaign/imu";
pub const DEFAULT_CLIENT_ID: &str = "imu-gen";
pub const DEFAULT_RATE: f64 = 10.0;
pub const DEFAULT_RANGE: f64 = 10.0;
pub const DEFAULT_PRECISION: u32 = 6;
pub const DEFAULT_BACKOFF_MS: u64 = 2000;

// ═══════════════════════════════════════════════════════════════
//  Run config
// ═══════════════════════════════════════════════════════════════

/// Everything the paced publisher needs. Built once at startup and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Device pool; each tick picks one uniformly at random.
    pub devices: Vec<String>,
    /// Campaign / run label stamped on every reading.
    pub cname: String,
    /// Sequence number of the first published reading.
    pub nth_start: i64,
    /// Ticks per second.
    pub rate: f64,
    /// Channels are drawn from `[-range, range]`.
    pub range: f64,
    /// Decimal places kept on channel values.
    pub precision: u32,
    /// Pause after a failed publish.
    pub backoff: Duration,
    /// Fixed RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub topic: String,
}

impl RunConfig {
    pub fn new(devices: Vec<String>, cname: impl Into<String>, nth_start: i64) -> Self {
        Self {
            devices,
            cname: cname.into(),
            nth_start,
            rate: DEFAULT_RATE,
            range: DEFAULT_RANGE,
            precision: DEFAULT_PRECISION,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            seed: None,
            topic: DEFAULT_TOPIC.to_string(),
        }
    }

    /// Nominal time between two ticks.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.devices.is_empty() {
            return Err(invalid("devices", "device list is empty"));
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(invalid("rate", format!("must be a positive number, got {}", self.rate)));
        }
        if Duration::try_from_secs_f64(1.0 / self.rate).is_err() {
            return Err(invalid("rate", format!("period of rate {} does not fit a duration", self.rate)));
        }
        // the sampler needs the width of [-range, range] to stay finite
        if !self.range.is_finite() || self.range < 0.0 || !(2.0 * self.range).is_finite() {
            return Err(invalid(
                "range",
                format!("must be a non-negative number below {:e}, got {}", f64::MAX / 2.0, self.range),
            ));
        }
        validate_topic(&self.topic)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Broker settings
// ═══════════════════════════════════════════════════════════════

/// MQTT connection parameters used for every connect-publish-disconnect cycle.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    /// 0, 1 or 2.
    pub qos: u8,
    /// Prefix of the per-connection client id.
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            qos: 0,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            username: None,
            password: None,
        }
    }
}

impl MqttSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.host.trim().is_empty() {
            return Err(invalid("host", "broker host is empty"));
        }
        if self.qos > 2 {
            return Err(invalid("qos", format!("must be 0, 1 or 2, got {}", self.qos)));
        }
        if self.client_id.is_empty() || self.client_id.starts_with(char::is_whitespace) {
            return Err(invalid("client_id", format!("invalid client id prefix {:?}", self.client_id)));
        }
        Ok(())
    }
}

/// Publish topics must be non-empty and free of wildcards.
fn validate_topic(topic: &str) -> Result<(), PipelineError> {
    if topic.is_empty() {
        return Err(invalid("topic", "topic is empty"));
    }
    if topic.contains(['+', '#']) {
        return Err(invalid("topic", format!("wildcards are not allowed in a publish topic: {topic}")));
    }
    Ok(())
}

fn invalid(field: &'static str, detail: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig { field, detail: detail.into() }
}
