use std::time::Duration;

use clap::Args;
use serde::Deserialize;

use imu_api::parse_device_list;
use pipeline::config::{
    DEFAULT_BACKOFF_MS, DEFAULT_CLIENT_ID, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PRECISION, DEFAULT_RANGE, DEFAULT_RATE,
    DEFAULT_TOPIC,
};
use pipeline::{MqttSettings, RunConfig};

use super::error::ImuGenError;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub topic: Option<String>,
    pub qos: Option<u8>,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub rate: Option<f64>,
    pub range: Option<f64>,
    pub precision: Option<u32>,
    pub backoff_ms: Option<u64>,
    pub seed: Option<u64>,
    pub dry_run: Option<bool>,
}

pub fn load_config(path: &str) -> Result<Config, ImuGenError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ImuGenError::Config(format!("cannot read config {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| ImuGenError::Config(format!("bad config {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct GenArgs {
    /// Device ids separated by commas and/or hyphens, e.g. "IMU1-IMU2"
    pub devices: String,

    /// Campaign / run label stamped on every reading
    pub cname: String,

    /// Sequence number of the first reading
    #[arg(allow_negative_numbers = true)]
    pub nth_start: i64,

    /// Path to the TOML config file (missing file = defaults)
    #[arg(long, default_value = "imu-gen.toml", env = "IMU_GEN_CONFIG")]
    pub config: String,

    /// Broker host
    #[arg(long)]
    pub host: Option<String>,

    /// Broker port
    #[arg(long)]
    pub port: Option<u16>,

    /// Publish topic
    #[arg(long)]
    pub topic: Option<String>,

    /// MQTT QoS (0, 1, 2)
    #[arg(long)]
    pub qos: Option<u8>,

    /// Client id prefix; each connection appends "-<pid>-<n>"
    #[arg(long)]
    pub client_id: Option<String>,

    #[arg(long, env = "IMU_GEN_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "IMU_GEN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Readings per second
    #[arg(long)]
    pub rate: Option<f64>,

    /// Channel values are drawn from [-range, range]
    #[arg(long)]
    pub range: Option<f64>,

    /// Decimal places kept on channel values
    #[arg(long)]
    pub precision: Option<u32>,

    /// Pause after a failed publish, in ms
    #[arg(long)]
    pub backoff_ms: Option<u64>,

    /// PRNG seed for a reproducible stream (default: OS entropy)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print payloads to stdout instead of publishing
    #[arg(long)]
    pub dry_run: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Final configuration after the merge: config file < env/CLI.
#[derive(Debug)]
pub struct Effective {
    pub run: RunConfig,
    pub mqtt: MqttSettings,
    pub dry_run: bool,
}

impl Effective {
    pub fn new(args: &GenArgs) -> Result<Self, ImuGenError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };

        let devices = parse_device_list(&args.devices)?;

        let run = RunConfig {
            devices,
            cname: args.cname.clone(),
            nth_start: args.nth_start,
            rate: args.rate.or(cfg.rate).unwrap_or(DEFAULT_RATE),
            range: args.range.or(cfg.range).unwrap_or(DEFAULT_RANGE),
            precision: args.precision.or(cfg.precision).unwrap_or(DEFAULT_PRECISION),
            backoff: Duration::from_millis(args.backoff_ms.or(cfg.backoff_ms).unwrap_or(DEFAULT_BACKOFF_MS)),
            seed: args.seed.or(cfg.seed),
            topic: args.topic.clone().or(cfg.topic).unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
        };
        run.validate()?;

        let mqtt = MqttSettings {
            host: args.host.clone().or(cfg.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: args.port.or(cfg.port).unwrap_or(DEFAULT_PORT),
            qos: args.qos.or(cfg.qos).unwrap_or(0),
            client_id: args.client_id.clone().or(cfg.client_id).unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            username: args.username.clone().or(cfg.username),
            password: args.password.clone().or(cfg.password),
        };
        mqtt.validate()?;

        Ok(Self {
            run,
            mqtt,
            dry_run: args.dry_run || cfg.dry_run.unwrap_or(false),
        })
    }
}
