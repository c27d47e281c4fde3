use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use imu_api::{Reading, now_secs, round_to};

use crate::config::RunConfig;

/// Produces synthetic readings: uniform channel values, a uniformly
/// chosen device, wall-clock timestamp.
pub struct ReadingGenerator {
    devices: Vec<String>,
    cname: String,
    range: f64,
    precision: u32,
    rng: ChaCha8Rng,
}

impl ReadingGenerator {
    pub fn new(cfg: &RunConfig) -> Self {
        let rng = match cfg.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            devices: cfg.devices.clone(),
            cname: cfg.cname.clone(),
            range: cfg.range,
            precision: cfg.precision,
            rng,
        }
    }

    /// Build the reading for sequence number `nth`.
    pub fn reading(&mut self, nth: i64) -> Reading {
        let mut channels = [0.0; 9];
        for value in channels.iter_mut() {
            *value = self.channel();
        }
        // devices is never empty: RunConfig::validate runs before the loop starts
        let imuid = self.devices.choose(&mut self.rng).cloned().unwrap_or_default();
        Reading {
            channels,
            nth,
            ts: now_secs(),
            imuid,
            cname: self.cname.clone(),
        }
    }

    fn channel(&mut self) -> f64 {
        if self.range == 0.0 {
            return 0.0;
        }
        let raw = self.rng.gen_range(-self.range..=self.range);
        round_to(raw, self.precision).clamp(-self.range, self.range)
    }
}
