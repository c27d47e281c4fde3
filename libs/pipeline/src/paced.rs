use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use imu_api::ApiError;

use crate::config::RunConfig;
use crate::generator::ReadingGenerator;
use crate::pacer::Pacer;
use crate::publish::Publish;

/// Counters returned when the paced loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Successfully published readings.
    pub sent: u64,
    /// Failed publish attempts.
    pub failed: u64,
    /// Sequence number the next reading would have carried.
    pub next_nth: i64,
}

// ═══════════════════════════════════════════════════════════════
//  Paced publisher task
// ═══════════════════════════════════════════════════════════════

/// Spawn the paced publish loop. The handle resolves once `token` is
/// cancelled and the in-flight publish has finished.
pub fn spawn_paced_publisher(
    cfg: RunConfig,
    publisher: Arc<dyn Publish>,
    token: CancellationToken,
) -> JoinHandle<RunStats> {
    tokio::spawn(async move { run_paced(&cfg, publisher, token).await })
}

/// Generate, encode and publish one reading per period until cancelled.
///
/// Cancellation is observed before (re)starting the tick loop and before
/// every tick. A failed publish is logged, followed by `cfg.backoff`, and
/// the tick loop restarts with a fresh pacing reference; the sequence number
/// only advances on success, so the published sequence stays gapless.
pub async fn run_paced(cfg: &RunConfig, publisher: Arc<dyn Publish>, token: CancellationToken) -> RunStats {
    let mut generator = ReadingGenerator::new(cfg);
    let topic: Arc<str> = Arc::from(cfg.topic.as_str());
    let mut pacer = Pacer::new(cfg.period(), Instant::now());
    let mut stats = RunStats { next_nth: cfg.nth_start, ..Default::default() };
    let started = std::time::Instant::now();

    tracing::info!(
        publisher = %publisher.name(),
        topic = %cfg.topic,
        period_ms = pacer.period().as_millis() as u64,
        "paced publisher started"
    );

    'run: while !token.is_cancelled() {
        pacer.reset(Instant::now());

        while !token.is_cancelled() {
            let reading = generator.reading(stats.next_nth);
            let payload = reading.encode();

            match publish_blocking(&publisher, &topic, payload.clone()).await {
                Ok(()) => {
                    stats.sent += 1;
                    stats.next_nth += 1;
                    tracing::debug!(nth = reading.nth, imuid = %reading.imuid, %payload, "published");
                    if stats.sent % 100 == 0 {
                        let elapsed = started.elapsed().as_secs_f64();
                        tracing::info!(
                            sent = stats.sent,
                            rate = format_args!("{:.1}", stats.sent as f64 / elapsed),
                            "progress"
                        );
                    }
                }
                Err(e) => {
                    stats.failed += 1;
                    if token.is_cancelled() {
                        tracing::warn!(publisher = %publisher.name(), error = %e, "publish failed during shutdown");
                        break 'run;
                    }
                    tracing::warn!(
                        publisher = %publisher.name(),
                        nth = reading.nth,
                        error = %e,
                        backoff_ms = cfg.backoff.as_millis() as u64,
                        "publish failed, retrying after backoff"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(cfg.backoff) => {}
                        _ = token.cancelled() => {}
                    }
                    continue 'run;
                }
            }

            if pacer.advance(Instant::now()).is_some() {
                tokio::select! {
                    _ = tokio::time::sleep_until(pacer.deadline()) => {}
                    _ = token.cancelled() => {}
                }
            }
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(
        sent = stats.sent,
        failed = stats.failed,
        next_nth = stats.next_nth,
        elapsed_s = format_args!("{elapsed:.1}"),
        rate = format_args!("{:.1}", if elapsed > 0.0 { stats.sent as f64 / elapsed } else { 0.0 }),
        "paced publisher stopped"
    );
    stats
}

/// Run the blocking publish on the blocking pool and await it.
async fn publish_blocking(publisher: &Arc<dyn Publish>, topic: &Arc<str>, payload: String) -> Result<(), ApiError> {
    let publisher = publisher.clone();
    let topic = topic.clone();
    tokio::task::spawn_blocking(move || publisher.publish(&topic, payload.as_bytes()))
        .await
        .map_err(|e| ApiError::io(format!("publish task failed: {e}")))?
}
