use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use pipeline::{MqttPublisher, Publish, RunStats, StdoutPublisher, spawn_paced_publisher};

use super::config::Effective;
use super::error::ImuGenError;

// ═══════════════════════════════════════════════════════════════
//  Main dispatch
// ═══════════════════════════════════════════════════════════════

pub async fn run(eff: Effective) -> Result<RunStats, ImuGenError> {
    let publisher: Arc<dyn Publish> = if eff.dry_run {
        Arc::new(StdoutPublisher)
    } else {
        Arc::new(MqttPublisher::new(eff.mqtt.clone())?)
    };

    tracing::info!(
        broker = %eff.mqtt.addr(),
        topic = %eff.run.topic,
        qos = eff.mqtt.qos,
        dry_run = eff.dry_run,
        "imu-gen starting"
    );
    tracing::info!(cname = %eff.run.cname, nth_start = eff.run.nth_start, devices = ?eff.run.devices, "run");
    tracing::info!(rate = eff.run.rate, "publishing; stop with SIGTERM or Ctrl+C");

    let token = CancellationToken::new();
    let mut handle = spawn_paced_publisher(eff.run, publisher, token.clone());

    let signal = tokio::select! {
        sig = shutdown_signal() => sig,
        // the loop only ends on cancellation; treat an early exit as final
        stats = &mut handle => return Ok(stats?),
    };

    match &signal {
        Ok(name) => tracing::info!(signal = %name, "shutdown requested, finishing in-flight publish"),
        Err(e) => tracing::error!(error = %e, "signal handling failed, shutting down"),
    }
    token.cancel();
    let stats = handle.await?;
    signal?;

    tracing::info!(sent = stats.sent, failed = stats.failed, "imu-gen stopped");
    Ok(stats)
}

/// Resolve on SIGINT or SIGTERM, returning the signal name.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT"),
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}
