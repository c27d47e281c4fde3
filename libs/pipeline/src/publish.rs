use std::io::Write;

use imu_api::ApiError;

/// A blocking publish primitive. One call is one complete transaction:
/// when it returns `Ok`, the payload has left the process.
///
/// Implementations may block for as long as the network needs; the paced
/// loop always calls them from the blocking pool.
pub trait Publish: Send + Sync {
    /// Short label for logs (broker address, "stdout", ...).
    fn name(&self) -> &str;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), ApiError>;
}

/// Dry-run publisher: writes `<topic> <payload>` lines to stdout.
#[derive(Debug, Default)]
pub struct StdoutPublisher;

impl Publish for StdoutPublisher {
    fn name(&self) -> &str {
        "stdout"
    }

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), ApiError> {
        let mut out = std::io::stdout().lock();
        out.write_all(topic.as_bytes())?;
        out.write_all(b" ")?;
        out.write_all(payload)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
