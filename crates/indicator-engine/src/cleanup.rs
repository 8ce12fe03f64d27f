//! Removal of temporary directories with retry.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

/// Remove `path` and everything below it.
///
/// Failures are retried with exponential backoff starting at
/// `initial_delay`. Returns whether the directory is gone; giving up is
/// logged but never an error. A path that does not exist counts as removed.
pub async fn remove_dir_with_retry(path: &Path, max_attempts: u32, initial_delay: Duration) -> bool {
    let mut delay = initial_delay;
    let attempts = max_attempts.max(1);

    for attempt in 1..=attempts {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => {
                debug!(path = %path.display(), attempt, "Removed directory");
                return true;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) if attempt < attempts => {
                debug!(
                    path = %path.display(),
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Directory removal failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    attempts,
                    error = %e,
                    "Could not remove directory, leaving it in place"
                );
            }
        }
    }
    false
}
