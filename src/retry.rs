//! Bounded retry on transient server errors
//!
//! Only 5xx-equivalent failures are retried, immediately and without
//! backoff. Every other failure is returned on the attempt that produced it.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::GatewayError;

/// Attempts made at each retrying call site
pub const MAX_RETRIES: u32 = 3;

/// Run `op` up to `max_attempts` times while it fails with a server error
///
/// # Arguments
/// * `label` - Name of the call site, for logging
/// * `max_attempts` - Total attempts, including the first one
/// * `op` - Operation to run; called once per attempt
///
/// # Returns
/// The first non-server-error result, or the last server error once the
/// attempts are exhausted
pub async fn retry_on_server_error<T, F, Fut>(
    label: &str,
    max_attempts: u32,
    mut op: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_server_error() && attempt < max_attempts => {
                warn!("{}: server error on attempt {}/{}: {}", label, attempt, max_attempts, e);
                attempt += 1;
            }
            Err(e) => {
                if e.is_server_error() {
                    warn!("{}: giving up after {} attempt(s): {}", label, attempt, e);
                }
                return Err(e);
            }
            Ok(value) => {
                if attempt > 1 {
                    debug!("{}: succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
        }
    }
}
