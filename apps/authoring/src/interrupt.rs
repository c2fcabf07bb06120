use std::future::Future;

use anyhow::{bail, Result};
use client_core::ClientError;
use tracing::info;

/// Races `operation` against `interrupt`. When the interrupt fires first the
/// operation is dropped, after `on_interrupt` had a chance to cancel it.
pub async fn interruptible<T, S>(
    operation: impl Future<Output = Result<T, ClientError>>,
    interrupt: S,
    on_interrupt: impl FnOnce(),
) -> Result<T>
where
    S: Future,
{
    let outcome = tokio::select! {
        biased;
        outcome = operation => outcome,
        _ = interrupt => {
            info!("authoring: interrupted, abandoning request");
            on_interrupt();
            bail!("request interrupted");
        }
    };
    match outcome {
        Ok(value) => Ok(value),
        Err(err) if err.is_cancelled() => bail!("request cancelled"),
        Err(err) => Err(err.into()),
    }
}
