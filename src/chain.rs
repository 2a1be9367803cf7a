use std::future::Future;

use tracing::debug;

use crate::error::{LaunchError, Result};

/// Runs `attempt` over `candidates` in order and returns the first success.
///
/// When every candidate fails, the error carries only the last failure;
/// earlier ones are dropped after being logged.
pub async fn try_each<I, F, Fut, T>(candidates: I, mut attempt: F) -> Result<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;
    let mut last = None;

    for candidate in candidates {
        attempts += 1;
        match attempt(candidate).await {
            Ok(v) => return Ok(v),
            Err(err) => {
                debug!(attempt = attempts, error = %err, "fallback candidate failed");
                last = Some(err);
            }
        }
    }

    match last {
        Some(last) => Err(LaunchError::AllCandidatesFailed {
            attempts,
            last: Box::new(last),
        }),
        None => Err(LaunchError::invalid("no candidates to try")),
    }
}
