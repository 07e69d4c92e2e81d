use std::future::Future;
use std::time::Duration;

use log::warn;
use thiserror::Error;
use tokio::time::timeout;

/// Outcome of an operation wrapped by [`retry_once_on_timeout`].
#[derive(Debug, Error)]
pub enum TimeoutError<E> {
    #[error("{operation} timed out twice after {limit:?}")]
    Elapsed { operation: String, limit: Duration },

    #[error(transparent)]
    Inner(E),
}

/// Run an operation under a deadline, retrying exactly once if the deadline passes.
///
/// Errors returned by the operation itself are passed through untouched and
/// never retried. `make_attempt` is called once per attempt so each attempt
/// gets a fresh future.
pub async fn retry_once_on_timeout<T, E, F, Fut>(
    operation: &str,
    limit: Duration,
    mut make_attempt: F,
) -> Result<T, TimeoutError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    for attempt in 1..=2 {
        match timeout(limit, make_attempt()).await {
            Ok(result) => return result.map_err(TimeoutError::Inner),
            Err(_) if attempt == 1 => {
                warn!("{} timed out after {:?}, retrying once", operation, limit);
            }
            Err(_) => {}
        }
    }

    Err(TimeoutError::Elapsed {
        operation: operation.to_string(),
        limit,
    })
}
