use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;

/// Fixed-interval polling bounds. Every poll site sets both knobs
/// explicitly; there is no unbounded default.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Polling cancelled")]
    Cancelled,
    #[error("Polling gave up after {0} attempts")]
    Exhausted(u32),
}

/// Runs `op` until it yields `Some`, attempts run out, or `cancel` fires.
/// The first attempt runs immediately; the interval separates attempts.
/// Dropping the cancel sender counts as cancellation.
pub async fn poll_until<T, F, Fut>(
    config: PollConfig,
    mut cancel: oneshot::Receiver<()>,
    mut op: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=config.max_attempts {
        let outcome = tokio::select! {
            _ = &mut cancel => return Err(PollError::Cancelled),
            outcome = op() => outcome,
        };
        if let Some(value) = outcome {
            return Ok(value);
        }
        if attempt == config.max_attempts {
            break;
        }
        tokio::select! {
            _ = &mut cancel => return Err(PollError::Cancelled),
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
    Err(PollError::Exhausted(config.max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn config(interval_ms: u64, max_attempts: u32) -> PollConfig {
        PollConfig::new(Duration::from_millis(interval_ms), max_attempts)
    }

    #[tokio::test]
    async fn yields_value_once_op_succeeds() {
        let (_cancel_tx, cancel_rx) = oneshot::channel();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let value = poll_until(config(5, 10), cancel_rx, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { (n == 3).then_some(n) }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let (_cancel_tx, cancel_rx) = oneshot::channel();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), PollError> = poll_until(config(1, 4), cancel_rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;

        assert_eq!(result, Err(PollError::Exhausted(4)));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cancel_interrupts_the_wait() {
        let (cancel_tx, cancel_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = cancel_tx.send(());
        });

        let started = std::time::Instant::now();
        let result: Result<(), PollError> =
            poll_until(config(10_000, 5), cancel_rx, || async { None }).await;

        assert_eq!(result, Err(PollError::Cancelled));
        // Far below the 10 s interval: the sleep was interrupted.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn dropped_sender_reads_as_cancelled() {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        drop(cancel_tx);

        let result: Result<(), PollError> =
            poll_until(config(10_000, 5), cancel_rx, || async { None }).await;
        assert_eq!(result, Err(PollError::Cancelled));
    }
}
