use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Stand-in expiry for timeouts too large to represent as an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Run-wide deadline exposed as a cancellation token.
///
/// A timer task cancels the token once the timeout elapses. Cancellation is
/// cooperative: holders of the token decide when to stop. The timer is
/// aborted when the deadline is dropped.
pub struct Deadline {
    token: CancellationToken,
    expires_at: Instant,
    timer: JoinHandle<()>,
}

impl Deadline {
    /// Start the clock. Must be called from within a tokio runtime.
    pub fn start(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let now = Instant::now();
        let expires_at = now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE);

        let timer_token = token.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(expires_at) => {
                    warn!("Deadline of {:?} expired", timeout);
                    timer_token.cancel();
                }
                _ = timer_token.cancelled() => {}
            }
        });

        Deadline {
            token,
            expires_at,
            timer,
        }
    }

    /// Token observed by workers; cancelled on expiry
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Expire the deadline now
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        if self.is_expired() {
            return Duration::ZERO;
        }
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_timeout() {
        let deadline = Deadline::start(Duration::from_secs(5));
        let token = deadline.token();

        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!token.is_cancelled());

        token.cancelled().await;
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
        assert!(Instant::now() >= deadline.expires_at());
    }

    #[tokio::test]
    async fn test_cancel_early() {
        let deadline = Deadline::start(Duration::from_secs(3600));
        let token = deadline.token();

        deadline.cancel();

        assert!(token.is_cancelled());
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn test_huge_timeout_never_expires() {
        let deadline = Deadline::start(Duration::from_secs(u64::MAX));

        tokio::task::yield_now().await;
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() > Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_leaves_token_untouched() {
        let deadline = Deadline::start(Duration::from_secs(1));
        let token = deadline.token();
        drop(deadline);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!token.is_cancelled());
    }
}
