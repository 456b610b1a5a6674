use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

/// 有上限的重試，指數退避並以 `max_delay` 為上限
///
/// 第 `n` 次 (從 1 起算) 失敗後等待 `min(base * 2^n, max_delay)`，
/// 預設策略依序等待 2s、4s，之後每次 5s
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_attempts(3)
    }
}

impl RetryPolicy {
    pub fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts,
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }

    /// 相同嘗試次數，但不等待
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.max_delay)
    }
}

/// 執行 `op` 直到成功或用完嘗試次數。閉包會收到從 1 起算的嘗試次數，
/// 最後一次的錯誤原樣回傳
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::RouteError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failure(n: u32) -> RouteError {
        RouteError::HttpStatusError {
            url: format!("http://example.com/{}", n),
            status: 503,
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(5));
        assert_eq!(policy.delay_for(40), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(4);

        let result = retry_with_backoff(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 4 {
                    Err(failure(attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_returns_last_error_after_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<()> = retry_with_backoff(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(failure(attempt)) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(RouteError::HttpStatusError { url, .. }) => {
                assert_eq!(url, "http://example.com/3")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(0);

        let result: Result<()> = retry_with_backoff(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(failure(attempt)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
