//! Bounded fixed-delay polling.
//!
//! Both the build-start poll and the stop reconciliation loop are "ask the
//! server up to N times, one delay apart, stop as soon as the answer is
//! final". [`RetryPolicy::run`] is that loop. The delay is an async sleep,
//! so dropping the future abandons the poll.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Call `attempt` with attempt numbers `1..=max_attempts` until it
    /// breaks. Sleeps `delay` between attempts, never after the last one.
    /// Returns `None` when every attempt continued.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ControlFlow<T>>,
    {
        for n in 1..=self.max_attempts {
            if let ControlFlow::Break(value) = attempt(n).await {
                return Some(value);
            }
            if n < self.max_attempts && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
        None
    }
}

impl Default for RetryPolicy {
    /// Ten attempts, one second apart.
    fn default() -> Self {
        Self::fixed(10, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn exhausts_without_trailing_sleep() {
        let calls = Cell::new(0u32);
        let start = tokio::time::Instant::now();
        let out: Option<()> = RetryPolicy::default()
            .run(|_| {
                calls.set(calls.get() + 1);
                async { ControlFlow::Continue(()) }
            })
            .await;
        assert!(out.is_none());
        assert_eq!(calls.get(), 10);
        assert_eq!(start.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_first_break() {
        let calls = Cell::new(0u32);
        let start = tokio::time::Instant::now();
        let out = RetryPolicy::default()
            .run(|n| {
                calls.set(calls.get() + 1);
                async move {
                    if n == 3 {
                        ControlFlow::Break(n * 10)
                    } else {
                        ControlFlow::Continue(())
                    }
                }
            })
            .await;
        assert_eq!(out, Some(30));
        assert_eq!(calls.get(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn zero_attempts_never_calls() {
        let calls = Cell::new(0u32);
        let out: Option<()> = RetryPolicy::fixed(0, Duration::ZERO)
            .run(|_| {
                calls.set(calls.get() + 1);
                async { ControlFlow::Continue(()) }
            })
            .await;
        assert!(out.is_none());
        assert_eq!(calls.get(), 0);
    }
}
