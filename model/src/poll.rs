/*!

A fixed-cadence "wait until true" primitive used to observe state that external controllers
converge asynchronously. There is no backoff and no jitter: the condition is checked immediately,
then once per `interval`, until it returns `true` or `timeout` has elapsed.

The [`Clock`] is injected so that tests can drive waits of several minutes without sleeping.

!*/

use async_trait::async_trait;
use log::{debug, trace};
use snafu::Snafu;
use std::future::Future;
use std::time::{Duration, Instant};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "Timed out after {:?} ({} attempts) waiting for {}",
        timeout,
        attempts,
        what
    ))]
    Timeout {
        what: String,
        timeout: Duration,
        attempts: u32,
    },
}

/// The source of time for [`await_condition`].
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// The wall clock, backed by `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// How often to check and how long to keep trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Invoke `condition` until it returns `true`. The first call happens immediately. A
/// [`Error::Timeout`] is returned only once at least `settings.timeout` has elapsed on `clock`.
///
/// Conditions report plain `bool`s: a condition that hits an error is expected to log it and return
/// `false` so that the wait carries on.
pub async fn await_condition<C, F, Fut>(
    clock: &C,
    settings: PollSettings,
    what: &str,
    mut condition: F,
) -> Result<()>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = clock.now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if condition().await {
            debug!("'{}' satisfied after {} attempt(s)", what, attempts);
            return Ok(());
        }
        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed >= settings.timeout {
            return TimeoutSnafu {
                what,
                timeout: settings.timeout,
                attempts,
            }
            .fail();
        }
        trace!(
            "'{}' not satisfied yet ({:?} elapsed), retrying in {:?}",
            what,
            elapsed,
            settings.interval
        );
        clock.sleep(settings.interval).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::ManualClock;
    use std::cell::Cell;

    const SETTINGS: PollSettings =
        PollSettings::new(Duration::from_secs(10), Duration::from_secs(60));

    #[tokio::test]
    async fn immediate_success_checks_once() {
        let clock = ManualClock::new();
        let calls = Cell::new(0);
        await_condition(&clock, SETTINGS, "immediate", || {
            calls.set(calls.get() + 1);
            async { true }
        })
        .await
        .unwrap();
        assert_eq!(calls.get(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn succeeds_on_first_true() {
        let clock = ManualClock::new();
        let calls = Cell::new(0);
        await_condition(&clock, SETTINGS, "third time", || {
            calls.set(calls.get() + 1);
            let ready = calls.get() == 3;
            async move { ready }
        })
        .await
        .unwrap();
        assert_eq!(calls.get(), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(20));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(10); 2]);
    }

    #[tokio::test]
    async fn times_out_only_after_timeout() {
        let clock = ManualClock::new();
        let calls = Cell::new(0);
        let err = await_condition(&clock, SETTINGS, "never", || {
            calls.set(calls.get() + 1);
            async { false }
        })
        .await
        .unwrap_err();
        assert!(clock.elapsed() >= SETTINGS.timeout);
        // Checked at 0s, 10s, ..., 60s.
        assert_eq!(calls.get(), 7);
        match err {
            Error::Timeout {
                what,
                timeout,
                attempts,
            } => {
                assert_eq!(what, "never");
                assert_eq!(timeout, SETTINGS.timeout);
                assert_eq!(attempts, 7);
            }
        }
    }

    #[tokio::test]
    async fn interval_longer_than_timeout() {
        let clock = ManualClock::new();
        let settings = PollSettings::new(Duration::from_secs(90), Duration::from_secs(60));
        let calls = Cell::new(0);
        let err = await_condition(&clock, settings, "slow", || {
            calls.set(calls.get() + 1);
            async { false }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 2, .. }));
        assert_eq!(calls.get(), 2);
        assert_eq!(clock.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_waits_real_intervals() {
        let clock = TokioClock;
        let start = tokio::time::Instant::now();
        let calls = Cell::new(0);
        await_condition(
            &clock,
            PollSettings::new(Duration::from_millis(100), Duration::from_secs(5)),
            "tokio",
            || {
                calls.set(calls.get() + 1);
                let ready = calls.get() > 2;
                async move { ready }
            },
        )
        .await
        .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
