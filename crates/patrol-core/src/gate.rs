//! Process-wide request gate.
//!
//! Every dispatched action runs while holding the gate. Acquisition is bounded;
//! running out of time is an error and the request does nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Error, Result};

/// Default bounded wait for the gate.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct RequestGate {
    lock: Arc<Mutex<()>>,
    timeout: Duration,
    metrics: Arc<GateMetrics>,
}

#[derive(Default)]
struct GateMetrics {
    granted: AtomicU64,
    timed_out: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct GateMetricsSnapshot {
    pub granted: u64,
    pub timed_out: u64,
}

/// Held for the duration of one request; dropping it releases the gate.
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard {
    _guard: OwnedMutexGuard<()>,
    waited: Duration,
}

impl GateGuard {
    /// How long the request queued before the gate was granted.
    pub const fn waited(&self) -> Duration {
        self.waited
    }
}

impl RequestGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            timeout,
            metrics: Arc::new(GateMetrics::default()),
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait up to the configured timeout for exclusive access.
    ///
    /// Waiters are granted the gate in arrival order.
    pub async fn acquire(&self) -> Result<GateGuard> {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, Arc::clone(&self.lock).lock_owned()).await {
            Ok(guard) => {
                self.metrics.granted.fetch_add(1, Ordering::Relaxed);
                Ok(GateGuard {
                    _guard: guard,
                    waited: started.elapsed(),
                })
            }
            Err(_) => {
                let timed_out = self.metrics.timed_out.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    timed_out,
                    "Request gate acquisition timed out"
                );
                Err(Error::LockTimeout(self.timeout))
            }
        }
    }

    pub fn metrics_snapshot(&self) -> GateMetricsSnapshot {
        GateMetricsSnapshot {
            granted: self.metrics.granted.load(Ordering::Relaxed),
            timed_out: self.metrics.timed_out.load(Ordering::Relaxed),
        }
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_release_lets_the_next_request_in() {
        let gate = RequestGate::new(Duration::from_millis(50));
        let first = gate.acquire().await.unwrap();
        drop(first);
        let _second = gate.acquire().await.unwrap();
        assert_eq!(gate.metrics_snapshot().granted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn held_gate_times_out_with_lock_timeout() {
        let gate = RequestGate::new(Duration::from_secs(10));
        let _held = gate.acquire().await.unwrap();

        let err = gate.acquire().await.err().unwrap();
        assert!(matches!(err, Error::LockTimeout(d) if d == Duration::from_secs(10)));
        assert_eq!(
            gate.metrics_snapshot(),
            GateMetricsSnapshot {
                granted: 1,
                timed_out: 1,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_one_lock() {
        let gate = RequestGate::new(Duration::from_secs(1));
        let other = gate.clone();
        let _held = gate.acquire().await.unwrap();
        assert!(other.acquire().await.is_err());
    }
}
