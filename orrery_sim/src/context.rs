//! Virtual clock and seeded randomness for harness runs.

use async_trait::async_trait;
use orrery_env::OrreryContext;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Deterministic [`OrreryContext`].
///
/// Time only moves when the harness advances it or when a task sleeps;
/// sleeping jumps the clock forward instead of waiting. Clones share the
/// clock and the random stream.
#[derive(Clone)]
pub struct SimContext {
    seed: u64,

    /// Nanoseconds since the run started
    clock_ns: Arc<AtomicU64>,

    /// Drives scripted user behaviour
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            clock_ns: Arc::new(AtomicU64::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Moves the virtual clock forward.
    pub fn advance_time(&self, by: Duration) {
        self.clock_ns.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// True with probability `p`.
    pub fn chance(&self, p: f64) -> bool {
        lock(&self.rng).gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform duration in `[lo, hi)`; `lo` when the range is empty.
    pub fn between(&self, lo: Duration, hi: Duration) -> Duration {
        if hi <= lo {
            return lo;
        }
        let secs = lock(&self.rng).gen_range(lo.as_secs_f64()..hi.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Seed for a sub-component, independent of the shared random stream.
    pub fn derive_seed(&self, extension: u64) -> u64 {
        self.seed.wrapping_mul(0x517c_c1b7_2722_0a95) ^ extension
    }
}

#[async_trait]
impl OrreryContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.clock_ns.load(Ordering::SeqCst))
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
        tokio::task::yield_now().await;
    }
}

/// Locks a harness mutex; a poisoned lock still holds usable state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
