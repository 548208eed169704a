//! The simulation-wide random source.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Thread-safe random handle shared by samplers, timers and the transition
/// selector. Cloning shares the underlying generator, so draws interleave
/// across tasks but each draw is atomic.
#[derive(Clone, Debug)]
pub struct SimRng {
    inner: Arc<Mutex<ChaCha8Rng>>,
}

impl SimRng {
    /// A generator seeded from the wall clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::seeded(seed)
    }

    /// A generator with a fixed seed, for reproducible tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Runs `f` with exclusive access to the generator.
    pub fn with<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.inner.lock().expect("rng lock poisoned");
        f(&mut rng)
    }

    /// A uniform draw in `[0, 1)`.
    pub fn unit(&self) -> f64 {
        self.with(|rng| rng.gen::<f64>())
    }

    /// A uniform float in `[min, max)`.
    pub fn float_in(&self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.unit()
    }

    /// A uniform integer in `[min, max)`, floor of the float draw.
    pub fn int_in(&self, min: f64, max: f64) -> i64 {
        (min + (max - min) * self.unit()).floor() as i64
    }

    /// A uniform index in `[0, len)`. `len` must be non-zero.
    pub fn index(&self, len: usize) -> usize {
        self.with(|rng| rng.gen_range(0..len))
    }

    /// A uniform duration in `[min, max)`. `max` must exceed `min`.
    pub fn duration_in(&self, min: Duration, max: Duration) -> Duration {
        let lo = min.as_nanos() as u64;
        let hi = max.as_nanos() as u64;
        Duration::from_nanos(self.with(|rng| rng.gen_range(lo..hi)))
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new()
    }
}
