use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// Millisecond time source used for scheduling and relative time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;

    /// Block until `deadline_ms`. Virtual clocks jump instead.
    fn sleep_until(&self, deadline_ms: f64) {
        let wait = deadline_ms - self.now_ms();
        if wait > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(wait / 1000.0));
        }
    }
}

/// Wall clock measured from construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests and offline runs. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by `ms`.
    pub fn advance(&self, ms: f64) {
        self.micros.fetch_add(to_micros(ms), Ordering::SeqCst);
    }

    /// Jump to `ms`.
    pub fn set(&self, ms: f64) {
        self.micros.store(to_micros(ms), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1000.0
    }

    fn sleep_until(&self, deadline_ms: f64) {
        if deadline_ms > self.now_ms() {
            self.set(deadline_ms);
        }
    }
}

fn to_micros(ms: f64) -> u64 {
    (ms.max(0.0) * 1000.0).round() as u64
}
