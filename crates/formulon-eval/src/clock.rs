//! The wall-clock seam used by `NOW`/`TODAY`. Per the concurrency model,
//! evaluation's only external read is a wall-clock value, and it must be
//! isolatable for test-time injection — hence a trait instead of a direct
//! `chrono::Local::now()` call inside the builtins.

use chrono::NaiveDateTime;

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
