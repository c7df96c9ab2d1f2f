//! Fixed-interval cycle runner.
//!
//! Cycles run strictly one after another on the calling thread. A cycle that
//! cannot get data or finds an empty portfolio is skipped and retried at the
//! next interval; configuration and I/O errors stop the schedule.

use std::time::Duration;

use chrono::Utc;
use log::{info, warn};

use crate::error::{Error, Result};

/// Blocks between cycles. Swappable so tests do not wait for real days.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Counts of what happened over a schedule run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub completed: u64,
    pub skipped: u64,
}

/// Runs a cycle once per interval.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Invoke `cycle(n)` for `n = 1, 2, ...`, sleeping one interval between
    /// invocations. Stops after `cycles` runs (forever when `None`) or at the
    /// first error that is not a skip.
    pub fn run<S, F, T>(
        &self,
        cycles: Option<u64>,
        sleeper: &mut S,
        mut cycle: F,
    ) -> Result<ScheduleSummary>
    where
        S: Sleeper,
        F: FnMut(u64) -> Result<T>,
    {
        let mut summary = ScheduleSummary::default();
        let mut n: u64 = 0;

        loop {
            n += 1;

            match cycle(n) {
                Ok(_) => summary.completed += 1,
                Err(e) if is_skip(&e) => {
                    warn!("cycle {n} skipped: {e}");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!("cycle {n} failed, stopping schedule: {e}");
                    return Err(e);
                }
            }

            if cycles.is_some_and(|max| n >= max) {
                break;
            }

            if let Ok(step) = chrono::Duration::from_std(self.interval) {
                info!("next cycle at {}", Utc::now() + step);
            }
            sleeper.sleep(self.interval);
        }

        Ok(summary)
    }
}

fn is_skip(e: &Error) -> bool {
    e.skips_cycle() || matches!(e, Error::Aborted(_))
}
