use std::time::{Duration, Instant};

use crate::error::BenchError;

/// Source of monotonic time, as an offset from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Warmup and measured iteration counts for one side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurePlan {
    pub warmup: u32,
    pub runs: u32,
}

impl MeasurePlan {
    pub fn new(warmup: u32, runs: u32) -> Result<Self, BenchError> {
        if runs == 0 {
            return Err(BenchError::configuration("--runs must be > 0"));
        }
        Ok(Self { warmup, runs })
    }

    /// Runs `op` `warmup` times untimed, then `runs` times timed.
    ///
    /// Every call completes before the next one starts. The returned
    /// durations follow execution order. The first failing call aborts the
    /// whole measurement.
    pub fn measure<C, F>(&self, clock: &C, mut op: F) -> Result<Vec<Duration>, BenchError>
    where
        C: Clock + ?Sized,
        F: FnMut() -> Result<(), BenchError>,
    {
        for _ in 0..self.warmup {
            op()?;
        }

        let mut measured = Vec::with_capacity(self.runs as usize);
        for _ in 0..self.runs {
            let started = clock.now();
            op()?;
            measured.push(clock.now().saturating_sub(started));
        }

        Ok(measured)
    }
}

pub fn as_seconds(durations: &[Duration]) -> Vec<f64> {
    durations.iter().map(Duration::as_secs_f64).collect()
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::stats::summarize_samples;

    /// Clock that only moves when a test operation advances it.
    struct SteppingClock {
        now: Cell<Duration>,
    }

    impl SteppingClock {
        fn new() -> Self {
            Self {
                now: Cell::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> Duration {
            self.now.get()
        }
    }

    #[test]
    fn zero_runs_is_rejected() {
        assert!(matches!(
            MeasurePlan::new(3, 0).unwrap_err(),
            BenchError::Configuration(_)
        ));
        assert!(MeasurePlan::new(0, 1).is_ok());
    }

    #[test]
    fn invokes_warmup_plus_runs_and_keeps_post_warmup_order() {
        let clock = SteppingClock::new();
        let calls = RefCell::new(Vec::new());
        let plan = MeasurePlan::new(2, 4).unwrap();

        let durations = plan
            .measure(&clock, || {
                let call = calls.borrow().len() as u64;
                calls.borrow_mut().push(call);
                clock.advance(Duration::from_millis(call + 1));
                Ok(())
            })
            .unwrap();

        assert_eq!(calls.borrow().len(), 6);
        // Calls 0 and 1 are warmup; calls 2..=5 take 3..=6 ms.
        let expected = (3..=6).map(Duration::from_millis).collect::<Vec<_>>();
        assert_eq!(durations, expected);
    }

    #[test]
    fn failure_stops_measurement() {
        let clock = SteppingClock::new();
        let calls = Cell::new(0);
        let plan = MeasurePlan::new(1, 5).unwrap();

        let err = plan
            .measure(&clock, || {
                calls.set(calls.get() + 1);
                if calls.get() == 3 {
                    return Err(BenchError::ExternalTool {
                        command: "tool".to_string(),
                        status: "2".to_string(),
                        stderr: String::new(),
                    });
                }
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, BenchError::ExternalTool { .. }));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn fixed_duration_operation_summarizes_to_flat_ten_ms() {
        let clock = SteppingClock::new();
        let plan = MeasurePlan::new(2, 5).unwrap();

        let durations = plan
            .measure(&clock, || {
                clock.advance(Duration::from_millis(10));
                Ok(())
            })
            .unwrap();
        let summary = summarize_samples(&as_seconds(&durations));

        assert_eq!(summary.samples_ms.len(), 5);
        assert!(summary.samples_ms.iter().all(|ms| (ms - 10.0).abs() < 1e-9));
        assert_eq!(summary.median_ms, Some(10.0));
        assert_eq!(summary.p95_ms, Some(10.0));
        assert_eq!(summary.cv_pct, Some(0.0));
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
