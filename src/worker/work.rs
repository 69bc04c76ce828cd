//! Simulated CPU work and error injection.

use rand::Rng;
use serde::Serialize;
use std::hint::black_box;
use std::time::Instant;

/// Exclusive upper bound of loop iterations per `/work` call.
pub const MAX_ITERATIONS: u64 = 1_000_000;

/// Body of a successful `GET /work`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOutcome {
    pub success: bool,
    /// Milliseconds spent in the loop.
    pub work_duration: u64,
    pub work_units: u64,
    pub queue_depth: u64,
}

/// Spin for `iterations` additions and return the elapsed milliseconds.
pub fn simulate_work(iterations: u64) -> u64 {
    let start = Instant::now();
    let mut sum = 0u64;
    for i in 0..iterations {
        sum = sum.wrapping_add(black_box(i));
    }
    black_box(sum);
    start.elapsed().as_millis() as u64
}

/// One unit per 10ms of work.
pub fn work_units(duration_ms: u64) -> u64 {
    duration_ms / 10
}

/// Decides which calls fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorInjector {
    rate: f64,
}

impl ErrorInjector {
    /// `rate` is a probability in `[0, 1]`, validated with the config.
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn should_fail<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen::<f64>() < self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_work_units() {
        assert_eq!(work_units(0), 0);
        assert_eq!(work_units(9), 0);
        assert_eq!(work_units(10), 1);
        assert_eq!(work_units(257), 25);
    }

    #[test]
    fn test_simulate_work_terminates() {
        assert_eq!(simulate_work(0), 0);
        assert!(simulate_work(10_000) < 1_000);
    }

    #[test]
    fn test_error_injector_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        let never = ErrorInjector::new(0.0);
        let always = ErrorInjector::new(1.0);
        for _ in 0..1_000 {
            assert!(!never.should_fail(&mut rng));
            assert!(always.should_fail(&mut rng));
        }
    }

    #[test]
    fn test_error_injector_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let injector = ErrorInjector::new(0.05);
        let failures = (0..20_000).filter(|_| injector.should_fail(&mut rng)).count();
        // 1000 expected; allow a generous band.
        assert!((700..1300).contains(&failures), "got {failures} failures");
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = WorkOutcome {
            success: true,
            work_duration: 12,
            work_units: 1,
            queue_depth: 40,
        };
        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(json["workDuration"], 12);
        assert_eq!(json["workUnits"], 1);
        assert_eq!(json["queueDepth"], 40);
    }
}
