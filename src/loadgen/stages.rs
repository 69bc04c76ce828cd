//! Virtual-user ramp schedule.
//!
//! Each stage moves the target VU count linearly from the previous stage's
//! target (0 before the first stage) to its own target.

use std::time::Duration;

use crate::config::StageConfig;
use crate::error::LoadgenError;

#[derive(Debug, Clone, PartialEq)]
pub struct StageSchedule {
    stages: Vec<StageConfig>,
}

impl StageSchedule {
    pub fn new(stages: &[StageConfig]) -> Self {
        Self {
            stages: stages.to_vec(),
        }
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_secs(self.stages.iter().map(|s| s.duration_secs).sum())
    }

    /// Number of VU tasks the driver has to spawn.
    pub fn max_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Interpolated VU target `elapsed` into the run; 0 once the run is over.
    pub fn target_at(&self, elapsed: Duration) -> f64 {
        let mut from = 0.0;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let length = Duration::from_secs(stage.duration_secs);
            let to = f64::from(stage.target);
            if elapsed < stage_start + length {
                let progress = (elapsed - stage_start).as_secs_f64() / length.as_secs_f64();
                return from + (to - from) * progress;
            }
            from = to;
            stage_start += length;
        }
        0.0
    }
}

/// Parse `"30s:10,2m:10,30s:0"` into stages.
pub fn parse_stages(input: &str) -> Result<Vec<StageConfig>, LoadgenError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| -> Result<StageConfig, LoadgenError> {
            let invalid = |reason: &str| LoadgenError::StageParse {
                input: part.to_string(),
                reason: reason.to_string(),
            };
            let (duration, target) = part
                .split_once(':')
                .ok_or_else(|| invalid("expected duration:target"))?;
            let duration_secs = parse_duration_secs(duration.trim()).map_err(|reason| invalid(&reason))?;
            let target = target
                .trim()
                .parse::<u32>()
                .map_err(|e| invalid(&format!("target: {e}")))?;
            Ok(StageConfig {
                duration_secs,
                target,
            })
        })
        .collect()
}

/// `"90"` (seconds) or any humantime duration: `"30s"`, `"2m"`, `"1m30s"`.
fn parse_duration_secs(input: &str) -> Result<u64, String> {
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(input)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}
