use chrono::Duration;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalGrid, RawObservations};

pub struct GridBuilder {
    interval: Duration,
}

impl GridBuilder {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Build `[min, max]` at the configured step from the rows' valid timestamps.
    /// The last point never passes the latest observation.
    pub fn build(&self, raw: &RawObservations) -> Result<CanonicalGrid> {
        if self.interval <= Duration::zero() {
            return Err(ProcessingError::Config(format!(
                "Grid interval must be positive, got {}s",
                self.interval.num_seconds()
            )));
        }

        let (start, end) = raw
            .valid_timestamps()
            .fold(None, |acc, ts| match acc {
                None => Some((ts, ts)),
                Some((lo, hi)) => Some((ts.min(lo), ts.max(hi))),
            })
            .ok_or(ProcessingError::EmptyInput)?;

        let step = self.interval.num_seconds();
        let span = (end - start).num_seconds();
        let points = (span / step) as usize + 1;

        let mut timestamps = Vec::with_capacity(points);
        let mut current = start;
        while current <= end {
            timestamps.push(current);
            current += self.interval;
        }

        debug!(
            start = %start,
            end = %end,
            points = timestamps.len(),
            step_seconds = step,
            "Built canonical grid"
        );

        CanonicalGrid::new(timestamps, self.interval)
    }
}
