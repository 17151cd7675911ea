use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::{AggregatedRow, AggregatedSeries, EnrichedRow, EnrichedSeries};

/// Resamples to a coarser bin width by sampling, not averaging: every column of a bin
/// comes from the chronologically first row in it.
pub struct Aggregator {
    bin_width: Duration,
}

impl Aggregator {
    pub fn new(bin_width: Duration) -> Self {
        Self { bin_width }
    }

    pub fn bin_width(&self) -> Duration {
        self.bin_width
    }

    /// Bins are laid out from local midnight of the earliest row's day. Bins without
    /// rows are left out.
    pub fn aggregate(&self, series: &EnrichedSeries) -> Result<AggregatedSeries> {
        let step = self.bin_width.num_seconds();
        if step <= 0 {
            return Err(ProcessingError::Config(format!(
                "Aggregation interval must be positive, got {}s",
                step
            )));
        }

        let mut ordered: Vec<&EnrichedRow> = series.rows().iter().collect();
        ordered.sort_by_key(|r| r.localized.local);

        let Some(first) = ordered.first() else {
            return Ok(AggregatedSeries::new(
                series.fields().to_vec(),
                series.timezone(),
                self.bin_width,
                Vec::new(),
            ));
        };
        let origin = first.localized.local_naive().date().and_time(NaiveTime::MIN);

        let mut bins: BTreeMap<i64, &EnrichedRow> = BTreeMap::new();
        for row in ordered {
            let index = bin_index(row.localized.local_naive(), origin, step);
            bins.entry(index).or_insert(row);
        }

        let rows: Vec<AggregatedRow> = bins
            .into_iter()
            .map(|(index, row)| AggregatedRow {
                bin_start: origin + Duration::seconds(index * step),
                sample: row.clone(),
            })
            .collect();

        debug!(
            input_rows = series.len(),
            bins = rows.len(),
            bin_seconds = step,
            "Aggregated series"
        );

        Ok(AggregatedSeries::new(
            series.fields().to_vec(),
            series.timezone(),
            self.bin_width,
            rows,
        ))
    }
}

fn bin_index(local: NaiveDateTime, origin: NaiveDateTime, step: i64) -> i64 {
    (local - origin).num_seconds().div_euclid(step)
}
