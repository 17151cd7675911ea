use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::{ProcessingError, Result};
use crate::models::ObservationField;

/// Gapless, strictly increasing timestamps at a fixed spacing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalGrid {
    interval_seconds: i64,
    timestamps: Vec<NaiveDateTime>,
}

impl CanonicalGrid {
    pub fn new(timestamps: Vec<NaiveDateTime>, interval: Duration) -> Result<Self> {
        let interval_seconds = interval.num_seconds();
        if interval_seconds <= 0 {
            return Err(ProcessingError::Config(format!(
                "Grid interval must be positive, got {}s",
                interval_seconds
            )));
        }

        if let Some(w) = timestamps
            .windows(2)
            .find(|w| (w[1] - w[0]).num_seconds() != interval_seconds)
        {
            return Err(ProcessingError::InvalidFormat(format!(
                "Grid is not uniformly spaced at {}s between {} and {}",
                interval_seconds, w[0], w[1]
            )));
        }

        Ok(Self {
            interval_seconds,
            timestamps,
        })
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn interval(&self) -> Duration {
        Duration::seconds(self.interval_seconds)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Index of `ts` when it sits exactly on a grid point.
    pub fn position(&self, ts: NaiveDateTime) -> Option<usize> {
        let start = self.first()?;
        let offset = (ts - start).num_seconds();
        if offset < 0 || offset % self.interval_seconds != 0 {
            return None;
        }
        let idx = (offset / self.interval_seconds) as usize;
        (idx < self.len()).then_some(idx)
    }
}

/// Counts from aligning the raw log onto the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub raw_rows: usize,
    pub matched_rows: usize,
    pub duplicate_rows: usize,
    pub off_grid_rows: usize,
    pub unparsable_timestamps: usize,
}

/// Grid-aligned values, `None` wherever nothing was observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledSeries {
    grid: CanonicalGrid,
    fields: Vec<ObservationField>,
    columns: Vec<Vec<Option<f64>>>,
    observed: Vec<bool>,
    summary: ReconcileSummary,
}

impl ReconciledSeries {
    pub(crate) fn new(
        grid: CanonicalGrid,
        fields: Vec<ObservationField>,
        columns: Vec<Vec<Option<f64>>>,
        observed: Vec<bool>,
        summary: ReconcileSummary,
    ) -> Self {
        debug_assert_eq!(fields.len(), columns.len());
        debug_assert!(columns.iter().all(|c| c.len() == grid.len()));
        debug_assert_eq!(observed.len(), grid.len());
        Self {
            grid,
            fields,
            columns,
            observed,
            summary,
        }
    }

    pub fn grid(&self) -> &CanonicalGrid {
        &self.grid
    }

    pub fn fields(&self) -> &[ObservationField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn columns(&self) -> &[Vec<Option<f64>>] {
        &self.columns
    }

    pub fn column(&self, field: ObservationField) -> Option<&[Option<f64>]> {
        self.fields
            .iter()
            .position(|f| *f == field)
            .map(|i| self.columns[i].as_slice())
    }

    /// Whether a raw row landed on grid point `index`
    pub fn is_observed(&self, index: usize) -> bool {
        self.observed.get(index).copied().unwrap_or(false)
    }

    pub fn summary(&self) -> &ReconcileSummary {
        &self.summary
    }
}

/// Grid-aligned values with every gap filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolatedSeries {
    grid: CanonicalGrid,
    fields: Vec<ObservationField>,
    columns: Vec<Vec<f64>>,
}

impl InterpolatedSeries {
    pub(crate) fn new(
        grid: CanonicalGrid,
        fields: Vec<ObservationField>,
        columns: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == grid.len()));
        Self {
            grid,
            fields,
            columns,
        }
    }

    pub fn grid(&self) -> &CanonicalGrid {
        &self.grid
    }

    pub fn fields(&self) -> &[ObservationField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn column(&self, field: ObservationField) -> Option<&[f64]> {
        self.fields
            .iter()
            .position(|f| *f == field)
            .map(|i| self.columns[i].as_slice())
    }

    /// All field values at grid point `index`, in field order
    pub fn row_values(&self, index: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[index]).collect()
    }
}
