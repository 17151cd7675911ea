use tracing::{debug, warn};

use crate::models::{CanonicalGrid, RawObservations, ReconcileSummary, ReconciledSeries};

/// Left-joins raw rows onto the grid by exact timestamp.
pub struct SeriesReconciler;

impl SeriesReconciler {
    pub fn new() -> Self {
        Self
    }

    /// The first raw row seen for a timestamp wins; later duplicates and rows that fall
    /// between grid points are discarded.
    pub fn reconcile(&self, grid: &CanonicalGrid, raw: &RawObservations) -> ReconciledSeries {
        let n = grid.len();
        let fields = raw.fields().to_vec();
        let mut columns: Vec<Vec<Option<f64>>> = vec![vec![None; n]; fields.len()];
        let mut observed = vec![false; n];

        let mut summary = ReconcileSummary {
            raw_rows: raw.len(),
            unparsable_timestamps: raw.unparsable_timestamps(),
            ..Default::default()
        };

        for row in raw.rows() {
            let Some(ts) = row.timestamp else {
                continue;
            };

            let Some(idx) = grid.position(ts) else {
                summary.off_grid_rows += 1;
                continue;
            };

            if observed[idx] {
                summary.duplicate_rows += 1;
                continue;
            }

            observed[idx] = true;
            summary.matched_rows += 1;
            for (column, value) in columns.iter_mut().zip(&row.values) {
                column[idx] = *value;
            }
        }

        if summary.off_grid_rows > 0 {
            warn!(
                off_grid = summary.off_grid_rows,
                "Rows not aligned to the grid were discarded"
            );
        }
        debug!(
            grid_points = n,
            matched = summary.matched_rows,
            duplicates = summary.duplicate_rows,
            "Reconciled raw rows onto grid"
        );

        ReconciledSeries::new(grid.clone(), fields, columns, observed, summary)
    }
}

impl Default for SeriesReconciler {
    fn default() -> Self {
        Self::new()
    }
}
