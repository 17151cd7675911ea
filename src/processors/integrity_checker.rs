use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::{ProcessingError, Result};
use crate::models::{ObservationField, ReconcileSummary, ReconciledSeries};

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub grid_points: usize,
    pub observed_points: usize,
    pub grid_start: NaiveDateTime,
    pub grid_end: NaiveDateTime,
    pub interval_seconds: i64,
    pub reconcile: ReconcileSummary,
    pub field_gaps: Vec<FieldGapStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldGapStatistics {
    pub field: ObservationField,
    pub absent_points: usize,
    pub longest_gap_points: usize,
    pub longest_gap_start: Option<NaiveDateTime>,
}

impl FieldGapStatistics {
    pub fn coverage_percentage(&self, grid_points: usize) -> f64 {
        if grid_points == 0 {
            return 0.0;
        }
        100.0 * (grid_points - self.absent_points) as f64 / grid_points as f64
    }

    pub fn is_entirely_absent(&self, grid_points: usize) -> bool {
        self.absent_points == grid_points
    }
}

impl IntegrityReport {
    pub fn missing_grid_points(&self) -> usize {
        self.grid_points - self.observed_points
    }

    pub fn unusable_fields(&self) -> Vec<ObservationField> {
        self.field_gaps
            .iter()
            .filter(|g| g.is_entirely_absent(self.grid_points))
            .map(|g| g.field)
            .collect()
    }
}

/// Gap statistics over the reconciled grid, before anything is filled in.
pub struct IntegrityChecker {
    long_gap_threshold: Duration,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            long_gap_threshold: Duration::hours(6),
        }
    }

    pub fn check_integrity(&self, series: &ReconciledSeries) -> Result<IntegrityReport> {
        let grid = series.grid();
        let (grid_start, grid_end) = grid
            .first()
            .zip(grid.last())
            .ok_or(ProcessingError::EmptyInput)?;

        let observed_points = (0..series.len()).filter(|&i| series.is_observed(i)).count();

        let field_gaps = series
            .fields()
            .iter()
            .zip(series.columns())
            .map(|(field, column)| {
                let (longest, start_index) = longest_absent_run(column);
                FieldGapStatistics {
                    field: *field,
                    absent_points: column.iter().filter(|v| v.is_none()).count(),
                    longest_gap_points: longest,
                    longest_gap_start: start_index.map(|i| grid.timestamps()[i]),
                }
            })
            .collect();

        Ok(IntegrityReport {
            grid_points: series.len(),
            observed_points,
            grid_start,
            grid_end,
            interval_seconds: grid.interval().num_seconds(),
            reconcile: *series.summary(),
            field_gaps,
        })
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();
        let interval = Duration::seconds(report.interval_seconds);

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!(
            "Grid: {} -> {} every {} min ({} points)\n",
            report.grid_start,
            report.grid_end,
            interval.num_minutes(),
            report.grid_points
        ));
        summary.push_str(&format!(
            "Observed Points: {} ({:.1}%)\n",
            report.observed_points,
            percentage(report.observed_points, report.grid_points)
        ));
        summary.push_str(&format!(
            "Missing Points: {}\n",
            report.missing_grid_points()
        ));
        summary.push_str(&format!(
            "Raw Rows: {} (duplicates: {}, off-grid: {}, bad timestamps: {})\n",
            report.reconcile.raw_rows,
            report.reconcile.duplicate_rows,
            report.reconcile.off_grid_rows,
            report.reconcile.unparsable_timestamps
        ));

        summary.push_str("\nField Coverage:\n");
        for gap in &report.field_gaps {
            let longest = interval * gap.longest_gap_points as i32;
            let flag = if longest >= self.long_gap_threshold {
                "  <- long gap"
            } else {
                ""
            };
            summary.push_str(&format!(
                "  {:<11} {:>6.1}%  absent {:>6}  longest gap {:>5} pts{}\n",
                gap.field.column_name(),
                gap.coverage_percentage(report.grid_points),
                gap.absent_points,
                gap.longest_gap_points,
                flag
            ));
        }

        let unusable = report.unusable_fields();
        if !unusable.is_empty() {
            let names: Vec<&str> = unusable.iter().map(|f| f.column_name()).collect();
            summary.push_str(&format!(
                "\nFields with no data (interpolation will fail): {}\n",
                names.join(", ")
            ));
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

/// Length and start index of the longest run of `None`
fn longest_absent_run(column: &[Option<f64>]) -> (usize, Option<usize>) {
    let mut best = (0, None);
    let mut run_start = None;

    for (i, value) in column.iter().enumerate() {
        match (value, run_start) {
            (None, None) => run_start = Some(i),
            (Some(_), Some(start)) => {
                if i - start > best.0 {
                    best = (i - start, Some(start));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        if column.len() - start > best.0 {
            best = (column.len() - start, Some(start));
        }
    }

    best
}
