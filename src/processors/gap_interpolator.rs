use rayon::prelude::*;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::{InterpolatedSeries, ReconciledSeries};

/// Fills absent grid values field by field.
///
/// Interior gaps are linear between the neighbouring known values, by grid position.
/// Leading and trailing gaps repeat the nearest known value.
pub struct GapInterpolator;

impl GapInterpolator {
    pub fn new() -> Self {
        Self
    }

    /// Fields are filled in parallel on the current rayon pool and collected back in
    /// field order.
    pub fn interpolate(&self, series: &ReconciledSeries) -> Result<InterpolatedSeries> {
        let columns: Vec<Vec<f64>> = series
            .fields()
            .par_iter()
            .zip(series.columns().par_iter())
            .map(|(field, column)| {
                fill_column(column).ok_or_else(|| ProcessingError::InsufficientData {
                    field: field.column_name().to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let filled: usize = series
            .columns()
            .iter()
            .map(|c| c.iter().filter(|v| v.is_none()).count())
            .sum();
        debug!(filled, fields = columns.len(), "Interpolated gaps");

        Ok(InterpolatedSeries::new(
            series.grid().clone(),
            series.fields().to_vec(),
            columns,
        ))
    }
}

impl Default for GapInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill one column. `None` when the column has no finite value at all; NaN and
/// infinities count as absent.
pub fn fill_column(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();

    let (&(first, first_value), &(last, last_value)) = (known.first()?, known.last()?);
    let mut out = vec![0.0; values.len()];

    out[..=first].fill(first_value);
    out[last..].fill(last_value);

    for pair in known.windows(2) {
        let ((lo, a), (hi, b)) = (pair[0], pair[1]);
        let run = (hi - lo) as f64;

        out[lo] = a;
        for (k, slot) in out.iter_mut().enumerate().take(hi).skip(lo + 1) {
            let fraction = (k - lo) as f64 / run;
            *slot = a + (b - a) * fraction;
        }
        out[hi] = b;
    }

    Some(out)
}
