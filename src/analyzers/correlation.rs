use crate::error::{ProcessingError, Result};
use crate::models::AggregatedSeries;
use crate::utils::constants::{COL_SUN_ALTITUDE, COL_SUN_AZIMUTH, COL_SUN_ZENITH};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;

const SOLAR_COLUMNS: [&str; 3] = [COL_SUN_ALTITUDE, COL_SUN_AZIMUTH, COL_SUN_ZENITH];

/// Symmetric Spearman matrix. Pairs involving a constant column are `NaN`.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub samples: usize,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    /// Other columns ordered by absolute correlation with `column`, strongest first
    pub fn strongest_with(&self, column: &str, limit: usize) -> Vec<(&str, f64)> {
        let Some(i) = self.columns.iter().position(|c| c == column) else {
            return Vec::new();
        };

        let mut pairs: Vec<(&str, f64)> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, name)| (name.as_str(), self.values[i][j]))
            .filter(|(_, r)| !r.is_nan())
            .collect();
        pairs.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(Ordering::Equal));
        pairs.truncate(limit);
        pairs
    }

    pub fn summary(&self) -> String {
        let width = self.columns.iter().map(|c| c.len()).max().unwrap_or(0).max(6);
        let mut out = format!("Spearman Correlation ({} samples)\n", self.samples);

        out.push_str(&format!("{:<width$}", "", width = width));
        for column in &self.columns {
            out.push_str(&format!(" {:>width$}", column, width = width));
        }
        out.push('\n');

        for (name, row) in self.columns.iter().zip(&self.values) {
            out.push_str(&format!("{:<width$}", name, width = width));
            for value in row {
                if value.is_nan() {
                    out.push_str(&format!(" {:>width$}", "-", width = width));
                } else {
                    out.push_str(&format!(" {:>width$.2}", value, width = width));
                }
            }
            out.push('\n');
        }

        out
    }
}

/// Reports rank correlation between the observation fields and the solar angles of an
/// aggregated series. It only reads the series.
pub struct CorrelationAnalyzer {
    columns: Option<Vec<String>>,
}

impl CorrelationAnalyzer {
    pub fn new() -> Self {
        Self { columns: None }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn analyze(&self, series: &AggregatedSeries) -> Result<CorrelationMatrix> {
        let columns = match &self.columns {
            Some(columns) => columns.clone(),
            None => series
                .fields()
                .iter()
                .map(|f| f.column_name().to_string())
                .chain(SOLAR_COLUMNS.iter().map(|c| c.to_string()))
                .collect(),
        };

        let ranks = columns
            .iter()
            .map(|name| {
                series
                    .column_values(name)
                    .map(|values| rank(&values))
                    .ok_or_else(|| ProcessingError::MissingData(format!("Column '{}' not found", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        let n = columns.len();
        let values: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j && !is_constant(&ranks[i]) {
                            1.0
                        } else {
                            pearson(&ranks[i], &ranks[j])
                        }
                    })
                    .collect::<Vec<f64>>()
            })
            .collect();

        Ok(CorrelationMatrix {
            columns,
            values,
            samples: series.len(),
        })
    }
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// 1-based ranks, ties share the average of their positions
pub fn rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let average = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average;
        }
        start = end;
    }
    ranks
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CalendarFeatures, EnrichedRow, EnrichedSeries, LocalizedTimestamp, ObservationField,
        SolarPosition,
    };
    use crate::processors::Aggregator;
    use chrono::{Duration, NaiveDate};

    fn series(values: &[(f64, f64, f64)]) -> AggregatedSeries {
        let start = NaiveDate::from_ymd_opt(2022, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, &(sr, tt, elevation))| EnrichedRow {
                localized: LocalizedTimestamp::localize(
                    start + Duration::hours(i as i64),
                    Duration::zero(),
                    &chrono_tz::UTC,
                )
                .unwrap(),
                values: vec![sr, tt],
                solar: SolarPosition {
                    elevation,
                    azimuth: 180.0,
                    zenith: 90.0 - elevation,
                },
                calendar: CalendarFeatures {
                    hour: i as u32,
                    day_of_year: 152,
                    month: 6,
                    year: 2022,
                    day: 1,
                },
            })
            .collect();
        let enriched = EnrichedSeries::new(
            vec![ObservationField::SolarRadiationAvg, ObservationField::AirTempAvg],
            "UTC",
            rows,
        );
        Aggregator::new(Duration::hours(1)).aggregate(&enriched).unwrap()
    }

    #[test]
    fn test_rank_with_ties() {
        assert_eq!(rank(&[10.0, 30.0, 20.0, 20.0]), vec![1.0, 4.0, 2.5, 2.5]);
    }

    #[test]
    fn test_monotonic_relationships() {
        let data = series(&[
            (0.0, 30.0, -5.0),
            (50.0, 28.0, 10.0),
            (400.0, 25.0, 40.0),
            (900.0, 21.0, 70.0),
        ]);
        let matrix = CorrelationAnalyzer::new().analyze(&data).unwrap();

        assert_eq!(matrix.columns.len(), 5);
        assert!((matrix.get("sr_avg", "sun_altitude").unwrap() - 1.0).abs() < 1e-12);
        assert!((matrix.get("sr_avg", "tt_air_avg").unwrap() + 1.0).abs() < 1e-12);
        assert!((matrix.get("sun_altitude", "sun_zenith_angle").unwrap() + 1.0).abs() < 1e-12);
        assert!(matrix.get("sun_azimuth", "sr_avg").unwrap().is_nan());
        assert!(matrix.get("sun_azimuth", "sun_azimuth").unwrap().is_nan());
        assert_eq!(matrix.get("sr_avg", "sr_avg"), Some(1.0));
    }

    #[test]
    fn test_strongest_with_and_summary() {
        let data = series(&[(1.0, 3.0, 1.0), (2.0, 1.0, 2.0), (3.0, 2.0, 3.0)]);
        let matrix = CorrelationAnalyzer::new().analyze(&data).unwrap();

        let strongest = matrix.strongest_with("sr_avg", 1);
        assert_eq!(strongest[0].0, "sun_altitude");
        assert!(matrix.summary().contains("Spearman Correlation (3 samples)"));
    }

    #[test]
    fn test_unknown_column() {
        let data = series(&[(1.0, 1.0, 1.0), (2.0, 2.0, 2.0)]);
        let result = CorrelationAnalyzer::new()
            .with_columns(vec!["sr_avg".to_string(), "nope".to_string()])
            .analyze(&data);
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));
    }
}
