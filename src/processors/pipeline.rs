use chrono_tz::Tz;
use tracing::{info, info_span};

use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{
    AggregatedSeries, EnrichedRow, EnrichedSeries, InterpolatedSeries, LocalizedTimestamp,
    RawObservations, RawTable, ReconciledSeries,
};
use crate::processors::{
    Aggregator, GapInterpolator, GridBuilder, IntegrityChecker, IntegrityReport,
    SeriesReconciler, SolarGeometryEngine, TemporalFeatureDeriver,
};
use crate::utils::progress::ProgressReporter;

pub const PIPELINE_STAGES: u64 = 5;

/// Everything one run produces. Each stage's value is independent of the others.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub integrity: IntegrityReport,
    pub enriched: EnrichedSeries,
    pub aggregated: AggregatedSeries,
}

/// Grid → reconcile → interpolate → solar + calendar → aggregate.
pub struct SeriesPipeline {
    config: PipelineConfig,
    timezone: Tz,
    solar: SolarGeometryEngine,
}

impl SeriesPipeline {
    /// Validates the whole configuration up front; a bad site fails here with
    /// `InvalidSite` before any data is touched.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate_config()?;
        let timezone = config.site.tz()?;
        let solar = SolarGeometryEngine::new(&config.site)?;

        Ok(Self {
            config,
            timezone,
            solar,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run_table(
        &self,
        table: &RawTable,
        progress: Option<&ProgressReporter>,
    ) -> Result<PipelineOutput> {
        let raw = RawObservations::parse(table)?;
        self.run(&raw, progress)
    }

    /// Run every stage on a dedicated rayon pool of `max_workers` threads.
    pub fn run(
        &self,
        raw: &RawObservations,
        progress: Option<&ProgressReporter>,
    ) -> Result<PipelineOutput> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        pool.install(|| self.run_stages(raw, progress))
    }

    fn run_stages(
        &self,
        raw: &RawObservations,
        progress: Option<&ProgressReporter>,
    ) -> Result<PipelineOutput> {
        let _span = info_span!("pipeline", raw_rows = raw.len()).entered();
        let advance = |stage: &str| {
            if let Some(p) = progress {
                p.advance(stage);
            }
        };

        advance("Building time grid...");
        let reconciled = self.reconcile(raw)?;
        let integrity = IntegrityChecker::new().check_integrity(&reconciled)?;
        info!(
            grid_points = integrity.grid_points,
            observed = integrity.observed_points,
            "Reconciled raw log onto grid"
        );

        advance("Interpolating gaps...");
        let interpolated = GapInterpolator::new().interpolate(&reconciled)?;

        advance("Computing solar geometry and calendar features...");
        let enriched = self.enrich(&interpolated)?;

        advance("Aggregating...");
        let aggregated = Aggregator::new(self.config.coarse_interval()).aggregate(&enriched)?;
        info!(
            fine_rows = enriched.len(),
            bins = aggregated.len(),
            bin_minutes = self.config.coarse_interval_minutes,
            "Aggregated series"
        );

        advance("Done");
        Ok(PipelineOutput {
            integrity,
            enriched,
            aggregated,
        })
    }

    /// Build the grid and align the raw rows onto it.
    pub fn reconcile(&self, raw: &RawObservations) -> Result<ReconciledSeries> {
        let grid = GridBuilder::new(self.config.fine_interval()).build(raw)?;
        Ok(SeriesReconciler::new().reconcile(&grid, raw))
    }

    /// Localize every grid timestamp, then derive solar and calendar features side by
    /// side from the localized values.
    pub fn enrich(&self, series: &InterpolatedSeries) -> Result<EnrichedSeries> {
        let offset = self.config.site.utc_offset();
        let localized = series
            .grid()
            .timestamps()
            .iter()
            .map(|ts| LocalizedTimestamp::localize(*ts, offset, &self.timezone))
            .collect::<Result<Vec<_>>>()?;

        let deriver = TemporalFeatureDeriver::new();
        let (positions, calendars) = rayon::join(
            || self.solar.positions(&localized),
            || localized.iter().map(|ts| deriver.derive(ts)).collect::<Vec<_>>(),
        );
        let positions = positions?;

        let rows = localized
            .into_iter()
            .zip(positions)
            .zip(calendars)
            .enumerate()
            .map(|(i, ((localized, solar), calendar))| EnrichedRow {
                localized,
                values: series.row_values(i),
                solar,
                calendar,
            })
            .collect();

        Ok(EnrichedSeries::new(
            series.fields().to_vec(),
            &self.config.site.timezone,
            rows,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::models::ObservationField;
    use crate::utils::constants::DEFAULT_TIMESTAMP_FORMAT;

    fn table(timestamps: &[&str], values: &[Option<f64>]) -> RawTable {
        RawTable::new(DEFAULT_TIMESTAMP_FORMAT)
            .with_timestamps(timestamps.iter().map(|s| s.to_string()).collect())
            .with_column(ObservationField::SolarRadiationAvg, values.to_vec())
    }

    fn pipeline() -> SeriesPipeline {
        SeriesPipeline::new(PipelineConfig::default().with_max_workers(2)).unwrap()
    }

    #[test]
    fn test_invalid_site_fails_at_construction() {
        let config = PipelineConfig::default()
            .with_site(SiteConfig::new(-7.0, 190.0, 0.0, "Asia/Jakarta", 420));
        assert!(matches!(
            SeriesPipeline::new(config),
            Err(ProcessingError::InvalidSite { .. })
        ));
    }

    #[test]
    fn test_run_end_to_end() {
        let input = table(
            &[
                "01/03/2022 00:00:00",
                "01/03/2022 00:30:00",
                "garbage",
                "01/03/2022 01:10:00",
            ],
            &[Some(100.0), Some(400.0), Some(999.0), Some(200.0)],
        );
        let output = pipeline().run_table(&input, None).unwrap();

        assert_eq!(output.enriched.len(), 8);
        assert_eq!(output.integrity.reconcile.unparsable_timestamps, 1);

        // 07:00 and 08:00 WIB bins
        assert_eq!(output.aggregated.len(), 2);
        assert_eq!(output.aggregated.value(0, "sr_avg"), Some(100.0));
        assert_eq!(output.aggregated.value(1, "sr_avg"), Some(250.0));
        assert_eq!(output.aggregated.value(0, "hour"), Some(7.0));
    }

    #[test]
    fn test_enriched_rows_keep_grid_timestamps() {
        let input = table(
            &["01/03/2022 23:50:00", "02/03/2022 00:00:00"],
            &[Some(0.0), Some(0.0)],
        );
        let output = pipeline().run_table(&input, None).unwrap();
        let first = &output.enriched.rows()[0];

        assert_eq!(first.localized.grid.to_string(), "2022-03-01 23:50:00");
        assert_eq!(first.localized.local_naive().to_string(), "2022-03-02 06:50:00");
        assert_eq!(first.calendar.day, 2);
    }

    #[test]
    fn test_nan_observation_is_interpolated_over() {
        use crate::models::Observation;
        use chrono::NaiveDate;

        let at = |m: u32| {
            NaiveDate::from_ymd_opt(2022, 3, 1)
                .unwrap()
                .and_hms_opt(0, m, 0)
        };
        let raw = RawObservations::new(
            vec![ObservationField::SolarRadiationAvg],
            vec![
                Observation::new(at(0), vec![Some(1.0)]),
                Observation::new(at(20), vec![Some(f64::NAN)]),
                Observation::new(at(30), vec![Some(4.0)]),
            ],
        )
        .unwrap();
        assert_eq!(raw.rows()[1].values, vec![None]);

        let output = pipeline().run(&raw, None).unwrap();
        let sr: Vec<f64> = output.enriched.rows().iter().map(|r| r.values[0]).collect();
        assert_eq!(sr, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_all_timestamps_bad() {
        let input = table(&["x", "y"], &[Some(1.0), Some(2.0)]);
        assert!(matches!(
            pipeline().run_table(&input, None),
            Err(ProcessingError::EmptyInput)
        ));
    }
}
