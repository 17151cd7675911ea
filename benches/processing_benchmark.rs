use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use irradiance_processor::config::{PipelineConfig, SiteConfig};
use irradiance_processor::models::{LocalizedTimestamp, ObservationField, RawTable};
use irradiance_processor::processors::{
    GapInterpolator, GridBuilder, SeriesPipeline, SeriesReconciler, SolarGeometryEngine,
};

// Synthetic 10-minute log with every seventh row dropped
fn create_test_table(days: i64) -> RawTable {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let rows: Vec<i64> = (0..days * 144).filter(|i| i % 7 != 3).collect();

    let timestamps = rows
        .iter()
        .map(|i| {
            (start + Duration::minutes(10 * i))
                .format("%d/%m/%Y %H:%M:%S")
                .to_string()
        })
        .collect();

    let mut table = RawTable::new("%d/%m/%Y %H:%M:%S").with_timestamps(timestamps);
    for (k, field) in ObservationField::ALL.iter().enumerate() {
        let values = rows
            .iter()
            .map(|i| {
                if (i + k as i64) % 11 == 0 {
                    None
                } else {
                    Some(((*i as f64) * 0.01 + k as f64).sin() * 100.0)
                }
            })
            .collect();
        table = table.with_column(*field, values);
    }
    table
}

fn benchmark_solar_positions(c: &mut Criterion) {
    let engine = SolarGeometryEngine::new(&SiteConfig::default()).unwrap();
    let start = NaiveDate::from_ymd_opt(2022, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let localized: Vec<LocalizedTimestamp> = (0..30 * 144)
        .map(|i| {
            LocalizedTimestamp::localize(
                start + Duration::minutes(10 * i),
                Duration::hours(7),
                &chrono_tz::Asia::Jakarta,
            )
            .unwrap()
        })
        .collect();

    c.bench_function("solar_positions_month", |b| {
        b.iter(|| black_box(engine.positions(&localized).unwrap().len()))
    });
}

fn benchmark_gap_interpolation(c: &mut Criterion) {
    let table = create_test_table(30);
    let raw = irradiance_processor::models::RawObservations::parse(&table).unwrap();
    let grid = GridBuilder::new(Duration::minutes(10)).build(&raw).unwrap();
    let reconciled = SeriesReconciler::new().reconcile(&grid, &raw);

    c.bench_function("gap_interpolation_month", |b| {
        b.iter(|| {
            let filled = GapInterpolator::new().interpolate(&reconciled).unwrap();
            black_box(filled.len())
        })
    });
}

fn benchmark_pipeline_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_by_days");
    let pipeline = SeriesPipeline::new(PipelineConfig::default()).unwrap();

    for &days in &[7, 30, 90] {
        let table = create_test_table(days);
        group.bench_with_input(BenchmarkId::new("days", days), &table, |b, table| {
            b.iter(|| {
                let output = pipeline.run_table(table, None).unwrap();
                black_box(output.aggregated.len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_solar_positions,
    benchmark_gap_interpolation,
    benchmark_pipeline_by_size
);
criterion_main!(benches);
