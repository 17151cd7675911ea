pub mod aggregator;
pub mod gap_interpolator;
pub mod grid_builder;
pub mod integrity_checker;
pub mod pipeline;
pub mod series_reconciler;
pub mod solar_geometry;
pub mod temporal_features;

pub use aggregator::Aggregator;
pub use gap_interpolator::GapInterpolator;
pub use grid_builder::GridBuilder;
pub use integrity_checker::{FieldGapStatistics, IntegrityChecker, IntegrityReport};
pub use pipeline::{PipelineOutput, SeriesPipeline, PIPELINE_STAGES};
pub use series_reconciler::SeriesReconciler;
pub use solar_geometry::SolarGeometryEngine;
pub use temporal_features::TemporalFeatureDeriver;
