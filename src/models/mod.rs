pub mod enriched;
pub mod observation;
pub mod series;

pub use enriched::{
    column_names, AggregatedRow, AggregatedSeries, CalendarFeatures, EnrichedRow, EnrichedSeries,
    LocalizedTimestamp, SolarPosition, DERIVED_COLUMNS,
};
pub use observation::{parse_timestamp, Observation, ObservationField, RawObservations, RawTable};
pub use series::{CanonicalGrid, InterpolatedSeries, ReconcileSummary, ReconciledSeries};
