use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ProcessingError, Result};
use crate::models::ObservationField;
use crate::utils::constants::{
    COL_DAY, COL_DOY, COL_HOUR, COL_MONTH, COL_SUN_ALTITUDE, COL_SUN_AZIMUTH, COL_SUN_ZENITH,
    COL_YEAR,
};

/// Derived columns appended after the observation fields, in output order.
pub const DERIVED_COLUMNS: [&str; 8] = [
    COL_SUN_ALTITUDE,
    COL_SUN_AZIMUTH,
    COL_SUN_ZENITH,
    COL_HOUR,
    COL_DOY,
    COL_MONTH,
    COL_YEAR,
    COL_DAY,
];

/// A grid timestamp paired with its shifted, zone-attached counterpart. The grid
/// value is carried untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalizedTimestamp {
    pub grid: NaiveDateTime,
    pub local: DateTime<FixedOffset>,
}

impl LocalizedTimestamp {
    /// Shift `grid` by `offset` and read the result as wall-clock time in `tz`.
    /// Ambiguous wall-clock times resolve to the earlier instant.
    pub fn localize(grid: NaiveDateTime, offset: Duration, tz: &Tz) -> Result<Self> {
        let localization_error = || ProcessingError::Localization {
            timestamp: grid.to_string(),
            timezone: tz.name().to_string(),
        };

        let shifted = grid
            .checked_add_signed(offset)
            .ok_or_else(localization_error)?;
        let zoned = tz
            .from_local_datetime(&shifted)
            .earliest()
            .ok_or_else(localization_error)?;
        let fixed = zoned.offset().fix();

        Ok(Self {
            grid,
            local: zoned.with_timezone(&fixed),
        })
    }

    pub fn local_naive(&self) -> NaiveDateTime {
        self.local.naive_local()
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.local.with_timezone(&Utc)
    }
}

/// Sun position in degrees. Elevation and zenith include refraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolarPosition {
    pub elevation: f64,
    /// Clockwise from north, [0, 360)
    pub azimuth: f64,
    pub zenith: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarFeatures {
    pub hour: u32,
    pub day_of_year: u32,
    pub month: u32,
    pub year: i32,
    pub day: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    pub localized: LocalizedTimestamp,
    pub values: Vec<f64>,
    pub solar: SolarPosition,
    pub calendar: CalendarFeatures,
}

impl EnrichedRow {
    /// Look up an observation column or a derived column by name.
    pub fn named_value(&self, fields: &[ObservationField], name: &str) -> Option<f64> {
        if let Some(i) = fields.iter().position(|f| f.column_name() == name) {
            return self.values.get(i).copied();
        }

        let value = match name {
            COL_SUN_ALTITUDE => self.solar.elevation,
            COL_SUN_AZIMUTH => self.solar.azimuth,
            COL_SUN_ZENITH => self.solar.zenith,
            COL_HOUR => f64::from(self.calendar.hour),
            COL_DOY => f64::from(self.calendar.day_of_year),
            COL_MONTH => f64::from(self.calendar.month),
            COL_YEAR => f64::from(self.calendar.year),
            COL_DAY => f64::from(self.calendar.day),
            _ => return None,
        };
        Some(value)
    }

    pub fn to_map(&self, fields: &[ObservationField]) -> BTreeMap<String, f64> {
        column_names(fields)
            .into_iter()
            .filter_map(|name| self.named_value(fields, &name).map(|v| (name, v)))
            .collect()
    }
}

/// Observation columns followed by the derived columns
pub fn column_names(fields: &[ObservationField]) -> Vec<String> {
    fields
        .iter()
        .map(|f| f.column_name().to_string())
        .chain(DERIVED_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// Interpolated series with per-row solar and calendar features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSeries {
    fields: Vec<ObservationField>,
    timezone: String,
    rows: Vec<EnrichedRow>,
}

impl EnrichedSeries {
    pub fn new(fields: Vec<ObservationField>, timezone: &str, rows: Vec<EnrichedRow>) -> Self {
        Self {
            fields,
            timezone: timezone.to_string(),
            rows,
        }
    }

    pub fn fields(&self) -> &[ObservationField] {
        &self.fields
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn rows(&self) -> &[EnrichedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    /// Local wall-clock start of the bin
    pub bin_start: NaiveDateTime,
    /// The row sampled for this bin
    pub sample: EnrichedRow,
}

/// One row per non-empty bin, ordered by bin start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    fields: Vec<ObservationField>,
    timezone: String,
    bin_seconds: i64,
    rows: Vec<AggregatedRow>,
}

impl AggregatedSeries {
    pub(crate) fn new(
        fields: Vec<ObservationField>,
        timezone: &str,
        bin_width: Duration,
        rows: Vec<AggregatedRow>,
    ) -> Self {
        Self {
            fields,
            timezone: timezone.to_string(),
            bin_seconds: bin_width.num_seconds(),
            rows,
        }
    }

    pub fn fields(&self) -> &[ObservationField] {
        &self.fields
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn bin_width(&self) -> Duration {
        Duration::seconds(self.bin_seconds)
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.fields)
    }

    pub fn value(&self, index: usize, column: &str) -> Option<f64> {
        self.rows
            .get(index)
            .and_then(|r| r.sample.named_value(&self.fields, column))
    }

    /// Every value of one column in bin order
    pub fn column_values(&self, column: &str) -> Option<Vec<f64>> {
        self.rows
            .iter()
            .map(|r| r.sample.named_value(&self.fields, column))
            .collect()
    }

    pub fn row_map(&self, index: usize) -> Option<BTreeMap<String, f64>> {
        self.rows.get(index).map(|r| r.sample.to_map(&self.fields))
    }

    /// View the sampled rows as a fine series so it can be binned again at another
    /// width. That is a separate aggregation, not a no-op.
    pub fn to_enriched(&self) -> EnrichedSeries {
        EnrichedSeries::new(
            self.fields.clone(),
            &self.timezone,
            self.rows.iter().map(|r| r.sample.clone()).collect(),
        )
    }
}
