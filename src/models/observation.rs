use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};

/// Sensor channels logged by the weather station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObservationField {
    Precipitation,
    WindSpeedAvg,
    WindSpeedMax,
    WindDirectionAvg,
    AirTempMax,
    AirTempAvg,
    AirTempMin,
    RelativeHumidity,
    AirPressure,
    SolarRadiationAvg,
    SolarRadiationMax,
}

impl ObservationField {
    pub const ALL: [ObservationField; 11] = [
        ObservationField::Precipitation,
        ObservationField::WindSpeedAvg,
        ObservationField::WindSpeedMax,
        ObservationField::WindDirectionAvg,
        ObservationField::AirTempMax,
        ObservationField::AirTempAvg,
        ObservationField::AirTempMin,
        ObservationField::RelativeHumidity,
        ObservationField::AirPressure,
        ObservationField::SolarRadiationAvg,
        ObservationField::SolarRadiationMax,
    ];

    /// Column header in the station export
    pub fn column_name(&self) -> &'static str {
        match self {
            ObservationField::Precipitation => "rr",
            ObservationField::WindSpeedAvg => "ws_avg",
            ObservationField::WindSpeedMax => "ws_max",
            ObservationField::WindDirectionAvg => "wd_avg",
            ObservationField::AirTempMax => "tt_air_max",
            ObservationField::AirTempAvg => "tt_air_avg",
            ObservationField::AirTempMin => "tt_air_min",
            ObservationField::RelativeHumidity => "rh_avg",
            ObservationField::AirPressure => "pp_air",
            ObservationField::SolarRadiationAvg => "sr_avg",
            ObservationField::SolarRadiationMax => "sr_max",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.column_name() == name.trim())
    }
}

impl fmt::Display for ObservationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One raw log row. `values` is parallel to the owning table's field list and keeps
/// missing cells as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: Option<NaiveDateTime>,
    pub values: Vec<Option<f64>>,
}

impl Observation {
    pub fn new(timestamp: Option<NaiveDateTime>, values: Vec<Option<f64>>) -> Self {
        Self { timestamp, values }
    }

    pub fn has_timestamp(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// Columnar hand-off from ingestion: raw timestamp strings plus one value column per
/// field, all the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub timestamps: Vec<String>,
    pub columns: BTreeMap<ObservationField, Vec<Option<f64>>>,
    pub timestamp_format: String,
}

impl RawTable {
    pub fn new(timestamp_format: &str) -> Self {
        Self {
            timestamps: Vec::new(),
            columns: BTreeMap::new(),
            timestamp_format: timestamp_format.to_string(),
        }
    }

    pub fn with_timestamps(mut self, timestamps: Vec<String>) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn with_column(mut self, field: ObservationField, values: Vec<Option<f64>>) -> Self {
        self.columns.insert(field, values);
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn fields(&self) -> Vec<ObservationField> {
        self.columns.keys().copied().collect()
    }
}

/// Raw rows with parsed (or absent) timestamps, still in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservations {
    fields: Vec<ObservationField>,
    rows: Vec<Observation>,
    unparsable_timestamps: usize,
}

impl RawObservations {
    /// Non-finite values are stored as absent.
    pub fn new(fields: Vec<ObservationField>, mut rows: Vec<Observation>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.values.len() != fields.len()) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Observation has {} values but {} fields are declared",
                row.values.len(),
                fields.len()
            )));
        }

        for value in rows.iter_mut().flat_map(|r| r.values.iter_mut()) {
            if value.is_some_and(|v| !v.is_finite()) {
                *value = None;
            }
        }

        Ok(Self {
            fields,
            rows,
            unparsable_timestamps: 0,
        })
    }

    /// Parse the table's timestamps with its declared format. Unparsable timestamps
    /// leave the row without a timestamp rather than failing the whole table.
    pub fn parse(table: &RawTable) -> Result<Self> {
        let n = table.timestamps.len();
        for (field, column) in &table.columns {
            if column.len() != n {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Column '{}' has {} values but there are {} timestamps",
                    field,
                    column.len(),
                    n
                )));
            }
        }

        let fields = table.fields();
        let mut rows = Vec::with_capacity(n);
        let mut unparsable = 0;

        for (i, raw) in table.timestamps.iter().enumerate() {
            let timestamp = match parse_timestamp(raw, &table.timestamp_format) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    unparsable += 1;
                    debug!(row = i, "{}", e);
                    None
                }
            };

            let values = fields
                .iter()
                .map(|f| table.columns[f][i].filter(|v| v.is_finite()))
                .collect();

            rows.push(Observation::new(timestamp, values));
        }

        if unparsable > 0 {
            warn!(
                unparsable,
                total = n,
                format = %table.timestamp_format,
                "Rows with malformed timestamps were marked absent"
            );
        }

        Ok(Self {
            fields,
            rows,
            unparsable_timestamps: unparsable,
        })
    }

    pub fn fields(&self) -> &[ObservationField] {
        &self.fields
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn unparsable_timestamps(&self) -> usize {
        self.unparsable_timestamps
    }

    pub fn valid_timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.rows.iter().filter_map(|r| r.timestamp)
    }
}

/// Strict parse against `format`, surrounding whitespace ignored.
pub fn parse_timestamp(raw: &str, format: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), format).map_err(|_| {
        ProcessingError::MalformedTimestamp {
            value: raw.to_string(),
            format: format.to_string(),
        }
    })
}
