use crate::error::{ProcessingError, Result};
use crate::models::{ObservationField, RawTable};
use crate::utils::constants::{DEFAULT_TIMESTAMP_FORMAT, TIMESTAMP_COLUMN};
use encoding_rs::{Encoding, WINDOWS_1252};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads a station export (CSV) into a `RawTable`, keeping the timestamp column and
/// the selected observation columns. Anything else in the file is ignored.
pub struct ObservationReader {
    timestamp_column: String,
    timestamp_format: String,
    fields: Vec<ObservationField>,
    delimiter: u8,
    use_mmap: bool,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self {
            timestamp_column: TIMESTAMP_COLUMN.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            fields: ObservationField::ALL.to_vec(),
            delimiter: b',',
            use_mmap: false,
        }
    }

    pub fn with_timestamp_column(mut self, column: &str) -> Self {
        self.timestamp_column = column.to_string();
        self
    }

    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    pub fn with_fields(mut self, fields: Vec<ObservationField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn read_path(&self, path: &Path) -> Result<RawTable> {
        let table = if self.use_mmap {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_bytes(&mmap)?
        } else {
            let bytes = std::fs::read(path)?;
            self.read_bytes(&bytes)?
        };

        info!(
            path = %path.display(),
            rows = table.len(),
            fields = table.columns.len(),
            "Read observation file"
        );
        Ok(table)
    }

    pub fn read_bytes(&self, bytes: &[u8]) -> Result<RawTable> {
        let text = decode_text(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let find = |name: &str| headers.iter().position(|h| h == name);

        let timestamp_idx = find(self.timestamp_column.as_str()).ok_or_else(|| {
            ProcessingError::MissingData(format!(
                "Timestamp column '{}' not found",
                self.timestamp_column
            ))
        })?;

        let field_columns = self
            .fields
            .iter()
            .map(|field| {
                find(field.column_name())
                    .map(|idx| (*field, idx))
                    .ok_or_else(|| {
                        ProcessingError::MissingData(format!(
                            "Column '{}' not found",
                            field.column_name()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut timestamps = Vec::new();
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); field_columns.len()];
        let mut unreadable_cells = 0usize;

        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            timestamps.push(record.get(timestamp_idx).unwrap_or_default().to_string());
            for ((_, idx), column) in field_columns.iter().zip(columns.iter_mut()) {
                let cell = record.get(*idx).unwrap_or_default();
                let value = self.parse_value(cell);
                if value.is_none() && !is_missing_marker(cell) {
                    unreadable_cells += 1;
                }
                column.push(value);
            }
        }

        if unreadable_cells > 0 {
            warn!(unreadable_cells, "Non-numeric cells were treated as missing");
        }
        debug!(rows = timestamps.len(), "Parsed CSV records");

        let mut table = RawTable::new(&self.timestamp_format).with_timestamps(timestamps);
        for ((field, _), column) in field_columns.into_iter().zip(columns) {
            table = table.with_column(field, column);
        }
        Ok(table)
    }

    /// Numeric cell, `None` for blanks and missing-value markers. Comma decimals are
    /// accepted when the delimiter is not a comma.
    fn parse_value(&self, cell: &str) -> Option<f64> {
        if is_missing_marker(cell) {
            return None;
        }

        let parsed = cell.parse::<f64>().ok().or_else(|| {
            if self.delimiter != b',' && cell.contains(',') {
                cell.replace(',', ".").parse::<f64>().ok()
            } else {
                None
            }
        });

        parsed.filter(|v| v.is_finite())
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_missing_marker(cell: &str) -> bool {
    matches!(
        cell.trim(),
        "" | "NaN" | "nan" | "NA" | "N/A" | "#N/A" | "-" | "null"
    )
}

/// UTF-8 (with or without BOM), UTF-16 with BOM, otherwise Windows-1252.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text;
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("Input is not UTF-8, decoding as Windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}
