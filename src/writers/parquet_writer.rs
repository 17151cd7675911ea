use crate::error::{ProcessingError, Result};
use crate::models::{AggregatedRow, AggregatedSeries};
use crate::utils::constants::{
    COL_BIN_START, COL_DAY, COL_DOY, COL_HOUR, COL_MONTH, COL_SUN_ALTITUDE, COL_SUN_AZIMUTH,
    COL_SUN_ZENITH, COL_TIMESTAMP, COL_YEAR, COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE,
    COMPRESSION_SNAPPY, COMPRESSION_ZSTD, DEFAULT_BUFFER_SIZE, DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write an aggregated series, one Parquet row per bin
    pub fn write_series(&self, series: &AggregatedSeries, path: &Path) -> Result<()> {
        self.write_series_batched(series, path, self.row_group_size)
    }

    /// Write in record batches of `batch_size` bins. An empty series still produces a
    /// file carrying the full schema and no row groups.
    pub fn write_series_batched(
        &self,
        series: &AggregatedSeries,
        path: &Path,
        batch_size: usize,
    ) -> Result<()> {
        let schema = self.create_schema(series);
        let file = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, File::create(path)?);
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in series.rows().chunks(batch_size.max(1)) {
            let batch = self.rows_to_batch(series, chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        info!(path = %path.display(), rows = series.len(), "Wrote Parquet file");
        Ok(())
    }

    /// Bin start and sample timestamp, the observation fields, then the derived columns.
    /// Timestamps are local wall-clock values.
    fn create_schema(&self, series: &AggregatedSeries) -> Arc<Schema> {
        let timestamp_type = DataType::Timestamp(TimeUnit::Millisecond, None);

        let mut fields = vec![
            Field::new(COL_BIN_START, timestamp_type.clone(), false),
            Field::new(COL_TIMESTAMP, timestamp_type, false),
        ];
        fields.extend(
            series
                .fields()
                .iter()
                .map(|f| Field::new(f.column_name(), DataType::Float64, false)),
        );
        fields.extend([
            Field::new(COL_SUN_ALTITUDE, DataType::Float64, false),
            Field::new(COL_SUN_AZIMUTH, DataType::Float64, false),
            Field::new(COL_SUN_ZENITH, DataType::Float64, false),
            Field::new(COL_HOUR, DataType::UInt32, false),
            Field::new(COL_DOY, DataType::UInt32, false),
            Field::new(COL_MONTH, DataType::UInt32, false),
            Field::new(COL_YEAR, DataType::Int32, false),
            Field::new(COL_DAY, DataType::UInt32, false),
        ]);

        Arc::new(Schema::new(fields))
    }

    fn rows_to_batch(
        &self,
        series: &AggregatedSeries,
        rows: &[AggregatedRow],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let bin_starts: Vec<i64> = rows
            .iter()
            .map(|r| r.bin_start.and_utc().timestamp_millis())
            .collect();
        let timestamps: Vec<i64> = rows
            .iter()
            .map(|r| r.sample.localized.local_naive().and_utc().timestamp_millis())
            .collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(TimestampMillisecondArray::from(bin_starts)),
            Arc::new(TimestampMillisecondArray::from(timestamps)),
        ];

        for i in 0..series.fields().len() {
            let values: Vec<f64> = rows.iter().map(|r| r.sample.values[i]).collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        let solar = |f: fn(&AggregatedRow) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
        };
        columns.push(solar(|r| r.sample.solar.elevation));
        columns.push(solar(|r| r.sample.solar.azimuth));
        columns.push(solar(|r| r.sample.solar.zenith));

        let calendar = |f: fn(&AggregatedRow) -> u32| -> ArrayRef {
            Arc::new(UInt32Array::from(rows.iter().map(f).collect::<Vec<_>>()))
        };
        columns.push(calendar(|r| r.sample.calendar.hour));
        columns.push(calendar(|r| r.sample.calendar.day_of_year));
        columns.push(calendar(|r| r.sample.calendar.month));
        columns.push(Arc::new(Int32Array::from(
            rows.iter()
                .map(|r| r.sample.calendar.year)
                .collect::<Vec<_>>(),
        )));
        columns.push(calendar(|r| r.sample.calendar.day));

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Read one Float64 column back, in file order
    pub fn read_float_column(&self, path: &Path, column: &str) -> Result<Vec<f64>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut values = Vec::new();
        for batch in reader {
            let batch = batch?;
            let array = batch
                .column_by_name(column)
                .ok_or_else(|| ProcessingError::MissingData(format!("Column '{}' not found", column)))?
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!("Column '{}' is not Float64", column))
                })?;
            values.extend(array.values().iter().copied());
        }

        Ok(values)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let column_names = file_metadata
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();
        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        Ok(ParquetFileInfo {
            total_rows: file_metadata.num_rows(),
            row_groups: row_groups as i32,
            row_group_sizes,
            column_names,
            file_size: std::fs::metadata(path)?.len(),
            compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub column_names: Vec<String>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Columns: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.column_names.join(", "),
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichedSeries, ObservationField};
    use crate::processors::Aggregator;
    use chrono::Duration;
    use tempfile::NamedTempFile;

    fn hourly_series() -> AggregatedSeries {
        use crate::models::{CalendarFeatures, EnrichedRow, LocalizedTimestamp, SolarPosition};
        use chrono::NaiveDate;

        let start = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rows = (0..30)
            .map(|i| {
                let localized = LocalizedTimestamp::localize(
                    start + Duration::minutes(10 * i),
                    Duration::hours(7),
                    &chrono_tz::Asia::Jakarta,
                )
                .unwrap();
                EnrichedRow {
                    localized,
                    values: vec![i as f64, 25.0],
                    solar: SolarPosition {
                        elevation: 10.0,
                        azimuth: 100.0,
                        zenith: 80.0,
                    },
                    calendar: CalendarFeatures {
                        hour: 7,
                        day_of_year: 1,
                        month: 1,
                        year: 2022,
                        day: 1,
                    },
                }
            })
            .collect();
        let enriched = EnrichedSeries::new(
            vec![ObservationField::SolarRadiationAvg, ObservationField::AirTempAvg],
            "Asia/Jakarta",
            rows,
        );
        Aggregator::new(Duration::hours(1)).aggregate(&enriched).unwrap()
    }

    #[test]
    fn test_write_empty_series() {
        let writer = ParquetWriter::new();
        let empty = Aggregator::new(Duration::hours(1))
            .aggregate(&EnrichedSeries::new(Vec::new(), "UTC", Vec::new()))
            .unwrap();

        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.parquet");
        writer.write_series(&empty, &path).unwrap();
        assert!(path.exists());

        let info = writer.get_file_info(&path).unwrap();
        assert_eq!(info.total_rows, 0);
        assert_eq!(info.row_groups, 0);
        assert!(info.column_names.contains(&COL_SUN_ZENITH.to_string()));
        assert!(info.column_names.contains(&COL_BIN_START.to_string()));
    }

    #[test]
    fn test_write_and_inspect() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(2);
        let temp_file = NamedTempFile::new()?;
        let series = hourly_series();

        writer.write_series(&series, temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 5);
        assert_eq!(info.row_groups, 3);
        assert_eq!(info.row_group_sizes, vec![2, 2, 1]);
        assert_eq!(info.column_names.len(), 2 + 2 + 8);
        assert_eq!(info.column_names[0], "bin_start");
        assert!(info.summary().contains("Total rows: 5"));

        let sr = writer.read_float_column(temp_file.path(), "sr_avg")?;
        assert_eq!(sr, vec![0.0, 6.0, 12.0, 18.0, 24.0]);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let series = hourly_series();
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;
            writer.write_series(&series, temp_file.path())?;
            assert!(std::fs::metadata(temp_file.path())?.len() > 0);
        }
        Ok(())
    }

    #[test]
    fn test_unsupported_compression() {
        assert!(matches!(
            ParquetWriter::new().with_compression("brotli-9000"),
            Err(ProcessingError::Config(_))
        ));
    }
}
