/// Reference site (PLRT station)
pub const DEFAULT_SITE_LAT: f64 = -7.00589;
pub const DEFAULT_SITE_LON: f64 = 106.562;
pub const DEFAULT_SITE_ALT: f64 = 49.0;
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";
/// WIB is UTC+7
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

/// Grid and bin widths
pub const DEFAULT_FINE_INTERVAL_MINUTES: i64 = 10;
pub const DEFAULT_COARSE_INTERVAL_MINUTES: i64 = 60;

/// Raw log layout
pub const TIMESTAMP_COLUMN: &str = "Time";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Derived column names
pub const COL_BIN_START: &str = "bin_start";
pub const COL_TIMESTAMP: &str = "timestamp";
pub const COL_SUN_ALTITUDE: &str = "sun_altitude";
pub const COL_SUN_AZIMUTH: &str = "sun_azimuth";
pub const COL_SUN_ZENITH: &str = "sun_zenith_angle";
pub const COL_HOUR: &str = "hour";
pub const COL_DOY: &str = "doy";
pub const COL_MONTH: &str = "month";
pub const COL_YEAR: &str = "year";
pub const COL_DAY: &str = "day";

/// Air temperature assumed by the refraction correction
pub const STANDARD_TEMPERATURE_C: f64 = 12.0;

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
