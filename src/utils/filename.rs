use chrono::{Datelike, Local};
use std::path::PathBuf;

/// Generate default Parquet filename with format: irradiance-{minutes}min-{YYMMDD}.parquet
pub fn generate_default_parquet_filename(coarse_interval_minutes: i64) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!(
        "irradiance-{}min-{:02}{:02}{:02}.parquet",
        coarse_interval_minutes, year, month, day
    );
    PathBuf::from("output").join(filename)
}
