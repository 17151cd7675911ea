use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    DEFAULT_COARSE_INTERVAL_MINUTES, DEFAULT_FINE_INTERVAL_MINUTES, DEFAULT_SITE_ALT,
    DEFAULT_SITE_LAT, DEFAULT_SITE_LON, DEFAULT_TIMESTAMP_FORMAT, DEFAULT_TIMEZONE,
    DEFAULT_UTC_OFFSET_MINUTES,
};
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Environment variable prefix, e.g. `IRRADIANCE__SITE__LATITUDE=-6.2`
pub const ENV_PREFIX: &str = "IRRADIANCE";

/// Fixed observer location and the clock shift used to localize grid timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SiteConfig {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    /// Metres above sea level
    pub altitude: f64,

    /// IANA zone name attached to the shifted timestamps
    pub timezone: String,

    pub utc_offset_minutes: i32,
}

impl SiteConfig {
    pub fn new(
        latitude: f64,
        longitude: f64,
        altitude: f64,
        timezone: &str,
        utc_offset_minutes: i32,
    ) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            timezone: timezone.to_string(),
            utc_offset_minutes,
        }
    }

    /// Check the coordinates are physically meaningful and the zone resolves.
    pub fn validate_site(&self) -> Result<()> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() || !self.altitude.is_finite()
        {
            return Err(ProcessingError::InvalidSite {
                message: format!(
                    "non-finite coordinates (lat={}, lon={}, alt={})",
                    self.latitude, self.longitude, self.altitude
                ),
            });
        }

        self.validate().map_err(|e| ProcessingError::InvalidSite {
            message: format!(
                "latitude {} / longitude {} out of range: {}",
                self.latitude, self.longitude, e
            ),
        })?;

        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            ProcessingError::Config(format!("Unknown timezone '{}': {}", self.timezone, e))
        })
    }

    pub fn utc_offset(&self) -> Duration {
        Duration::minutes(i64::from(self.utc_offset_minutes))
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_SITE_LAT,
            DEFAULT_SITE_LON,
            DEFAULT_SITE_ALT,
            DEFAULT_TIMEZONE,
            DEFAULT_UTC_OFFSET_MINUTES,
        )
    }
}

/// Everything the core needs for one run. Built once and passed by reference into
/// every stage; nothing in the core reads process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub fine_interval_minutes: i64,
    pub coarse_interval_minutes: i64,
    pub timestamp_format: String,
    pub site: SiteConfig,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_max_workers() -> usize {
    num_cpus::get()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fine_interval_minutes: DEFAULT_FINE_INTERVAL_MINUTES,
            coarse_interval_minutes: DEFAULT_COARSE_INTERVAL_MINUTES,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            site: SiteConfig::default(),
            max_workers: default_max_workers(),
        }
    }
}

impl PipelineConfig {
    /// Layer built-in defaults, an optional settings file and `IRRADIANCE__*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("fine_interval_minutes", defaults.fine_interval_minutes)?
            .set_default("coarse_interval_minutes", defaults.coarse_interval_minutes)?
            .set_default("timestamp_format", defaults.timestamp_format.clone())?
            .set_default("max_workers", defaults.max_workers as i64)?
            .set_default("site.latitude", defaults.site.latitude)?
            .set_default("site.longitude", defaults.site.longitude)?
            .set_default("site.altitude", defaults.site.altitude)?
            .set_default("site.timezone", defaults.site.timezone.clone())?
            .set_default(
                "site.utc_offset_minutes",
                i64::from(defaults.site.utc_offset_minutes),
            )?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings: PipelineConfig = builder.build()?.try_deserialize()?;
        settings.validate_config()?;
        Ok(settings)
    }

    pub fn with_site(mut self, site: SiteConfig) -> Self {
        self.site = site;
        self
    }

    pub fn with_fine_interval_minutes(mut self, minutes: i64) -> Self {
        self.fine_interval_minutes = minutes;
        self
    }

    pub fn with_coarse_interval_minutes(mut self, minutes: i64) -> Self {
        self.coarse_interval_minutes = minutes;
        self
    }

    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn fine_interval(&self) -> Duration {
        Duration::minutes(self.fine_interval_minutes)
    }

    pub fn coarse_interval(&self) -> Duration {
        Duration::minutes(self.coarse_interval_minutes)
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.fine_interval_minutes <= 0 {
            return Err(ProcessingError::Config(format!(
                "fine_interval_minutes must be positive, got {}",
                self.fine_interval_minutes
            )));
        }
        if self.coarse_interval_minutes <= 0 {
            return Err(ProcessingError::Config(format!(
                "coarse_interval_minutes must be positive, got {}",
                self.coarse_interval_minutes
            )));
        }
        if self.timestamp_format.trim().is_empty() {
            return Err(ProcessingError::Config(
                "timestamp_format must not be empty".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ProcessingError::Config(
                "max_workers must be at least 1".to_string(),
            ));
        }
        self.site.validate_site()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_site_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate_config().is_ok());
        assert_eq!(config.site.tz().unwrap(), chrono_tz::Asia::Jakarta);
        assert_eq!(config.site.utc_offset(), Duration::hours(7));
    }

    #[test]
    fn test_latitude_out_of_range() {
        let site = SiteConfig::new(91.0, 0.0, 0.0, "UTC", 0);
        match site.validate_site() {
            Err(ProcessingError::InvalidSite { .. }) => {}
            other => panic!("expected InvalidSite, got {:?}", other),
        }
    }

    #[test]
    fn test_longitude_out_of_range() {
        let site = SiteConfig::new(0.0, -180.5, 0.0, "UTC", 0);
        assert!(matches!(
            site.validate_site(),
            Err(ProcessingError::InvalidSite { .. })
        ));
    }

    #[test]
    fn test_nan_latitude_rejected() {
        let site = SiteConfig::new(f64::NAN, 0.0, 0.0, "UTC", 0);
        assert!(matches!(
            site.validate_site(),
            Err(ProcessingError::InvalidSite { .. })
        ));
    }

    #[test]
    fn test_unknown_timezone() {
        let site = SiteConfig::new(0.0, 0.0, 0.0, "Mars/Olympus_Mons", 0);
        assert!(matches!(site.validate_site(), Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = PipelineConfig::default().with_fine_interval_minutes(0);
        assert!(matches!(
            config.validate_config(),
            Err(ProcessingError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "coarse_interval_minutes = 180").unwrap();
        writeln!(file, "[site]").unwrap();
        writeln!(file, "latitude = 51.5").unwrap();
        writeln!(file, "longitude = -0.12").unwrap();
        writeln!(file, "timezone = \"Europe/London\"").unwrap();
        writeln!(file, "utc_offset_minutes = 0").unwrap();

        let config = PipelineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.coarse_interval_minutes, 180);
        assert_eq!(config.fine_interval_minutes, DEFAULT_FINE_INTERVAL_MINUTES);
        assert_eq!(config.site.latitude, 51.5);
        assert_eq!(config.site.altitude, DEFAULT_SITE_ALT);
        assert_eq!(config.site.timezone, "Europe/London");
    }

    #[test]
    fn test_load_rejects_invalid_site_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[site]").unwrap();
        writeln!(file, "latitude = 123.0").unwrap();

        assert!(matches!(
            PipelineConfig::load(Some(file.path())),
            Err(ProcessingError::InvalidSite { .. })
        ));
    }
}
