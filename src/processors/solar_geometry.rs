//! Sun position for a fixed observer.
//!
//! Positions come from the NREL Solar Position Algorithm (`solar_positioning::spa`)
//! with ΔT estimated per instant. Apparent angles include the SPA refraction
//! correction, using surface pressure estimated from site altitude and a fixed
//! standard temperature.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use solar_positioning::spa;
use solar_positioning::time::DeltaT;
use solar_positioning::RefractionCorrection;

use crate::config::SiteConfig;
use crate::error::Result;
use crate::models::{LocalizedTimestamp, SolarPosition};
use crate::utils::constants::STANDARD_TEMPERATURE_C;

/// Surface pressure (mbar) from altitude (m), standard atmosphere
pub fn altitude_to_pressure(altitude: f64) -> f64 {
    ((44331.514 - altitude) / 11880.516).powf(1.0 / 0.1902632)
}

pub struct SolarGeometryEngine {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    refraction: RefractionCorrection,
}

impl SolarGeometryEngine {
    /// Fails with `InvalidSite` for coordinates off the globe.
    pub fn new(site: &SiteConfig) -> Result<Self> {
        site.validate_site()?;
        let refraction =
            RefractionCorrection::new(altitude_to_pressure(site.altitude), STANDARD_TEMPERATURE_C)?;

        Ok(Self {
            latitude: site.latitude,
            longitude: site.longitude,
            altitude: site.altitude,
            refraction,
        })
    }

    pub fn position(&self, instant: &DateTime<Utc>) -> Result<SolarPosition> {
        let delta_t = DeltaT::estimate_from_date_like(*instant)?;
        let position = spa::solar_position(
            *instant,
            self.latitude,
            self.longitude,
            self.altitude,
            delta_t,
            Some(self.refraction),
        )?;

        Ok(SolarPosition {
            elevation: position.elevation_angle(),
            azimuth: position.azimuth().rem_euclid(360.0),
            zenith: position.zenith_angle(),
        })
    }

    pub fn position_at(&self, timestamp: &LocalizedTimestamp) -> Result<SolarPosition> {
        self.position(&timestamp.utc())
    }

    /// One position per timestamp, computed in parallel, returned in input order.
    pub fn positions(&self, timestamps: &[LocalizedTimestamp]) -> Result<Vec<SolarPosition>> {
        timestamps
            .par_iter()
            .map(|ts| self.position_at(ts))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use chrono::{Duration, TimeZone};

    macro_rules! assert_approx {
        ($left:expr, $right:expr, $tol:expr) => {
            let (l, r) = ($left as f64, $right as f64);
            assert!(
                (l - r).abs() <= $tol,
                "assert_approx failed: left={}, right={}, diff={}, tol={}",
                l,
                r,
                (l - r).abs(),
                $tol
            );
        };
    }

    fn plrt() -> SolarGeometryEngine {
        SolarGeometryEngine::new(&SiteConfig::default()).unwrap()
    }

    #[test]
    fn test_nrel_reference_case() {
        // 2003-10-17 12:30:30 MST at Golden, Colorado
        let site = SiteConfig::new(39.742476, -105.1786, 1830.14, "America/Denver", -420);
        let engine = SolarGeometryEngine::new(&site).unwrap();
        let pos = engine
            .position(&Utc.with_ymd_and_hms(2003, 10, 17, 19, 30, 30).unwrap())
            .unwrap();

        assert_approx!(pos.zenith, 50.11162, 0.05);
        assert_approx!(pos.azimuth, 194.34024, 0.05);
    }

    #[test]
    fn test_equinox_noon_near_equator() {
        // Local solar noon at 106.56°E is close to 05:00 UTC
        let instant = Utc.with_ymd_and_hms(2023, 3, 21, 5, 0, 0).unwrap();
        let pos = plrt().position(&instant).unwrap();
        assert_approx!(pos.elevation, 90.0 - 7.00589_f64.abs(), 3.0);
    }

    #[test]
    fn test_below_horizon_at_local_midnight() {
        let instant = Utc.with_ymd_and_hms(2023, 3, 21, 17, 0, 0).unwrap();
        let pos = plrt().position(&instant).unwrap();
        assert!(pos.elevation < 0.0, "elevation {}", pos.elevation);
        assert!(pos.zenith > 90.0);
    }

    #[test]
    fn test_greenwich_new_year_noon() {
        let site = SiteConfig::new(51.4769, 0.0, 0.0, "UTC", 0);
        let engine = SolarGeometryEngine::new(&site).unwrap();
        let pos = engine
            .position(&Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap())
            .unwrap();

        assert_approx!(pos.elevation, 15.5, 0.25);
        assert!(pos.azimuth > 178.0 && pos.azimuth < 180.0, "azimuth {}", pos.azimuth);
    }

    #[test]
    fn test_zenith_elevation_identity() {
        let engine = plrt();
        let start = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
        for step in 0..144 {
            let pos = engine.position(&(start + Duration::minutes(10 * step))).unwrap();
            assert_approx!(pos.zenith + pos.elevation, 90.0, 1e-6);
            assert!((0.0..360.0).contains(&pos.azimuth));
        }
    }

    #[test]
    fn test_morning_sun_in_the_east() {
        // 08:00 WIB
        let pos = plrt()
            .position(&Utc.with_ymd_and_hms(2023, 3, 21, 1, 0, 0).unwrap())
            .unwrap();
        assert!(pos.elevation > 0.0);
        assert!(pos.azimuth > 0.0 && pos.azimuth < 180.0, "azimuth {}", pos.azimuth);
    }

    #[test]
    fn test_positions_keep_input_order() {
        let engine = plrt();
        let start = chrono::NaiveDate::from_ymd_opt(2022, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let localized: Vec<LocalizedTimestamp> = (0..48)
            .map(|i| {
                LocalizedTimestamp::localize(
                    start + Duration::minutes(30 * i),
                    Duration::hours(7),
                    &chrono_tz::Asia::Jakarta,
                )
                .unwrap()
            })
            .collect();

        let batch = engine.positions(&localized).unwrap();
        for (ts, pos) in localized.iter().zip(&batch) {
            assert_eq!(*pos, engine.position_at(ts).unwrap());
        }
    }

    #[test]
    fn test_pressure_from_altitude() {
        assert_approx!(altitude_to_pressure(0.0), 1013.25, 0.1);
        assert!(altitude_to_pressure(1500.0) < 860.0);
    }

    #[test]
    fn test_invalid_site() {
        let site = SiteConfig::new(-95.0, 106.0, 0.0, "Asia/Jakarta", 420);
        assert!(matches!(
            SolarGeometryEngine::new(&site),
            Err(ProcessingError::InvalidSite { .. })
        ));
    }
}
