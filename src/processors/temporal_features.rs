use chrono::{Datelike, Timelike};

use crate::models::{CalendarFeatures, LocalizedTimestamp};

/// Calendar fields read from the localized clock, never the raw grid value.
pub struct TemporalFeatureDeriver;

impl TemporalFeatureDeriver {
    pub fn new() -> Self {
        Self
    }

    pub fn derive(&self, timestamp: &LocalizedTimestamp) -> CalendarFeatures {
        let local = &timestamp.local;
        CalendarFeatures {
            hour: local.hour(),
            day_of_year: local.ordinal(),
            month: local.month(),
            year: local.year(),
            day: local.day(),
        }
    }
}

impl Default for TemporalFeatureDeriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn localized(y: i32, mo: u32, d: u32, h: u32, offset_hours: i64) -> LocalizedTimestamp {
        let grid = NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        LocalizedTimestamp::localize(grid, Duration::hours(offset_hours), &chrono_tz::Asia::Jakarta)
            .unwrap()
    }

    #[test]
    fn test_features_follow_localized_clock() {
        // 2022-12-31 20:00 on the logger clock is 2023-01-01 03:00 WIB
        let features = TemporalFeatureDeriver::new().derive(&localized(2022, 12, 31, 20, 7));
        assert_eq!(
            features,
            CalendarFeatures {
                hour: 3,
                day_of_year: 1,
                month: 1,
                year: 2023,
                day: 1,
            }
        );
    }

    #[test]
    fn test_leap_day_ordinal() {
        let features = TemporalFeatureDeriver::new().derive(&localized(2024, 12, 31, 12, 0));
        assert_eq!(features.day_of_year, 366);

        let features = TemporalFeatureDeriver::new().derive(&localized(2024, 2, 29, 23, 0));
        assert_eq!(features.day_of_year, 60);
        assert_eq!(features.hour, 23);
    }
}
