//! Conversion between calendar values and serial day numbers.
//!
//! Workbooks store dates as the number of days since the 1900 epoch, with
//! the fraction holding the time of day (0.5 = noon).
//!
//! # The 1900 leap year
//!
//! Serial 60 stands for February 29, 1900, a day that never existed. Serials
//! 1 to 59 are therefore one lower than a plain day count, and serial 60 is
//! read back as February 28. Only dates from January 1, 1900 to
//! December 31, 9999 can be encoded.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::ooxml::error::{OoxmlError, Result};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Largest serial that still falls on December 31, 9999.
const MAX_SERIAL: f64 = 2_958_466.0;

/// The 1900 system counts from this day (serial 0 after the leap-year shift).
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

fn first_real_march() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 3, 1).unwrap_or_default()
}

fn in_range(date: NaiveDate) -> bool {
    let min = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default();
    let max = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or_default();
    (min..=max).contains(&date)
}

/// Fraction of a day for a time of day.
#[inline]
pub fn time_to_serial(time: NaiveTime) -> f64 {
    let millis = f64::from(time.num_seconds_from_midnight()) * 1000.0
        + f64::from(time.nanosecond() / 1_000_000);
    millis / MILLIS_PER_DAY
}

/// Serial number of a date and time.
///
/// ```
/// use chrono::NaiveDate;
/// use kumquat::ooxml::xlsx::date_utils::datetime_to_serial;
///
/// let noon = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// assert_eq!(datetime_to_serial(noon).unwrap(), 36526.5);
/// ```
pub fn datetime_to_serial(value: NaiveDateTime) -> Result<f64> {
    let date = value.date();
    if !in_range(date) {
        return Err(OoxmlError::Format(format!(
            "{} cannot be stored as a serial date",
            value
        )));
    }

    let mut days = (date - epoch()).num_days();
    if date < first_real_march() {
        days -= 1;
    }
    Ok(days as f64 + time_to_serial(value.time()))
}

/// Date and time of a serial number, to the millisecond.
pub fn serial_to_datetime(serial: f64) -> Result<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..MAX_SERIAL).contains(&serial) {
        return Err(OoxmlError::Format(format!(
            "{} is not a representable serial date",
            serial
        )));
    }

    let mut days = serial.trunc() as i64;
    let mut millis = ((serial - serial.trunc()) * MILLIS_PER_DAY).round() as i64;
    if millis >= MILLIS_PER_DAY as i64 {
        days += 1;
        millis = 0;
    }

    let date = match days {
        60 => NaiveDate::from_ymd_opt(1900, 2, 28).unwrap_or_default(),
        d if d < 60 => epoch() + Duration::days(d + 1),
        d => epoch() + Duration::days(d),
    };
    Ok(date.and_time(NaiveTime::MIN) + Duration::milliseconds(millis))
}

/// Time of day held in the fractional part of a serial number.
pub fn serial_to_time(serial: f64) -> Result<NaiveTime> {
    if !serial.is_finite() || serial < 0.0 {
        return Err(OoxmlError::Format(format!(
            "{} is not a representable time",
            serial
        )));
    }
    let millis = ((serial - serial.trunc()) * MILLIS_PER_DAY).round() as i64;
    let millis = millis.rem_euclid(MILLIS_PER_DAY as i64);
    Ok(NaiveTime::MIN + Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_known_serials() {
        assert_eq!(datetime_to_serial(date(1900, 1, 1)).unwrap(), 1.0);
        assert_eq!(datetime_to_serial(date(1900, 2, 28)).unwrap(), 59.0);
        assert_eq!(datetime_to_serial(date(1900, 3, 1)).unwrap(), 61.0);
        assert_eq!(datetime_to_serial(date(2024, 2, 29)).unwrap(), 45351.0);
        assert_eq!(datetime_to_serial(date(9999, 12, 31)).unwrap(), 2_958_465.0);
    }

    #[test]
    fn test_phantom_leap_day() {
        assert_eq!(serial_to_datetime(60.0).unwrap(), date(1900, 2, 28));
        assert_eq!(serial_to_datetime(59.0).unwrap(), date(1900, 2, 28));
        assert_eq!(serial_to_datetime(61.0).unwrap(), date(1900, 3, 1));
        assert_eq!(serial_to_datetime(1.0).unwrap(), date(1900, 1, 1));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(datetime_to_serial(date(1899, 12, 31)), Err(OoxmlError::Format(_))));
        assert!(matches!(serial_to_datetime(0.5), Err(OoxmlError::Format(_))));
        assert!(matches!(serial_to_datetime(3_000_000.0), Err(OoxmlError::Format(_))));
        assert!(matches!(serial_to_datetime(f64::NAN), Err(OoxmlError::Format(_))));
    }

    #[test]
    fn test_time_fraction() {
        let t = NaiveTime::from_hms_milli_opt(18, 30, 15, 250).unwrap();
        let serial = time_to_serial(t);
        assert_eq!(serial_to_time(serial).unwrap(), t);
        assert_eq!(serial_to_time(45351.25).unwrap(), NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    }

    #[test]
    fn test_round_trip_with_time() {
        let value = NaiveDate::from_ymd_opt(1987, 6, 5)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 500)
            .unwrap();
        let serial = datetime_to_serial(value).unwrap();
        assert_eq!(serial_to_datetime(serial).unwrap(), value);
    }
}
