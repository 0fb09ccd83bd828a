//! Nanosecond-resolution instants for archive data
//!
//! Archive samples are stamped with nanosecond precision, which is finer
//! than anything a float of seconds can carry for modern epochs. `Timestamp`
//! keeps the full resolution as an `i64` of nanoseconds since the Unix epoch
//! and owns every conversion the cache needs:
//!
//! - calendar datetimes (`chrono`) for user-facing query boundaries
//! - fractional seconds-since-epoch, the unit the persisted index uses
//! - ISO-8601 text with nine fractional digits, the segment file format

use chrono::{DateTime, NaiveDateTime, Utc};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Format used in segment files and deterministic segment file names.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9f";

/// A nanosecond-resolution instant, counted from the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create from raw nanoseconds since the epoch.
    pub const fn from_nanos(nanos: i64) -> Self {
        Timestamp(nanos)
    }

    /// Raw nanoseconds since the epoch.
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Create from fractional seconds since the epoch.
    ///
    /// The integer and fractional parts are split before scaling so the
    /// sub-second digits survive as well as the input allows; the fraction
    /// is rounded to whole nanoseconds. Instants outside the i64 nanosecond
    /// range (roughly the years 1677 to 2262) saturate.
    pub fn from_secs_f64(secs: f64) -> Self {
        let whole = secs.trunc() as i64;
        let frac = ((secs - secs.trunc()) * NANOS_PER_SEC as f64).round() as i64;
        let nanos = whole
            .checked_mul(NANOS_PER_SEC)
            .and_then(|n| n.checked_add(frac))
            .unwrap_or(if secs < 0.0 { i64::MIN } else { i64::MAX });
        Timestamp(nanos)
    }

    /// Fractional seconds since the epoch. Lossy above ~2^53 nanoseconds;
    /// use [`Timestamp::to_decimal_secs`] where precision matters.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Fixed-point decimal seconds, always nine fractional digits.
    ///
    /// This is the lossless form the persisted index stores, e.g.
    /// `"1525392000.123456789"`.
    pub fn to_decimal_secs(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!(
            "{}{}.{:09}",
            sign,
            abs / NANOS_PER_SEC as u64,
            abs % NANOS_PER_SEC as u64
        )
    }

    /// Parse fixed-point decimal seconds. Accepts fewer than nine fractional
    /// digits (older producers wrote plain floats) and no fraction at all.
    /// A value outside the i64 nanosecond range is unrepresentable and
    /// parses as `None`.
    pub fn parse_decimal_secs(s: &str) -> Option<Self> {
        let s = s.trim();
        let (sign, body) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let (whole, frac) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };
        let whole: i64 = whole.parse().ok()?;
        let mut nanos = 0i64;
        if !frac.is_empty() {
            // Right-pad to nine digits; extra digits beyond nanoseconds drop.
            let digits: String = frac.chars().take(9).collect();
            if !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            nanos = digits.parse::<i64>().ok()? * 10i64.pow(9 - digits.len() as u32);
        }
        let total = whole.checked_mul(NANOS_PER_SEC)?.checked_add(nanos)?;
        Some(Timestamp(sign * total))
    }

    /// The calendar datetime for this instant.
    pub fn to_datetime(self) -> DateTime<Utc> {
        let secs = self.0.div_euclid(NANOS_PER_SEC);
        let nanos = self.0.rem_euclid(NANOS_PER_SEC) as u32;
        // Every i64 of nanoseconds lands inside chrono's representable range.
        DateTime::from_timestamp(secs, nanos).expect("nanosecond instant in range")
    }

    /// ISO-8601 text with nine fractional digits, the segment file form.
    pub fn to_iso(self) -> String {
        self.to_datetime().format(ISO_FORMAT).to_string()
    }

    /// Parse ISO-8601 text. The fractional part may have any number of
    /// digits or be absent.
    pub fn parse_iso(s: &str) -> Option<Self> {
        let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        naive.and_utc().timestamp_nanos_opt().map(Timestamp)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        // Saturates for dates past ~2262, beyond which i64 nanoseconds run out.
        Timestamp(dt.timestamp_nanos_opt().unwrap_or(i64::MAX))
    }
}

impl From<f64> for Timestamp {
    fn from(secs: f64) -> Self {
        Timestamp::from_secs_f64(secs)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_iso())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2018, 5, 4, 6, 10, 0).unwrap();
        let ts = Timestamp::from(dt);
        assert_eq!(ts.to_datetime(), dt);
    }

    #[test]
    fn test_decimal_secs_roundtrip_preserves_nanos() {
        let ts = Timestamp::from_nanos(1_525_392_000_123_456_789);
        let text = ts.to_decimal_secs();
        assert_eq!(text, "1525392000.123456789");
        assert_eq!(Timestamp::parse_decimal_secs(&text), Some(ts));
    }

    #[test]
    fn test_decimal_secs_accepts_short_fraction() {
        // Older index files were written with float formatting.
        let ts = Timestamp::parse_decimal_secs("1525392000.5").unwrap();
        assert_eq!(ts.as_nanos(), 1_525_392_000_500_000_000);

        let ts = Timestamp::parse_decimal_secs("1525392000").unwrap();
        assert_eq!(ts.as_nanos(), 1_525_392_000_000_000_000);
    }

    #[test]
    fn test_decimal_secs_rejects_garbage() {
        assert_eq!(Timestamp::parse_decimal_secs("not-a-number"), None);
        assert_eq!(Timestamp::parse_decimal_secs("12.3a"), None);
    }

    #[test]
    fn test_decimal_secs_overflow_is_unrepresentable() {
        // ~292 years of seconds is the most an i64 of nanoseconds can hold;
        // anything past that parses as None instead of wrapping.
        assert_eq!(Timestamp::parse_decimal_secs("99999999999999.0"), None);
        assert_eq!(Timestamp::parse_decimal_secs("-99999999999999.0"), None);
        assert_eq!(
            Timestamp::parse_decimal_secs("9223372036.854775807"),
            Some(Timestamp::from_nanos(i64::MAX))
        );
    }

    #[test]
    fn test_from_secs_f64_saturates_out_of_range() {
        assert_eq!(Timestamp::from_secs_f64(1.0e30).as_nanos(), i64::MAX);
        assert_eq!(Timestamp::from_secs_f64(-1.0e30).as_nanos(), i64::MIN);
    }

    #[test]
    fn test_negative_decimal_secs() {
        let ts = Timestamp::from_nanos(-1_500_000_000);
        assert_eq!(ts.to_decimal_secs(), "-1.500000000");
        assert_eq!(Timestamp::parse_decimal_secs("-1.500000000"), Some(ts));
    }

    #[test]
    fn test_iso_roundtrip() {
        let ts = Timestamp::from_nanos(1_525_392_000_123_456_789);
        let text = ts.to_iso();
        assert_eq!(text, "2018-05-04T00:00:00.123456789");
        assert_eq!(Timestamp::parse_iso(&text), Some(ts));
    }

    #[test]
    fn test_iso_without_fraction() {
        let ts = Timestamp::parse_iso("2018-05-04T00:00:00").unwrap();
        assert_eq!(ts.as_nanos(), 1_525_392_000_000_000_000);
    }

    #[test]
    fn test_from_secs_f64_splits_fraction() {
        let ts = Timestamp::from_secs_f64(1525392000.25);
        assert_eq!(ts.as_nanos(), 1_525_392_000_250_000_000);
    }

    #[test]
    fn test_ordering() {
        let a = Timestamp::from_nanos(1);
        let b = Timestamp::from_nanos(2);
        assert!(a < b);
    }
}
