//! Core domain model and tolerant field parsing for the listing historian.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "ilh-core";

/// Inclusive bounds applied to the floor attribute during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorBounds {
    pub min: i16,
    pub max: i16,
}

impl Default for FloorBounds {
    fn default() -> Self {
        Self { min: -5, max: 300 }
    }
}

/// Historized attribute tuple of one listing version.
///
/// `None` means "unknown": the value was absent upstream or failed the
/// tolerant parse. Field-wise null-aware comparison of two tuples is what
/// drives delta detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FactTuple {
    pub price: Option<f64>,
    pub area: Option<f64>,
    pub site_area: Option<f64>,
    pub floor: Option<i16>,
    pub room_count: Option<i16>,
    pub balcony_count: Option<i16>,
    pub terrace_count: Option<i16>,
    pub terrace_area: Option<f64>,
}

/// Non-historized listing attributes, overwritten in place on every
/// re-ingest of the same business key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MasterAttrs {
    pub build_year: Option<i16>,
    pub is_new_construction: Option<bool>,
    pub has_passenger_lift: Option<bool>,
    pub has_cellar: Option<bool>,
    pub is_furnished: Option<bool>,
}

/// Effective timestamp of an incoming fact: first present among the source
/// change timestamp, the source start timestamp and the load wall-clock
/// time. Doubles as the new version's `valid_from`.
pub fn effective_valid_from(
    change: Option<DateTime<Utc>>,
    start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    change.or(start).unwrap_or(now)
}

pub mod parse {
    //! Pure tolerant parsers applied uniformly to every raw batch field.
    //!
    //! Every function maps malformed or out-of-range input to `None`
    //! ("unknown") rather than failing the row.

    use super::FloorBounds;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    const TRUTHY: &[&str] = &["true", "t", "1", "yes", "y", "oui"];
    const FALSY: &[&str] = &["false", "f", "0", "no", "n", "non"];

    /// Trimmed non-empty code, or `None` for blank input.
    pub fn trim_code(raw: &str) -> Option<&str> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// Canonical 5-character zip: keep an extractable run of up to five
    /// digits, left-padded with zeros. Anything else is unknown.
    pub fn normalize_zip(raw: &str) -> Option<String> {
        let digits: String = raw.trim().chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() || digits.len() > 5 {
            return None;
        }
        Some(format!("{digits:0>5}"))
    }

    /// Tri-state boolean over multilingual truthy/falsy token sets.
    pub fn parse_bool(raw: &str) -> Option<bool> {
        let token = raw.trim().to_ascii_lowercase();
        if TRUTHY.contains(&token.as_str()) {
            Some(true)
        } else if FALSY.contains(&token.as_str()) {
            Some(false)
        } else {
            None
        }
    }

    /// Build year as an integer in [1800, 2100], digits extracted from
    /// surrounding noise.
    pub fn parse_year(raw: &str) -> Option<i16> {
        let digits: String = raw.trim().chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() || digits.len() > 4 {
            return None;
        }
        let value: i32 = digits.parse().ok()?;
        if (1800..=2100).contains(&value) {
            Some(value as i16)
        } else {
            None
        }
    }

    /// Decimal token after stripping everything but digits, '.' and '-'.
    /// The surviving characters must still form a plain decimal literal.
    fn numeric_token(raw: &str) -> Option<f64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let kept: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        let body = kept.strip_prefix('-').unwrap_or(&kept);
        let mut parts = body.splitn(2, '.');
        let int_part = parts.next().unwrap_or("");
        let frac_part = parts.next();
        if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if let Some(frac) = frac_part {
            if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
        }
        kept.parse().ok()
    }

    /// Non-negative decimal attribute (price, area, ...).
    pub fn parse_nonneg_f64(raw: &str) -> Option<f64> {
        numeric_token(raw).filter(|v| *v >= 0.0)
    }

    /// Non-negative small count (rooms, balconies, terraces), rounded.
    pub fn parse_count(raw: &str) -> Option<i16> {
        let rounded = numeric_token(raw)?.round();
        if (0.0..=i16::MAX as f64).contains(&rounded) {
            Some(rounded as i16)
        } else {
            None
        }
    }

    /// Floor within configurable bounds, rounded.
    pub fn parse_floor(raw: &str, bounds: FloorBounds) -> Option<i16> {
        let rounded = numeric_token(raw)?.round();
        if rounded >= bounds.min as f64 && rounded <= bounds.max as f64 {
            Some(rounded as i16)
        } else {
            None
        }
    }

    /// Timestamp in RFC 3339 or the cleaner's `YYYY-MM-DD[ HH:MM:SS]` forms.
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(ts.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
            return Some(Utc.from_utc_datetime(&naive));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::parse::*;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn zip_pads_short_runs_and_rejects_garbage() {
        assert_eq!(normalize_zip("7501"), Some("07501".to_string()));
        assert_eq!(normalize_zip(" 75011 "), Some("75011".to_string()));
        assert_eq!(normalize_zip("CH-1204"), Some("01204".to_string()));
        assert_eq!(normalize_zip("ABCDE"), None);
        assert_eq!(normalize_zip("1234567"), None);
        assert_eq!(normalize_zip(""), None);
    }

    #[test]
    fn bool_tokens_are_multilingual_and_case_insensitive() {
        assert_eq!(parse_bool("OUI"), Some(true));
        assert_eq!(parse_bool("y"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("Non"), Some(false));
        assert_eq!(parse_bool("f"), Some(false));
        assert_eq!(parse_bool("peut-etre"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn year_is_bounded() {
        assert_eq!(parse_year("1999"), Some(1999));
        assert_eq!(parse_year("ca. 1850"), Some(1850));
        assert_eq!(parse_year("1750"), None);
        assert_eq!(parse_year("2150"), None);
        assert_eq!(parse_year("old"), None);
    }

    #[test]
    fn nonneg_decimal_degrades_to_unknown() {
        assert_eq!(parse_nonneg_f64("200000"), Some(200000.0));
        assert_eq!(parse_nonneg_f64(" 49.5 "), Some(49.5));
        assert_eq!(parse_nonneg_f64("-12"), None);
        assert_eq!(parse_nonneg_f64("n/a"), None);
        assert_eq!(parse_nonneg_f64("1.2.3"), None);
        assert_eq!(parse_nonneg_f64(""), None);
    }

    #[test]
    fn counts_round_and_stay_nonnegative() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("2.6"), Some(3));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("many"), None);
    }

    #[test]
    fn floor_respects_bounds() {
        let bounds = FloorBounds::default();
        assert_eq!(parse_floor("-3", bounds), Some(-3));
        assert_eq!(parse_floor("12", bounds), Some(12));
        assert_eq!(parse_floor("-9", bounds), None);
        assert_eq!(parse_floor("301", bounds), None);
        let tight = FloorBounds { min: 0, max: 10 };
        assert_eq!(parse_floor("-1", tight), None);
    }

    #[test]
    fn timestamps_accept_cleaner_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).single().unwrap();
        assert_eq!(parse_timestamp("2026-03-01T08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-01 08:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2026-03-01"),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single()
        );
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn effective_timestamp_prefers_change_then_start_then_now() {
        let change = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).single().unwrap();
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).single().unwrap();
        assert_eq!(effective_valid_from(Some(change), Some(start), now), change);
        assert_eq!(effective_valid_from(None, Some(start), now), start);
        assert_eq!(effective_valid_from(None, None, now), now);
    }

    #[test]
    fn fact_tuples_compare_null_aware() {
        let a = FactTuple {
            price: Some(200000.0),
            area: Some(50.0),
            ..FactTuple::default()
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.price = None;
        assert_ne!(a, b);
    }
}
