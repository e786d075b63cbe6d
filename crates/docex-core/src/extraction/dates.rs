//! Normalization of model-reported dates to calendar dates.
//!
//! Month/year-only values resolve by role: an expiry date becomes the last
//! day of that month, an activation date the first day.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATE_YMD: Regex = Regex::new(
        r"^(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})(?:[T\s].*)?$"
    ).unwrap();

    static ref DATE_DMY: Regex = Regex::new(
        r"^(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})$"
    ).unwrap();

    static ref DATE_D_MONTH_Y: Regex = Regex::new(
        r"(?i)^(\d{1,2})(?:st|nd|rd|th)?[\s\-]+([a-z]+)\.?,?[\s\-]+(\d{4}|\d{2})$"
    ).unwrap();

    static ref DATE_MONTH_D_Y: Regex = Regex::new(
        r"(?i)^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$"
    ).unwrap();

    static ref DATE_MY: Regex = Regex::new(
        r"^(\d{1,2})[./\-](\d{4}|\d{2})$"
    ).unwrap();

    static ref DATE_YM: Regex = Regex::new(
        r"^(\d{4})[./\-](\d{1,2})$"
    ).unwrap();

    static ref DATE_MONTH_Y: Regex = Regex::new(
        r"(?i)^([a-z]+)\.?,?\s+(\d{4}|\d{2})$"
    ).unwrap();
}

/// Which dedicated date field a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRole {
    Expiry,
    Activation,
}

/// Parse a date string in any of the common layouts.
///
/// Numeric dates are read day-first unless the first number cannot be a
/// day-of-month reading and the second can (`12/31/2025`).
pub fn normalize_date(raw: &str, role: DateRole) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() || matches!(text.to_lowercase().as_str(), "null" | "none" | "n/a" | "unknown") {
        return None;
    }

    if let Some(caps) = DATE_YMD.captures(text) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
    }

    if let Some(caps) = DATE_DMY.captures(text) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3]);
        let (day, month) = if second > 12 && first <= 12 {
            (second, first)
        } else {
            (first, second)
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DATE_D_MONTH_Y.captures(text) {
        let month = month_from_name(&caps[2])?;
        return NaiveDate::from_ymd_opt(parse_year(&caps[3]), month, caps[1].parse().ok()?);
    }

    if let Some(caps) = DATE_MONTH_D_Y.captures(text) {
        let month = month_from_name(&caps[1])?;
        return NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[2].parse().ok()?);
    }

    if let Some(caps) = DATE_MY.captures(text) {
        return month_only(parse_year(&caps[2]), caps[1].parse().ok()?, role);
    }

    if let Some(caps) = DATE_YM.captures(text) {
        return month_only(caps[1].parse().ok()?, caps[2].parse().ok()?, role);
    }

    if let Some(caps) = DATE_MONTH_Y.captures(text) {
        let month = month_from_name(&caps[1])?;
        return month_only(parse_year(&caps[2]), month, role);
    }

    None
}

/// Resolve a month/year-only date for the given role.
pub fn month_only(year: i32, month: u32, role: DateRole) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    match role {
        DateRole::Activation => Some(first),
        DateRole::Expiry => {
            let next = if first.month() == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)?
            };
            next.pred_opt()
        }
    }
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Document validity dates: two-digit years are always 20xx
        2000 + year
    } else {
        year
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_iso_passthrough() {
        assert_eq!(normalize_date("2025-12-31", DateRole::Expiry), ymd(2025, 12, 31));
        assert_eq!(normalize_date(" 2024/02/29 ", DateRole::Activation), ymd(2024, 2, 29));
        assert_eq!(normalize_date("2024-01-15T00:00:00Z", DateRole::Activation), ymd(2024, 1, 15));
    }

    #[test]
    fn test_day_first_numeric() {
        assert_eq!(normalize_date("15.01.2024", DateRole::Activation), ymd(2024, 1, 15));
        assert_eq!(normalize_date("03/04/2026", DateRole::Expiry), ymd(2026, 4, 3));
        assert_eq!(normalize_date("12/31/2025", DateRole::Expiry), ymd(2025, 12, 31));
        assert_eq!(normalize_date("15-01-24", DateRole::Activation), ymd(2024, 1, 15));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(normalize_date("15 January 2025", DateRole::Activation), ymd(2025, 1, 15));
        assert_eq!(normalize_date("15-Jan-2025", DateRole::Activation), ymd(2025, 1, 15));
        assert_eq!(normalize_date("March 3rd, 2027", DateRole::Expiry), ymd(2027, 3, 3));
    }

    #[test]
    fn test_month_year_expiry_is_last_day() {
        assert_eq!(normalize_date("12/2025", DateRole::Expiry), ymd(2025, 12, 31));
        assert_eq!(normalize_date("09/28", DateRole::Expiry), ymd(2028, 9, 30));
        assert_eq!(normalize_date("02/2024", DateRole::Expiry), ymd(2024, 2, 29));
        assert_eq!(normalize_date("2025-11", DateRole::Expiry), ymd(2025, 11, 30));
        assert_eq!(normalize_date("December 2025", DateRole::Expiry), ymd(2025, 12, 31));
    }

    #[test]
    fn test_month_year_activation_is_first_day() {
        assert_eq!(normalize_date("09/28", DateRole::Activation), ymd(2028, 9, 1));
        assert_eq!(normalize_date("Sept 2023", DateRole::Activation), ymd(2023, 9, 1));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(normalize_date("", DateRole::Expiry), None);
        assert_eq!(normalize_date("null", DateRole::Expiry), None);
        assert_eq!(normalize_date("N/A", DateRole::Expiry), None);
        assert_eq!(normalize_date("soon", DateRole::Expiry), None);
        assert_eq!(normalize_date("2025-13-01", DateRole::Expiry), None);
        assert_eq!(normalize_date("13/2025", DateRole::Expiry), None);
    }
}
