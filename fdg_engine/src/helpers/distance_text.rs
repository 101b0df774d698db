//! Tolerant parsers for the free-text distance and duration strings returned by the distance service.
//!
//! Neither parser ever fails. Anything that cannot be understood evaluates to zero.
use std::sync::OnceLock;

use regex::{Captures, Regex};

// Group 1 is a number with thousands separators ("1,204.5"), group 2 a plain one whose decimal mark may be a comma
// ("12,4"). A comma only separates thousands when exactly three digits follow it.
const NUMBER: &str = r"(?:(\d{1,3}(?:,\d{3})+(?:\.\d+)?)|(\d+(?:[.,]\d+)?))";
const UNIT: &str = r"(kilometres?|kilometers?|km|metres?|meters?|miles?|mi|m)";

fn distance_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"(?i)\b{NUMBER}\s*{UNIT}\b")).ok()).as_ref()
}

fn bare_number_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^\s*{NUMBER}\s*$")).ok()).as_ref()
}

fn duration_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*(days?|hours?|hrs?|h|minutes?|mins?|m)\b").ok()).as_ref()
}

const KM_PER_MILE: f64 = 1.609_344;

/// Parses a distance string such as `"12.4 km"`, `"850 m"` or `"3.1 mi"` into kilometres.
///
/// The first number followed by a unit wins, so `"Route 66, 12 km"` is 12 km. Text that is only a number is taken to
/// be kilometres.
pub fn parse_distance_km(text: &str) -> f64 {
    let (value, unit) = if let Some(caps) = distance_regex().and_then(|re| re.captures(text)) {
        (number_value(&caps), caps.get(3).map(|m| m.as_str().to_ascii_lowercase()))
    } else if let Some(caps) = bare_number_regex().and_then(|re| re.captures(text)) {
        (number_value(&caps), None)
    } else {
        return 0.0;
    };
    let value = value.unwrap_or(0.0);
    if !value.is_finite() || value < 0.0 {
        return 0.0;
    }
    match unit.unwrap_or_default().as_str() {
        "m" | "meter" | "meters" | "metre" | "metres" => value / 1000.0,
        "mi" | "mile" | "miles" => value * KM_PER_MILE,
        _ => value,
    }
}

fn number_value(caps: &Captures<'_>) -> Option<f64> {
    if let Some(grouped) = caps.get(1) {
        return grouped.as_str().replace(',', "").parse().ok();
    }
    caps.get(2)?.as_str().replace(',', ".").parse().ok()
}

/// Parses a travel-time string such as `"1 hour 5 mins"` or `"25 mins"` into whole minutes.
pub fn parse_duration_minutes(text: &str) -> i64 {
    let Some(re) = duration_regex() else {
        return 0;
    };
    re.captures_iter(text)
        .filter_map(|caps| {
            let n = caps.get(1)?.as_str().parse::<i64>().ok()?;
            let unit = caps.get(2)?.as_str().to_ascii_lowercase();
            let factor = match unit.chars().next()? {
                'd' => 24 * 60,
                'h' => 60,
                _ => 1,
            };
            n.checked_mul(factor)
        })
        .fold(0i64, |acc, m| acc.saturating_add(m))
}
