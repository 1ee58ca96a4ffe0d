use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Trimmed, non-empty string content of a JSON value
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => coerce_str(Some(s)).map(str::to_string),
        _ => None,
    }
}

pub fn coerce_str(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Finite number from a JSON number or numeric string
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

pub fn coerce_identifier(value: &Value) -> Option<String> {
    if let Some(text) = coerce_string(value) {
        return Some(text);
    }
    match value {
        Value::Number(n) if n.as_f64().is_some_and(f64::is_finite) => Some(n.to_string()),
        _ => None,
    }
}

/// First key holding a usable identifier
pub fn coerce_identifier_from_record(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(coerce_identifier)
}

pub fn format_full_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let first = coerce_str(first_name).unwrap_or("");
    let last = coerce_str(last_name).unwrap_or("");
    let combined = format!("{} {}", first, last).trim().to_string();

    if combined.is_empty() {
        "Unknown Player".to_string()
    } else {
        combined
    }
}

/// Add the missing colon to a trailing UTC offset (`+0000` -> `+00:00`,
/// `+00` -> `+00:00`). `timetz` columns are delivered in that shape.
pub fn normalize_time_offset(time: &str) -> String {
    if time.is_empty() || time.ends_with('Z') {
        return time.to_string();
    }

    let bytes = time.as_bytes();
    let n = bytes.len();
    let is_sign = |b: u8| b == b'+' || b == b'-';
    let all_digits = |slice: &[u8]| slice.iter().all(u8::is_ascii_digit);

    if n >= 5 && is_sign(bytes[n - 5]) && all_digits(&bytes[n - 4..]) {
        return format!("{}:{}", &time[..n - 2], &time[n - 2..]);
    }
    if n >= 3 && is_sign(bytes[n - 3]) && all_digits(&bytes[n - 2..]) {
        return format!("{}:00", time);
    }

    time.to_string()
}

fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = value.strip_suffix('Z').unwrap_or(value);
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }
    None
}

fn parse_loose(value: &str) -> Option<DateTime<Utc>> {
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%d %I:%M %p"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.and_utc());
        }
    }
    None
}

/// Combine a match date and a `timetz` string into an instant.
///
/// Tries, in order: ISO `dateTtime` with the offset normalized, the raw
/// `date time` pair, then the date alone at midnight UTC. Times without an
/// offset are read as UTC.
pub fn parse_date_time(date: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = coerce_str(date)?;

    if let Some(time) = coerce_str(time) {
        let normalized = normalize_time_offset(time);
        if let Some(parsed) = parse_iso(&format!("{}T{}", date, normalized)) {
            return Some(parsed);
        }
        if let Some(parsed) = parse_loose(&format!("{} {}", date, time)) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .or_else(|| parse_iso(date))
}

/// Short month/day label ("Oct 12"), "Recent" for undated matches
pub fn format_match_label(match_date: Option<DateTime<Utc>>) -> String {
    match match_date {
        Some(date) => date.format("%b %-d").to_string(),
        None => "Recent".to_string(),
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whole-number percentage, 0 when there is nothing to divide by
pub fn to_percentage(wins: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((wins as f64 / total as f64) * 100.0).round() as u32
}

pub fn to_average(sum: f64, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    round2(sum / count as f64)
}

/// "+1.5 pts" / "-2 pts"
pub fn format_signed(value: f64, suffix: &str) -> String {
    let rounded = round2(value);
    let prefix = if rounded > 0.0 { "+" } else { "" };
    format!("{}{}{}", prefix, rounded, suffix)
}

pub fn format_month_year(value: Option<&str>) -> Option<String> {
    parse_date_time(value, None).map(|d| d.format("%b %Y").to_string())
}

/// Tenure between two ISO dates ("1 yr 3 mos"); an open end runs to `today`.
pub fn format_duration(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> String {
    let Some(start_date) = parse_date_time(start, None) else {
        return "Tenure unknown".to_string();
    };
    let end_date = match coerce_str(end) {
        Some(end) => match parse_date_time(Some(end), None) {
            Some(parsed) => parsed.date_naive(),
            None => return "Tenure unknown".to_string(),
        },
        None => today,
    };
    let start_date = start_date.date_naive();

    let months = (end_date.year() * 12 + end_date.month0() as i32)
        - (start_date.year() * 12 + start_date.month0() as i32);
    let months = months.max(0);
    let years = months / 12;
    let remaining = months % 12;

    let mut parts = Vec::new();
    if years > 0 {
        parts.push(format!("{} yr{}", years, if years == 1 { "" } else { "s" }));
    }
    if remaining > 0 {
        parts.push(format!("{} mo{}", remaining, if remaining == 1 { "" } else { "s" }));
    }

    if parts.is_empty() {
        "Less than 1 mo".to_string()
    } else {
        parts.join(" ")
    }
}

/// `home_team_id` -> "Home Team Id"
pub fn format_table_column_label(column: &str) -> String {
    let spaced = column.replace('_', " ");
    let mut label = String::with_capacity(spaced.len());
    let mut at_boundary = true;
    for ch in spaced.chars() {
        if at_boundary && ch.is_alphanumeric() {
            label.extend(ch.to_uppercase());
        } else {
            label.push(ch);
        }
        at_boundary = !ch.is_alphanumeric();
    }
    label
}

pub fn format_table_cell_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => coerce_str(Some(s)).unwrap_or("-").to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| "-".to_string())
        }
    }
}

/// Hyphenated UUID, the only player id shape the database issues
pub fn is_valid_uuid(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() == 36 && Uuid::parse_str(trimmed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_normalize_time_offset() {
        assert_eq!(normalize_time_offset("16:00+0000"), "16:00+00:00");
        assert_eq!(normalize_time_offset("16:12:00+00"), "16:12:00+00:00");
        assert_eq!(normalize_time_offset("09:30:00-0530"), "09:30:00-05:30");
        assert_eq!(normalize_time_offset("16:00+00:00"), "16:00+00:00");
        assert_eq!(normalize_time_offset("16:00Z"), "16:00Z");
        assert_eq!(normalize_time_offset("16:00"), "16:00");
        assert_eq!(normalize_time_offset(""), "");
    }

    #[test]
    fn test_parse_date_time_colonless_offset_matches_colon_offset() {
        let a = parse_date_time(Some("2025-10-12"), Some("16:00+0000"));
        let b = parse_date_time(Some("2025-10-12"), Some("16:00+00:00"));
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(a, Some(Utc.with_ymd_and_hms(2025, 10, 12, 16, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_date_time_timetz_and_offsets() {
        assert_eq!(
            parse_date_time(Some("2025-10-12"), Some("16:12:00+00")),
            Some(Utc.with_ymd_and_hms(2025, 10, 12, 16, 12, 0).unwrap())
        );
        assert_eq!(
            parse_date_time(Some("2025-10-12"), Some("09:00:00-0700")),
            Some(Utc.with_ymd_and_hms(2025, 10, 12, 16, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date_time(Some("2025-10-12"), Some("18:30")),
            Some(Utc.with_ymd_and_hms(2025, 10, 12, 18, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_date_time_fallbacks() {
        // space-joined fallback
        assert_eq!(
            parse_date_time(Some("2025-10-12"), Some("4:15 PM")),
            Some(Utc.with_ymd_and_hms(2025, 10, 12, 16, 15, 0).unwrap())
        );
        // unusable time falls back to the date alone
        assert_eq!(
            parse_date_time(Some("2025-10-12"), Some("evening")),
            Some(Utc.with_ymd_and_hms(2025, 10, 12, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_date_time(Some("not a date"), Some("16:00")), None);
        assert_eq!(parse_date_time(None, Some("16:00+0000")), None);
        assert_eq!(parse_date_time(Some("  "), None), None);
    }

    #[test]
    fn test_format_match_label() {
        let date = Utc.with_ymd_and_hms(2025, 10, 2, 16, 0, 0).unwrap();
        assert_eq!(format_match_label(Some(date)), "Oct 2");
        assert_eq!(format_match_label(None), "Recent");
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(11)), Some(11.0));
        assert_eq!(coerce_number(&json!("9")), Some(9.0));
        assert_eq!(coerce_number(&json!(" 7.5 ")), Some(7.5));
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_coerce_identifier_from_record() {
        let record = json!({"team_id": null, "id": 7});
        let map = record.as_object().unwrap();
        assert_eq!(coerce_identifier_from_record(map, &["team_id", "id"]), Some("7".to_string()));

        let record = json!({"team_id": "  "});
        assert_eq!(coerce_identifier_from_record(record.as_object().unwrap(), &["team_id"]), None);
    }

    #[test]
    fn test_format_full_name() {
        assert_eq!(format_full_name(Some("Ava"), Some("Morales")), "Ava Morales");
        assert_eq!(format_full_name(Some(" Ava "), None), "Ava");
        assert_eq!(format_full_name(None, Some("  ")), "Unknown Player");
    }

    #[test]
    fn test_percentages_and_averages() {
        assert_eq!(to_percentage(2, 3), 67);
        assert_eq!(to_percentage(1, 2), 50);
        assert_eq!(to_percentage(0, 0), 0);
        assert_eq!(to_average(5.0, 3), 1.67);
        assert_eq!(to_average(-5.0, 3), -1.67);
        assert_eq!(to_average(4.0, 0), 0.0);
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed(1.456, " pts"), "+1.46 pts");
        assert_eq!(format_signed(-2.0, " pts"), "-2 pts");
        assert_eq!(format_signed(0.0, ""), "0");
    }

    #[test]
    fn test_format_duration() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 16).unwrap();
        assert_eq!(format_duration(Some("2024-07-01"), None, today), "1 yr 3 mos");
        assert_eq!(format_duration(Some("2025-09-20"), Some("2025-10-01"), today), "1 mo");
        assert_eq!(format_duration(Some("2025-10-01"), None, today), "Less than 1 mo");
        assert_eq!(format_duration(Some("2023-01-15"), Some("2025-01-15"), today), "2 yrs");
        assert_eq!(format_duration(None, None, today), "Tenure unknown");
        assert_eq!(format_duration(Some("2025-01-01"), Some("garbage"), today), "Tenure unknown");
    }

    #[test]
    fn test_format_month_year() {
        assert_eq!(format_month_year(Some("2024-03-18")), Some("Mar 2024".to_string()));
        assert_eq!(format_month_year(None), None);
    }

    #[test]
    fn test_table_formatting() {
        assert_eq!(format_table_column_label("home_team_id"), "Home Team Id");
        assert_eq!(format_table_cell_value(&json!(null)), "-");
        assert_eq!(format_table_cell_value(&json!("  ")), "-");
        assert_eq!(format_table_cell_value(&json!(false)), "false");
        assert_eq!(format_table_cell_value(&json!(11)), "11");
        assert_eq!(format_table_cell_value(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_is_valid_uuid() {
        assert!(is_valid_uuid("0b6f5c8e-3a52-4c1e-9d0a-6a8b2f3c4d5e"));
        assert!(is_valid_uuid(" 0B6F5C8E-3A52-4C1E-9D0A-6A8B2F3C4D5E "));
        assert!(!is_valid_uuid("0b6f5c8e3a524c1e9d0a6a8b2f3c4d5e"));
        assert!(!is_valid_uuid("player-12"));
    }
}
