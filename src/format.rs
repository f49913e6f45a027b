//! Display formatting for money, percentages and dates.
//!
//! Missing values render as an em dash so "not extracted" never reads as zero.

use chrono::{DateTime, NaiveDate};

/// Placeholder for values that are absent.
pub const MISSING: &str = "—";

/// Format as whole US dollars, e.g. `$3,150,000`.
pub fn format_currency(value: Option<f64>) -> String {
    let Some(value) = value else {
        return MISSING.to_string();
    };

    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(rounded.abs() as u64))
}

/// Format a fraction as a percentage with one decimal, e.g. `0.05` as `5.0%`.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.1}%", value * 100.0),
        None => MISSING.to_string(),
    }
}

/// Format an ISO-8601 timestamp as `Jan 5, 2024`.
///
/// Unparseable input is shown as given.
pub fn format_date(value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return MISSING.to_string();
    };

    let date = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.date())
        })
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"));

    match date {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => value.to_string(),
    }
}

/// Format an optional count or year.
pub fn format_number<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Format optional text.
pub fn format_text(value: Option<&str>) -> String {
    value.map_or_else(|| MISSING.to_string(), str::to_string)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}
