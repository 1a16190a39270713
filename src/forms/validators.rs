//! Field-level validators shared by the forms

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{FormErrors, INVALID_CHOICE, REQUIRED};

/// Length limit for titles and names
pub const MAX_LENGTH: usize = 256;
/// Length limit for usernames and personal names
pub const NAME_MAX_LENGTH: usize = 150;
pub const SLUG_MAX_LENGTH: usize = 64;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex"));
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s.][^@\s]*$").expect("valid regex"));

/// Trimmed value of a mandatory text field
pub fn required(field: &str, value: &str, errors: &mut FormErrors) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value.to_string()
}

pub fn max_length(field: &str, value: &str, limit: usize, errors: &mut FormErrors) {
    let len = value.chars().count();
    if len > limit {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                limit, len
            ),
        );
    }
}

pub fn slug(field: &str, value: &str, errors: &mut FormErrors) {
    if !value.is_empty() && !SLUG_RE.is_match(value) {
        errors.add(
            field,
            "Enter a valid slug consisting of Latin letters, numbers, underscores or hyphens.",
        );
    }
}

pub fn username(field: &str, value: &str, errors: &mut FormErrors) {
    if !value.is_empty() && !USERNAME_RE.is_match(value) {
        errors.add(
            field,
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

/// Optional email: empty passes, anything else must look like `local@domain`
pub fn email(field: &str, value: &str, errors: &mut FormErrors) {
    if !value.is_empty() && !EMAIL_RE.is_match(value) {
        errors.add(field, "Enter a valid email address.");
    }
}

/// Parse a submitted date and time; naive values are taken as UTC.
///
/// Accepts what a `datetime-local` input sends (`2024-05-01T12:30`), the
/// same with a space or seconds, RFC 3339, and a bare date (midnight).
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Mandatory date/time field
pub fn datetime(field: &str, value: &str, errors: &mut FormErrors) -> Option<DateTime<Utc>> {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    let parsed = parse_datetime(value);
    if parsed.is_none() {
        errors.add(field, "Enter a valid date/time.");
    }
    parsed
}

/// Value of a `<select>` holding a primary key; empty means "no choice"
pub fn choice(field: &str, value: &str, errors: &mut FormErrors) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.add(field, INVALID_CHOICE);
            None
        }
    }
}

/// Format a timestamp for a `datetime-local` input
pub fn format_datetime_local(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_required_trims() {
        let mut errors = FormErrors::new();
        assert_eq!(required("title", "  Hello ", &mut errors), "Hello");
        assert!(errors.is_empty());

        required("title", "   ", &mut errors);
        assert_eq!(errors.get("title"), [REQUIRED.to_string()]);
    }

    #[test]
    fn test_max_length_counts_chars() {
        let mut errors = FormErrors::new();
        max_length("title", &"я".repeat(MAX_LENGTH), MAX_LENGTH, &mut errors);
        assert!(errors.is_empty());

        max_length("title", &"я".repeat(MAX_LENGTH + 1), MAX_LENGTH, &mut errors);
        assert!(errors.get("title")[0].contains("it has 257"));
    }

    #[test]
    fn test_slug_and_username() {
        let mut errors = FormErrors::new();
        slug("slug", "travel_2024-summer", &mut errors);
        username("username", "leo.t@home+1", &mut errors);
        username("username", "лев", &mut errors);
        assert!(errors.is_empty());

        slug("slug", "путешествия", &mut errors);
        slug("slug", "with space", &mut errors);
        username("username", "no spaces", &mut errors);
        assert_eq!(errors.get("slug").len(), 2);
        assert_eq!(errors.get("username").len(), 1);
    }

    #[test]
    fn test_email() {
        let mut errors = FormErrors::new();
        email("email", "", &mut errors);
        email("email", "leo@example.com", &mut errors);
        assert!(errors.is_empty());

        email("email", "leo", &mut errors);
        email("email", "leo@", &mut errors);
        email("email", "a b@example.com", &mut errors);
        assert_eq!(errors.get("email").len(), 3);
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-05-01T12:30"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01 12:30"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01 12:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01T15:30:00+03:00"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01").map(|d| d.hour()), Some(0));
        assert_eq!(parse_datetime("yesterday"), None);
        assert_eq!(format_datetime_local(&expected), "2024-05-01T12:30");
    }

    #[test]
    fn test_choice() {
        let mut errors = FormErrors::new();
        assert_eq!(choice("category", "", &mut errors), None);
        assert_eq!(choice("category", "7", &mut errors), Some(7));
        assert!(errors.is_empty());

        assert_eq!(choice("category", "seven", &mut errors), None);
        assert_eq!(choice("category", "-1", &mut errors), None);
        assert_eq!(errors.get("category").len(), 2);
    }
}
