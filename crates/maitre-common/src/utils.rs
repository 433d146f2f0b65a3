//! Common utility functions used across Maitre components

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;
use uuid::Uuid;

/// Generate a unique ID for various entities
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a short ID for display purposes (8 characters)
pub fn generate_short_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Get current UTC timestamp as milliseconds
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Resolve an IANA timezone name, falling back to UTC
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!(timezone = name, "Unknown timezone, falling back to UTC");
        Tz::UTC
    })
}

/// Current wall-clock time in the given timezone
pub fn now_in_timezone(timezone: &str) -> DateTime<Tz> {
    Utc::now().with_timezone(&parse_timezone(timezone))
}

/// Today's date in the given timezone
pub fn today_in_timezone(timezone: &str) -> NaiveDate {
    now_in_timezone(timezone).date_naive()
}

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Format a time as `HH:MM`
pub fn format_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Subtract minutes, wrapping around midnight
pub fn subtract_minutes(time: NaiveTime, minutes: u32) -> NaiveTime {
    let (result, _) = time.overflowing_sub_signed(Duration::minutes(minutes as i64));
    result
}

/// Absolute distance between two times of day, in minutes
pub fn minutes_between(a: NaiveTime, b: NaiveTime) -> i64 {
    (a - b).num_minutes().abs()
}

/// Edit distance between two strings, counted in characters
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Truncate string to the given number of characters, appending an ellipsis
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ids() {
        let id1 = generate_id();
        let id2 = generate_id();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
        assert_eq!(generate_short_id().len(), 8);
    }

    #[test]
    fn test_parse_and_format_time() {
        let t = parse_time("19:30").unwrap();
        assert_eq!(format_time(t), "19:30");
        assert_eq!(format_time(parse_time("07:05:00").unwrap()), "07:05");
        assert!(parse_time("seven").is_none());
    }

    #[test]
    fn test_subtract_minutes_wraps_midnight() {
        let t = parse_time("01:00").unwrap();
        assert_eq!(format_time(subtract_minutes(t, 120)), "23:00");
    }

    #[test]
    fn test_minutes_between() {
        let a = parse_time("19:00").unwrap();
        let b = parse_time("18:45").unwrap();
        assert_eq!(minutes_between(a, b), 15);
        assert_eq!(minutes_between(b, a), 15);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("anna", "ana"), 1);
        assert_eq!(levenshtein("Иван", "Иванн"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        assert_eq!(parse_timezone("Mars/Olympus"), Tz::UTC);
        assert_eq!(parse_timezone("Europe/Belgrade"), Tz::Europe__Belgrade);
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 1), "...");
    }
}
