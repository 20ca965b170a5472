//! Parsed session data shared by every detector

use chrono::{DateTime, Utc};
use std::time::Duration;

/// One transcript message with its text already extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Everything partio keeps from an agent session transcript
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub session_id: String,
    pub agent: String,
    /// First human message
    pub prompt: String,
    pub transcript: Vec<Message>,
    /// Short human-readable summary
    pub context: String,
    pub total_tokens: u64,
    pub duration: Duration,
    pub plan_slug: Option<String>,
}

/// Render a duration the way `1h2m3s` style tools print it
///
/// Zero is `0s`, sub-minute values keep up to three fractional digits
/// (`1.5s`), and leading zero units are dropped (`2m0s`, `1h0m5s`).
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }

    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1_000) % 60;
    let frac = millis % 1_000;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if frac == 0 {
        out.push_str(&format!("{seconds}s"));
    } else {
        let frac = format!("{frac:03}");
        out.push_str(&format!("{seconds}.{}s", frac.trim_end_matches('0')));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m0s");
        assert_eq!(format_duration(Duration::from_secs(3_605)), "1h0m5s");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(61_250)), "1m1.25s");
    }
}
