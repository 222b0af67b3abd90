use crate::models::line::{InputLine, LineSource};
use std::time::{Duration, Instant};

pub const SERIAL_KEYWORDS: &[&str] = &["ALERT", "SOS"];

/// Device lines match as sent; console lines match in any letter case.
pub fn is_trigger(line: &InputLine) -> bool {
    match line.source {
        LineSource::Serial => contains_keyword(&line.text),
        LineSource::Console => contains_keyword(&line.text.trim().to_uppercase()),
    }
}

fn contains_keyword(text: &str) -> bool {
    SERIAL_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

/// Optional gate against repeated triggers. With no window every trigger
/// passes.
#[derive(Debug, Default)]
pub struct Debouncer {
    window: Option<Duration>,
    last_admitted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Option<Duration>) -> Self {
        Self {
            window,
            last_admitted: None,
        }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        let Some(window) = self.window else {
            return true;
        };

        if let Some(last) = self.last_admitted {
            if now.saturating_duration_since(last) < window {
                return false;
            }
        }
        self.last_admitted = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_lines_match_case_sensitively() {
        assert!(is_trigger(&InputLine::serial("Arduino: ALERT low battery")));
        assert!(is_trigger(&InputLine::serial("{\"type\":\"SOS\"}")));
        assert!(!is_trigger(&InputLine::serial("sos")));
        assert!(!is_trigger(&InputLine::serial("Alert")));
        assert!(!is_trigger(&InputLine::serial("heartbeat 42")));
        assert!(!is_trigger(&InputLine::serial("")));
    }

    #[test]
    fn test_console_lines_match_any_case() {
        assert!(is_trigger(&InputLine::console("sos")));
        assert!(is_trigger(&InputLine::console("  Alert me  ")));
        assert!(is_trigger(&InputLine::console("SoS")));
        assert!(!is_trigger(&InputLine::console("help")));
        assert!(!is_trigger(&InputLine::console("s o s")));
    }

    #[test]
    fn test_keyword_inside_word_still_triggers() {
        assert!(is_trigger(&InputLine::serial("ALERTING")));
        assert!(is_trigger(&InputLine::console("sosa")));
    }

    #[test]
    fn test_no_window_admits_everything() {
        let mut debouncer = Debouncer::new(None);
        let now = Instant::now();
        assert!(debouncer.admit(now));
        assert!(debouncer.admit(now));
        assert!(debouncer.admit(now));
    }

    #[test]
    fn test_window_suppresses_rapid_repeats() {
        let mut debouncer = Debouncer::new(Some(Duration::from_secs(2)));
        let start = Instant::now();

        assert!(debouncer.admit(start));
        assert!(!debouncer.admit(start + Duration::from_millis(500)));
        assert!(!debouncer.admit(start + Duration::from_millis(1999)));
        assert!(debouncer.admit(start + Duration::from_secs(2)));
        // Window restarts from the last admitted trigger.
        assert!(!debouncer.admit(start + Duration::from_secs(3)));
        assert!(debouncer.admit(start + Duration::from_secs(4)));
    }
}
