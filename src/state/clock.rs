use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// Wall-clock source for session stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Cloned handles share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Tracks the current session start and renders elapsed-time stamps.
pub struct SessionClock {
    source: Arc<dyn Clock>,
    start: Option<DateTime<Utc>>,
}

impl SessionClock {
    pub fn new(source: Arc<dyn Clock>) -> Self {
        Self {
            source,
            start: None,
        }
    }

    pub fn start(&mut self, at: Option<DateTime<Utc>>) {
        self.start = Some(at.unwrap_or_else(|| self.source.now()));
    }

    pub fn clear(&mut self) {
        self.start = None;
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.source.now()
    }

    /// Seconds since session start with two decimals; `"0.00"` when no
    /// session is running or the start lies in the future.
    pub fn elapsed(&self) -> String {
        let Some(start) = self.start else {
            return "0.00".to_string();
        };
        let millis = (self.source.now() - start).num_milliseconds().max(0);
        format!("{:.2}", millis as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn fixed_clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_elapsed_is_zero_without_session() {
        let clock = SessionClock::new(Arc::new(fixed_clock()));
        assert_eq!(clock.elapsed(), "0.00");
        assert_eq!(clock.start_time(), None);
    }

    #[test]
    fn test_elapsed_formats_two_decimals() {
        let source = fixed_clock();
        let mut clock = SessionClock::new(Arc::new(source.clone()));
        clock.start(None);
        source.advance(Duration::milliseconds(1234));
        assert_eq!(clock.elapsed(), "1.23");
        source.advance(Duration::seconds(60));
        assert_eq!(clock.elapsed(), "61.23");
    }

    #[test]
    fn test_future_start_clamps_to_zero() {
        let source = fixed_clock();
        let mut clock = SessionClock::new(Arc::new(source.clone()));
        clock.start(Some(source.now() + Duration::seconds(5)));
        assert_eq!(clock.elapsed(), "0.00");
        clock.clear();
        assert_eq!(clock.start_time(), None);
    }
}
