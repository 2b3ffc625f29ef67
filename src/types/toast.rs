//! Toast notifications surfaced to the user

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// How long a toast stays visible unless overridden
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(4000);

/// Visual severity of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Transient, time-boxed notification. Never persisted.
///
/// Serializes as `{"message": ..., "type": ..., "duration": <ms>}`, the payload
/// shape the toast renderer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    #[serde(with = "duration_ms", default = "default_duration")]
    pub duration: Duration,
}

fn default_duration() -> Duration {
    DEFAULT_TOAST_DURATION
}

impl Toast {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            duration: DEFAULT_TOAST_DURATION,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether a toast shown at `shown_at` has expired by `now`
    pub fn is_expired(&self, shown_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(shown_at) >= self.duration
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_wire_shape() {
        let toast = Toast::success("Budget approved").with_duration(Duration::from_millis(2500));
        let json = serde_json::to_value(&toast).unwrap();
        assert_eq!(json["message"], "Budget approved");
        assert_eq!(json["type"], "success");
        assert_eq!(json["duration"], 2500);
    }

    #[test]
    fn test_toast_expiry() {
        let toast = Toast::info("hello");
        let shown = Instant::now();
        assert!(!toast.is_expired(shown, shown));
        assert!(toast.is_expired(shown, shown + DEFAULT_TOAST_DURATION));
    }
}
