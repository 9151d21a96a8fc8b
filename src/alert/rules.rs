//! Forecast classification rules.
//!
//! Rules are evaluated top to bottom for each forecast day. Tornado takes
//! priority over generic severe weather (a day that matches tornado never
//! also raises a severe-weather alert), while rain is checked independently.

use crate::model::{ForecastDay, Notification};

/// Emergency re-delivery interval for tornado alerts, in seconds.
pub const TORNADO_RETRY_SECS: u32 = 60;

/// Tornado alerts stop repeating after this many seconds.
pub const TORNADO_EXPIRE_SECS: u32 = 3600;

const SEVERE_KEYWORDS: &[&str] = &["thunderstorm", "severe"];
const RAIN_KEYWORDS: &[&str] = &["rain"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    HighTemp,
    Tornado,
    SevereWeather,
    Rain,
}

/// Evaluation order.
pub const RULES: &[AlertKind] = &[
    AlertKind::HighTemp,
    AlertKind::Tornado,
    AlertKind::SevereWeather,
    AlertKind::Rain,
];

impl AlertKind {
    /// Human-readable name used in debug log lines.
    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::HighTemp => "high temp",
            AlertKind::Tornado => "tornado",
            AlertKind::SevereWeather => "severe weather",
            AlertKind::Rain => "rain",
        }
    }

    /// A rule that is skipped whenever the returned rule matched the same day.
    pub fn yields_to(&self) -> Option<AlertKind> {
        match self {
            AlertKind::SevereWeather => Some(AlertKind::Tornado),
            _ => None,
        }
    }

    fn matches(&self, day: &ForecastDay, high_temp_threshold: f64) -> bool {
        match self {
            AlertKind::HighTemp => day.max_temp > high_temp_threshold,
            AlertKind::Tornado => day.condition.contains("tornado"),
            AlertKind::SevereWeather => contains_any(&day.condition, SEVERE_KEYWORDS),
            AlertKind::Rain => contains_any(&day.condition, RAIN_KEYWORDS),
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// A rule that matched a forecast day, with the alert it would send.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTrigger {
    pub kind: AlertKind,
    /// Condition half of the dedup key `"{date}-{condition}"`.
    pub dedup_condition: String,
    pub notification: Notification,
}

/// The configured rule set for one location.
#[derive(Debug, Clone)]
pub struct RuleSet {
    location_name: String,
    high_temp_threshold: f64,
}

impl RuleSet {
    pub fn new(location_name: impl Into<String>, high_temp_threshold: f64) -> Self {
        Self {
            location_name: location_name.into(),
            high_temp_threshold,
        }
    }

    /// Returns every rule that matches `day`, in evaluation order.
    pub fn classify_day(&self, day: &ForecastDay) -> Vec<AlertTrigger> {
        let mut matched: Vec<AlertKind> = Vec::new();
        for kind in RULES {
            if let Some(blocker) = kind.yields_to() {
                if matched.contains(&blocker) {
                    continue;
                }
            }
            if kind.matches(day, self.high_temp_threshold) {
                matched.push(*kind);
            }
        }

        matched.into_iter().map(|kind| self.trigger(kind, day)).collect()
    }

    fn trigger(&self, kind: AlertKind, day: &ForecastDay) -> AlertTrigger {
        let location = &self.location_name;
        let date = &day.date;
        let text = &day.condition;

        let (dedup_condition, notification) = match kind {
            AlertKind::HighTemp => (
                "high_temp".to_string(),
                Notification::normal(format!(
                    "Alert! The temperature in {} is forecasted to exceed {}°F on {}: High of {}°F",
                    location, self.high_temp_threshold, date, day.max_temp
                )),
            ),
            AlertKind::Tornado => (
                "tornado".to_string(),
                Notification::emergency(
                    format!("URGENT: Tornado Alert for {} on {}: {}", location, date, text),
                    TORNADO_RETRY_SECS,
                    TORNADO_EXPIRE_SECS,
                ),
            ),
            AlertKind::SevereWeather => (
                text.clone(),
                Notification::normal(format!(
                    "Severe Weather Alert for {} on {}: {}",
                    location, date, text
                )),
            ),
            AlertKind::Rain => (
                text.clone(),
                Notification::normal(format!("Rain Alert for {} on {}: {}", location, date, text)),
            ),
        };

        AlertTrigger {
            kind,
            dedup_condition,
            notification,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
