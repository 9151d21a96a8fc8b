//! One forecast check: fetch, classify, deduplicate, notify.
//!
//! A run is a single linear pass over the forecast days. The only state
//! carried between days (and between runs) is the alert log, which is
//! persisted after every mutation.

use chrono::NaiveDateTime;
use std::fmt;

use crate::alert::dedup::DedupPolicy;
use crate::alert::log_store::{AlertLog, AlertLogStore};
use crate::alert::rules::{AlertTrigger, RuleSet};
use crate::config::Config;
use crate::ingest::weatherbit::ForecastSource;
use crate::logging::DebugLog;
use crate::model::{AlertLogError, ForecastDay, ForecastError, Notification};
use crate::notify::pushover::Notifier;

pub const COMPLETION_MESSAGE: &str = "Weather forecast check complete.";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub days_processed: usize,
    pub alerts_sent: usize,
    pub alerts_suppressed: usize,
    /// Alerts that fired but whose delivery reported an error.
    pub send_failures: usize,
}

#[derive(Debug, PartialEq)]
pub enum RunError {
    /// The forecast could not be fetched or decoded; no alerts were evaluated.
    Forecast(ForecastError),
    /// The alert log could not be loaded or saved.
    AlertLog(AlertLogError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Forecast(e) => write!(f, "{}", e),
            RunError::AlertLog(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RunError {}

impl From<AlertLogError> for RunError {
    fn from(e: AlertLogError) -> Self {
        RunError::AlertLog(e)
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor<'a> {
    rules: RuleSet,
    policy: DedupPolicy,
    store: AlertLogStore,
    notifier: &'a dyn Notifier,
    debug: &'a DebugLog,
}

impl<'a> Monitor<'a> {
    pub fn new(config: &Config, notifier: &'a dyn Notifier, debug: &'a DebugLog) -> Self {
        Self {
            rules: RuleSet::new(&config.location_name, config.alerts.high_temp_threshold_f),
            policy: DedupPolicy::new(config.alerts.cooldown_hours),
            store: AlertLogStore::new(&config.files.alert_log),
            notifier,
            debug,
        }
    }

    /// Performs one complete check as of `now`.
    ///
    /// The alert log is loaded before the forecast is fetched, so a corrupt
    /// log stops the run before anything is sent. A fetch or parse failure
    /// is reported by notification and debug line, and no day is evaluated.
    pub fn run_check_at(
        &self,
        source: &dyn ForecastSource,
        now: NaiveDateTime,
    ) -> Result<RunSummary, RunError> {
        let mut log = self.store.load()?;

        let days = match source.fetch_forecast() {
            Ok(days) => days,
            Err(e) => {
                let message = e.to_string();
                self.deliver(&Notification::normal(message.clone()), "error");
                self.debug.error(&message);
                return Err(RunError::Forecast(e));
            }
        };

        let summary = self.evaluate_at(&mut log, &days, now)?;

        self.debug.info(COMPLETION_MESSAGE);
        Ok(summary)
    }

    /// Applies every rule to every day, in the order received.
    pub fn evaluate_at(
        &self,
        log: &mut AlertLog,
        days: &[ForecastDay],
        now: NaiveDateTime,
    ) -> Result<RunSummary, AlertLogError> {
        let mut summary = RunSummary::default();

        for day in days {
            self.debug.debug(&format!(
                "Processing forecast for {}: {} with max temp {}°F",
                day.date, day.condition, day.max_temp
            ));

            let changed =
                self.policy
                    .has_condition_changed(log, &self.store, &day.date, &day.condition, self.debug)?;

            // Decide every rule against the log as it stood before this day's
            // alerts are stamped, so rules sharing a key stay independent.
            let before: &AlertLog = log;
            let firing: Vec<AlertTrigger> = self
                .rules
                .classify_day(day)
                .into_iter()
                .filter(|t| {
                    let fire = self.policy.should_alert_at(
                        before,
                        &day.date,
                        &t.dedup_condition,
                        now,
                        self.debug,
                    ) || changed;
                    if !fire {
                        summary.alerts_suppressed += 1;
                    }
                    fire
                })
                .collect();

            for trigger in firing {
                let label = trigger.kind.label();
                let message = &trigger.notification.message;
                if self.deliver(&trigger.notification, label) {
                    summary.alerts_sent += 1;
                    self.debug.debug(&format!("Sent {} alert: {}", label, message));
                } else {
                    summary.send_failures += 1;
                    self.debug
                        .debug(&format!("Recorded {} alert (delivery failed): {}", label, message));
                }
                // Stamped whether or not delivery succeeded.
                self.policy
                    .record_alert_at(log, &self.store, &day.date, &trigger.dedup_condition, now)?;
            }

            summary.days_processed += 1;
        }

        Ok(summary)
    }

    /// Sends without escalating: a failure is logged and reported as `false`.
    fn deliver(&self, notification: &Notification, label: &str) -> bool {
        match self.notifier.send(notification) {
            Ok(()) => true,
            Err(e) => {
                self.debug.warn(&format!("Failed to send {} notification: {}", label, e));
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::notify::pushover::NotifyError;
    use chrono::{Duration, NaiveDate};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<Notification>>,
        fail: bool,
    }

    impl Notifier for Recorder {
        fn send(&self, n: &Notification) -> Result<(), NotifyError> {
            self.sent.borrow_mut().push(n.clone());
            if self.fail {
                Err(NotifyError::Rejected(500))
            } else {
                Ok(())
            }
        }
    }

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn config_in(dir: &tempfile::TempDir) -> Config {
        let mut config = parse_config(
            r#"
                location_name = "Peoria, IL"
                [forecast]
                api_key = "k"
                [pushover]
                api_token = "t"
                user_key = "u"
            "#,
        )
        .unwrap();
        config.files.alert_log = dir.path().join("weather_alert_log.json");
        config
    }

    fn day(date: &str, max_temp: f64, condition: &str) -> ForecastDay {
        ForecastDay {
            date: date.to_string(),
            max_temp,
            condition: condition.to_string(),
        }
    }

    #[test]
    fn test_quiet_forecast_sends_nothing_but_records_condition() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let recorder = Recorder::default();
        let debug = DebugLog::disabled();
        let monitor = Monitor::new(&config, &recorder, &debug);
        let mut log = AlertLog::new();

        let summary = monitor
            .evaluate_at(&mut log, &[day("2024-07-01", 72.0, "clear sky")], fixed_now())
            .unwrap();

        assert_eq!(summary.days_processed, 1);
        assert_eq!(summary.alerts_sent, 0);
        assert!(recorder.sent.borrow().is_empty());
        assert_eq!(log.last_condition("2024-07-01"), Some("clear sky"));
    }

    #[test]
    fn test_shared_key_still_fires_both_after_cooldown_expiry() {
        // Severe and rain share the full-text key; a cooled-down key with an
        // unchanged description must still raise both alerts.
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let recorder = Recorder::default();
        let debug = DebugLog::disabled();
        let monitor = Monitor::new(&config, &recorder, &debug);

        let text = "severe thunderstorms and rain";
        let mut log = AlertLog::new();
        log.set_last_condition("2024-07-02", text);
        log.set_alerted("2024-07-02", text, fixed_now() - Duration::hours(25));

        let summary = monitor
            .evaluate_at(&mut log, &[day("2024-07-02", 80.0, text)], fixed_now())
            .unwrap();

        assert_eq!(summary.alerts_sent, 2);
        assert_eq!(log.last_alerted("2024-07-02", text), Some(fixed_now()));
    }

    #[test]
    fn test_send_failure_is_counted_and_still_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let debug_path = dir.path().join("debug_log.txt");
        let debug = DebugLog::file_only(&debug_path);
        let monitor = Monitor::new(&config, &recorder, &debug);
        let mut log = AlertLog::new();

        let summary = monitor
            .evaluate_at(&mut log, &[day("2024-07-01", 99.0, "sunny")], fixed_now())
            .unwrap();

        assert_eq!(summary.alerts_sent, 0);
        assert_eq!(summary.send_failures, 1);
        assert_eq!(log.last_alerted("2024-07-01", "high_temp"), Some(fixed_now()));

        let text = std::fs::read_to_string(&debug_path).unwrap();
        assert!(text.contains("Failed to send high temp notification"), "got {}", text);
        assert!(text.contains("Recorded high temp alert (delivery failed): Alert!"), "got {}", text);
        assert!(!text.contains("Sent high temp alert"), "got {}", text);
    }

    #[test]
    fn test_successful_delivery_logs_sent_line() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let recorder = Recorder::default();
        let debug_path = dir.path().join("debug_log.txt");
        let debug = DebugLog::file_only(&debug_path);
        let monitor = Monitor::new(&config, &recorder, &debug);

        monitor
            .evaluate_at(&mut AlertLog::new(), &[day("2024-07-01", 99.0, "sunny")], fixed_now())
            .unwrap();

        let text = std::fs::read_to_string(&debug_path).unwrap();
        assert!(text.contains("Sent high temp alert: Alert!"), "got {}", text);
        assert!(!text.contains("delivery failed"), "got {}", text);
    }

    #[test]
    fn test_days_are_evaluated_in_received_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let recorder = Recorder::default();
        let debug = DebugLog::disabled();
        let monitor = Monitor::new(&config, &recorder, &debug);
        let mut log = AlertLog::new();

        monitor
            .evaluate_at(
                &mut log,
                &[
                    day("2024-07-03", 92.0, "sunny"),
                    day("2024-07-01", 93.0, "sunny"),
                ],
                fixed_now(),
            )
            .unwrap();

        let sent = recorder.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].message.contains("2024-07-03"));
        assert!(sent[1].message.contains("2024-07-01"));
    }
}
