/// Alert deduplication: cooldown window and condition-change detection.
///
/// A (date, condition) pair alerts at most once per cooldown window, unless
/// the weather description for that date changed since it was last seen.
///
/// # Clock injection
/// Functions that depend on the current time take `now` explicitly instead of
/// calling `Local::now()` internally, so tests are deterministic without
/// mocking or time manipulation.

use chrono::{Duration, NaiveDateTime};

use crate::alert::log_store::{AlertLog, AlertLogStore};
use crate::logging::DebugLog;
use crate::model::AlertLogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPolicy {
    cooldown: Duration,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self::new(24)
    }
}

impl DedupPolicy {
    /// A cooldown too large to represent saturates to `Duration::MAX`,
    /// which suppresses every repeat.
    pub fn new(cooldown_hours: i64) -> Self {
        Self {
            cooldown: Duration::try_hours(cooldown_hours).unwrap_or(Duration::MAX),
        }
    }

    /// Returns `true` if an alert for `condition` on `date` may fire at `now`.
    ///
    /// Suppression is strictly less than the cooldown:
    ///   elapsed <  cooldown  →  suppress
    ///   elapsed == cooldown  →  alert
    ///
    /// The window runs from the last alert's wall-clock time, not from the
    /// forecast date. A last-alert time in the future (clock skew) suppresses.
    pub fn should_alert_at(
        &self,
        log: &AlertLog,
        date: &str,
        condition: &str,
        now: NaiveDateTime,
        debug: &DebugLog,
    ) -> bool {
        let Some(last) = log.last_alerted(date, condition) else {
            return true;
        };

        if now - last < self.cooldown {
            debug.debug(&format!(
                "Alert skipped for {} on {}: Last alert time was {}",
                condition, date, last
            ));
            return false;
        }
        true
    }

    /// Returns `true` if `new_condition` differs from the description last
    /// recorded for `date`, including when nothing was recorded yet.
    ///
    /// On change the new value is stored and the log persisted immediately.
    pub fn has_condition_changed(
        &self,
        log: &mut AlertLog,
        store: &AlertLogStore,
        date: &str,
        new_condition: &str,
        debug: &DebugLog,
    ) -> Result<bool, AlertLogError> {
        if log.last_condition(date) == Some(new_condition) {
            return Ok(false);
        }

        log.set_last_condition(date, new_condition);
        store.save(log)?;
        debug.debug(&format!("Condition changed for {}: {}", date, new_condition));
        Ok(true)
    }

    /// Stamps `now` as the last alert time for (date, condition) and persists.
    pub fn record_alert_at(
        &self,
        log: &mut AlertLog,
        store: &AlertLogStore,
        date: &str,
        condition: &str,
        now: NaiveDateTime,
    ) -> Result<(), AlertLogError> {
        log.set_alerted(date, condition, now);
        store.save(log)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
