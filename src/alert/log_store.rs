//! Persisted alert log.
//!
//! On disk the log is a flat JSON object of string keys to string values,
//! rewritten wholesale on every mutation. Two key shapes share the file:
//!
//! - `"{date}-{condition}"` → ISO-8601 local timestamp of the last alert
//! - `"{date}-last_condition"` → the last observed weather description
//!
//! In memory each value is a `LogEntry` tagged by its key shape, so a
//! timestamp is parsed exactly once, at load time.

use chrono::{DateTime, NaiveDateTime};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::AlertLogError;

/// Key suffix marking a "last seen condition" entry.
pub const LAST_CONDITION_SUFFIX: &str = "last_condition";

/// Timestamp layout written to the log, e.g. `2024-07-01T06:00:00.000000`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

// ---------------------------------------------------------------------------
// In-memory log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// When an alert for this (date, condition) last fired.
    AlertedAt(NaiveDateTime),
    /// The weather description last observed for this date.
    LastCondition(String),
}

/// Dedup state for every (date, condition) pair seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertLog {
    entries: BTreeMap<String, LogEntry>,
}

pub fn alert_key(date: &str, condition: &str) -> String {
    format!("{}-{}", date, condition)
}

pub fn last_condition_key(date: &str) -> String {
    alert_key(date, LAST_CONDITION_SUFFIX)
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_alerted(&self, date: &str, condition: &str) -> Option<NaiveDateTime> {
        match self.entries.get(&alert_key(date, condition)) {
            Some(LogEntry::AlertedAt(at)) => Some(*at),
            _ => None,
        }
    }

    pub fn last_condition(&self, date: &str) -> Option<&str> {
        match self.entries.get(&last_condition_key(date)) {
            Some(LogEntry::LastCondition(c)) => Some(c.as_str()),
            _ => None,
        }
    }

    pub fn set_alerted(&mut self, date: &str, condition: &str, at: NaiveDateTime) {
        self.entries
            .insert(alert_key(date, condition), LogEntry::AlertedAt(at));
    }

    pub fn set_last_condition(&mut self, date: &str, condition: &str) {
        self.entries.insert(
            last_condition_key(date),
            LogEntry::LastCondition(condition.to_string()),
        );
    }

    /// Flattens the log into its on-disk string mapping.
    pub fn to_raw(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    LogEntry::AlertedAt(at) => at.format(TIMESTAMP_FORMAT).to_string(),
                    LogEntry::LastCondition(c) => c.clone(),
                };
                (k.clone(), value)
            })
            .collect()
    }

    /// Rebuilds the log from its on-disk string mapping.
    ///
    /// Returns the offending key and value if a timestamp entry does not parse.
    pub fn from_raw(raw: BTreeMap<String, String>) -> Result<Self, String> {
        let mut entries = BTreeMap::new();
        for (key, value) in raw {
            let entry = if key.ends_with(&format!("-{}", LAST_CONDITION_SUFFIX)) {
                LogEntry::LastCondition(value)
            } else {
                match parse_timestamp(&value) {
                    Some(at) => LogEntry::AlertedAt(at),
                    None => {
                        return Err(format!("entry {:?} has unparseable timestamp {:?}", key, value));
                    }
                }
            };
            entries.insert(key, entry);
        }
        Ok(Self { entries })
    }
}

/// Parses a stored alert timestamp.
///
/// Accepts naive ISO-8601 with or without fractional seconds, and RFC 3339
/// with an offset (converted to its local wall-clock reading).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    s.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Reads and writes the alert log file.
#[derive(Debug, Clone)]
pub struct AlertLogStore {
    path: PathBuf,
}

impl AlertLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the log, or an empty log if the file does not exist.
    ///
    /// A file that exists but does not decode is an error: resetting it
    /// would drop all dedup state and re-send every recent alert.
    pub fn load(&self) -> Result<AlertLog, AlertLogError> {
        if !self.path.exists() {
            return Ok(AlertLog::new());
        }

        let text = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let raw: BTreeMap<String, String> =
            serde_json::from_str(&text).map_err(|e| self.corrupt(e.to_string()))?;
        AlertLog::from_raw(raw).map_err(|reason| self.corrupt(reason))
    }

    /// Overwrites the file with the full log.
    ///
    /// Writes to a sibling temp file and renames it over the target, so a
    /// crash mid-write leaves the previous log intact.
    pub fn save(&self, log: &AlertLog) -> Result<(), AlertLogError> {
        let json = serde_json::to_string(&log.to_raw())
            .map_err(|e| self.corrupt(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn corrupt(&self, reason: String) -> AlertLogError {
        AlertLogError::Corrupt {
            path: self.path.display().to_string(),
            reason,
        }
    }

    fn io_error(&self, e: std::io::Error) -> AlertLogError {
        AlertLogError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
