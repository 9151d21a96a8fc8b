//! Core data types for the weather alert service.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O: forecast records, outgoing notifications, and the
//! error types that cross module boundaries.

use std::fmt;

// ---------------------------------------------------------------------------
// Forecast types
// ---------------------------------------------------------------------------

/// One day's prediction from the upstream forecast API.
///
/// Corresponds to one entry in the `data[]` array of a Weatherbit daily
/// forecast response. `condition` is already lowercased so that keyword
/// matching and dedup keys never depend on the API's capitalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDay {
    pub date: String,     // "YYYY-MM-DD", passed through verbatim
    pub max_temp: f64,    // degrees as reported by the API
    pub condition: String, // lowercased weather.description
}

// ---------------------------------------------------------------------------
// Notification types
// ---------------------------------------------------------------------------

/// Pushover priority for ordinary alerts.
pub const PRIORITY_NORMAL: i8 = 0;

/// Pushover emergency priority: repeats until acknowledged or expired.
pub const PRIORITY_EMERGENCY: i8 = 2;

/// A single push notification. Constructed, sent, and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub priority: i8,
    /// Seconds between re-deliveries of an emergency notification.
    pub retry_secs: Option<u32>,
    /// Seconds after which an emergency notification stops repeating.
    pub expire_secs: Option<u32>,
}

impl Notification {
    /// A priority-0 notification with no retry/expire parameters.
    pub fn normal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            priority: PRIORITY_NORMAL,
            retry_secs: None,
            expire_secs: None,
        }
    }

    /// An emergency (priority 2) notification that repeats every
    /// `retry_secs` until acknowledged or `expire_secs` elapse.
    pub fn emergency(message: impl Into<String>, retry_secs: u32, expire_secs: u32) -> Self {
        Self {
            message: message.into(),
            priority: PRIORITY_EMERGENCY,
            retry_secs: Some(retry_secs),
            expire_secs: Some(expire_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding the forecast.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Network failure, timeout, or non-2xx HTTP response.
    Fetch(String),
    /// The response body could not be decoded into forecast days.
    Parse(String),
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastError::Fetch(msg) => write!(f, "Error fetching weather data: {}", msg),
            ForecastError::Parse(msg) => write!(f, "Error decoding weather data: {}", msg),
        }
    }
}

impl std::error::Error for ForecastError {}

/// Errors from loading or persisting the alert log.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertLogError {
    /// The file exists but is not a flat JSON object of strings, or a
    /// timestamp entry cannot be parsed.
    Corrupt { path: String, reason: String },
    /// The file could not be read or written.
    Io { path: String, reason: String },
}

impl fmt::Display for AlertLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLogError::Corrupt { path, reason } => write!(
                f,
                "Alert log {} is corrupt ({}); refusing to reset it, fix or remove the file",
                path, reason
            ),
            AlertLogError::Io { path, reason } => {
                write!(f, "Alert log {} could not be accessed: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for AlertLogError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
