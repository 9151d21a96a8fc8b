/// Pushover push-notification delivery.
///
/// Sends one form-encoded POST per notification. Delivery is best-effort:
/// callers log a failed send and carry on.
///
/// API Documentation: https://pushover.net/api

use std::fmt;
use std::thread;

use crate::config::{Config, HttpConfig, PushoverConfig};
use crate::ingest::weatherbit::is_transient;
use crate::logging::DebugLog;
use crate::model::Notification;

// ---------------------------------------------------------------------------
// Notifier abstraction
// ---------------------------------------------------------------------------

pub trait Notifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyError {
    /// The request never produced a response.
    Request(String),
    /// Pushover answered with a non-2xx status.
    Rejected(u16),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Request(msg) => write!(f, "Notification request failed: {}", msg),
            NotifyError::Rejected(code) => write!(f, "Notification rejected: HTTP {}", code),
        }
    }
}

impl std::error::Error for NotifyError {}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Form fields for one message. `retry` and `expire` are present only when set.
pub fn form_fields(config: &PushoverConfig, n: &Notification) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("token", config.api_token.clone()),
        ("user", config.user_key.clone()),
        ("message", n.message.clone()),
        ("priority", n.priority.to_string()),
    ];
    if let Some(retry) = n.retry_secs {
        fields.push(("retry", retry.to_string()));
    }
    if let Some(expire) = n.expire_secs {
        fields.push(("expire", expire.to_string()));
    }
    fields
}

// ---------------------------------------------------------------------------
// Pushover
// ---------------------------------------------------------------------------

pub struct PushoverNotifier<'a> {
    client: reqwest::blocking::Client,
    pushover: PushoverConfig,
    http: HttpConfig,
    debug: &'a DebugLog,
}

impl<'a> PushoverNotifier<'a> {
    pub fn new(config: &Config, debug: &'a DebugLog) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.http.timeout())
            .build()
            .map_err(|e| NotifyError::Request(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            pushover: config.pushover.clone(),
            http: config.http.clone(),
            debug,
        })
    }
}

impl Notifier for PushoverNotifier<'_> {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let fields = form_fields(&self.pushover, notification);
        let mut attempt = 0;
        loop {
            match self.client.post(&self.pushover.url).form(&fields).send() {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => return Err(NotifyError::Rejected(response.status().as_u16())),
                Err(e) if is_transient(&e) && attempt < self.http.max_retries => {
                    attempt += 1;
                    self.debug.warn(&format!(
                        "Notification send failed ({}); retry {}/{}",
                        e, attempt, self.http.max_retries
                    ));
                    thread::sleep(self.http.backoff(attempt));
                }
                Err(e) => return Err(NotifyError::Request(e.to_string())),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Prints notifications to stdout instead of delivering them.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        println!("[dry-run] priority {}: {}", notification.priority, notification.message);
        Ok(())
    }
}
