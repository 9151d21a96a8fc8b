//! Weather alert service.
//!
//! Polls a daily forecast, raises push notifications for high temperature,
//! tornado, severe weather, and rain, and suppresses repeats through a
//! small persisted alert log.

pub mod alert;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod notify;
