//! Outbound notification channels.

pub mod pushover;
