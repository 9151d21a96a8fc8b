//! Upstream data sources.

pub mod weatherbit;
