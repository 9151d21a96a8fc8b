/// Alert classification, deduplication, and the persisted alert log.
///
/// Submodules:
/// - `rules` — which alerts a forecast day raises, and their messages.
/// - `dedup` — cooldown window and condition-change detection.
/// - `log_store` — the JSON file recording when each alert last fired.

pub mod dedup;
pub mod log_store;
pub mod rules;
