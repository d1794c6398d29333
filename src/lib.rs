//! Flood alert chat relay.
//!
//! Answers chat commands with the current river level, its recent history,
//! and field incident reports. Readings come from a read-only repository,
//! are assessed for trend and severity, rendered into text or cards, and
//! handed to a delivery sink.

pub mod alert;
pub mod analysis;
pub mod compose;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod repository;
pub mod webhook;
