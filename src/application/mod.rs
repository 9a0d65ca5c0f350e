pub mod board_sync;
pub mod calendar_setup;
pub mod commands;
pub mod error;
pub mod oauth;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod test_support;

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
