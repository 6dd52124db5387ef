//! Keeps a hosted search index in step with a publishing platform's
//! articles.
//!
//! Host events flag publications dirty; the [`sync::SyncEngine`] later
//! pushes them through a [`index::SearchIndex`] adapter, formatted into
//! paragraph-sized entries by [`format::Formatter`].

pub mod cmd;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod index;
pub mod store;
pub mod sync;
pub mod tracker;
pub mod types;

pub use error::{Error, Result};
