//! CLI command implementations for pubsync.
//!
//! Each module corresponds to one subcommand. Commands that talk to the
//! search service share the catalog and engine setup below.

pub mod delete;
pub mod indexes;
pub mod mark;
pub mod push;
pub mod rebuild;
pub mod settings;
pub mod status;

use crate::{
   Result,
   config::Config,
   index::AlgoliaIndex,
   store::CatalogStore,
   sync::SyncEngine,
};

/// Opens the host catalog named by the configuration.
pub fn open_store(cfg: &Config) -> Result<CatalogStore> {
   let path = cfg.catalog_path();
   tracing::debug!(catalog = %path.display(), "opening catalog");
   CatalogStore::open(path)
}

/// Builds an engine against the configured index. Fails with a config error
/// when credentials are missing.
pub fn connect(cfg: &Config) -> Result<SyncEngine<CatalogStore, AlgoliaIndex>> {
   SyncEngine::connect(open_store(cfg)?, cfg)
}
