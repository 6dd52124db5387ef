//! Indexing status command.
//!
//! Shows whether the search service is configured and how many publications
//! are waiting to be pushed, per journal.

use console::style;
use serde::Serialize;

use crate::{Result, cmd, config, store::EntityStore, tracker::ChangeTracker, types::JournalId};

#[derive(Serialize)]
struct JournalStatus {
   id:        JournalId,
   name:      String,
   indexable: usize,
   pending:   usize,
}

#[derive(Serialize)]
struct StatusReport {
   configured: bool,
   index:      String,
   catalog:    String,
   journals:   Vec<JournalStatus>,
   pending:    usize,
}

pub fn execute(json: bool) -> Result<()> {
   let cfg = config::get();
   let configured = match cfg.adapter_settings() {
      Ok(_) => true,
      Err(e) => {
         tracing::debug!("adapter not configured: {e}");
         false
      },
   };

   let store = cmd::open_store(cfg)?;
   let catalog = store
      .path()
      .map(|p| p.display().to_string())
      .unwrap_or_default();
   let tracker = ChangeTracker::new(store);

   let mut journals = Vec::new();
   for journal in tracker.store().journals()? {
      journals.push(JournalStatus {
         id:        journal.id,
         indexable: tracker.indexable_in_collection(journal.id)?.len(),
         pending:   tracker.count_dirty(Some(journal.id))?,
         name:      journal.name,
      });
   }

   let report = StatusReport {
      configured,
      index: cfg.index.clone(),
      catalog,
      pending: tracker.count_dirty(None)?,
      journals,
   };

   if json {
      println!("{}", serde_json::to_string_pretty(&report)?);
      return Ok(());
   }

   if report.configured {
      println!("{} index {}", style("●").green(), style(&report.index).bold());
   } else {
      println!("{} {}", style("●").red(), style("search service not configured").dim());
   }
   println!("  catalog: {}", style(&report.catalog).dim());
   println!();

   if report.journals.is_empty() {
      println!("{}", style("No journals").dim());
      return Ok(());
   }

   for journal in &report.journals {
      let marker = if journal.pending > 0 { style("●").yellow() } else { style("●").green() };
      println!(
         "  {} {} {}",
         marker,
         journal.name,
         style(format!("(published: {}, pending: {})", journal.indexable, journal.pending)).dim()
      );
   }
   Ok(())
}
