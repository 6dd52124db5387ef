//! Pushes pending changes to the search index.

use console::style;

use crate::{Result, cmd, config, types::JournalId};

pub async fn execute(batch_size: Option<usize>, journal: Option<u64>) -> Result<()> {
   let cfg = config::get();
   let engine = cmd::connect(cfg)?;
   let batch_size = batch_size.unwrap_or_else(|| cfg.effective_max_batch_size());

   let summary = engine
      .push_changed(batch_size, journal.map(JournalId))
      .await?;

   if summary.processed == 0 {
      println!("{}", style("Nothing to push").dim());
      return Ok(());
   }

   println!(
      "{} {} publications pushed {}",
      style("✓").green(),
      summary.processed,
      style(format!(
         "(entries added: {}, deleted: {}, skipped: {})",
         summary.added, summary.deleted, summary.skipped
      ))
      .dim()
   );
   if summary.cleared {
      println!("  {}", style("journal entries were cleared before adding").dim());
   }
   let remaining = engine.tracker().count_dirty(journal.map(JournalId))?;
   if remaining > 0 {
      println!("  {} still pending", style(remaining).yellow());
   }
   Ok(())
}
