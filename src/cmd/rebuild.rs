//! Full index rebuild command.
//!
//! Clears the index (or one journal's share of it), re-marks every published
//! publication and pushes them in maximum-size batches.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{Result, cmd, config, types::JournalId};

pub async fn execute(journal: Option<u64>, dry_run: bool) -> Result<()> {
   let cfg = config::get();
   let engine = cmd::connect(cfg)?;

   let mut pb = ProgressBar::new(0);
   pb.set_style(
      ProgressStyle::default_bar()
         .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
         .unwrap_or_else(|_| ProgressStyle::default_bar())
         .progress_chars("█▓░"),
   );
   pb.set_message(if dry_run { "Previewing..." } else { "Rebuilding..." });

   let report = engine
      .rebuild(journal.map(JournalId), dry_run, &mut pb)
      .await;
   pb.finish_and_clear();
   let report = report?;

   for line in report.lines() {
      println!("{line}");
   }

   println!();
   if dry_run {
      println!(
         "{} {} publications would be indexed (nothing changed)",
         style("Dry run:").yellow().bold(),
         report.total_marked()
      );
   } else if report.is_success() {
      println!(
         "{} {} publications indexed",
         style("✓").green(),
         report.journals.iter().map(|j| j.pushed).sum::<usize>()
      );
   } else {
      for failed in report.journals.iter().filter(|j| j.error.is_some()) {
         println!(
            "{} {} {}",
            style("✗").red(),
            failed.name,
            style(failed.error.as_deref().unwrap_or_default()).dim()
         );
      }
   }

   report.ensure_success()
}
