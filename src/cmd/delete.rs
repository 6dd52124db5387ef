//! Removes a submission's published versions from the index.

use console::style;

use crate::{Result, cmd, config, types::SubmissionId};

pub async fn execute(submission: u64) -> Result<()> {
   let engine = cmd::connect(config::get())?;
   let deleted = engine.delete_document(SubmissionId(submission)).await?;
   if deleted == 0 {
      println!("{}", style("No published versions to remove").dim());
   } else {
      println!("{} removed {deleted} published version(s) of submission {submission}", style("✓").green());
   }
   Ok(())
}
