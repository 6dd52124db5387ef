//! Lists the indexes visible to the configured credentials.

use console::style;

use crate::{Result, cmd, config, index::SearchIndex};

pub async fn execute() -> Result<()> {
   let cfg = config::get();
   let engine = cmd::connect(cfg)?;
   let names = engine.index().list_indexes().await?;

   if names.is_empty() {
      println!("{}", style("No indexes").dim());
      return Ok(());
   }
   for name in names {
      if name == cfg.index.trim() {
         println!("  {} {} {}", style("●").green(), name, style("(configured)").dim());
      } else {
         println!("  {} {}", style("●").dim(), name);
      }
   }
   Ok(())
}
