//! Flags one publication for the next push.

use console::style;

use crate::{Result, cmd, config, tracker::ChangeTracker, types::PublicationId};

pub fn execute(publication: u64) -> Result<()> {
   let store = cmd::open_store(config::get())?;
   let tracker = ChangeTracker::new(store);
   let publication = tracker.mark_dirty(PublicationId(publication))?;
   println!(
      "{} publication {} marked {}",
      style("●").yellow(),
      publication.id,
      style("(pending push)").dim()
   );
   Ok(())
}
