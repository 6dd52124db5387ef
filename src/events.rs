//! Typed host lifecycle events and the plugin that reacts to them.

use crate::{
   Error, Result,
   config::Config,
   index::{AlgoliaIndex, SearchIndex},
   store::EntityStore,
   sync::{PushSummary, RebuildReport, SyncEngine},
   types::{JournalId, SubmissionId},
};

/// Lifecycle notifications raised by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
   /// Metadata of a submission's current version was edited.
   ContentMetadataChanged { submission_id: SubmissionId },
   ContentDeleted { submission_id: SubmissionId },
   /// A version was published or unpublished.
   PublicationStatusChanged { submission_id: SubmissionId },
   /// The host finished a unit of work; pending changes may be pushed.
   AllChangesFlushed,
   ParentDocumentFileDeleted { submission_id: SubmissionId },
   RebuildRequested { journal_id: Option<JournalId>, dry_run: bool },
}

impl HostEvent {
   pub const fn name(&self) -> &'static str {
      match self {
         Self::ContentMetadataChanged { .. } => "contentMetadataChanged",
         Self::ContentDeleted { .. } => "contentDeleted",
         Self::PublicationStatusChanged { .. } => "publicationStatusChanged",
         Self::AllChangesFlushed => "allChangesFlushed",
         Self::ParentDocumentFileDeleted { .. } => "parentDocumentFileDeleted",
         Self::RebuildRequested { .. } => "rebuildRequested",
      }
   }
}

/// What handling an event did.
#[derive(Debug, Clone)]
pub enum EventOutcome {
   /// No engine is configured, or there was nothing to do.
   Ignored,
   /// Records marked dirty, push deferred.
   Marked(usize),
   Pushed(PushSummary),
   /// Published versions removed from the index.
   Deleted(usize),
   Rebuilt(RebuildReport),
}

/// Wires host events to a [`SyncEngine`].
///
/// When the search service is not configured the plugin stays installed but
/// every event is a no-op, so host behavior is never affected.
pub struct Plugin<S: EntityStore, I: SearchIndex> {
   engine:            Option<SyncEngine<S, I>>,
   online_batch_size: usize,
}

impl<S: EntityStore> Plugin<S, AlgoliaIndex> {
   /// Connects to Algolia using `cfg`. Missing or invalid settings disable
   /// the plugin instead of failing.
   pub fn from_config(store: S, cfg: &Config) -> Result<Self> {
      let engine = match SyncEngine::connect(store, cfg) {
         Ok(engine) => Some(engine),
         Err(Error::Config(e)) => {
            tracing::warn!("Search indexing disabled: {}", e);
            None
         },
         Err(e) => return Err(e),
      };
      Ok(Self { engine, online_batch_size: cfg.effective_online_batch_size() })
   }
}

impl<S, I> Plugin<S, I>
where
   S: EntityStore,
   I: SearchIndex,
{
   pub const fn new(engine: SyncEngine<S, I>, online_batch_size: usize) -> Self {
      Self { engine: Some(engine), online_batch_size }
   }

   pub const fn disabled() -> Self {
      Self { engine: None, online_batch_size: crate::config::ONLINE_BATCH_SIZE }
   }

   pub const fn is_enabled(&self) -> bool {
      self.engine.is_some()
   }

   pub const fn engine(&self) -> Option<&SyncEngine<S, I>> {
      self.engine.as_ref()
   }

   pub async fn handle(&self, event: HostEvent) -> Result<EventOutcome> {
      let Some(engine) = &self.engine else {
         tracing::debug!(event = event.name(), "indexing not configured, event ignored");
         return Ok(EventOutcome::Ignored);
      };
      tracing::debug!(?event, "handling host event");

      match event {
         HostEvent::ContentMetadataChanged { submission_id } => {
            let submission = engine
               .tracker()
               .store()
               .submission(submission_id)?
               .ok_or_else(|| Error::invalid_record("submission", submission_id))?;
            let Some(current) = submission.current_publication_id else {
               tracing::debug!(submission = %submission_id, "no current version, nothing to index");
               return Ok(EventOutcome::Ignored);
            };
            engine.tracker().mark_dirty(current)?;
            Ok(EventOutcome::Pushed(
               engine.push_changed(self.online_batch_size, None).await?,
            ))
         },
         HostEvent::ContentDeleted { submission_id }
         | HostEvent::ParentDocumentFileDeleted { submission_id } => {
            Ok(EventOutcome::Deleted(engine.delete_document(submission_id).await?))
         },
         HostEvent::PublicationStatusChanged { submission_id } => Ok(EventOutcome::Marked(
            engine.tracker().mark_submission_dirty(submission_id)?,
         )),
         HostEvent::AllChangesFlushed => Ok(EventOutcome::Pushed(
            engine.push_changed(self.online_batch_size, None).await?,
         )),
         HostEvent::RebuildRequested { journal_id, dry_run } => {
            Ok(EventOutcome::Rebuilt(engine.rebuild(journal_id, dry_run, &mut ()).await?))
         },
      }
   }

   /// Handles events in order, stopping at the first failure.
   pub async fn dispatch(
      &self,
      events: impl IntoIterator<Item = HostEvent>,
   ) -> Result<Vec<EventOutcome>> {
      let mut outcomes = Vec::new();
      for event in events {
         outcomes.push(self.handle(event).await?);
      }
      Ok(outcomes)
   }
}
