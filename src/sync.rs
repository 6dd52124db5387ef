//! Batched synchronization of dirty publications to the search index.
//!
//! A push clears each record's dirty flag *before* building its payload. If
//! the remote call then fails the record stays clean: delivery is
//! at-most-once and recovery is an explicit rebuild. Deletes (or a collection
//! clear) always reach the index before any add of the same push.

use indicatif::ProgressBar;

use crate::{
   Error, Result,
   config::Config,
   error::AdapterError,
   format::Formatter,
   index::{AlgoliaIndex, SearchIndex},
   store::EntityStore,
   tracker::{ChangeTracker, DirtyFilter},
   types::{BatchOperation, Journal, JournalId, Publication, PublicationFilter, SubmissionId},
};

/// Result summary from one push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushSummary {
   /// Records whose flag was cleared by this push.
   pub processed: usize,
   /// Delete operations applied (per-record mode only).
   pub deleted:   usize,
   /// Index entries added.
   pub added:     usize,
   /// Processed records that were not added because a reference could not
   /// be resolved. Always counted in `processed` as well; their stale entries
   /// are still deleted.
   pub skipped:   usize,
   /// Whether a collection clear replaced per-record deletes.
   pub cleared:   bool,
}

/// How stale entries are removed before adds are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeletePlan {
   PerRecord,
   ClearCollection(JournalId),
   /// The caller already cleared the target.
   Skip,
}

/// Progress tracking for rebuild operations
#[derive(Debug, Clone)]
pub struct RebuildProgress {
   pub journal:        Option<String>,
   pub journals_done:  usize,
   pub journals_total: usize,
   pub records:        usize,
}

/// Trait for receiving rebuild progress updates
pub trait RebuildProgressCallback: Send {
   fn progress(&mut self, progress: RebuildProgress);
}

impl<F: FnMut(RebuildProgress) + Send> RebuildProgressCallback for F {
   fn progress(&mut self, progress: RebuildProgress) {
      self(progress);
   }
}

impl RebuildProgressCallback for () {
   fn progress(&mut self, _progress: RebuildProgress) {}
}

impl RebuildProgressCallback for ProgressBar {
   fn progress(&mut self, progress: RebuildProgress) {
      self.update(|state| {
         state.set_len(progress.journals_total as u64);
         state.set_pos(progress.journals_done as u64);
      });
      if let Some(journal) = &progress.journal {
         self.set_message(format!("{journal} ({} records)", progress.records));
      }
   }
}

/// Outcome for one journal of a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalReport {
   pub journal_id: JournalId,
   pub name:       String,
   /// Records marked dirty (or that would be, in a dry run).
   pub marked:     usize,
   /// Records pushed to the index.
   pub pushed:     usize,
   pub error:      Option<String>,
}

/// Human-readable log plus per-journal counts.
#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
   pub dry_run:  bool,
   pub cleared:  bool,
   pub journals: Vec<JournalReport>,
   lines:        Vec<String>,
}

impl RebuildReport {
   fn note(&mut self, line: String) {
      tracing::info!("{line}");
      self.lines.push(line);
   }

   pub fn lines(&self) -> &[String] {
      &self.lines
   }

   pub fn log(&self) -> String {
      self.lines.join("\n")
   }

   pub fn is_success(&self) -> bool {
      self.journals.iter().all(|j| j.error.is_none())
   }

   pub fn total_marked(&self) -> usize {
      self.journals.iter().map(|j| j.marked).sum()
   }

   /// Turns the first failed journal into an adapter error.
   pub fn ensure_success(&self) -> Result<()> {
      let mut failed = self
         .journals
         .iter()
         .filter_map(|j| j.error.as_deref().map(|err| (j.name.as_str(), err)));
      let Some((name, err)) = failed.next() else {
         return Ok(());
      };
      let others = failed.count();
      let reason = if others == 0 {
         format!("rebuild of \"{name}\" failed: {err}")
      } else {
         format!("rebuild of \"{name}\" and {others} more journal(s) failed: {err}")
      };
      Err(AdapterError::Unavailable(reason).into())
   }
}

/// Engine for synchronizing publications to the index
pub struct SyncEngine<S: EntityStore, I: SearchIndex> {
   tracker:        ChangeTracker<S>,
   index:          I,
   formatter:      Formatter,
   max_batch_size: usize,
}

impl<S: EntityStore> SyncEngine<S, AlgoliaIndex> {
   /// Builds an engine talking to Algolia; fails if credentials are missing.
   pub fn connect(store: S, cfg: &Config) -> Result<Self> {
      let settings = cfg.adapter_settings()?;
      let index = AlgoliaIndex::new(&settings)?;
      Ok(Self::new(
         store,
         index,
         Formatter::new(cfg.effective_wrap_width()),
         cfg.effective_max_batch_size(),
      ))
   }
}

impl<S, I> SyncEngine<S, I>
where
   S: EntityStore,
   I: SearchIndex,
{
   pub const fn new(store: S, index: I, formatter: Formatter, max_batch_size: usize) -> Self {
      Self { tracker: ChangeTracker::new(store), index, formatter, max_batch_size }
   }

   pub const fn tracker(&self) -> &ChangeTracker<S> {
      &self.tracker
   }

   pub const fn index(&self) -> &I {
      &self.index
   }

   pub const fn formatter(&self) -> &Formatter {
      &self.formatter
   }

   fn store(&self) -> &S {
      self.tracker.store()
   }

   /// Pushes up to `batch_size` dirty publications.
   ///
   /// Without a journal, stale entries are removed record by record. With a
   /// journal, that journal's entries are cleared once instead.
   pub async fn push_changed(
      &self,
      batch_size: usize,
      journal_id: Option<JournalId>,
   ) -> Result<PushSummary> {
      let plan = journal_id.map_or(DeletePlan::PerRecord, DeletePlan::ClearCollection);
      self.push_batch(batch_size, journal_id, plan).await
   }

   async fn push_batch(
      &self,
      batch_size: usize,
      journal_id: Option<JournalId>,
      plan: DeletePlan,
   ) -> Result<PushSummary> {
      let batch_size = batch_size.min(self.max_batch_size);
      let dirty: Vec<Publication> = self
         .tracker
         .find_dirty(DirtyFilter::new(batch_size, journal_id))?
         .collect();

      let mut summary = PushSummary::default();
      if dirty.is_empty() {
         return Ok(summary);
      }

      let ids: Vec<_> = dirty.iter().map(|p| p.id).collect();
      let cleaned = self.tracker.mark_clean_many(&ids)?;

      let mut deletes = Vec::with_capacity(cleaned.len());
      let mut adds = Vec::new();

      for (id, publication) in ids.into_iter().zip(cleaned) {
         // Removed from the host after the dirty query; nothing left to index.
         let Some(publication) = publication else {
            tracing::warn!("Publication {} vanished before it could be pushed", id);
            continue;
         };
         summary.processed += 1;

         deletes.push(BatchOperation::Delete { distinct_id: publication.distinct_id() });

         match self.build_adds(&publication) {
            Ok(ops) => adds.extend(ops),
            Err(e @ Error::InvalidRecord { .. }) => {
               tracing::warn!("Not indexing publication {}: {}", publication.id, e);
               summary.skipped += 1;
            },
            Err(e) => return Err(e),
         }
      }

      match plan {
         DeletePlan::PerRecord => {
            self.index.submit_batch(&deletes).await?;
            summary.deleted = deletes.len();
         },
         DeletePlan::ClearCollection(journal_id) => {
            self.index.clear_collection(journal_id).await?;
            summary.cleared = true;
         },
         DeletePlan::Skip => {},
      }

      for chunk in adds.chunks(self.index.max_batch_len().max(1)) {
         self.index.submit_batch(chunk).await?;
         summary.added += chunk.len();
      }

      tracing::info!(
         processed = summary.processed,
         deleted = summary.deleted,
         added = summary.added,
         skipped = summary.skipped,
         "pushed changed publications"
      );
      Ok(summary)
   }

   /// Add operations for `publication`, empty unless it is published and the
   /// current version of its submission.
   fn build_adds(&self, publication: &Publication) -> Result<Vec<BatchOperation>> {
      if !publication.is_published() || !self.is_current(publication)? {
         return Ok(Vec::new());
      }
      Ok(
         self
            .formatter
            .format(self.store(), publication)?
            .into_iter()
            .map(BatchOperation::Add)
            .collect(),
      )
   }

   fn is_current(&self, publication: &Publication) -> Result<bool> {
      let submission = self
         .store()
         .submission(publication.submission_id)?
         .ok_or_else(|| Error::invalid_record("submission", publication.submission_id))?;
      Ok(submission.current_publication_id == Some(publication.id))
   }

   /// Removes every published version of a submission from the index.
   ///
   /// Runs immediately: once the submission is gone there is nothing left to
   /// carry a dirty flag.
   pub async fn delete_document(&self, submission_id: SubmissionId) -> Result<usize> {
      if self.store().submission(submission_id)?.is_none() {
         return Err(Error::invalid_record("submission", submission_id));
      }

      let published = self.store().query_publications(
         &PublicationFilter::default()
            .for_submission(submission_id)
            .published(),
      )?;

      for publication in &published {
         self
            .index
            .delete_by_distinct_id(&publication.distinct_id())
            .await?;
      }

      tracing::info!(submission = %submission_id, deleted = published.len(), "submission removed from index");
      Ok(published.len())
   }

   /// Rebuilds the index for every journal, or just `journal_id`.
   ///
   /// A dry run only counts what would be marked; nothing is written to the
   /// store or the index.
   pub async fn rebuild(
      &self,
      journal_id: Option<JournalId>,
      dry_run: bool,
      callback: &mut dyn RebuildProgressCallback,
   ) -> Result<RebuildReport> {
      let journals = match journal_id {
         Some(id) => vec![
            self
               .store()
               .journal(id)?
               .ok_or_else(|| Error::invalid_record("journal", id))?,
         ],
         None => self.store().journals()?,
      };

      let mut report = RebuildReport { dry_run, ..RebuildReport::default() };
      let total = journals.len();

      if !dry_run {
         match journal_id {
            Some(id) => self.index.clear_collection(id).await?,
            None => self.index.clear_index().await?,
         }
         report.cleared = true;
         report.note("Clearing index ... done".to_string());
      }

      for (done, journal) in journals.into_iter().enumerate() {
         callback.progress(RebuildProgress {
            journal:        Some(journal.name.clone()),
            journals_done:  done,
            journals_total: total,
            records:        0,
         });

         let entry = if dry_run {
            self.preview_journal(&journal)?
         } else {
            self.rebuild_journal(&journal).await?
         };

         report.note(describe(&entry, dry_run));
         callback.progress(RebuildProgress {
            journal:        Some(journal.name),
            journals_done:  done + 1,
            journals_total: total,
            records:        entry.marked,
         });
         report.journals.push(entry);
      }

      report.note("done".to_string());
      Ok(report)
   }

   fn preview_journal(&self, journal: &Journal) -> Result<JournalReport> {
      let marked = self.tracker.indexable_in_collection(journal.id)?.len();
      Ok(JournalReport {
         journal_id: journal.id,
         name: journal.name.clone(),
         marked,
         pushed: 0,
         error: None,
      })
   }

   async fn rebuild_journal(&self, journal: &Journal) -> Result<JournalReport> {
      let marked = self.tracker.mark_collection_dirty(journal.id)?;
      let mut pushed = 0;
      let mut error = None;

      loop {
         match self
            .push_batch(self.max_batch_size, Some(journal.id), DeletePlan::Skip)
            .await
         {
            Ok(summary) if summary.processed == 0 => break,
            Ok(summary) => pushed += summary.processed,
            Err(Error::Adapter(e)) => {
               tracing::warn!("Indexing {} failed: {}", journal.name, e);
               error = Some(e.to_string());
               break;
            },
            Err(e) => return Err(e),
         }
      }

      Ok(JournalReport { journal_id: journal.id, name: journal.name.clone(), marked, pushed, error })
   }
}

fn describe(entry: &JournalReport, dry_run: bool) -> String {
   if dry_run {
      return format!("Indexing \"{}\" ... {} articles would be indexed", entry.name, entry.marked);
   }
   match &entry.error {
      Some(err) => format!(
         "Indexing \"{}\" ... {} articles marked, {} indexed, failed: {err}",
         entry.name, entry.marked, entry.pushed
      ),
      None => format!("Indexing \"{}\" ... {} articles indexed", entry.name, entry.marked),
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn entry(error: Option<&str>) -> JournalReport {
      JournalReport {
         journal_id: JournalId(1),
         name:       "Alpha".into(),
         marked:     4,
         pushed:     2,
         error:      error.map(str::to_string),
      }
   }

   #[test]
   fn log_lines_describe_each_journal() {
      assert_eq!(describe(&entry(None), false), "Indexing \"Alpha\" ... 4 articles indexed");
      assert_eq!(describe(&entry(None), true), "Indexing \"Alpha\" ... 4 articles would be indexed");
      assert!(describe(&entry(Some("503")), false).ends_with("2 indexed, failed: 503"));
   }

   #[test]
   fn report_fails_when_any_journal_failed() {
      let mut report = RebuildReport::default();
      report.journals.push(entry(None));
      assert!(report.is_success());
      report.journals.push(entry(Some("timeout")));
      assert!(!report.is_success());
      assert_eq!(report.total_marked(), 8);
   }

   #[test]
   fn failed_journal_becomes_an_adapter_error() {
      let mut report = RebuildReport::default();
      report.journals.push(entry(None));
      assert!(report.ensure_success().is_ok());

      report.journals.push(entry(Some("timeout")));
      let err = report.ensure_success().unwrap_err();
      assert_eq!(err.exit_code(), 4);
      assert!(err.to_string().contains("\"Alpha\" failed: timeout"));

      report.journals.push(entry(Some("503")));
      assert!(report.ensure_success().unwrap_err().to_string().contains("and 1 more"));
   }
}
