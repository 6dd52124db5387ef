//! Persistent dirty-flag tracking for publications.
//!
//! The flag lives on the publication itself (`indexing_dirty`) and is the
//! only durable state this crate owns besides the remote index.

use crate::{
   Error, Result,
   store::EntityStore,
   types::{JournalId, Publication, PublicationEdit, PublicationFilter, PublicationId, SubmissionId},
};

/// Which dirty publications to fetch.
#[derive(Debug, Clone, Copy)]
pub struct DirtyFilter {
   pub journal_id: Option<JournalId>,
   pub max_count:  usize,
}

impl DirtyFilter {
   pub const fn new(max_count: usize, journal_id: Option<JournalId>) -> Self {
      Self { journal_id, max_count }
   }
}

/// Marks publications changed or clean through the host's edit interface.
pub struct ChangeTracker<S: EntityStore> {
   store: S,
}

impl<S: EntityStore> ChangeTracker<S> {
   pub const fn new(store: S) -> Self {
      Self { store }
   }

   pub const fn store(&self) -> &S {
      &self.store
   }

   /// Flags a publication for the next push. Idempotent.
   pub fn mark_dirty(&self, id: PublicationId) -> Result<Publication> {
      self.set_state(id, true)
   }

   /// Clears the flag. Idempotent.
   pub fn mark_clean(&self, id: PublicationId) -> Result<Publication> {
      self.set_state(id, false)
   }

   /// Clears the flag on every publication in `ids` with a single store
   /// write. The result is parallel to `ids`; `None` marks an id the store
   /// no longer knows.
   pub fn mark_clean_many(&self, ids: &[PublicationId]) -> Result<Vec<Option<Publication>>> {
      self.set_many(ids, false)
   }

   /// Flags every publication in `ids`; see [`Self::mark_clean_many`].
   pub fn mark_dirty_many(&self, ids: &[PublicationId]) -> Result<Vec<Option<Publication>>> {
      self.set_many(ids, true)
   }

   fn set_many(&self, ids: &[PublicationId], dirty: bool) -> Result<Vec<Option<Publication>>> {
      if ids.is_empty() {
         return Ok(Vec::new());
      }
      let updated = self
         .store
         .edit_publications(ids, PublicationEdit::dirty(dirty))?;
      tracing::debug!(
         requested = ids.len(),
         updated = updated.iter().flatten().count(),
         dirty,
         "indexing state changed"
      );
      Ok(updated)
   }

   fn set_state(&self, id: PublicationId, dirty: bool) -> Result<Publication> {
      let publication = self
         .store
         .edit_publication(id, PublicationEdit::dirty(dirty))?
         .ok_or_else(|| Error::invalid_record("publication", id))?;
      tracing::debug!(publication = %id, dirty, "indexing state changed");
      Ok(publication)
   }

   /// Dirty publications, at most `filter.max_count`, ordered by id.
   ///
   /// Each call queries the store afresh, so the sequence can be restarted by
   /// calling again.
   pub fn find_dirty(&self, filter: DirtyFilter) -> Result<impl Iterator<Item = Publication>> {
      if filter.max_count == 0 {
         return Ok(Vec::<Publication>::new().into_iter());
      }
      let query = PublicationFilter::dirty()
         .in_journal(filter.journal_id)
         .limit(filter.max_count);
      Ok(self.store.query_publications(&query)?.into_iter())
   }

   /// Number of dirty publications, optionally within one journal.
   pub fn count_dirty(&self, journal_id: Option<JournalId>) -> Result<usize> {
      Ok(
         self
            .store
            .query_publications(&PublicationFilter::dirty().in_journal(journal_id))?
            .len(),
      )
   }

   /// Published publications of a journal, i.e. what a rebuild would mark.
   pub fn indexable_in_collection(&self, journal_id: JournalId) -> Result<Vec<Publication>> {
      if self.store.journal(journal_id)?.is_none() {
         return Err(Error::invalid_record("journal", journal_id));
      }
      self.store.query_publications(
         &PublicationFilter::default()
            .in_journal(Some(journal_id))
            .published(),
      )
   }

   /// Marks every published publication of a journal dirty and returns how
   /// many were marked. Drafts and unpublished versions are left alone.
   pub fn mark_collection_dirty(&self, journal_id: JournalId) -> Result<usize> {
      let ids: Vec<PublicationId> = self
         .indexable_in_collection(journal_id)?
         .iter()
         .map(|p| p.id)
         .collect();
      let marked = self.mark_dirty_many(&ids)?.iter().flatten().count();
      tracing::info!(journal = %journal_id, marked, "journal marked for re-indexing");
      Ok(marked)
   }

   /// Marks every version of a submission dirty; returns how many.
   pub fn mark_submission_dirty(&self, submission_id: SubmissionId) -> Result<usize> {
      if self.store.submission(submission_id)?.is_none() {
         return Err(Error::invalid_record("submission", submission_id));
      }
      let ids: Vec<PublicationId> = self
         .store
         .query_publications(&PublicationFilter::default().for_submission(submission_id))?
         .iter()
         .map(|p| p.id)
         .collect();
      Ok(self.mark_dirty_many(&ids)?.iter().flatten().count())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{
      store::{Catalog, CatalogStore},
      types::{Journal, PublicationStatus, Submission},
   };

   fn publication(id: u64, submission: u64, status: PublicationStatus) -> Publication {
      serde_json::from_value(serde_json::json!({
         "id": id,
         "submission_id": submission,
         "status": status,
         "locale": "en_US",
      }))
      .unwrap()
   }

   fn tracker() -> ChangeTracker<CatalogStore> {
      let catalog = Catalog {
         journals: vec![Journal { id: JournalId(1), name: "J1".into(), path: "j1".into() }],
         submissions: vec![
            Submission {
               id:                     SubmissionId(1),
               journal_id:             JournalId(1),
               current_publication_id: Some(PublicationId(1)),
               url_published:          String::new(),
            },
            Submission {
               id:                     SubmissionId(2),
               journal_id:             JournalId(1),
               current_publication_id: Some(PublicationId(3)),
               url_published:          String::new(),
            },
         ],
         publications: vec![
            publication(1, 1, PublicationStatus::Published),
            publication(2, 2, PublicationStatus::Draft),
            publication(3, 2, PublicationStatus::Unpublished),
         ],
         ..Catalog::default()
      };
      ChangeTracker::new(CatalogStore::new(catalog))
   }

   #[test]
   fn marking_is_idempotent() {
      let tracker = tracker();
      tracker.mark_dirty(PublicationId(1)).unwrap();
      tracker.mark_dirty(PublicationId(1)).unwrap();
      assert_eq!(tracker.count_dirty(None).unwrap(), 1);

      tracker.mark_clean(PublicationId(1)).unwrap();
      tracker.mark_clean(PublicationId(1)).unwrap();
      assert_eq!(tracker.count_dirty(None).unwrap(), 0);
   }

   #[test]
   fn unknown_publication_is_invalid() {
      let tracker = tracker();
      assert!(matches!(
         tracker.mark_dirty(PublicationId(404)),
         Err(Error::InvalidRecord { kind: "publication", .. })
      ));
      assert!(matches!(tracker.mark_clean(PublicationId(404)), Err(Error::InvalidRecord { .. })));
   }

   #[test]
   fn collection_marking_skips_unpublished_records() {
      let tracker = tracker();
      assert_eq!(tracker.mark_collection_dirty(JournalId(1)).unwrap(), 1);

      let dirty: Vec<_> = tracker
         .find_dirty(DirtyFilter::new(10, Some(JournalId(1))))
         .unwrap()
         .map(|p| p.id)
         .collect();
      assert_eq!(dirty, vec![PublicationId(1)]);
   }

   #[test]
   fn find_dirty_respects_max_count() {
      let tracker = tracker();
      tracker.mark_submission_dirty(SubmissionId(2)).unwrap();
      tracker.mark_dirty(PublicationId(1)).unwrap();

      assert_eq!(tracker.find_dirty(DirtyFilter::new(2, None)).unwrap().count(), 2);
      assert_eq!(tracker.find_dirty(DirtyFilter::new(0, None)).unwrap().count(), 0);
      assert_eq!(tracker.find_dirty(DirtyFilter::new(10, None)).unwrap().count(), 3);
   }

   #[test]
   fn batch_marking_reports_unknown_ids() {
      let tracker = tracker();
      let ids = [PublicationId(1), PublicationId(404), PublicationId(3)];
      let marked = tracker.mark_dirty_many(&ids).unwrap();
      assert_eq!(marked.iter().map(Option::is_some).collect::<Vec<_>>(), vec![true, false, true]);
      assert_eq!(tracker.count_dirty(None).unwrap(), 2);

      assert_eq!(tracker.mark_clean_many(&ids).unwrap().iter().flatten().count(), 2);
      assert_eq!(tracker.count_dirty(None).unwrap(), 0);
      assert!(tracker.mark_clean_many(&[]).unwrap().is_empty());
   }

   #[test]
   fn unknown_journal_is_invalid() {
      assert!(matches!(
         tracker().mark_collection_dirty(JournalId(9)),
         Err(Error::InvalidRecord { kind: "journal", .. })
      ));
   }
}
