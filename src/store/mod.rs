//! Access to the host's entity storage.
//!
//! The host owns publications, submissions and journals. This crate reads
//! them and writes exactly one attribute back (`indexing_dirty`) through
//! [`EntityStore::edit_publication`].

mod catalog;

pub use catalog::{Catalog, CatalogStore};

use crate::{
   Result,
   types::{
      Author, AuthorId, Journal, JournalId, Publication, PublicationEdit, PublicationFilter,
      PublicationId, Section, SectionId, Submission, SubmissionId,
   },
};

/// Narrow view of the host's entity storage.
pub trait EntityStore: Send + Sync {
   fn journals(&self) -> Result<Vec<Journal>>;

   fn journal(&self, id: JournalId) -> Result<Option<Journal>>;

   fn submission(&self, id: SubmissionId) -> Result<Option<Submission>>;

   fn publication(&self, id: PublicationId) -> Result<Option<Publication>>;

   /// Applies `edit` and returns the updated publication, or `None` when no
   /// such publication exists.
   fn edit_publication(
      &self,
      id: PublicationId,
      edit: PublicationEdit,
   ) -> Result<Option<Publication>>;

   /// Applies one `edit` to many publications. The result is parallel to
   /// `ids`, with `None` for unknown ids. Stores that persist edits should
   /// write once for the whole batch.
   fn edit_publications(
      &self,
      ids: &[PublicationId],
      edit: PublicationEdit,
   ) -> Result<Vec<Option<Publication>>> {
      ids.iter().map(|&id| self.edit_publication(id, edit)).collect()
   }

   /// Publications matching `filter`, in a stable order (ascending id).
   fn query_publications(&self, filter: &PublicationFilter) -> Result<Vec<Publication>>;

   fn author(&self, id: AuthorId) -> Result<Option<Author>>;

   fn section(&self, id: SectionId) -> Result<Option<Section>>;
}

impl<T: EntityStore + ?Sized> EntityStore for std::sync::Arc<T> {
   fn journals(&self) -> Result<Vec<Journal>> {
      (**self).journals()
   }

   fn journal(&self, id: JournalId) -> Result<Option<Journal>> {
      (**self).journal(id)
   }

   fn submission(&self, id: SubmissionId) -> Result<Option<Submission>> {
      (**self).submission(id)
   }

   fn publication(&self, id: PublicationId) -> Result<Option<Publication>> {
      (**self).publication(id)
   }

   fn edit_publication(
      &self,
      id: PublicationId,
      edit: PublicationEdit,
   ) -> Result<Option<Publication>> {
      (**self).edit_publication(id, edit)
   }

   fn edit_publications(
      &self,
      ids: &[PublicationId],
      edit: PublicationEdit,
   ) -> Result<Vec<Option<Publication>>> {
      (**self).edit_publications(ids, edit)
   }

   fn query_publications(&self, filter: &PublicationFilter) -> Result<Vec<Publication>> {
      (**self).query_publications(filter)
   }

   fn author(&self, id: AuthorId) -> Result<Option<Author>> {
      (**self).author(id)
   }

   fn section(&self, id: SectionId) -> Result<Option<Section>> {
      (**self).section(id)
   }
}
