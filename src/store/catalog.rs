//! In-memory entity store with optional JSON persistence.

use std::{
   collections::BTreeMap,
   fs,
   path::{Path, PathBuf},
   sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::EntityStore;
use crate::{
   Result,
   types::{
      Author, AuthorId, Journal, JournalId, Publication, PublicationEdit, PublicationFilter,
      PublicationId, Section, SectionId, Submission, SubmissionId,
   },
};

/// Serialized form of a host catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
   #[serde(default)]
   pub journals:     Vec<Journal>,
   #[serde(default)]
   pub submissions:  Vec<Submission>,
   #[serde(default)]
   pub publications: Vec<Publication>,
   #[serde(default)]
   pub authors:      Vec<Author>,
   #[serde(default)]
   pub sections:     Vec<Section>,
}

#[derive(Default)]
struct Tables {
   journals:     BTreeMap<JournalId, Journal>,
   submissions:  BTreeMap<SubmissionId, Submission>,
   publications: BTreeMap<PublicationId, Publication>,
   authors:      BTreeMap<AuthorId, Author>,
   sections:     BTreeMap<SectionId, Section>,
}

impl From<Catalog> for Tables {
   fn from(catalog: Catalog) -> Self {
      Self {
         journals:     catalog.journals.into_iter().map(|j| (j.id, j)).collect(),
         submissions:  catalog.submissions.into_iter().map(|s| (s.id, s)).collect(),
         publications: catalog.publications.into_iter().map(|p| (p.id, p)).collect(),
         authors:      catalog.authors.into_iter().map(|a| (a.id, a)).collect(),
         sections:     catalog.sections.into_iter().map(|s| (s.id, s)).collect(),
      }
   }
}

impl Tables {
   fn to_catalog(&self) -> Catalog {
      Catalog {
         journals:     self.journals.values().cloned().collect(),
         submissions:  self.submissions.values().cloned().collect(),
         publications: self.publications.values().cloned().collect(),
         authors:      self.authors.values().cloned().collect(),
         sections:     self.sections.values().cloned().collect(),
      }
   }

   fn journal_of(&self, publication: &Publication) -> Option<JournalId> {
      self
         .submissions
         .get(&publication.submission_id)
         .map(|s| s.journal_id)
   }
}

/// Entity store backed by a [`Catalog`].
///
/// When opened from a file, every edit call rewrites the file so the dirty
/// flag survives restarts. A batched edit is written once.
pub struct CatalogStore {
   tables: RwLock<Tables>,
   path:   Option<PathBuf>,
   writes: AtomicUsize,
}

impl CatalogStore {
   pub fn new(catalog: Catalog) -> Self {
      Self { tables: RwLock::new(catalog.into()), path: None, writes: AtomicUsize::new(0) }
   }

   /// Loads a catalog from disk, starting empty if the file doesn't exist.
   pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
      let path = path.into();
      let catalog = if path.exists() {
         let content = fs::read_to_string(&path)?;
         serde_json::from_str(&content)?
      } else {
         Catalog::default()
      };
      Ok(Self {
         tables: RwLock::new(catalog.into()),
         path:   Some(path),
         writes: AtomicUsize::new(0),
      })
   }

   pub fn path(&self) -> Option<&Path> {
      self.path.as_deref()
   }

   /// Number of times the catalog file has been written since opening.
   pub fn writes(&self) -> usize {
      self.writes.load(Ordering::Relaxed)
   }

   pub fn snapshot(&self) -> Catalog {
      self.tables.read().to_catalog()
   }

   /// Inserts or replaces a publication, e.g. after a host edit.
   pub fn upsert_publication(&self, publication: Publication) -> Result<()> {
      self
         .tables
         .write()
         .publications
         .insert(publication.id, publication);
      self.save()
   }

   /// Removes a submission and all of its publications.
   pub fn remove_submission(&self, id: SubmissionId) -> Result<()> {
      {
         let mut tables = self.tables.write();
         tables.submissions.remove(&id);
         tables.publications.retain(|_, p| p.submission_id != id);
      }
      self.save()
   }

   pub fn save(&self) -> Result<()> {
      let Some(path) = &self.path else {
         return Ok(());
      };

      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent)?;
      }

      let content = serde_json::to_string_pretty(&self.tables.read().to_catalog())?;
      let tmp = path.with_extension("json.tmp");
      fs::write(&tmp, content)?;
      fs::rename(&tmp, path)?;
      self.writes.fetch_add(1, Ordering::Relaxed);
      Ok(())
   }
}

impl EntityStore for CatalogStore {
   fn journals(&self) -> Result<Vec<Journal>> {
      Ok(self.tables.read().journals.values().cloned().collect())
   }

   fn journal(&self, id: JournalId) -> Result<Option<Journal>> {
      Ok(self.tables.read().journals.get(&id).cloned())
   }

   fn submission(&self, id: SubmissionId) -> Result<Option<Submission>> {
      Ok(self.tables.read().submissions.get(&id).cloned())
   }

   fn publication(&self, id: PublicationId) -> Result<Option<Publication>> {
      Ok(self.tables.read().publications.get(&id).cloned())
   }

   fn edit_publication(
      &self,
      id: PublicationId,
      edit: PublicationEdit,
   ) -> Result<Option<Publication>> {
      let mut updated = self.edit_publications(&[id], edit)?;
      Ok(updated.pop().flatten())
   }

   fn edit_publications(
      &self,
      ids: &[PublicationId],
      edit: PublicationEdit,
   ) -> Result<Vec<Option<Publication>>> {
      let mut updated = Vec::with_capacity(ids.len());
      {
         let mut tables = self.tables.write();
         for id in ids {
            let publication = tables.publications.get_mut(id).map(|publication| {
               if let Some(dirty) = edit.indexing_dirty {
                  publication.indexing_dirty = dirty;
               }
               publication.clone()
            });
            updated.push(publication);
         }
      }
      if updated.iter().any(Option::is_some) {
         self.save()?;
      }
      Ok(updated)
   }

   fn query_publications(&self, filter: &PublicationFilter) -> Result<Vec<Publication>> {
      let tables = self.tables.read();
      let limit = filter.count.unwrap_or(usize::MAX);
      Ok(
         tables
            .publications
            .values()
            .filter(|p| {
               tables
                  .journal_of(p)
                  .is_some_and(|journal_id| filter.matches(p, journal_id))
            })
            .take(limit)
            .cloned()
            .collect(),
      )
   }

   fn author(&self, id: AuthorId) -> Result<Option<Author>> {
      Ok(self.tables.read().authors.get(&id).cloned())
   }

   fn section(&self, id: SectionId) -> Result<Option<Section>> {
      Ok(self.tables.read().sections.get(&id).cloned())
   }
}
