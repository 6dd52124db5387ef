#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use pubsync::{
   format::Formatter,
   index::MemoryIndex,
   store::{Catalog, CatalogStore},
   sync::SyncEngine,
   types::{
      Author, AuthorId, Galley, Journal, JournalId, Localized, Publication, PublicationId,
      PublicationStatus, Section, SectionId, Submission, SubmissionId,
   },
};

pub type TestEngine = SyncEngine<Arc<CatalogStore>, Arc<MemoryIndex>>;

pub fn en(text: &str) -> Localized<String> {
   Localized::from([("en_US".to_string(), text.to_string())])
}

pub fn publication(
   id: u64,
   submission: u64,
   status: PublicationStatus,
   abstract_html: &str,
) -> Publication {
   Publication {
      id:             PublicationId(id),
      submission_id:  SubmissionId(submission),
      status,
      locale:         "en_US".into(),
      title:          en(&format!("Article {id}")),
      abstract_text:  en(abstract_html),
      subjects:       Localized::new(),
      keywords:       Localized::from([("en_US".to_string(), vec!["search".to_string()])]),
      disciplines:    Localized::new(),
      coverage:       Localized::new(),
      kind:           Localized::new(),
      author_ids:     vec![AuthorId(1)],
      section_id:     Some(SectionId(1)),
      date_published: NaiveDate::from_ymd_opt(2020, 1, 2),
      galleys:        Vec::new(),
      indexing_dirty: false,
   }
}

pub fn html_galley(contents: &str) -> Galley {
   Galley { id: 1, file_type: "text/html".into(), path: None, contents: Some(contents.into()) }
}

/// Builds a catalog of journals and articles for tests.
pub struct Fixture {
   catalog: Catalog,
   next_id: u64,
}

impl Default for Fixture {
   fn default() -> Self {
      Self::new()
   }
}

impl Fixture {
   pub fn new() -> Self {
      let catalog = Catalog {
         authors: vec![Author {
            id:          AuthorId(1),
            given_name:  en("Ada"),
            family_name: en("Lovelace"),
         }],
         sections: vec![Section { id: SectionId(1), title: en("Articles") }],
         ..Catalog::default()
      };
      Self { catalog, next_id: 1 }
   }

   pub fn journal(&mut self, id: u64, name: &str) -> JournalId {
      self.catalog.journals.push(Journal {
         id:   JournalId(id),
         name: name.into(),
         path: name.to_lowercase(),
      });
      JournalId(id)
   }

   /// Adds a submission whose only version is published and current.
   pub fn article(&mut self, journal: JournalId, abstract_html: &str) -> (SubmissionId, PublicationId) {
      let id = self.next_id;
      self.next_id += 1;
      self.catalog.submissions.push(Submission {
         id:                     SubmissionId(id),
         journal_id:             journal,
         current_publication_id: Some(PublicationId(id * 100)),
         url_published:          format!("https://journal.example/article/view/{id}"),
      });
      self
         .catalog
         .publications
         .push(publication(id * 100, id, PublicationStatus::Published, abstract_html));
      (SubmissionId(id), PublicationId(id * 100))
   }

   /// Adds another version to `submission`; it does not become current.
   pub fn version(
      &mut self,
      submission: SubmissionId,
      status: PublicationStatus,
      abstract_html: &str,
   ) -> PublicationId {
      let id = submission.0 * 100 + self.versions_of(submission) as u64;
      self
         .catalog
         .publications
         .push(publication(id, submission.0, status, abstract_html));
      PublicationId(id)
   }

   fn versions_of(&self, submission: SubmissionId) -> usize {
      self
         .catalog
         .publications
         .iter()
         .filter(|p| p.submission_id == submission)
         .count()
   }

   pub fn set_current(&mut self, submission: SubmissionId, publication: PublicationId) {
      if let Some(s) = self
         .catalog
         .submissions
         .iter_mut()
         .find(|s| s.id == submission)
      {
         s.current_publication_id = Some(publication);
      }
   }

   pub fn clear_current(&mut self, submission: SubmissionId) {
      if let Some(s) = self
         .catalog
         .submissions
         .iter_mut()
         .find(|s| s.id == submission)
      {
         s.current_publication_id = None;
      }
   }

   pub fn edit(&mut self, id: PublicationId, f: impl FnOnce(&mut Publication)) {
      if let Some(p) = self.catalog.publications.iter_mut().find(|p| p.id == id) {
         f(p);
      }
   }

   pub fn dirty(&mut self, id: PublicationId) {
      self.edit(id, |p| p.indexing_dirty = true);
   }

   pub fn dirty_all(&mut self) {
      for p in &mut self.catalog.publications {
         p.indexing_dirty = true;
      }
   }

   pub fn store(self) -> Arc<CatalogStore> {
      Arc::new(CatalogStore::new(self.catalog))
   }

   pub fn engine(self) -> (TestEngine, Arc<CatalogStore>, Arc<MemoryIndex>) {
      self.engine_with(MemoryIndex::default(), 2000)
   }

   pub fn engine_with(
      self,
      index: MemoryIndex,
      max_batch_size: usize,
   ) -> (TestEngine, Arc<CatalogStore>, Arc<MemoryIndex>) {
      let store = self.store();
      let index = Arc::new(index);
      let engine =
         SyncEngine::new(Arc::clone(&store), Arc::clone(&index), Formatter::default(), max_batch_size);
      (engine, store, index)
   }
}

pub fn set_temp_home(dir: &tempfile::TempDir) {
   // Safe in test harness: set before touching config paths to isolate data.
   unsafe {
      std::env::set_var("HOME", dir.path());
   }
}
