//! Host entities and index payload types shared across the crate.

use std::{collections::BTreeMap, fmt, path::PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! define_ids {
   ($($name:ident),* $(,)?) => {
      $(
         #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
         )]
         #[serde(transparent)]
         pub struct $name(pub u64);

         impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
               write!(f, "{}", self.0)
            }
         }
      )*
   };
}

define_ids! {
   JournalId,
   SubmissionId,
   PublicationId,
   AuthorId,
   SectionId,
}

/// Locale-keyed text, e.g. `{"en_US": "Title"}`.
pub type Localized<T> = BTreeMap<String, T>;

/// Reads a localized value in `locale`, falling back to the first locale
/// present.
pub fn localized<'a, T>(values: &'a Localized<T>, locale: &str) -> Option<&'a T> {
   values.get(locale).or_else(|| values.values().next())
}

/// Publication status as stored by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
   #[default]
   Draft,
   Published,
   Unpublished,
}

/// A journal: the unit of scoped rebuilds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
   pub id:   JournalId,
   pub name: String,
   #[serde(default)]
   pub path: String,
}

/// The parent document owning one or more publication versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
   pub id:                     SubmissionId,
   pub journal_id:             JournalId,
   #[serde(default)]
   pub current_publication_id: Option<PublicationId>,
   #[serde(default)]
   pub url_published:          String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
   pub id:          AuthorId,
   #[serde(default)]
   pub given_name:  Localized<String>,
   #[serde(default)]
   pub family_name: Localized<String>,
}

impl Author {
   /// Display name in `locale`: given name followed by family name.
   pub fn full_name(&self, locale: &str) -> String {
      let given = localized(&self.given_name, locale).map_or("", String::as_str);
      let family = localized(&self.family_name, locale).map_or("", String::as_str);
      format!("{given} {family}").trim().to_string()
   }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
   pub id:    SectionId,
   #[serde(default)]
   pub title: Localized<String>,
}

/// An attached rendition of a publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Galley {
   pub id:        u64,
   pub file_type: String,
   #[serde(default)]
   pub path:      Option<PathBuf>,
   #[serde(default)]
   pub contents:  Option<String>,
}

impl Galley {
   pub fn is_html(&self) -> bool {
      self.file_type.eq_ignore_ascii_case("text/html")
   }
}

/// One versioned snapshot of an article's metadata and status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
   pub id:             PublicationId,
   pub submission_id:  SubmissionId,
   #[serde(default)]
   pub status:         PublicationStatus,
   pub locale:         String,
   #[serde(default)]
   pub title:          Localized<String>,
   #[serde(default, rename = "abstract")]
   pub abstract_text:  Localized<String>,
   #[serde(default)]
   pub subjects:       Localized<Vec<String>>,
   #[serde(default)]
   pub keywords:       Localized<Vec<String>>,
   #[serde(default)]
   pub disciplines:    Localized<Vec<String>>,
   #[serde(default)]
   pub coverage:       Localized<Vec<String>>,
   #[serde(default, rename = "type")]
   pub kind:           Localized<String>,
   #[serde(default)]
   pub author_ids:     Vec<AuthorId>,
   #[serde(default)]
   pub section_id:     Option<SectionId>,
   #[serde(default)]
   pub date_published: Option<NaiveDate>,
   #[serde(default)]
   pub galleys:        Vec<Galley>,
   #[serde(default)]
   pub indexing_dirty: bool,
}

impl Publication {
   pub fn is_published(&self) -> bool {
      self.status == PublicationStatus::Published
   }

   /// Key grouping every index entry built from this publication.
   pub fn distinct_id(&self) -> String {
      self.id.to_string()
   }
}

/// Attribute update applied through the host's edit interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicationEdit {
   pub indexing_dirty: Option<bool>,
}

impl PublicationEdit {
   pub const fn dirty(dirty: bool) -> Self {
      Self { indexing_dirty: Some(dirty) }
   }
}

/// Query filter accepted by the entity store.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicationFilter {
   pub journal_id:     Option<JournalId>,
   pub submission_id:  Option<SubmissionId>,
   pub indexing_dirty: Option<bool>,
   pub status:         Option<PublicationStatus>,
   pub count:          Option<usize>,
}

impl PublicationFilter {
   pub fn dirty() -> Self {
      Self { indexing_dirty: Some(true), ..Self::default() }
   }

   pub const fn in_journal(mut self, journal_id: Option<JournalId>) -> Self {
      self.journal_id = journal_id;
      self
   }

   pub const fn for_submission(mut self, submission_id: SubmissionId) -> Self {
      self.submission_id = Some(submission_id);
      self
   }

   pub const fn published(mut self) -> Self {
      self.status = Some(PublicationStatus::Published);
      self
   }

   pub const fn limit(mut self, count: usize) -> Self {
      self.count = Some(count);
      self
   }

   /// Whether `publication` (belonging to `journal_id`) passes every
   /// criterion except `count`.
   pub fn matches(&self, publication: &Publication, journal_id: JournalId) -> bool {
      self.journal_id.is_none_or(|j| j == journal_id)
         && self
            .submission_id
            .is_none_or(|s| s == publication.submission_id)
         && self
            .indexing_dirty
            .is_none_or(|d| d == publication.indexing_dirty)
         && self.status.is_none_or(|s| s == publication.status)
   }
}

/// One record written to the remote index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
   #[serde(rename = "objectID")]
   pub object_id:        String,
   pub distinct_id:      String,
   pub journal_id:       JournalId,
   pub order:            usize,
   pub title:            String,
   pub body:             String,
   pub authors:          String,
   pub section:          String,
   pub publication_date: Option<i64>,
   pub url:              String,
   pub discipline:       Vec<String>,
   pub subject:          Vec<String>,
   pub keyword:          Vec<String>,
   #[serde(rename = "type")]
   pub kind:             String,
   pub coverage:         Vec<String>,
}

/// A single remote index mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
   Add(IndexEntry),
   Delete { distinct_id: String },
}

impl BatchOperation {
   pub const fn is_delete(&self) -> bool {
      matches!(self, Self::Delete { .. })
   }

   pub fn distinct_id(&self) -> &str {
      match self {
         Self::Add(entry) => &entry.distinct_id,
         Self::Delete { distinct_id } => distinct_id,
      }
   }
}
