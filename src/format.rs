//! Publication → index entry transformation.
//!
//! Long text (abstract plus the body of any HTML galley) is entity-decoded,
//! split on paragraph openers, stripped of markup and soft-wrapped. Every
//! non-blank paragraph becomes its own [`IndexEntry`]; all entries of one
//! publication share a `distinctId`.

use std::{fs, sync::LazyLock};

use chrono::NaiveTime;
use html_escape::decode_html_entities;
use regex::Regex;
use scraper::{Html, Selector};

use crate::{
   Error, Result,
   store::EntityStore,
   types::{IndexEntry, JournalId, Publication, localized},
};

static PARAGRAPH_OPEN: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"(?i)<p(?:\s[^>]*)?/?>").expect("valid paragraph regex"));
static PARAGRAPH_CLOSE: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"(?i)</p\s*>").expect("valid paragraph close regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static BODY: LazyLock<Selector> =
   LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Localized metadata fields copied into every entry.
pub const LOCALIZED_FIELDS: [&str; 7] =
   ["title", "abstract", "discipline", "subject", "keyword", "type", "coverage"];
/// Fields sourced from attached renditions.
pub const MULTIFORMAT_FIELDS: [&str; 1] = ["galleyFullText"];
/// Fields that do not depend on the locale.
pub const STATIC_FIELDS: [&str; 2] = ["authors", "publicationDate"];

/// Every source field consulted when building entries.
pub fn indexed_fields() -> Vec<&'static str> {
   LOCALIZED_FIELDS
      .iter()
      .chain(MULTIFORMAT_FIELDS.iter())
      .chain(STATIC_FIELDS.iter())
      .copied()
      .collect()
}

/// Flattened, denormalized view of one publication.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
   pub distinct_id:      String,
   pub journal_id:       JournalId,
   pub title:            String,
   pub authors:          String,
   pub section:          String,
   pub publication_date: Option<i64>,
   pub url:              String,
   pub discipline:       Vec<String>,
   pub subject:          Vec<String>,
   pub keyword:          Vec<String>,
   pub kind:             String,
   pub coverage:         Vec<String>,
   /// Abstract chunks followed by galley chunks, blanks removed.
   pub body:             Vec<String>,
}

impl IndexDocument {
   /// One entry per body chunk, `order` starting at 1.
   pub fn into_entries(self) -> Vec<IndexEntry> {
      let Self {
         distinct_id,
         journal_id,
         title,
         authors,
         section,
         publication_date,
         url,
         discipline,
         subject,
         keyword,
         kind,
         coverage,
         body,
      } = self;

      body
         .into_iter()
         .enumerate()
         .map(|(idx, chunk)| {
            let order = idx + 1;
            IndexEntry {
               object_id: format!("{distinct_id}_{order}"),
               distinct_id: distinct_id.clone(),
               journal_id,
               order,
               title: title.clone(),
               body: chunk,
               authors: authors.clone(),
               section: section.clone(),
               publication_date,
               url: url.clone(),
               discipline: discipline.clone(),
               subject: subject.clone(),
               keyword: keyword.clone(),
               kind: kind.clone(),
               coverage: coverage.clone(),
            }
         })
         .collect()
   }
}

/// Builds index entries from publications.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
   wrap_width: usize,
}

impl Default for Formatter {
   fn default() -> Self {
      Self::new(crate::config::WRAP_WIDTH)
   }
}

impl Formatter {
   pub const fn new(wrap_width: usize) -> Self {
      Self { wrap_width }
   }

   pub const fn wrap_width(&self) -> usize {
      self.wrap_width
   }

   /// Entries for `publication`; empty when it has no abstract or body text.
   pub fn format<S: EntityStore + ?Sized>(
      &self,
      store: &S,
      publication: &Publication,
   ) -> Result<Vec<IndexEntry>> {
      Ok(self.document(store, publication)?.into_entries())
   }

   pub fn document<S: EntityStore + ?Sized>(
      &self,
      store: &S,
      publication: &Publication,
   ) -> Result<IndexDocument> {
      let locale = publication.locale.as_str();
      let submission = store
         .submission(publication.submission_id)?
         .ok_or_else(|| Error::invalid_record("submission", publication.submission_id))?;

      let text = |values: &crate::types::Localized<String>| {
         localized(values, locale).cloned().unwrap_or_default()
      };
      let list = |values: &crate::types::Localized<Vec<String>>| {
         localized(values, locale).cloned().unwrap_or_default()
      };

      let mut body = self.chunk(&text(&publication.abstract_text));
      body.extend(self.chunk(&galley_html(publication)));

      Ok(IndexDocument {
         distinct_id: publication.distinct_id(),
         journal_id: submission.journal_id,
         title: strip_tags(&text(&publication.title)),
         authors: author_names(store, publication)?,
         section: section_title(store, publication)?,
         publication_date: publication
            .date_published
            .map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp()),
         url: submission.url_published,
         discipline: list(&publication.disciplines),
         subject: list(&publication.subjects),
         keyword: list(&publication.keywords),
         kind: text(&publication.kind),
         coverage: list(&publication.coverage),
         body,
      })
   }

   /// Splits HTML into wrapped, markup-free paragraphs.
   pub fn chunk(&self, content: &str) -> Vec<String> {
      chunk_content(content, self.wrap_width)
   }
}

/// Decodes entities, then splits `content` on `<p>` openers. Closing `</p>`
/// tags are dropped first, so text trailing a paragraph joins it. Each piece
/// is stripped of markup and soft-wrapped at `width`; blank pieces are
/// dropped.
pub fn chunk_content(content: &str, width: usize) -> Vec<String> {
   if content.trim().is_empty() {
      return Vec::new();
   }

   let decoded = decode_html_entities(content);
   let unclosed = PARAGRAPH_CLOSE.replace_all(&decoded, "");
   PARAGRAPH_OPEN
      .split(&unclosed)
      .map(|piece| wordwrap(strip_tags(piece).trim(), width))
      .filter(|chunk| !chunk.trim().is_empty())
      .collect()
}

/// `fragment` with every tag removed. Entities are left alone.
pub fn strip_tags(fragment: &str) -> String {
   TAG.replace_all(fragment, "").into_owned()
}

/// Inner HTML of a galley's `<body>`, so head and title text is never indexed.
fn galley_body(html: &str) -> String {
   let document = Html::parse_document(html);
   document
      .select(&BODY)
      .next()
      .map(|body| body.inner_html())
      .unwrap_or_default()
}

/// Inserts line breaks at spaces so no line exceeds `width` characters.
///
/// Words longer than `width` are kept whole on their own line. Existing line
/// breaks are preserved and reset the running width.
pub fn wordwrap(text: &str, width: usize) -> String {
   let width = width.max(1);
   let mut out = String::with_capacity(text.len());

   for (line_idx, line) in text.split('\n').enumerate() {
      if line_idx > 0 {
         out.push('\n');
      }

      let mut line_len = 0usize;
      for (word_idx, word) in line.split(' ').enumerate() {
         let word_len = word.chars().count();
         if word_idx > 0 {
            if line_len > 0 && line_len + 1 + word_len > width {
               out.push('\n');
               line_len = 0;
            } else {
               out.push(' ');
               line_len += 1;
            }
         }
         out.push_str(word);
         line_len += word_len;
      }
   }

   out
}

fn galley_html(publication: &Publication) -> String {
   let mut contents = String::new();
   for galley in publication.galleys.iter().filter(|g| g.is_html()) {
      if let Some(inline) = &galley.contents {
         contents.push_str(&galley_body(inline));
      } else if let Some(path) = &galley.path {
         match fs::read_to_string(path) {
            Ok(html) => contents.push_str(&galley_body(&html)),
            Err(e) => {
               tracing::warn!("Failed to read galley {}: {}", path.display(), e);
            },
         }
      }
   }
   contents
}

fn author_names<S: EntityStore + ?Sized>(store: &S, publication: &Publication) -> Result<String> {
   let mut names = Vec::with_capacity(publication.author_ids.len());
   for &id in &publication.author_ids {
      let author = store
         .author(id)?
         .ok_or_else(|| Error::invalid_record("author", id))?;
      names.push(author.full_name(&publication.locale));
   }
   Ok(names.join(", "))
}

fn section_title<S: EntityStore + ?Sized>(store: &S, publication: &Publication) -> Result<String> {
   let Some(section_id) = publication.section_id else {
      return Ok(String::new());
   };
   let section = store
      .section(section_id)?
      .ok_or_else(|| Error::invalid_record("section", section_id))?;
   Ok(localized(&section.title, &publication.locale)
      .cloned()
      .unwrap_or_default())
}
