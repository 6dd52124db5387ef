mod support;

use std::fs;

use proptest::prelude::*;
use pubsync::{
   Error,
   format::{Formatter, chunk_content, wordwrap},
   types::{Galley, JournalId, SectionId},
};
use support::{Fixture, html_galley};
use tempfile::TempDir;

#[test]
fn hello_world_becomes_one_entry() {
   let mut fx = Fixture::new();
   let j = fx.journal(3, "Journal");
   let (_, id) = fx.article(j, "<p>Hello world</p>");
   let store = fx.store();
   let publication = store_publication(&store, id);

   let entries = Formatter::default()
      .format(&*store, &publication)
      .expect("format");
   assert_eq!(entries.len(), 1);

   let entry = &entries[0];
   assert_eq!(entry.body, "Hello world");
   assert_eq!(entry.distinct_id, id.to_string());
   assert_eq!(entry.object_id, format!("{id}_1"));
   assert_eq!(entry.order, 1);
   assert_eq!(entry.journal_id, JournalId(3));
   assert_eq!(entry.title, format!("Article {id}"));
   assert_eq!(entry.url, "https://journal.example/article/view/1");
   assert_eq!(entry.keyword, vec!["search".to_string()]);
   // 2020-01-02T00:00:00Z
   assert_eq!(entry.publication_date, Some(1_577_923_200));
}

#[test]
fn empty_paragraph_is_dropped_and_order_is_kept() {
   let mut fx = Fixture::new();
   let j = fx.journal(1, "Journal");
   let (_, id) = fx.article(j, "<p>First</p><p></p><p>Second</p>");
   let store = fx.store();

   let entries = Formatter::default()
      .format(&*store, &store_publication(&store, id))
      .expect("format");
   let got: Vec<_> = entries
      .iter()
      .map(|e| (e.order, e.body.as_str(), e.distinct_id.as_str()))
      .collect();
   let distinct = id.to_string();
   assert_eq!(got, vec![(1, "First", distinct.as_str()), (2, "Second", distinct.as_str())]);
}

#[test]
fn galley_paragraphs_follow_the_abstract() {
   let mut fx = Fixture::new();
   let j = fx.journal(1, "Journal");
   let (_, id) = fx.article(j, "<p>Abstract</p>");
   fx.edit(id, |p| {
      p.galleys = vec![
         html_galley(
            "<html><head><title>Galley</title></head><body><p>Body one</p><p>Fish &amp; \
             chips</p></body></html>",
         ),
         Galley {
            id:        2,
            file_type: "application/pdf".into(),
            path:      None,
            contents:  Some("<p>pdf</p>".into()),
         },
      ];
   });
   let store = fx.store();

   let entries = Formatter::default()
      .format(&*store, &store_publication(&store, id))
      .expect("format");
   let bodies: Vec<_> = entries.iter().map(|e| e.body.as_str()).collect();
   assert_eq!(bodies, vec!["Abstract", "Body one", "Fish & chips"]);
   assert_eq!(
      entries.iter().map(|e| e.order).collect::<Vec<_>>(),
      vec![1, 2, 3]
   );
}

#[test]
fn galley_files_are_read_from_disk() {
   let dir = TempDir::new().expect("temp dir");
   let path = dir.path().join("galley.html");
   fs::write(&path, "<p>From disk</p>").expect("write galley");

   let mut fx = Fixture::new();
   let j = fx.journal(1, "Journal");
   let (_, id) = fx.article(j, "");
   fx.edit(id, |p| {
      p.galleys = vec![
         Galley { id: 1, file_type: "text/html".into(), path: Some(path), contents: None },
         Galley {
            id:        2,
            file_type: "text/html".into(),
            path:      Some(dir.path().join("missing.html")),
            contents:  None,
         },
      ];
   });
   let store = fx.store();

   let entries = Formatter::default()
      .format(&*store, &store_publication(&store, id))
      .expect("format");
   assert_eq!(entries.len(), 1);
   assert_eq!(entries[0].body, "From disk");
}

#[test]
fn no_text_means_no_entries() {
   let mut fx = Fixture::new();
   let j = fx.journal(1, "Journal");
   let (_, id) = fx.article(j, "");
   let store = fx.store();

   let entries = Formatter::default()
      .format(&*store, &store_publication(&store, id))
      .expect("format");
   assert!(entries.is_empty());
}

#[test]
fn missing_section_is_an_invalid_record() {
   let mut fx = Fixture::new();
   let j = fx.journal(1, "Journal");
   let (_, id) = fx.article(j, "<p>text</p>");
   fx.edit(id, |p| p.section_id = Some(SectionId(77)));
   let store = fx.store();

   let err = Formatter::default()
      .format(&*store, &store_publication(&store, id))
      .unwrap_err();
   assert!(matches!(err, Error::InvalidRecord { kind: "section", .. }));
   assert_eq!(err.exit_code(), 3);
}

#[test]
fn publication_without_section_has_empty_section() {
   let mut fx = Fixture::new();
   let j = fx.journal(1, "Journal");
   let (_, id) = fx.article(j, "<p>text</p>");
   fx.edit(id, |p| {
      p.section_id = None;
      p.date_published = None;
   });
   let store = fx.store();

   let entries = Formatter::default()
      .format(&*store, &store_publication(&store, id))
      .expect("format");
   assert_eq!(entries[0].section, "");
   assert_eq!(entries[0].publication_date, None);
}

#[test]
fn long_paragraphs_are_wrapped() {
   let words = "word ".repeat(120);
   let chunks = Formatter::new(40).chunk(&format!("<p>{words}</p>"));
   assert_eq!(chunks.len(), 1);
   assert!(chunks[0].lines().count() > 1);
   assert!(chunks[0].lines().all(|l| l.chars().count() <= 40));
}

fn store_publication(
   store: &pubsync::store::CatalogStore,
   id: pubsync::types::PublicationId,
) -> pubsync::types::Publication {
   use pubsync::store::EntityStore;
   store
      .publication(id)
      .expect("lookup")
      .expect("publication exists")
}

proptest! {
   #[test]
   fn whitespace_and_markup_yield_nothing(
      parts in prop::collection::vec(prop_oneof![
         Just(" "), Just("\n"), Just("\t"), Just("<p>"), Just("</p>"),
         Just("<p class=\"x\">"), Just("<br/>"), Just("<span></span>"),
      ], 0..20)
   ) {
      let content: String = parts.concat();
      prop_assert!(chunk_content(&content, 250).is_empty());
   }

   #[test]
   fn chunking_plain_text_is_stable(words in prop::collection::vec("[a-z]{1,12}", 1..80)) {
      let text = words.join(" ");
      let once = chunk_content(&format!("<p>{text}</p>"), 30);
      prop_assert_eq!(once.len(), 1);
      let again = chunk_content(&once[0], 30);
      prop_assert_eq!(&again, &once);
   }

   #[test]
   fn wordwrap_never_loses_words(words in prop::collection::vec("[a-z]{1,20}", 0..60), width in 1usize..60) {
      let text = words.join(" ");
      let wrapped = wordwrap(&text, width);
      prop_assert_eq!(wrapped.replace('\n', " "), text);
   }
}
