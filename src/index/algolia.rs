//! Algolia REST client for batch writes, clears and filtered deletes.
//!
//! `deleteBy` on `distinctId` is a facet filter, which Algolia only honors
//! for attributes declared in `attributesForFaceting`. The client declares
//! both filter attributes once, before its first filtered delete.

use std::sync::Arc;

use reqwest::{
   Client, RequestBuilder, Url,
   header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use super::{AdapterResult, SearchIndex};
use crate::{
   Result,
   config::AdapterSettings,
   error::{AdapterError, ConfigError},
   types::{BatchOperation, IndexEntry, JournalId},
};

/// Attributes the index must accept in `deleteBy` filters.
pub const FILTER_ATTRIBUTES: [&str; 2] = ["filterOnly(distinctId)", "filterOnly(journalId)"];

/// Talks to one Algolia index. Every call is attempted exactly once.
#[derive(Clone)]
pub struct AlgoliaIndex {
   client:    Client,
   base_url:  Url,
   index:     String,
   max_batch: usize,
   faceting:  Arc<OnceCell<()>>,
}

impl AlgoliaIndex {
   pub fn new(settings: &AdapterSettings) -> Result<Self> {
      let base_url = Url::parse(&settings.base_url)
         .map_err(|e| ConfigError::InvalidSetting(format!("host {}: {e}", settings.base_url)))?;
      if base_url.cannot_be_a_base() {
         return Err(
            ConfigError::InvalidSetting(format!("host {} is not a base URL", settings.base_url))
               .into(),
         );
      }

      let mut headers = HeaderMap::new();
      headers.insert(
         "X-Algolia-Application-Id",
         header_value(&settings.app_id, "app_id")?,
      );
      headers.insert("X-Algolia-API-Key", header_value(&settings.api_key, "admin_key")?);
      headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

      let client = Client::builder()
         .timeout(settings.timeout)
         .default_headers(headers)
         .build()
         .map_err(AdapterError::Request)?;

      Ok(Self {
         client,
         base_url,
         index: settings.index.clone(),
         max_batch: settings.max_batch.max(1),
         faceting: Arc::new(OnceCell::new()),
      })
   }

   pub fn index_name(&self) -> &str {
      &self.index
   }

   fn endpoint(&self, segments: &[&str]) -> AdapterResult<Url> {
      let mut url = self.base_url.clone();
      url.path_segments_mut()
         .map_err(|()| AdapterError::Endpoint(self.base_url.to_string()))?
         .pop_if_empty()
         .extend(segments);
      Ok(url)
   }

   async fn send(
      &self,
      op: &'static str,
      request: RequestBuilder,
   ) -> AdapterResult<reqwest::Response> {
      let response = request.send().await?;
      let status = response.status();
      if status.is_success() {
         return Ok(response);
      }
      let body = response
         .text()
         .await
         .unwrap_or_else(|_| "<body unavailable>".to_string());
      Err(AdapterError::Status { op, status: status.as_u16(), body })
   }

   async fn add_entries(&self, entries: &[&IndexEntry]) -> AdapterResult<()> {
      for chunk in entries.chunks(self.max_batch) {
         let url = self.endpoint(&["1", "indexes", "*", "batch"])?;
         let payload = batch_payload(&self.index, chunk);
         self.send("batch", self.client.post(url).json(&payload)).await?;
         tracing::debug!(index = %self.index, entries = chunk.len(), "batch submitted");
      }
      Ok(())
   }

   /// Declares [`FILTER_ATTRIBUTES`] for faceting. Runs at most once per
   /// client; a failed attempt is retried by the next filtered delete.
   pub async fn ensure_faceting(&self) -> AdapterResult<()> {
      self
         .faceting
         .get_or_try_init(|| async {
            let url = self.endpoint(&["1", "indexes", &self.index, "settings"])?;
            let body = SettingsRequest { attributes_for_faceting: &FILTER_ATTRIBUTES };
            self.send("settings", self.client.put(url).json(&body)).await?;
            tracing::info!(index = %self.index, "filter attributes declared");
            Ok::<(), AdapterError>(())
         })
         .await?;
      Ok(())
   }

   async fn delete_by_filter(&self, filters: String) -> AdapterResult<()> {
      self.ensure_faceting().await?;
      let url = self.endpoint(&["1", "indexes", &self.index, "deleteBy"])?;
      let body = DeleteByRequest { filters };
      self.send("deleteBy", self.client.post(url).json(&body)).await?;
      Ok(())
   }
}

fn header_value(value: &str, name: &str) -> Result<HeaderValue> {
   Ok(
      HeaderValue::from_str(value.trim())
         .map_err(|_| ConfigError::InvalidSetting(format!("{name} is not a valid header value")))?,
   )
}

#[derive(Serialize)]
struct BatchRequest<'a> {
   requests: Vec<BatchItem<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchItem<'a> {
   action:     &'static str,
   index_name: &'a str,
   body:       &'a IndexEntry,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsRequest<'a> {
   attributes_for_faceting: &'a [&'a str],
}

#[derive(Serialize)]
struct DeleteByRequest {
   filters: String,
}

#[derive(Deserialize)]
struct ListIndicesResponse {
   #[serde(default)]
   items: Vec<IndexItem>,
}

#[derive(Deserialize)]
struct IndexItem {
   name: String,
}

fn batch_payload<'a>(index: &'a str, entries: &[&'a IndexEntry]) -> BatchRequest<'a> {
   BatchRequest {
      requests: entries
         .iter()
         .map(|body| BatchItem { action: "addObject", index_name: index, body })
         .collect(),
   }
}

fn distinct_filter(distinct_id: &str) -> String {
   format!("distinctId:\"{}\"", distinct_id.replace('"', "\\\""))
}

fn journal_filter(journal_id: JournalId) -> String {
   format!("journalId={}", journal_id.0)
}

#[async_trait::async_trait]
impl SearchIndex for AlgoliaIndex {
   async fn submit_batch(&self, operations: &[BatchOperation]) -> AdapterResult<()> {
      let mut pending: Vec<&IndexEntry> = Vec::new();
      for operation in operations {
         match operation {
            BatchOperation::Add(entry) => pending.push(entry),
            BatchOperation::Delete { distinct_id } => {
               self.add_entries(&pending).await?;
               pending.clear();
               self.delete_by_distinct_id(distinct_id).await?;
            },
         }
      }
      self.add_entries(&pending).await
   }

   async fn clear_index(&self) -> AdapterResult<()> {
      let url = self.endpoint(&["1", "indexes", &self.index, "clear"])?;
      self.send("clear", self.client.post(url)).await?;
      tracing::info!(index = %self.index, "index cleared");
      Ok(())
   }

   async fn clear_collection(&self, journal_id: JournalId) -> AdapterResult<()> {
      self.delete_by_filter(journal_filter(journal_id)).await
   }

   async fn delete_by_distinct_id(&self, distinct_id: &str) -> AdapterResult<()> {
      self.delete_by_filter(distinct_filter(distinct_id)).await
   }

   async fn list_indexes(&self) -> AdapterResult<Vec<String>> {
      let url = self.endpoint(&["1", "indexes"])?;
      let response = self.send("listIndexes", self.client.get(url)).await?;
      let payload: ListIndicesResponse = response
         .json()
         .await
         .map_err(|e| AdapterError::Decode { op: "listIndexes", reason: e.to_string() })?;
      Ok(payload.items.into_iter().map(|item| item.name).collect())
   }

   fn max_batch_len(&self) -> usize {
      self.max_batch
   }
}
