//! Remote search index abstraction with Algolia and in-memory
//! implementations.

mod algolia;
mod memory;

pub use algolia::AlgoliaIndex;
pub use memory::{IndexCall, MemoryIndex};

use crate::{
   error::AdapterError,
   types::{BatchOperation, JournalId},
};

/// Result type for adapter calls.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Write-side operations against a hosted search index.
///
/// Implementations must not retry: a failed call is reported once and the
/// caller decides what to do with it.
#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
   /// Applies `operations` in order. Adds may be split into several requests
   /// of at most [`Self::max_batch_len`] operations.
   async fn submit_batch(&self, operations: &[BatchOperation]) -> AdapterResult<()>;

   /// Removes every entry from the index.
   async fn clear_index(&self) -> AdapterResult<()>;

   /// Removes every entry belonging to one journal.
   async fn clear_collection(&self, journal_id: JournalId) -> AdapterResult<()>;

   /// Removes every entry sharing `distinct_id`.
   async fn delete_by_distinct_id(&self, distinct_id: &str) -> AdapterResult<()>;

   /// Names of the indexes visible to the configured credentials.
   async fn list_indexes(&self) -> AdapterResult<Vec<String>>;

   fn max_batch_len(&self) -> usize;
}

#[async_trait::async_trait]
impl<T: SearchIndex + ?Sized> SearchIndex for std::sync::Arc<T> {
   async fn submit_batch(&self, operations: &[BatchOperation]) -> AdapterResult<()> {
      (**self).submit_batch(operations).await
   }

   async fn clear_index(&self) -> AdapterResult<()> {
      (**self).clear_index().await
   }

   async fn clear_collection(&self, journal_id: JournalId) -> AdapterResult<()> {
      (**self).clear_collection(journal_id).await
   }

   async fn delete_by_distinct_id(&self, distinct_id: &str) -> AdapterResult<()> {
      (**self).delete_by_distinct_id(distinct_id).await
   }

   async fn list_indexes(&self) -> AdapterResult<Vec<String>> {
      (**self).list_indexes().await
   }

   fn max_batch_len(&self) -> usize {
      (**self).max_batch_len()
   }
}
