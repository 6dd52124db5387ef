//! Lightweight in-process index for tests and offline tooling.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::{AdapterResult, SearchIndex};
use crate::{
   error::AdapterError,
   types::{BatchOperation, IndexEntry, JournalId},
};

/// One successfully applied mutation, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
   Add { object_id: String },
   Delete { distinct_id: String },
   ClearIndex,
   ClearCollection { journal_id: JournalId },
}

#[derive(Default)]
struct State {
   entries: BTreeMap<String, IndexEntry>,
   calls:   Vec<IndexCall>,
   failure: Option<String>,
   /// Calls still allowed before a single injected failure.
   pending: Option<(usize, String)>,
}

impl State {
   fn check(&mut self) -> AdapterResult<()> {
      if let Some((allowed, reason)) = self.pending.take() {
         if allowed == 0 {
            return Err(AdapterError::Unavailable(reason));
         }
         self.pending = Some((allowed - 1, reason));
      }
      match &self.failure {
         Some(reason) => Err(AdapterError::Unavailable(reason.clone())),
         None => Ok(()),
      }
   }

   fn delete(&mut self, distinct_id: &str) {
      self.entries.retain(|_, e| e.distinct_id != distinct_id);
      self
         .calls
         .push(IndexCall::Delete { distinct_id: distinct_id.to_string() });
   }
}

/// Index kept in memory, keyed by `objectID`.
pub struct MemoryIndex {
   state:     Mutex<State>,
   max_batch: usize,
}

impl Default for MemoryIndex {
   fn default() -> Self {
      Self::new(crate::config::MAX_BATCH_SIZE_CAP)
   }
}

impl MemoryIndex {
   pub fn new(max_batch: usize) -> Self {
      Self { state: Mutex::new(State::default()), max_batch: max_batch.max(1) }
   }

   /// Makes every following call fail with `reason` until [`Self::recover`].
   pub fn fail_with(&self, reason: impl Into<String>) {
      self.state.lock().failure = Some(reason.into());
   }

   /// Lets `calls` adapter calls succeed, fails the next one with `reason`,
   /// then behaves normally again.
   pub fn fail_once_after(&self, calls: usize, reason: impl Into<String>) {
      self.state.lock().pending = Some((calls, reason.into()));
   }

   pub fn recover(&self) {
      let mut state = self.state.lock();
      state.failure = None;
      state.pending = None;
   }

   pub fn entries(&self) -> Vec<IndexEntry> {
      self.state.lock().entries.values().cloned().collect()
   }

   /// Entries sharing `distinct_id`, sorted by `order`.
   pub fn entries_for(&self, distinct_id: &str) -> Vec<IndexEntry> {
      let mut entries: Vec<IndexEntry> = self
         .state
         .lock()
         .entries
         .values()
         .filter(|e| e.distinct_id == distinct_id)
         .cloned()
         .collect();
      entries.sort_by_key(|e| e.order);
      entries
   }

   pub fn len(&self) -> usize {
      self.state.lock().entries.len()
   }

   pub fn is_empty(&self) -> bool {
      self.len() == 0
   }

   pub fn calls(&self) -> Vec<IndexCall> {
      self.state.lock().calls.clone()
   }

   pub fn take_calls(&self) -> Vec<IndexCall> {
      std::mem::take(&mut self.state.lock().calls)
   }
}

#[async_trait::async_trait]
impl SearchIndex for MemoryIndex {
   async fn submit_batch(&self, operations: &[BatchOperation]) -> AdapterResult<()> {
      let mut state = self.state.lock();
      state.check()?;
      for operation in operations {
         match operation {
            BatchOperation::Add(entry) => {
               state
                  .calls
                  .push(IndexCall::Add { object_id: entry.object_id.clone() });
               state.entries.insert(entry.object_id.clone(), entry.clone());
            },
            BatchOperation::Delete { distinct_id } => state.delete(distinct_id),
         }
      }
      Ok(())
   }

   async fn clear_index(&self) -> AdapterResult<()> {
      let mut state = self.state.lock();
      state.check()?;
      state.entries.clear();
      state.calls.push(IndexCall::ClearIndex);
      Ok(())
   }

   async fn clear_collection(&self, journal_id: JournalId) -> AdapterResult<()> {
      let mut state = self.state.lock();
      state.check()?;
      state.entries.retain(|_, e| e.journal_id != journal_id);
      state.calls.push(IndexCall::ClearCollection { journal_id });
      Ok(())
   }

   async fn delete_by_distinct_id(&self, distinct_id: &str) -> AdapterResult<()> {
      let mut state = self.state.lock();
      state.check()?;
      state.delete(distinct_id);
      Ok(())
   }

   async fn list_indexes(&self) -> AdapterResult<Vec<String>> {
      self.state.lock().check()?;
      Ok(vec!["memory".to_string()])
   }

   fn max_batch_len(&self) -> usize {
      self.max_batch
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[tokio::test]
   async fn one_shot_failure_hits_only_the_chosen_call() {
      let index = MemoryIndex::default();
      index.fail_once_after(1, "blip");

      assert!(index.clear_index().await.is_ok());
      assert!(matches!(index.clear_index().await, Err(AdapterError::Unavailable(r)) if r == "blip"));
      assert!(index.clear_index().await.is_ok());
      assert_eq!(index.calls(), vec![IndexCall::ClearIndex, IndexCall::ClearIndex]);
   }
}
