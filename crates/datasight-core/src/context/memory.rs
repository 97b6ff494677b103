use crate::constants::{limits, storage};
use crate::context::persistence::{self, KeyValueStore};
use crate::error::DataSightError;
use crate::ingest::FileRecord;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Metadata about one analyzed file batch. Never holds file content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFingerprint {
    pub timestamp: String,
    pub file_count: usize,
    pub file_names: Vec<String>,
    pub file_types: Vec<String>,
}

impl DatasetFingerprint {
    /// Fingerprint a batch, stamped with the current UTC time.
    pub fn from_files(files: &[FileRecord]) -> Self {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::at(timestamp, files)
    }

    pub fn at(timestamp: impl Into<String>, files: &[FileRecord]) -> Self {
        Self {
            timestamp: timestamp.into(),
            file_count: files.len(),
            file_names: files.iter().map(|f| f.name.clone()).collect(),
            file_types: files.iter().map(|f| f.mime_type.clone()).collect(),
        }
    }
}

/// Bounded, chronologically ordered record of recent dataset fingerprints.
/// Survives conversation restarts; oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct DatasetMemory {
    entries: VecDeque<DatasetFingerprint>,
    capacity: usize,
}

impl DatasetMemory {
    pub fn new() -> Self {
        Self::with_capacity(limits::DATASET_MEMORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Restore from durable storage. Missing or corrupt data yields an empty memory.
    pub fn load(store: &dyn KeyValueStore, capacity: usize) -> Self {
        let mut memory = Self::with_capacity(capacity);
        if let Some(saved) =
            persistence::load_json::<Vec<DatasetFingerprint>>(store, storage::DATASET_MEMORY_KEY)
        {
            for fingerprint in saved {
                memory.push_bounded(fingerprint);
            }
        }
        memory
    }

    pub fn record(&mut self, fingerprint: DatasetFingerprint) {
        tracing::debug!(
            files = fingerprint.file_count,
            "recording dataset fingerprint"
        );
        self.push_bounded(fingerprint);
    }

    fn push_bounded(&mut self, fingerprint: DatasetFingerprint) {
        self.entries.push_back(fingerprint);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Serialize the full memory for durable storage.
    pub fn snapshot(&self) -> Result<String, DataSightError> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    pub fn persist(&self, store: &dyn KeyValueStore) -> Result<(), DataSightError> {
        store.set(storage::DATASET_MEMORY_KEY, &self.snapshot()?)
    }

    pub fn entries(&self) -> impl Iterator<Item = &DatasetFingerprint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Count of each file type across all fingerprints, in first-seen order.
    pub fn type_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for file_type in self.entries.iter().flat_map(|e| e.file_types.iter()) {
            match counts.iter_mut().find(|(t, _)| t == file_type) {
                Some((_, count)) => *count += 1,
                None => counts.push((file_type.clone(), 1)),
            }
        }
        counts
    }
}

impl Default for DatasetMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::persistence::InMemoryStore;

    fn fingerprint(ts: &str, types: &[&str]) -> DatasetFingerprint {
        DatasetFingerprint {
            timestamp: ts.to_string(),
            file_count: types.len(),
            file_names: types.iter().enumerate().map(|(i, _)| format!("f{i}")).collect(),
            file_types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_record_evicts_oldest_first() {
        let mut memory = DatasetMemory::new();
        for i in 1..=11 {
            memory.record(fingerprint(&format!("t{i}"), &["text/csv"]));
            assert!(memory.len() <= 10);
        }

        let stamps: Vec<&str> = memory.entries().map(|e| e.timestamp.as_str()).collect();
        let expected: Vec<String> = (2..=11).map(|i| format!("t{i}")).collect();
        assert_eq!(stamps, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_type_counts_first_seen_order() {
        let mut memory = DatasetMemory::new();
        memory.record(fingerprint("t1", &["image/png", "text/csv"]));
        memory.record(fingerprint("t2", &["text/csv", "text/csv", "application/pdf"]));

        assert_eq!(
            memory.type_counts(),
            vec![
                ("image/png".to_string(), 1),
                ("text/csv".to_string(), 3),
                ("application/pdf".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_fingerprint_serializes_camel_case() {
        let json = serde_json::to_value(fingerprint("t1", &["text/csv"])).unwrap();
        assert_eq!(json["fileCount"], 1);
        assert_eq!(json["fileTypes"][0], "text/csv");
        assert!(json.get("file_count").is_none());
    }

    #[test]
    fn test_load_resets_on_corrupt_data() {
        let store = InMemoryStore::new();
        store.set(storage::DATASET_MEMORY_KEY, "definitely not json").unwrap();
        let memory = DatasetMemory::load(&store, 10);
        assert!(memory.is_empty());
    }

    #[test]
    fn test_persist_then_load_respects_capacity() {
        let store = InMemoryStore::new();
        let mut memory = DatasetMemory::with_capacity(10);
        for i in 0..10 {
            memory.record(fingerprint(&format!("t{i}"), &["image/png"]));
        }
        memory.persist(&store).unwrap();

        let smaller = DatasetMemory::load(&store, 4);
        assert_eq!(smaller.len(), 4);
        assert_eq!(smaller.entries().next().unwrap().timestamp, "t6");
    }
}
