//! The key-value tracking store (§4.2): a small, indexable record per
//! document. Nested blobs (full pages/sections) live in C1; this store only
//! ever holds status, timestamps, counters, and the last known output uris.

use crate::error::DocumentError;
use crate::model::{Document, DocumentErrorEntry, DocumentStatus, Metering};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub document_id: String,
    pub status: DocumentStatus,
    pub execution_id: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub num_pages: usize,
    pub errors: Vec<DocumentErrorEntry>,
    pub metering: Metering,
    pub summary_uri: Option<String>,
    pub evaluation_uri: Option<String>,
    pub rule_validation_uri: Option<String>,
    /// Incremented on every write; lets callers opt into a monotonic version
    /// guard instead of plain last-writer-wins.
    pub version: u64,
}

impl From<&Document> for TrackingRecord {
    fn from(doc: &Document) -> Self {
        Self {
            document_id: doc.id.clone(),
            status: doc.status,
            execution_id: doc.execution_id.clone(),
            queued_at: doc.queued_at,
            started_at: doc.started_at,
            completed_at: doc.completed_at,
            num_pages: doc.num_pages,
            errors: doc.errors.clone(),
            metering: doc.metering.clone(),
            summary_uri: doc.summary_uri.clone(),
            evaluation_uri: doc.evaluation_uri.clone(),
            rule_validation_uri: doc.rule_validation_uri.clone(),
            version: 0,
        }
    }
}

#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Last-writer-wins upsert.
    async fn upsert(&self, record: TrackingRecord) -> Result<(), DocumentError>;

    /// Upsert gated on `expected_version` matching the stored version (the
    /// "optional monotonic version guard" in §4.2). `None` skips the check.
    async fn upsert_checked(
        &self,
        record: TrackingRecord,
        expected_version: Option<u64>,
    ) -> Result<(), DocumentError>;

    async fn get(&self, document_id: &str) -> Result<TrackingRecord, DocumentError>;

    async fn list_by_status(&self, status: DocumentStatus) -> Result<Vec<TrackingRecord>, DocumentError>;
}

#[derive(Default)]
pub struct InMemoryTrackingStore {
    records: RwLock<HashMap<String, TrackingRecord>>,
}

impl InMemoryTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingStore for InMemoryTrackingStore {
    async fn upsert(&self, mut record: TrackingRecord) -> Result<(), DocumentError> {
        let mut guard = self.records.write().await;
        let version = guard
            .get(&record.document_id)
            .map(|r| r.version + 1)
            .unwrap_or(0);
        record.version = version;
        guard.insert(record.document_id.clone(), record);
        Ok(())
    }

    async fn upsert_checked(
        &self,
        mut record: TrackingRecord,
        expected_version: Option<u64>,
    ) -> Result<(), DocumentError> {
        let mut guard = self.records.write().await;
        let current_version = guard.get(&record.document_id).map(|r| r.version);
        if let Some(expected) = expected_version {
            if current_version != Some(expected) {
                return Err(DocumentError::TrackingStore(format!(
                    "version conflict for {}: expected {}, found {:?}",
                    record.document_id, expected, current_version
                )));
            }
        }
        record.version = current_version.map(|v| v + 1).unwrap_or(0);
        guard.insert(record.document_id.clone(), record);
        Ok(())
    }

    async fn get(&self, document_id: &str) -> Result<TrackingRecord, DocumentError> {
        self.records
            .read()
            .await
            .get(document_id)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(document_id.to_string()))
    }

    async fn list_by_status(&self, status: DocumentStatus) -> Result<Vec<TrackingRecord>, DocumentError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }
}
