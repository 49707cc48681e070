//! Admission control (C3, §4.3): dedup by input location, a backpressure
//! watermark on queue depth, and a `max_in_flight` semaphore gating how many
//! documents may be `RUNNING` at once. Grounded on the bounded-concurrency
//! pattern used for bulk execution: a shared `tokio::sync::Semaphore` handed
//! out as an owned permit per in-flight unit of work.

use idp_core::config::AdmissionConfig;
use idp_document::{Document, DocumentStatus, Location};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

use crate::error::IntakeError;

fn location_key(location: &Location) -> String {
    format!("{}/{}", location.bucket, location.key)
}

/// A pending intake event: a new object observed in the input bucket.
pub struct IntakeEvent {
    pub input_location: Location,
    pub output_location: String,
}

pub struct AdmissionController {
    permits: Arc<Semaphore>,
    queue_depth: AtomicUsize,
    queue_watermark_high: usize,
    in_flight_by_location: Mutex<HashMap<String, DocumentStatus>>,
}

impl AdmissionController {
    pub fn new(cfg: &AdmissionConfig) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(cfg.max_in_flight)),
            queue_depth: AtomicUsize::new(0),
            queue_watermark_high: cfg.queue_watermark_high,
            in_flight_by_location: Mutex::new(HashMap::new()),
        }
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::SeqCst)
    }

    /// Admit a new event: enforce dedup (B4) and the backpressure watermark,
    /// then create the initial `Document(QUEUED)`. Callers are responsible
    /// for persisting the returned document through the tracking store.
    pub fn admit(&self, event: IntakeEvent, document_id: impl Into<String>) -> Result<Document, IntakeError> {
        let key = location_key(&event.input_location);
        let mut in_flight = self.in_flight_by_location.lock().unwrap();

        if let Some(status) = in_flight.get(&key) {
            if !status.is_terminal() {
                return Err(IntakeError::AlreadyRunning);
            }
        }

        if self.queue_depth.load(Ordering::SeqCst) >= self.queue_watermark_high {
            return Err(IntakeError::BackPressure);
        }

        let doc = Document::new(document_id, event.input_location, event.output_location);
        in_flight.insert(key, DocumentStatus::Queued);
        self.queue_depth.fetch_add(1, Ordering::SeqCst);
        debug!(document_id = %doc.id, "admitted for intake");
        Ok(doc)
    }

    /// Block until a `max_in_flight` slot frees up, then release this
    /// document's queue-depth slot and mark it `Running` (P7: the permit
    /// count never exceeds `max_in_flight`).
    pub async fn acquire_run_permit(&self, location: &Location) -> OwnedSemaphorePermit {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed");
        self.queue_depth.fetch_sub(1, Ordering::SeqCst);
        self.mark_status(location, DocumentStatus::Running);
        permit
    }

    pub fn mark_status(&self, location: &Location, status: DocumentStatus) {
        let mut in_flight = self.in_flight_by_location.lock().unwrap();
        in_flight.insert(location_key(location), status);
    }

    /// Drop the dedup entry once a document reaches a terminal state, so a
    /// later event for the same location starts a fresh attempt.
    pub fn complete(&self, location: &Location) {
        let key = location_key(location);
        let mut in_flight = self.in_flight_by_location.lock().unwrap();
        if in_flight.remove(&key).is_some() {
            info!(location = %key, "cleared intake dedup entry");
        }
    }
}
