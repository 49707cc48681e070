//! Intake & Admission (C3, §4.3): turns object-creation events into
//! `Document(QUEUED)` records and gates how many may run concurrently.

mod admission;
mod error;

pub use admission::{AdmissionController, IntakeEvent};
pub use error::IntakeError;

use idp_document::TrackingStore;
use tracing::info;
use uuid::Uuid;

/// Admit an event and persist the resulting `Document(QUEUED)` through the
/// tracking store. Returns the created document's id.
pub async fn intake(
    controller: &AdmissionController,
    tracking: &dyn TrackingStore,
    event: IntakeEvent,
) -> Result<String, IntakeError> {
    let document_id = Uuid::new_v4().to_string();
    let doc = controller.admit(event, document_id)?;
    let record = idp_document::TrackingRecord::from(&doc);
    tracking.upsert(record).await?;
    info!(document_id = %doc.id, "document queued");
    Ok(doc.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_core::config::AdmissionConfig;
    use idp_document::{InMemoryTrackingStore, Location};

    #[tokio::test]
    async fn intake_persists_a_queued_document() {
        let controller = AdmissionController::new(&AdmissionConfig { max_in_flight: 4, queue_watermark_high: 100 });
        let tracking = InMemoryTrackingStore::default();
        let event = IntakeEvent {
            input_location: Location { bucket: "in".to_string(), key: "a.pdf".to_string() },
            output_location: "out/a".to_string(),
        };
        let id = intake(&controller, &tracking, event).await.unwrap();
        let record = tracking.get(&id).await.unwrap();
        assert_eq!(record.status, idp_document::DocumentStatus::Queued);
    }

    #[tokio::test]
    async fn duplicate_running_event_is_rejected() {
        let controller = AdmissionController::new(&AdmissionConfig { max_in_flight: 4, queue_watermark_high: 100 });
        let tracking = InMemoryTrackingStore::default();
        let loc = Location { bucket: "in".to_string(), key: "a.pdf".to_string() };

        let id = intake(
            &controller,
            &tracking,
            IntakeEvent { input_location: loc.clone(), output_location: "out/a".to_string() },
        )
        .await
        .unwrap();
        controller.mark_status(&loc, idp_document::DocumentStatus::Running);
        let _ = id;

        let err = intake(
            &controller,
            &tracking,
            IntakeEvent { input_location: loc, output_location: "out/a".to_string() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IntakeError::AlreadyRunning));
    }
}
