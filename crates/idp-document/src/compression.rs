//! The Compressed Payload transport contract (§3, §4.2): orchestration hops
//! either carry the document inline or a storage reference, and every
//! reader must accept both shapes and normalize.

use crate::error::DocumentError;
use crate::model::Document;
use idp_blob_store::BlobStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedPayload {
    pub document_id: String,
    pub storage_uri: String,
    /// Preserved so downstream map-fan-out can proceed without rehydrating
    /// the whole document per section.
    pub section_ids: Vec<String>,
    pub compressed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentPayload {
    Compressed(CompressedPayload),
    Inline(Document),
}

/// Serialize `doc`, writing it to the blob store and returning a
/// `CompressedPayload` reference if the encoded size exceeds
/// `threshold_bytes`; otherwise returns the document inline (B3: exactly at
/// threshold stays inline, one byte over compresses).
pub async fn serialize_document(
    doc: &Document,
    blobs: &dyn BlobStore,
    threshold_bytes: usize,
    step: &str,
) -> Result<DocumentPayload, DocumentError> {
    let bytes = serde_json::to_vec(doc)?;
    if bytes.len() <= threshold_bytes {
        return Ok(DocumentPayload::Inline(doc.clone()));
    }

    let key = format!("compressed/{}/{}.json", doc.id, step);
    let storage_uri = blobs.put(&key, &bytes, "application/json").await?;

    Ok(DocumentPayload::Compressed(CompressedPayload {
        document_id: doc.id.clone(),
        storage_uri,
        section_ids: doc.sections.iter().map(|s| s.section_id.clone()).collect(),
        compressed: true,
    }))
}

/// Rehydrate a `DocumentPayload` back into a `Document`, accepting either
/// shape (R2, P5).
pub async fn load_document(
    payload: &DocumentPayload,
    blobs: &dyn BlobStore,
) -> Result<Document, DocumentError> {
    match payload {
        DocumentPayload::Inline(doc) => Ok(doc.clone()),
        DocumentPayload::Compressed(envelope) => {
            let bytes = idp_blob_store::get_with_eventual_consistency_retry(
                blobs,
                &envelope.storage_uri,
            )
            .await?;
            let doc: Document = serde_json::from_slice(&bytes)?;
            Ok(doc)
        }
    }
}
