//! Document Model & Store (C2): the canonical Document record, the
//! compression/rehydration contract, and the tracking-store persistence
//! layer.

mod compression;
mod error;
mod model;
mod postgres_store;
mod tracking_store;

pub use compression::{load_document, serialize_document, CompressedPayload, DocumentPayload};
pub use error::DocumentError;
pub use model::{
    merge_metering, Document, DocumentErrorEntry, DocumentStatus, Location, Metering, Page, Section,
};
pub use postgres_store::{PostgresConfig, PostgresTrackingStore};
pub use tracking_store::{InMemoryTrackingStore, TrackingRecord, TrackingStore};
