//! PostgreSQL-backed tracking store. Grounded on this workspace's other
//! `tokio_postgres` adapter: same `PostgresConfig` env-var defaulting, same
//! background connection task, same `ON CONFLICT ... DO UPDATE` upsert
//! shape.

use crate::error::DocumentError;
use crate::model::DocumentStatus;
use crate::tracking_store::{TrackingRecord, TrackingStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Client, NoTls};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("IDP_POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("IDP_POSTGRES_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            database: std::env::var("IDP_POSTGRES_DB")
                .unwrap_or_else(|_| "idp_pipeline".to_string()),
            user: std::env::var("IDP_POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("IDP_POSTGRES_PASSWORD").unwrap_or_default(),
        }
    }
}

impl PostgresConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.database, self.user, self.password
        )
    }
}

pub struct PostgresTrackingStore {
    client: Client,
}

impl PostgresTrackingStore {
    pub async fn new(config: PostgresConfig) -> Result<Self, DocumentError> {
        let (client, connection) = tokio_postgres::connect(&config.connection_string(), NoTls)
            .await
            .map_err(|e| DocumentError::TrackingStore(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("postgres tracking store connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    pub async fn init_schema(&self) -> Result<(), DocumentError> {
        self.client
            .execute(
                r"
                CREATE TABLE IF NOT EXISTS documents (
                    document_id TEXT PRIMARY KEY,
                    status TEXT NOT NULL,
                    execution_id TEXT,
                    queued_at TIMESTAMP WITH TIME ZONE NOT NULL,
                    started_at TIMESTAMP WITH TIME ZONE,
                    completed_at TIMESTAMP WITH TIME ZONE,
                    num_pages INTEGER NOT NULL,
                    metering JSONB NOT NULL,
                    errors JSONB NOT NULL,
                    summary_uri TEXT,
                    evaluation_uri TEXT,
                    rule_validation_uri TEXT,
                    version BIGINT NOT NULL
                )
                ",
                &[],
            )
            .await
            .map_err(|e| DocumentError::TrackingStore(e.to_string()))?;

        self.client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status)",
                &[],
            )
            .await
            .map_err(|e| DocumentError::TrackingStore(e.to_string()))?;

        tracing::info!("tracking store schema initialized");
        Ok(())
    }

    fn row_to_record(row: &tokio_postgres::Row) -> Result<TrackingRecord, DocumentError> {
        let status_str: String = row.get(1);
        let status = status_from_str(&status_str)?;
        let metering_json: serde_json::Value = row.get(7);
        let errors_json: serde_json::Value = row.get(8);

        Ok(TrackingRecord {
            document_id: row.get(0),
            status,
            execution_id: row.get(2),
            queued_at: row.get(3),
            started_at: row.get(4),
            completed_at: row.get(5),
            num_pages: row.get::<_, i32>(6) as usize,
            metering: serde_json::from_value(metering_json)?,
            errors: serde_json::from_value(errors_json)?,
            summary_uri: row.get(9),
            evaluation_uri: row.get(10),
            rule_validation_uri: row.get(11),
            version: row.get::<_, i64>(12) as u64,
        })
    }
}

fn status_to_str(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Queued => "QUEUED",
        DocumentStatus::Running => "RUNNING",
        DocumentStatus::Ocr => "OCR",
        DocumentStatus::Classifying => "CLASSIFYING",
        DocumentStatus::Extracting => "EXTRACTING",
        DocumentStatus::Assessing => "ASSESSING",
        DocumentStatus::Postprocessing => "POSTPROCESSING",
        DocumentStatus::Summarizing => "SUMMARIZING",
        DocumentStatus::Evaluating => "EVALUATING",
        DocumentStatus::Completed => "COMPLETED",
        DocumentStatus::Failed => "FAILED",
    }
}

fn status_from_str(s: &str) -> Result<DocumentStatus, DocumentError> {
    Ok(match s {
        "QUEUED" => DocumentStatus::Queued,
        "RUNNING" => DocumentStatus::Running,
        "OCR" => DocumentStatus::Ocr,
        "CLASSIFYING" => DocumentStatus::Classifying,
        "EXTRACTING" => DocumentStatus::Extracting,
        "ASSESSING" => DocumentStatus::Assessing,
        "POSTPROCESSING" => DocumentStatus::Postprocessing,
        "SUMMARIZING" => DocumentStatus::Summarizing,
        "EVALUATING" => DocumentStatus::Evaluating,
        "COMPLETED" => DocumentStatus::Completed,
        "FAILED" => DocumentStatus::Failed,
        other => {
            return Err(DocumentError::TrackingStore(format!(
                "unknown status in tracking store: {other}"
            )))
        }
    })
}

#[async_trait]
impl TrackingStore for PostgresTrackingStore {
    async fn upsert(&self, record: TrackingRecord) -> Result<(), DocumentError> {
        self.upsert_checked(record, None).await
    }

    async fn upsert_checked(
        &self,
        record: TrackingRecord,
        expected_version: Option<u64>,
    ) -> Result<(), DocumentError> {
        if let Some(expected) = expected_version {
            let current = self.client
                .query_opt(
                    "SELECT version FROM documents WHERE document_id = $1",
                    &[&record.document_id],
                )
                .await
                .map_err(|e| DocumentError::TrackingStore(e.to_string()))?
                .map(|row| row.get::<_, i64>(0) as u64);
            if current != Some(expected) {
                return Err(DocumentError::TrackingStore(format!(
                    "version conflict for {}: expected {}, found {:?}",
                    record.document_id, expected, current
                )));
            }
        }

        let metering_json = serde_json::to_value(&record.metering)?;
        let errors_json = serde_json::to_value(&record.errors)?;
        self.client
            .execute(
                r"
                INSERT INTO documents
                (document_id, status, execution_id, queued_at, started_at, completed_at,
                 num_pages, metering, errors, summary_uri, evaluation_uri, rule_validation_uri, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (document_id) DO UPDATE SET
                    status = EXCLUDED.status,
                    execution_id = EXCLUDED.execution_id,
                    started_at = EXCLUDED.started_at,
                    completed_at = EXCLUDED.completed_at,
                    num_pages = EXCLUDED.num_pages,
                    metering = EXCLUDED.metering,
                    errors = EXCLUDED.errors,
                    summary_uri = EXCLUDED.summary_uri,
                    evaluation_uri = EXCLUDED.evaluation_uri,
                    rule_validation_uri = EXCLUDED.rule_validation_uri,
                    version = documents.version + 1
                ",
                &[
                    &record.document_id,
                    &status_to_str(record.status),
                    &record.execution_id,
                    &record.queued_at,
                    &record.started_at,
                    &record.completed_at,
                    &(record.num_pages as i32),
                    &metering_json,
                    &errors_json,
                    &record.summary_uri,
                    &record.evaluation_uri,
                    &record.rule_validation_uri,
                    &0i64,
                ],
            )
            .await
            .map_err(|e| DocumentError::TrackingStore(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, document_id: &str) -> Result<TrackingRecord, DocumentError> {
        let row = self
            .client
            .query_opt(
                r"
                SELECT document_id, status, execution_id, queued_at, started_at, completed_at,
                       num_pages, metering, errors, summary_uri, evaluation_uri, rule_validation_uri, version
                FROM documents WHERE document_id = $1
                ",
                &[&document_id],
            )
            .await
            .map_err(|e| DocumentError::TrackingStore(e.to_string()))?
            .ok_or_else(|| DocumentError::NotFound(document_id.to_string()))?;

        Self::row_to_record(&row)
    }

    async fn list_by_status(&self, status: DocumentStatus) -> Result<Vec<TrackingRecord>, DocumentError> {
        let rows = self
            .client
            .query(
                r"
                SELECT document_id, status, execution_id, queued_at, started_at, completed_at,
                       num_pages, metering, errors, summary_uri, evaluation_uri, rule_validation_uri, version
                FROM documents WHERE status = $1
                ",
                &[&status_to_str(status)],
            )
            .await
            .map_err(|e| DocumentError::TrackingStore(e.to_string()))?;

        rows.iter().map(Self::row_to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_reads_env_or_falls_back() {
        let config = PostgresConfig::default();
        let expected_port = std::env::var("IDP_POSTGRES_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432);
        assert_eq!(config.port, expected_port);
        assert!(!config.database.is_empty());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            DocumentStatus::Queued,
            DocumentStatus::Running,
            DocumentStatus::Ocr,
            DocumentStatus::Classifying,
            DocumentStatus::Extracting,
            DocumentStatus::Assessing,
            DocumentStatus::Postprocessing,
            DocumentStatus::Summarizing,
            DocumentStatus::Evaluating,
            DocumentStatus::Completed,
            DocumentStatus::Failed,
        ] {
            assert_eq!(status_from_str(status_to_str(status)).unwrap(), status);
        }
    }
}
