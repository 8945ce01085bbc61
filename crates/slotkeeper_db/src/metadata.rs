//! SQL implementation of the appointment metadata store
//!
//! One row per appointment. Timestamps are stored as RFC 3339 text and the
//! delivered reminder labels as a comma separated list, since `sqlx::Any`
//! cannot decode `DateTime<Utc>` or arrays portably. The upsert relies on
//! `ON CONFLICT ... DO UPDATE`, which SQLite and PostgreSQL both accept.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotkeeper_common::models::AppointmentMetadata;
use slotkeeper_common::{MetadataStore, StoreError};
use sqlx::Row;
use tracing::{debug, error, info};

use crate::error::DbError;
use crate::DbClient;

#[derive(Debug, Clone)]
pub struct SqlMetadataStore {
    db_client: DbClient,
}

impl SqlMetadataStore {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    pub async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing appointment metadata schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS appointment_metadata (
                appointment_id TEXT PRIMARY KEY NOT NULL,
                confirmed_at TEXT NULL,
                reminders_sent TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL
            )
        "#;

        self.db_client.execute(query).await?;

        info!("Appointment metadata schema initialized successfully");
        Ok(())
    }
}

fn encode_labels(metadata: &AppointmentMetadata) -> String {
    metadata
        .reminders_sent
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_row(
    appointment_id: &str,
    confirmed_at: Option<String>,
    reminders_sent: String,
) -> Result<AppointmentMetadata, StoreError> {
    let confirmed_at = confirmed_at
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Corrupt {
                    id: appointment_id.to_string(),
                    message: format!("confirmed_at {:?}: {}", raw, e),
                })
        })
        .transpose()?;

    let reminders_sent = reminders_sent
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect();

    Ok(AppointmentMetadata {
        confirmed_at,
        reminders_sent,
    })
}

#[async_trait]
impl MetadataStore for SqlMetadataStore {
    async fn get_metadata(&self, appointment_id: &str) -> Result<AppointmentMetadata, StoreError> {
        let query = r#"
            SELECT confirmed_at, reminders_sent
            FROM appointment_metadata
            WHERE appointment_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(appointment_id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to read metadata for {}: {}", appointment_id, e);
                StoreError::Unavailable(e.to_string())
            })?;

        match row {
            None => Ok(AppointmentMetadata::default()),
            Some(row) => {
                let confirmed_at: Option<String> =
                    row.try_get("confirmed_at").map_err(|e| StoreError::Corrupt {
                        id: appointment_id.to_string(),
                        message: e.to_string(),
                    })?;
                let reminders_sent: String =
                    row.try_get("reminders_sent").map_err(|e| StoreError::Corrupt {
                        id: appointment_id.to_string(),
                        message: e.to_string(),
                    })?;
                decode_row(appointment_id, confirmed_at, reminders_sent)
            }
        }
    }

    async fn save_metadata(
        &self,
        appointment_id: &str,
        metadata: &AppointmentMetadata,
    ) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO appointment_metadata (appointment_id, confirmed_at, reminders_sent, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (appointment_id) DO UPDATE SET
                confirmed_at = excluded.confirmed_at,
                reminders_sent = excluded.reminders_sent,
                updated_at = excluded.updated_at
        "#;

        sqlx::query(query)
            .bind(appointment_id)
            .bind(metadata.confirmed_at.map(|dt| dt.to_rfc3339()))
            .bind(encode_labels(metadata))
            .bind(Utc::now().to_rfc3339())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to save metadata for {}: {}", appointment_id, e);
                StoreError::Unavailable(e.to_string())
            })?;

        debug!(appointment_id, "appointment metadata saved");
        Ok(())
    }
}
