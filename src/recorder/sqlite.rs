//! SQLite recorder
//!
//! Recorder backed by SQLite through sqlx. Notification ids come from an
//! `AUTOINCREMENT` primary key, so committed ids are strictly increasing and
//! never reused; stream uniqueness is a `UNIQUE(stream_id, stream_version)`
//! constraint. Suitable for embedded use and for exercising the full
//! transactional semantics in tests without an external server.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{
    is_unique_violation, ConsumerTracking, Notification, NotificationFeed, Recorder,
    RecorderError, StoredRecord, Tracking,
};

/// Recorder over a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteRecorder {
    pool: SqlitePool,
    events_table: String,
    tracking_table: String,
}

impl SqliteRecorder {
    /// Create a recorder over the given pool and events table name.
    /// The tracking table name is derived as `<events_table>_tracking`.
    pub fn new(pool: SqlitePool, events_table: impl Into<String>) -> Self {
        let events_table = events_table.into();
        let tracking_table = format!("{}_tracking", events_table);
        Self {
            pool,
            events_table,
            tracking_table,
        }
    }

    /// Create the events and tracking tables if they do not exist.
    pub async fn create_tables(&self) -> Result<(), RecorderError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {events} (
                notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
                stream_id BLOB NOT NULL,
                stream_version INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload BLOB NOT NULL,
                UNIQUE (stream_id, stream_version)
            )
            "#,
            events = self.events_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {tracking} (
                consumer TEXT NOT NULL,
                notification_id INTEGER NOT NULL,
                PRIMARY KEY (consumer, notification_id)
            )
            "#,
            tracking = self.tracking_table
        ))
        .execute(&self.pool)
        .await?;

        tracing::debug!(table = %self.events_table, "sqlite tables ready");
        Ok(())
    }
}

#[async_trait]
impl Recorder for SqliteRecorder {
    async fn append(
        &self,
        records: &[StoredRecord],
        tracking: Option<&Tracking>,
    ) -> Result<(), RecorderError> {
        let mut tx = self.pool.begin().await?;

        let insert = format!(
            "INSERT INTO {} (stream_id, stream_version, kind, payload) VALUES (?1, ?2, ?3, ?4)",
            self.events_table
        );
        for record in records {
            let result = sqlx::query(&insert)
                .bind(record.stream_id)
                .bind(record.stream_version)
                .bind(&record.kind)
                .bind(&record.payload)
                .execute(&mut *tx)
                .await;

            if let Err(e) = result {
                // Dropping the transaction rolls everything back.
                if is_unique_violation(&e) {
                    tracing::warn!(
                        stream_id = %record.stream_id,
                        stream_version = record.stream_version,
                        "append rejected: version already recorded"
                    );
                    return Err(RecorderError::Conflict {
                        stream_id: record.stream_id,
                        stream_version: record.stream_version,
                    });
                }
                return Err(e.into());
            }
        }

        if let Some(tracking) = tracking {
            let insert_tracking = format!(
                r#"
                INSERT INTO {tracking} (consumer, notification_id)
                SELECT ?1, ?2
                WHERE NOT EXISTS (
                    SELECT 1 FROM {tracking}
                    WHERE consumer = ?1 AND notification_id >= ?2
                )
                "#,
                tracking = self.tracking_table
            );
            let result = sqlx::query(&insert_tracking)
                .bind(&tracking.consumer)
                .bind(tracking.notification_id)
                .execute(&mut *tx)
                .await;

            let rows = match result {
                Ok(done) => done.rows_affected(),
                Err(e) if is_unique_violation(&e) => 0,
                Err(e) => return Err(e.into()),
            };
            if rows == 0 {
                tracing::warn!(
                    consumer = %tracking.consumer,
                    notification_id = tracking.notification_id,
                    "append rejected: notification already tracked"
                );
                return Err(RecorderError::TrackingConflict {
                    consumer: tracking.consumer.clone(),
                    notification_id: tracking.notification_id,
                });
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn read(
        &self,
        stream_id: Uuid,
        gt: Option<i64>,
        lte: Option<i64>,
        desc: bool,
        limit: Option<i64>,
    ) -> Result<Vec<StoredRecord>, RecorderError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT stream_id, stream_version, kind, payload FROM {} WHERE stream_id = ",
            self.events_table
        ));
        query.push_bind(stream_id);
        if let Some(gt) = gt {
            query.push(" AND stream_version > ").push_bind(gt);
        }
        if let Some(lte) = lte {
            query.push(" AND stream_version <= ").push_bind(lte);
        }
        query.push(if desc {
            " ORDER BY stream_version DESC"
        } else {
            " ORDER BY stream_version ASC"
        });
        if let Some(limit) = limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rows: Vec<(Uuid, i64, String, Vec<u8>)> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(stream_id, stream_version, kind, payload)| StoredRecord {
                stream_id,
                stream_version,
                kind,
                payload,
            })
            .collect())
    }
}

#[async_trait]
impl NotificationFeed for SqliteRecorder {
    async fn select_notifications(
        &self,
        start: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, RecorderError> {
        let rows: Vec<(i64, Uuid, i64, String, Vec<u8>)> = sqlx::query_as(&format!(
            r#"
            SELECT notification_id, stream_id, stream_version, kind, payload
            FROM {}
            WHERE notification_id >= ?1
            ORDER BY notification_id ASC
            LIMIT ?2
            "#,
            self.events_table
        ))
        .bind(start)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, stream_id, stream_version, kind, payload)| Notification {
                id,
                record: StoredRecord {
                    stream_id,
                    stream_version,
                    kind,
                    payload,
                },
            })
            .collect())
    }

    async fn max_notification_id(&self) -> Result<i64, RecorderError> {
        let max: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT MAX(notification_id) FROM {}",
            self.events_table
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(max.unwrap_or(0))
    }
}

#[async_trait]
impl ConsumerTracking for SqliteRecorder {
    async fn max_tracking_id(&self, consumer: &str) -> Result<i64, RecorderError> {
        let max: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT MAX(notification_id) FROM {} WHERE consumer = ?1",
            self.tracking_table
        ))
        .bind(consumer)
        .fetch_one(&self.pool)
        .await?;

        Ok(max.unwrap_or(0))
    }
}
