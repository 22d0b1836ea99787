//! Notification log module
//!
//! Presents the recorder's globally ordered record sequence as bounded,
//! resumable sections for external consumers. Sections are computed per
//! request and never stored.

use std::sync::Arc;

use crate::recorder::{Notification, NotificationFeed, RecorderError};

/// Default number of notifications per section.
pub const DEFAULT_SECTION_SIZE: i64 = 10;

/// One page of the notification feed.
///
/// `id` describes the first and last notification ids actually contained in
/// the section (which may be a sparser range than requested if the sequence
/// has gaps); `next_id` is set only when the page came back full.
///
/// `next_id = None` means "caught up, poll again later", not "stream
/// exhausted": the underlying log is append-only and unbounded, so a later
/// request with the same section id may return new notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: Option<String>,
    pub items: Vec<Notification>,
    pub next_id: Option<String>,
}

/// Errors that can occur while reading the notification log
#[derive(Debug, thiserror::Error)]
pub enum NotificationLogError {
    /// Section id is not two comma-separated integers
    #[error("invalid section id '{0}': expected \"<first>,<last>\"")]
    InvalidSectionId(String),

    #[error(transparent)]
    Recorder(#[from] RecorderError),
}

/// Notification log that reads sections from a local recorder's feed.
pub struct LocalNotificationLog {
    feed: Arc<dyn NotificationFeed>,
    section_size: i64,
}

impl LocalNotificationLog {
    /// Create a notification log with the default section size.
    pub fn new(feed: Arc<dyn NotificationFeed>) -> Self {
        Self::with_section_size(feed, DEFAULT_SECTION_SIZE)
    }

    /// Create a notification log with a configured section size.
    pub fn with_section_size(feed: Arc<dyn NotificationFeed>, section_size: i64) -> Self {
        Self { feed, section_size }
    }

    /// Return the section of the feed described by `section_id`.
    ///
    /// The requested range is clamped: the start is floored to 1 and the
    /// span to at most one section, so reversed or oversized ranges degrade
    /// gracefully instead of erroring.
    pub async fn get(&self, section_id: &str) -> Result<Section, NotificationLogError> {
        let (first, last) = parse_section_id(section_id)?;
        let start = first.max(1);
        let limit = last
            .saturating_sub(start)
            .saturating_add(1)
            .clamp(0, self.section_size);

        let notifications = self.feed.select_notifications(start, limit).await?;

        let (id, next_id) = match (notifications.first(), notifications.last()) {
            (Some(head), Some(tail)) => {
                let id = format_section_id(head.id, tail.id);
                let next_id = if notifications.len() as i64 == limit {
                    // The next page starts right after the last notification
                    // actually returned, never after the requested range.
                    let next_start = tail.id + 1;
                    Some(format_section_id(next_start, next_start + limit - 1))
                } else {
                    None
                };
                (Some(id), next_id)
            }
            _ => (None, None),
        };

        Ok(Section {
            id,
            items: notifications,
            next_id,
        })
    }
}

fn parse_section_id(section_id: &str) -> Result<(i64, i64), NotificationLogError> {
    let invalid = || NotificationLogError::InvalidSectionId(section_id.to_string());
    let (first, last) = section_id.split_once(',').ok_or_else(invalid)?;
    let first = first.trim().parse::<i64>().map_err(|_| invalid())?;
    let last = last.trim().parse::<i64>().map_err(|_| invalid())?;
    Ok((first, last))
}

fn format_section_id(first: i64, last: i64) -> String {
    format!("{},{}", first, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{MemoryRecorder, Recorder, StoredRecord};
    use async_trait::async_trait;
    use uuid::Uuid;

    /// Feed with a fixed, gappy id sequence; only ids matter here.
    struct GappyFeed {
        ids: Vec<i64>,
    }

    #[async_trait]
    impl NotificationFeed for GappyFeed {
        async fn select_notifications(
            &self,
            start: i64,
            limit: i64,
        ) -> Result<Vec<Notification>, RecorderError> {
            Ok(self
                .ids
                .iter()
                .filter(|id| **id >= start)
                .take(limit.max(0) as usize)
                .map(|id| Notification {
                    id: *id,
                    record: StoredRecord {
                        stream_id: Uuid::nil(),
                        stream_version: 1,
                        kind: "TestEvent".to_string(),
                        payload: Vec::new(),
                    },
                })
                .collect())
        }

        async fn max_notification_id(&self) -> Result<i64, RecorderError> {
            Ok(self.ids.last().copied().unwrap_or(0))
        }
    }

    async fn populated_log(total: i64, section_size: i64) -> LocalNotificationLog {
        let recorder = Arc::new(MemoryRecorder::new());
        let stream_id = Uuid::new_v4();
        for version in 1..=total {
            recorder
                .append(
                    &[StoredRecord {
                        stream_id,
                        stream_version: version,
                        kind: "TestEvent".to_string(),
                        payload: Vec::new(),
                    }],
                    None,
                )
                .await
                .unwrap();
        }
        LocalNotificationLog::with_section_size(recorder, section_size)
    }

    #[tokio::test]
    async fn test_section_roundtrip_over_25_notifications() {
        let log = populated_log(25, 10).await;

        let section = log.get("1,10").await.unwrap();
        assert_eq!(section.id.as_deref(), Some("1,10"));
        assert_eq!(section.items.len(), 10);
        assert_eq!(section.next_id.as_deref(), Some("11,20"));

        let section = log.get("11,20").await.unwrap();
        assert_eq!(section.id.as_deref(), Some("11,20"));
        assert_eq!(section.next_id.as_deref(), Some("21,30"));

        // The tail section is partial: caught up, but not "ended".
        let section = log.get("21,30").await.unwrap();
        assert_eq!(section.id.as_deref(), Some("21,25"));
        assert_eq!(section.items.len(), 5);
        assert_eq!(section.next_id, None);
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_section() {
        let log = populated_log(0, 10).await;
        let section = log.get("1,10").await.unwrap();
        assert_eq!(
            section,
            Section {
                id: None,
                items: Vec::new(),
                next_id: None,
            }
        );
    }

    #[tokio::test]
    async fn test_requested_range_is_clamped() {
        let log = populated_log(25, 10).await;

        // Oversized span is clamped to one section.
        let section = log.get("1,1000").await.unwrap();
        assert_eq!(section.items.len(), 10);
        assert_eq!(section.id.as_deref(), Some("1,10"));

        // Non-positive start is floored to 1.
        let section = log.get("-5,4").await.unwrap();
        assert_eq!(section.id.as_deref(), Some("1,4"));
        assert_eq!(section.next_id.as_deref(), Some("5,8"));

        // Reversed range degrades to an empty section.
        let section = log.get("10,1").await.unwrap();
        assert_eq!(section.id, None);
        assert!(section.items.is_empty());
        assert_eq!(section.next_id, None);
    }

    #[tokio::test]
    async fn test_malformed_section_id_is_rejected() {
        let log = populated_log(3, 10).await;
        for bad in ["", "1", "a,b", "1,2,3", "1;10"] {
            let err = log.get(bad).await.unwrap_err();
            assert!(
                matches!(err, NotificationLogError::InvalidSectionId(_)),
                "{bad:?} should be invalid"
            );
        }
    }

    #[tokio::test]
    async fn test_gaps_shrink_the_reported_range() {
        // Ids 3 and 4 were burned by rolled-back appends.
        let feed = Arc::new(GappyFeed {
            ids: vec![1, 2, 5, 6, 7, 8, 9, 10, 11, 12, 13],
        });
        let log = LocalNotificationLog::with_section_size(feed, 10);

        // A full page spans a sparser range than requested; the next section
        // starts after the last id actually returned.
        let section = log.get("1,10").await.unwrap();
        assert_eq!(section.items.len(), 10);
        assert_eq!(section.id.as_deref(), Some("1,12"));
        assert_eq!(section.next_id.as_deref(), Some("13,22"));

        let section = log.get("13,22").await.unwrap();
        assert_eq!(section.id.as_deref(), Some("13,13"));
        assert_eq!(section.next_id, None);
    }

    #[tokio::test]
    async fn test_sections_resume_without_overlap() {
        let log = populated_log(25, 7).await;

        let mut seen = Vec::new();
        let mut section_id = "1,7".to_string();
        loop {
            let section = log.get(&section_id).await.unwrap();
            seen.extend(section.items.iter().map(|n| n.id));
            match section.next_id {
                Some(next) => section_id = next,
                None => break,
            }
        }
        assert_eq!(seen, (1..=25).collect::<Vec<i64>>());
    }
}
