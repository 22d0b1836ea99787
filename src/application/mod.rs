//! Application module
//!
//! Wires the engine together for one aggregate type: recorders, typed event
//! store, optional snapshot store, repository, and notification log, all
//! sharing one storage handle with an explicit lifecycle. Also hosts the
//! in-process subscriber hook invoked after events are saved.

use std::sync::Arc;

use uuid::Uuid;

use crate::aggregate::{Aggregate, Snapshot};
use crate::config::Config;
use crate::db;
use crate::error::LedgerResult;
use crate::event_store::EventStore;
use crate::notification_log::LocalNotificationLog;
use crate::recorder::{
    ApplicationRecorder, ConsumerTracking, NotificationFeed, PostgresRecorder, Recorder, Tracking,
};
use crate::repository::Repository;

/// Callback invoked with each batch of newly saved events.
type Subscriber<E> = Box<dyn Fn(&[E]) + Send + Sync>;

/// An event-sourced application for one aggregate type.
pub struct Application<A: Aggregate> {
    events: EventStore<A::Event>,
    repository: Repository<A>,
    log: LocalNotificationLog,
    feed: Arc<dyn NotificationFeed>,
    tracking: Arc<dyn ConsumerTracking>,
    subscribers: Vec<Subscriber<A::Event>>,
}

impl<A: Aggregate> Application<A> {
    /// Connect to PostgreSQL per the given configuration, creating schema
    /// objects when the auto-create toggle is on.
    pub async fn connect(config: &Config) -> LedgerResult<Self> {
        let pool = db::connect_postgres(config).await?;
        db::verify_connection(&pool).await?;

        let recorder = Arc::new(PostgresRecorder::new(pool.clone(), "events"));
        if config.create_tables {
            recorder.create_tables().await?;
        }

        let snapshots: Option<Arc<dyn Recorder>> = if config.snapshotting_enabled {
            let snapshot_recorder = Arc::new(PostgresRecorder::new(pool, "snapshots"));
            if config.create_tables {
                snapshot_recorder.create_tables().await?;
            }
            Some(snapshot_recorder)
        } else {
            None
        };

        Ok(Self::with_recorders(recorder, snapshots, config.section_size))
    }

    /// Assemble an application from prebuilt recorders. The main recorder
    /// serves events, the notification feed, and consumer tracking; the
    /// optional second recorder serves the snapshot stream.
    pub fn with_recorders<R>(
        recorder: Arc<R>,
        snapshots: Option<Arc<dyn Recorder>>,
        section_size: i64,
    ) -> Self
    where
        R: ApplicationRecorder + 'static,
    {
        let events_recorder: Arc<dyn Recorder> = recorder.clone();
        let feed: Arc<dyn NotificationFeed> = recorder.clone();
        let tracking: Arc<dyn ConsumerTracking> = recorder;

        let events = EventStore::<A::Event>::new(events_recorder);
        let snapshot_store = snapshots.map(EventStore::<Snapshot<A>>::new);
        let repository = Repository::new(events.clone(), snapshot_store);
        let log = LocalNotificationLog::with_section_size(feed.clone(), section_size);

        Self {
            events,
            repository,
            log,
            feed,
            tracking,
            subscribers: Vec::new(),
        }
    }

    /// Register a callback invoked synchronously after each successful save.
    /// Subscribers run after the commit, so they never affect durability.
    pub fn subscribe(&mut self, subscriber: impl Fn(&[A::Event]) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Append the given pending events and notify subscribers.
    pub async fn save(&self, events: &[A::Event]) -> LedgerResult<()> {
        self.events.put(events, None).await?;
        self.notify(events);
        Ok(())
    }

    /// Append the given events together with the upstream notification
    /// position that caused them, in one atomic commit. Rejected as a
    /// conflict when the position was already tracked, which is what makes
    /// re-delivered notifications safe to skip.
    pub async fn save_with_tracking(
        &self,
        events: &[A::Event],
        tracking: &Tracking,
    ) -> LedgerResult<()> {
        self.events.put(events, Some(tracking)).await?;
        self.notify(events);
        Ok(())
    }

    fn notify(&self, events: &[A::Event]) {
        for subscriber in &self.subscribers {
            subscriber(events);
        }
    }

    /// Reconstruct an aggregate, optionally at a historical version.
    pub async fn get(&self, stream_id: Uuid, version: Option<i64>) -> LedgerResult<A> {
        Ok(self.repository.get(stream_id, version).await?)
    }

    /// Snapshot the recorded state of an aggregate.
    pub async fn take_snapshot(
        &self,
        stream_id: Uuid,
        version: Option<i64>,
    ) -> LedgerResult<i64> {
        Ok(self.repository.take_snapshot(stream_id, version).await?)
    }

    /// The repository for direct access.
    pub fn repository(&self) -> &Repository<A> {
        &self.repository
    }

    /// The notification log exposing this application's feed.
    pub fn notification_log(&self) -> &LocalNotificationLog {
        &self.log
    }

    /// Highest committed notification id (0 if empty). Progress probe.
    pub async fn max_notification_id(&self) -> LedgerResult<i64> {
        Ok(self.feed.max_notification_id().await?)
    }

    /// Highest notification id this application has tracked for the given
    /// consumer name (0 if never tracked).
    pub async fn max_tracking_id(&self, consumer: &str) -> LedgerResult<i64> {
        Ok(self.tracking.max_tracking_id(consumer).await?)
    }
}
