//! Service composition and the sweep driver.
//!
//! A [`Dashboard`] owns one store, one notification manager and one sync
//! manager for the lifetime of a session and hands out references to them.
//! The periodic work (firing scheduled reminders, finishing interrupted
//! event dispatch, refreshing insight watchers) runs either from
//! [`Dashboard::tick`] or from the [`Dashboard::run`] loop.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{CollectionError, CoreError, TransferError};
use crate::insights::ProductivityInsights;
use crate::model::{CalendarEvent, StudySession, Task, TaskStatus, Transaction};
use crate::notifications::{LogSurface, NotificationManager, NotificationSurface};
use crate::scheduler::SweepTimer;
use crate::storage::{
    self, data_dir, Collection, Config, ImportSummary, StorageKey, Store,
};
use crate::sync::{InsightsWatch, SyncManager, SyncPayload};

/// What one [`Dashboard::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub reminders_fired: usize,
    pub events_reprocessed: usize,
    pub insights_refreshed: bool,
}

struct Timers {
    reminders: SweepTimer,
    events: SweepTimer,
    insights: SweepTimer,
}

pub struct Dashboard {
    config: Config,
    clock: Rc<dyn Clock>,
    store: Rc<Store>,
    notifications: Rc<NotificationManager>,
    sync: Rc<SyncManager>,
    timers: RefCell<Timers>,
    watches: RefCell<Vec<InsightsWatch>>,
}

impl Dashboard {
    /// Open the SQLite-backed dashboard in the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open(config: Config) -> Result<Self, CoreError> {
        let path = data_dir()?.join(&config.storage.database_file);
        info!(path = %path.display(), "opening dashboard store");
        let store = Store::open(&path, config.storage.namespace.clone())?;
        Ok(Self::with_parts(
            config,
            store,
            Rc::new(LogSurface),
            Rc::new(SystemClock),
        ))
    }

    /// A throwaway dashboard that persists nothing beyond the process.
    pub fn in_memory(config: Config) -> Self {
        Self::with_parts(
            config,
            Store::in_memory(),
            Rc::new(LogSurface),
            Rc::new(SystemClock),
        )
    }

    pub fn with_parts(
        config: Config,
        store: Store,
        surface: Rc<dyn NotificationSurface>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let store = Rc::new(store);
        let notifications = Rc::new(NotificationManager::new(
            Rc::clone(&store),
            surface,
            Rc::clone(&clock),
            config.notifications.clone(),
        ));
        let sync = Rc::new(SyncManager::new(
            Rc::clone(&store),
            Rc::clone(&notifications),
            Rc::clone(&clock),
            config.sync.clone(),
            config.insights.clone(),
        ));

        let now = clock.now();
        let timers = Timers {
            reminders: SweepTimer::every_secs(
                "reminders",
                config.notifications.reminder_sweep_secs,
                now,
            ),
            events: SweepTimer::every_secs("events", config.sync.event_sweep_secs, now),
            insights: SweepTimer::every_secs("insights", config.insights.refresh_secs, now),
        };

        Self {
            config,
            clock,
            store,
            notifications,
            sync,
            timers: RefCell::new(timers),
            watches: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    pub fn store(&self) -> &Rc<Store> {
        &self.store
    }

    pub fn notifications(&self) -> &Rc<NotificationManager> {
        &self.notifications
    }

    pub fn sync(&self) -> &Rc<SyncManager> {
        &self.sync
    }

    pub fn tasks(&self) -> Collection<Task> {
        Collection::new(Rc::clone(&self.store), StorageKey::Tasks)
    }

    pub fn events(&self) -> Collection<CalendarEvent> {
        Collection::new(Rc::clone(&self.store), StorageKey::Events)
    }

    pub fn transactions(&self) -> Collection<Transaction> {
        Collection::new(Rc::clone(&self.store), StorageKey::Transactions)
    }

    pub fn study_sessions(&self) -> Collection<StudySession> {
        Collection::new(Rc::clone(&self.store), StorageKey::StudySessions)
    }

    /// Store a new task and announce it.
    ///
    /// # Errors
    /// Returns an error if a task with the same id exists; nothing is emitted.
    pub fn create_task(&self, task: Task) -> Result<(), CollectionError> {
        self.tasks().insert(task.clone())?;
        self.sync.emit(SyncPayload::TaskCreated(task));
        Ok(())
    }

    /// Replace a stored task and announce the change. Stored fields the
    /// task type does not model are kept.
    ///
    /// # Errors
    /// Returns an error if no task has this id.
    pub fn update_task(&self, task: Task) -> Result<(), CollectionError> {
        let updated = task.clone();
        self.tasks().update(&task.id, |stored| {
            let kept = std::mem::take(&mut stored.extra);
            *stored = updated;
            keep_unmodelled(&mut stored.extra, kept);
        })?;
        self.sync.emit(SyncPayload::TaskUpdated(task));
        Ok(())
    }

    /// Mark a task done and announce it. Completing a done task is a no-op.
    ///
    /// # Errors
    /// Returns an error if no task has this id.
    pub fn complete_task(&self, id: &str) -> Result<(), CollectionError> {
        let tasks = self.tasks();
        let task = tasks.get(id).ok_or_else(|| CollectionError::NotFound {
            key: StorageKey::Tasks.to_string(),
            id: id.to_string(),
        })?;
        if task.is_done() {
            return Ok(());
        }
        tasks.update(id, |t| t.status = TaskStatus::Done)?;
        let mut done = task;
        done.status = TaskStatus::Done;
        self.sync.emit(SyncPayload::TaskCompleted(done));
        Ok(())
    }

    /// # Errors
    /// Returns an error if an event with the same id exists.
    pub fn schedule_event(&self, event: CalendarEvent) -> Result<(), CollectionError> {
        self.events().insert(event.clone())?;
        self.sync.emit(SyncPayload::EventCreated(event));
        Ok(())
    }

    /// # Errors
    /// Returns an error if no event has this id.
    pub fn update_event(&self, event: CalendarEvent) -> Result<(), CollectionError> {
        let updated = event.clone();
        self.events().update(&event.id, |stored| {
            let kept = std::mem::take(&mut stored.extra);
            *stored = updated;
            keep_unmodelled(&mut stored.extra, kept);
        })?;
        self.sync.emit(SyncPayload::EventUpdated(event));
        Ok(())
    }

    /// # Errors
    /// Returns an error if a transaction with the same id exists.
    pub fn record_transaction(&self, tx: Transaction) -> Result<(), CollectionError> {
        self.transactions().insert(tx.clone())?;
        self.sync.emit(SyncPayload::TransactionAdded(tx));
        Ok(())
    }

    /// # Errors
    /// Returns an error if a session with the same id exists.
    pub fn log_study_session(&self, session: StudySession) -> Result<(), CollectionError> {
        self.study_sessions().insert(session.clone())?;
        self.sync.emit(SyncPayload::StudySessionCompleted(session));
        Ok(())
    }

    pub fn insights(&self) -> ProductivityInsights {
        self.sync.insights()
    }

    /// Deliver insights to `on_change` now, after relevant events and on
    /// every insights sweep.
    pub fn watch_insights(&self, on_change: impl Fn(&ProductivityInsights) + 'static) {
        let watch = self.sync.watch_insights(on_change);
        self.watches.borrow_mut().push(watch);
    }

    /// Drop every insights watcher.
    pub fn unwatch_insights(&self) {
        let watches = std::mem::take(&mut *self.watches.borrow_mut());
        for watch in watches {
            watch.cancel(&self.sync);
        }
    }

    /// # Errors
    /// Returns an error if the bundle cannot be encoded.
    pub fn export_all(&self) -> Result<String, CoreError> {
        storage::export_all(&self.store, self.clock.now_utc())
    }

    /// # Errors
    /// Returns an error, with nothing written, if the bundle is malformed.
    pub fn import_all(&self, json: &str) -> Result<ImportSummary, TransferError> {
        storage::import_all(&self.store, json)
    }

    pub fn clear_all(&self) {
        storage::clear_all(&self.store);
    }

    /// Run whichever sweeps are due at the clock's current time.
    pub fn tick(&self) -> TickReport {
        let now = self.clock.now();
        let (reminders_due, events_due, insights_due) = {
            let mut timers = self.timers.borrow_mut();
            (
                timers.reminders.poll(now),
                timers.events.poll(now),
                timers.insights.poll(now),
            )
        };

        let mut report = TickReport::default();
        if reminders_due {
            report.reminders_fired = self.notifications.fire_due_reminders();
        }
        if events_due {
            report.events_reprocessed = self.sync.reprocess_pending();
        }
        if insights_due {
            let watches = self.watches.borrow().clone();
            for watch in &watches {
                watch.refresh();
            }
            report.insights_refreshed = !watches.is_empty();
        }
        if report != TickReport::default() {
            debug!(?report, "sweep");
        }
        report
    }

    /// Cancel every sweep timer. [`tick`](Self::tick) does nothing afterwards
    /// until [`resume`](Self::resume).
    pub fn stop(&self) {
        let mut timers = self.timers.borrow_mut();
        timers.reminders.cancel();
        timers.events.cancel();
        timers.insights.cancel();
    }

    pub fn resume(&self) {
        let now = self.clock.now();
        let mut timers = self.timers.borrow_mut();
        timers.reminders.restart(now);
        timers.events.restart(now);
        timers.insights.restart(now);
    }

    /// Drive [`tick`](Self::tick) once a second until `shutdown` turns true
    /// or its sender is dropped, then cancel the timers.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("sweep loop started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.stop();
        info!("sweep loop stopped");
    }
}

/// Restore stored fields the record type does not model; fields the caller
/// supplied win.
fn keep_unmodelled(extra: &mut Map<String, Value>, kept: Map<String, Value>) {
    for (key, value) in kept {
        extra.entry(key).or_insert(value);
    }
}
