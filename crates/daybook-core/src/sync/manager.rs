//! The event bus.
//!
//! `emit` records the event, runs the subscribers for its type and then the
//! built-in handler, all before returning. Nested emits from a subscriber or
//! handler complete depth-first. No `RefCell` borrow is held across a
//! callback.

use chrono::Duration;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, warn};

use super::handlers::{self, HandlerContext};
use super::{SyncEvent, SyncEventType, SyncPayload};
use crate::clock::Clock;
use crate::ids::new_id;
use crate::insights::{self, ProductivityInsights, WATCHED_EVENTS};
use crate::notifications::NotificationManager;
use crate::storage::{Collection, InsightsConfig, StorageKey, Store, SyncConfig};

/// Error a subscriber may report; it is logged and dispatch continues.
pub type SubscriberError = Box<dyn std::error::Error>;

type Subscriber = Rc<dyn Fn(&SyncEvent) -> Result<(), SubscriberError>>;

/// Handle returned by [`SyncManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct SyncManager {
    store: Rc<Store>,
    notifications: Rc<NotificationManager>,
    clock: Rc<dyn Clock>,
    config: SyncConfig,
    insights: InsightsConfig,
    events: RefCell<Vec<SyncEvent>>,
    subscribers: RefCell<HashMap<SyncEventType, Vec<(SubscriptionId, Subscriber)>>>,
    in_flight: RefCell<HashSet<String>>,
    next_subscription: Cell<u64>,
}

impl SyncManager {
    pub fn new(
        store: Rc<Store>,
        notifications: Rc<NotificationManager>,
        clock: Rc<dyn Clock>,
        config: SyncConfig,
        insights: InsightsConfig,
    ) -> Self {
        let events: Vec<SyncEvent> = store.get(StorageKey::SyncEvents, Vec::new());
        debug!(count = events.len(), "sync log loaded");
        Self {
            store,
            notifications,
            clock,
            config,
            insights,
            events: RefCell::new(events),
            subscribers: RefCell::new(HashMap::new()),
            in_flight: RefCell::new(HashSet::new()),
            next_subscription: Cell::new(0),
        }
    }

    /// Record and dispatch an event. Returns the event id.
    pub fn emit(&self, payload: SyncPayload) -> String {
        let event = SyncEvent {
            id: new_id(self.clock.now_utc()),
            payload,
            timestamp: self.clock.now_utc(),
            processed: false,
        };
        debug!(id = %event.id, kind = %event.event_type(), "emit");

        {
            let mut log = self.events.borrow_mut();
            log.insert(0, event.clone());
            log.truncate(self.config.event_log_capacity);
        }
        self.persist();
        self.process(&event);
        event.id
    }

    /// Register `callback` for events of `kind`.
    pub fn subscribe(
        &self,
        kind: SyncEventType,
        callback: impl Fn(&SyncEvent) -> Result<(), SubscriberError> + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        for list in subscribers.values_mut() {
            if let Some(pos) = list.iter().position(|(sid, _)| *sid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    fn persist(&self) {
        self.store.set(StorageKey::SyncEvents, &*self.events.borrow());
    }

    fn handler_context(&self) -> HandlerContext<'_> {
        HandlerContext {
            store: &self.store,
            calendar: Collection::new(Rc::clone(&self.store), StorageKey::Events),
            transactions: Collection::new(Rc::clone(&self.store), StorageKey::Transactions),
            notifications: &self.notifications,
            clock: self.clock.as_ref(),
            config: &self.config,
        }
    }

    fn process(&self, event: &SyncEvent) {
        let kind = event.event_type();
        self.in_flight.borrow_mut().insert(event.id.clone());

        let subscribers = self
            .subscribers
            .borrow()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        for (subscription, subscriber) in subscribers {
            if let Err(e) = subscriber(event) {
                warn!(
                    event = %event.id,
                    %kind,
                    subscription = subscription.0,
                    error = %e,
                    "sync subscriber failed"
                );
            }
        }

        handlers::dispatch(&self.handler_context(), &event.payload);

        self.in_flight.borrow_mut().remove(&event.id);
        // Nested emits may have changed the log since this event was added.
        if let Some(entry) = self
            .events
            .borrow_mut()
            .iter_mut()
            .find(|e| e.id == event.id)
        {
            entry.processed = true;
        }
        self.persist();
    }

    /// Dispatch every logged event not yet marked processed.
    ///
    /// Events already being dispatched further up the stack are skipped.
    /// Returns how many were dispatched.
    pub fn reprocess_pending(&self) -> usize {
        let pending: Vec<SyncEvent> = self
            .events
            .borrow()
            .iter()
            .filter(|e| !e.processed)
            .cloned()
            .collect();
        let mut dispatched = 0;
        for event in pending {
            let still_pending = !self.in_flight.borrow().contains(&event.id)
                && self
                    .events
                    .borrow()
                    .iter()
                    .any(|e| e.id == event.id && !e.processed);
            if still_pending {
                debug!(id = %event.id, "reprocessing sync event");
                self.process(&event);
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Drop events older than `days` days.
    pub fn clear_old_events(&self, days: i64) {
        let cutoff = self.clock.now_utc() - Duration::days(days);
        let removed = {
            let mut log = self.events.borrow_mut();
            let before = log.len();
            log.retain(|e| e.timestamp > cutoff);
            before - log.len()
        };
        debug!(removed, days, "cleared old sync events");
        self.persist();
    }

    /// Drop events older than the configured retention.
    pub fn clear_expired_events(&self) {
        self.clear_old_events(self.config.event_retention_days);
    }

    /// The log, most recent first.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.borrow().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.events.borrow().iter().filter(|e| !e.processed).count()
    }

    pub fn insights(&self) -> ProductivityInsights {
        insights::snapshot(&self.store, self.clock.today(), &self.insights)
    }

    /// Call `on_change` with fresh insights now and after every event that
    /// can move them.
    ///
    /// Subscribers run before the built-in handler, so counters the handler
    /// updates show up on the next refresh.
    pub fn watch_insights(
        &self,
        on_change: impl Fn(&ProductivityInsights) + 'static,
    ) -> InsightsWatch {
        let store = Rc::clone(&self.store);
        let clock = Rc::clone(&self.clock);
        let config = self.insights.clone();
        let refresh: Rc<dyn Fn()> = Rc::new(move || {
            on_change(&insights::snapshot(&store, clock.today(), &config));
        });
        refresh();

        let subscriptions = WATCHED_EVENTS
            .iter()
            .map(|&kind| {
                let refresh = Rc::clone(&refresh);
                self.subscribe(kind, move |_| {
                    refresh();
                    Ok(())
                })
            })
            .collect();
        InsightsWatch {
            subscriptions,
            refresh,
        }
    }
}

/// A live insights subscription.
#[derive(Clone)]
pub struct InsightsWatch {
    subscriptions: Vec<SubscriptionId>,
    refresh: Rc<dyn Fn()>,
}

impl InsightsWatch {
    /// Recompute and deliver insights now.
    pub fn refresh(&self) {
        (self.refresh)();
    }

    pub fn cancel(self, sync: &SyncManager) {
        for id in self.subscriptions {
            sync.unsubscribe(id);
        }
    }
}
