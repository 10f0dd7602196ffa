//! The notification manager service.
//!
//! Single-threaded: state lives in `RefCell`s and no borrow is held while
//! listeners or the surface run, so a listener may call back into the
//! manager.

use chrono::{DateTime, Duration, Local, Utc};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};

use super::{
    NewNotification, Notification, NotificationKind, NotificationSettings, NotificationSurface,
    OsNotification, Permission, SettingsPatch,
};
use crate::clock::Clock;
use crate::ids::new_id;
use crate::storage::{NotificationsConfig, StorageKey, Store};

type Listener = Rc<dyn Fn(&[Notification])>;

/// Handle returned by [`NotificationManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct NotificationManager {
    store: Rc<Store>,
    surface: Rc<dyn NotificationSurface>,
    clock: Rc<dyn Clock>,
    config: NotificationsConfig,
    notifications: RefCell<Vec<Notification>>,
    settings: RefCell<NotificationSettings>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
}

impl NotificationManager {
    /// Load notifications and settings from `store`.
    ///
    /// Persisted settings are a partial override of the defaults.
    pub fn new(
        store: Rc<Store>,
        surface: Rc<dyn NotificationSurface>,
        clock: Rc<dyn Clock>,
        config: NotificationsConfig,
    ) -> Self {
        let notifications: Vec<Notification> = store.get(StorageKey::Notifications, Vec::new());
        let persisted: serde_json::Value =
            store.get(StorageKey::NotificationSettings, serde_json::Value::Null);
        let settings = NotificationSettings::merged_with(&persisted);
        debug!(count = notifications.len(), "notification manager loaded");
        Self {
            store,
            surface,
            clock,
            config,
            notifications: RefCell::new(notifications),
            settings: RefCell::new(settings),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }
    }

    /// Register a listener that receives the full list after every change.
    pub fn subscribe(&self, listener: impl Fn(&[Notification]) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    fn persist(&self) {
        self.store
            .set(StorageKey::Notifications, &*self.notifications.borrow());
        self.store
            .set(StorageKey::NotificationSettings, &*self.settings.borrow());
        self.notify_listeners();
    }

    fn notify_listeners(&self) {
        let snapshot = self.notifications.borrow().clone();
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Record a notification. Returns its id, or `None` when notifications are disabled.
    pub fn add(&self, new: NewNotification) -> Option<String> {
        let settings = self.settings.borrow().clone();
        if !settings.enabled {
            return None;
        }

        let now = self.clock.now_utc();
        let notification = Notification {
            id: new_id(now),
            title: new.title,
            message: new.message,
            kind: new.kind,
            timestamp: now,
            read: false,
            action_url: new.action_url,
            action_label: new.action_label,
            persistent: new.persistent,
            scheduled_for: new.scheduled_for,
        };

        {
            let mut list = self.notifications.borrow_mut();
            list.insert(0, notification.clone());
            list.truncate(self.config.capacity);
        }
        self.persist();

        let quiet = self.is_quiet_now();
        if settings.browser_notifications && !quiet {
            self.show_os(&notification);
        }
        if settings.sound_enabled && !quiet {
            if let Err(e) = self.surface.play_sound() {
                warn!(error = %e, "could not play notification sound");
            }
        }

        Some(notification.id)
    }

    fn show_os(&self, n: &Notification) {
        if self.surface.permission() != Permission::Granted {
            return;
        }
        let popup = OsNotification {
            title: n.title.clone(),
            body: n.message.clone(),
            tag: n.id.clone(),
            auto_dismiss: (!n.persistent)
                .then(|| std::time::Duration::from_secs(self.config.os_auto_dismiss_secs)),
            action_url: n.action_url.clone(),
            action_label: n.action_label.clone(),
        };
        if let Err(e) = self.surface.show(&popup) {
            warn!(id = %n.id, error = %e, "could not show OS notification");
        }
    }

    /// Record a placeholder that the reminder sweep re-fires at `when`.
    pub fn schedule_reminder(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        when: DateTime<Utc>,
        kind: NotificationKind,
        action_url: Option<&str>,
    ) -> Option<String> {
        let mut new = NewNotification::new(title, message, kind)
            .persistent()
            .scheduled_for(when);
        new.action_url = action_url.map(str::to_string);
        self.add(new)
    }

    /// Re-fire every unread placeholder whose time has come.
    ///
    /// Each due placeholder produces a fresh notification without a schedule
    /// and is then marked read. Returns how many fired.
    pub fn fire_due_reminders(&self) -> usize {
        let now = self.clock.now_utc();
        let due: Vec<Notification> = self
            .notifications
            .borrow()
            .iter()
            .filter(|n| n.is_due(now))
            .cloned()
            .collect();
        for placeholder in &due {
            debug!(id = %placeholder.id, "firing scheduled reminder");
            self.add(NewNotification::from(placeholder));
            self.mark_as_read(&placeholder.id);
        }
        due.len()
    }

    pub fn mark_as_read(&self, id: &str) -> bool {
        let found = {
            let mut list = self.notifications.borrow_mut();
            match list.iter_mut().find(|n| n.id == id) {
                Some(n) => {
                    n.read = true;
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist();
        }
        found
    }

    pub fn mark_all_as_read(&self) {
        for n in self.notifications.borrow_mut().iter_mut() {
            n.read = true;
        }
        self.persist();
    }

    pub fn remove(&self, id: &str) {
        self.notifications.borrow_mut().retain(|n| n.id != id);
        self.persist();
    }

    pub fn clear(&self) {
        self.notifications.borrow_mut().clear();
        self.persist();
    }

    /// All notifications, most recent first.
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.borrow().clone()
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.notifications
            .borrow()
            .iter()
            .filter(|n| !n.read)
            .cloned()
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.borrow().iter().filter(|n| !n.read).count()
    }

    pub fn settings(&self) -> NotificationSettings {
        self.settings.borrow().clone()
    }

    pub fn update_settings(&self, patch: SettingsPatch) {
        self.settings.borrow_mut().apply(patch);
        self.persist();
    }

    pub fn is_quiet_now(&self) -> bool {
        self.settings
            .borrow()
            .quiet_hours
            .is_active(self.clock.now().time())
    }

    /// Ask for OS notification permission, prompting at most once.
    ///
    /// Already granted: enables OS popups without prompting. Already denied
    /// or unsupported: returns false without prompting.
    pub async fn request_os_permission(&self) -> bool {
        let granted = match self.surface.permission() {
            Permission::Granted => true,
            Permission::Denied => false,
            Permission::Unsupported => {
                warn!("host does not support OS notifications");
                false
            }
            Permission::Prompt => self.surface.request_permission().await == Permission::Granted,
        };
        if granted {
            self.settings.borrow_mut().browser_notifications = true;
            self.persist();
        }
        granted
    }

    /// Reminders ahead of a task's due instant, one per configured offset still in the future.
    pub fn task_reminder(&self, task_title: &str, due: DateTime<Local>) -> Vec<String> {
        if !self.settings.borrow().task_reminders {
            return Vec::new();
        }
        self.offset_reminders(due, "Task reminder", "/tasks", |offset| {
            format!("\"{task_title}\" is due in {offset}")
        })
    }

    /// Reminders ahead of an event's start, one per configured offset still in the future.
    pub fn event_reminder(&self, event_title: &str, starts: DateTime<Local>) -> Vec<String> {
        if !self.settings.borrow().event_reminders {
            return Vec::new();
        }
        self.offset_reminders(starts, "Event reminder", "/calendar", |offset| {
            format!("\"{event_title}\" starts in {offset}")
        })
    }

    fn offset_reminders(
        &self,
        target: DateTime<Local>,
        title: &str,
        action_url: &str,
        message: impl Fn(&str) -> String,
    ) -> Vec<String> {
        let now = self.clock.now();
        let offsets = self.settings.borrow().reminder_minutes.clone();
        offsets
            .into_iter()
            .filter_map(|minutes| {
                let at = target - Duration::minutes(i64::from(minutes));
                if at <= now {
                    return None;
                }
                self.schedule_reminder(
                    title,
                    message(&offset_label(minutes)),
                    at.with_timezone(&Utc),
                    NotificationKind::Reminder,
                    Some(action_url),
                )
            })
            .collect()
    }

    /// A single reminder at the start of a study session.
    pub fn study_reminder(&self, subject: &str, at: DateTime<Local>) -> Option<String> {
        if !self.settings.borrow().study_reminders {
            return None;
        }
        self.schedule_reminder(
            "Time to study",
            format!("Study session for {subject} scheduled for now"),
            at.with_timezone(&Utc),
            NotificationKind::Info,
            Some("/studies"),
        )
    }

    /// A persistent alert linking to the finances view.
    pub fn financial_alert(&self, message: impl Into<String>, kind: NotificationKind) -> Option<String> {
        if !self.settings.borrow().financial_alerts {
            return None;
        }
        self.add(
            NewNotification::new("Financial alert", message, kind)
                .persistent()
                .action_url("/finances"),
        )
    }
}

fn offset_label(minutes: u32) -> String {
    match minutes {
        1 => "1 minute".to_string(),
        m if m < 60 => format!("{m} minutes"),
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        m => format!("{:.1} hours", f64::from(m) / 60.0),
    }
}
