//! OS-level notification surface.
//!
//! The manager records every notification itself; a surface only renders
//! popups, plays the audible cue and owns the permission prompt. Hosts plug
//! in their native backend; [`NullSurface`] and [`LogSurface`] cover
//! headless use.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Host answer to "may we show OS notifications?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet.
    Prompt,
    /// The host has no notification surface.
    Unsupported,
}

pub type PermissionFuture<'a> = Pin<Box<dyn Future<Output = Permission> + 'a>>;

/// A popup request.
#[derive(Debug, Clone, PartialEq)]
pub struct OsNotification {
    pub title: String,
    pub body: String,
    /// Stable per-notification tag; the host replaces rather than stacks popups with the same tag.
    pub tag: String,
    /// `None` keeps the popup until the user dismisses it.
    pub auto_dismiss: Option<Duration>,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("notification surface unavailable: {0}")]
    Unavailable(String),
    #[error("notification surface failed: {0}")]
    Failed(String),
}

pub trait NotificationSurface {
    /// Current permission, without prompting.
    fn permission(&self) -> Permission;

    /// Ask the user. Resolves once they answer.
    fn request_permission(&self) -> PermissionFuture<'_>;

    fn show(&self, notification: &OsNotification) -> Result<(), SurfaceError>;

    fn play_sound(&self) -> Result<(), SurfaceError>;
}

/// A host without any notification surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl NotificationSurface for NullSurface {
    fn permission(&self) -> Permission {
        Permission::Unsupported
    }

    fn request_permission(&self) -> PermissionFuture<'_> {
        Box::pin(async { Permission::Unsupported })
    }

    fn show(&self, _notification: &OsNotification) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn play_sound(&self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// Writes popups to the log instead of the desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSurface;

impl NotificationSurface for LogSurface {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> PermissionFuture<'_> {
        Box::pin(async { Permission::Granted })
    }

    fn show(&self, n: &OsNotification) -> Result<(), SurfaceError> {
        info!(tag = %n.tag, title = %n.title, body = %n.body, "notification");
        Ok(())
    }

    fn play_sound(&self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// Keeps popups in memory with a scripted permission answer.
///
/// Used by headless hosts that render their own in-app banners, and by tests.
#[derive(Debug)]
pub struct RecordingSurface {
    permission: Cell<Permission>,
    answer: Cell<Permission>,
    prompts: Cell<u32>,
    sounds: Cell<u32>,
    shown: RefCell<Vec<OsNotification>>,
}

impl RecordingSurface {
    /// A surface whose current permission is `permission` and whose prompt resolves to `answer`.
    pub fn new(permission: Permission, answer: Permission) -> Self {
        Self {
            permission: Cell::new(permission),
            answer: Cell::new(answer),
            prompts: Cell::new(0),
            sounds: Cell::new(0),
            shown: RefCell::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(Permission::Granted, Permission::Granted)
    }

    pub fn shown(&self) -> Vec<OsNotification> {
        self.shown.borrow().clone()
    }

    pub fn prompts(&self) -> u32 {
        self.prompts.get()
    }

    pub fn sounds(&self) -> u32 {
        self.sounds.get()
    }
}

impl NotificationSurface for RecordingSurface {
    fn permission(&self) -> Permission {
        self.permission.get()
    }

    fn request_permission(&self) -> PermissionFuture<'_> {
        Box::pin(async move {
            self.prompts.set(self.prompts.get() + 1);
            let answer = self.answer.get();
            self.permission.set(answer);
            answer
        })
    }

    fn show(&self, notification: &OsNotification) -> Result<(), SurfaceError> {
        if self.permission.get() != Permission::Granted {
            return Err(SurfaceError::Unavailable("permission not granted".into()));
        }
        self.shown.borrow_mut().push(notification.clone());
        Ok(())
    }

    fn play_sound(&self) -> Result<(), SurfaceError> {
        self.sounds.set(self.sounds.get() + 1);
        Ok(())
    }
}
