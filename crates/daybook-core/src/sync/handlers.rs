//! Built-in cross-module reactions, one per event type.

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};

use super::stats::{Activity, ProductivityStats};
use super::SyncPayload;
use crate::clock::{local_instant, Clock};
use crate::error::CollectionError;
use crate::holidays;
use crate::insights;
use crate::model::{
    hhmm, CalendarEvent, EventStatus, Priority, StudySession, Task, Transaction, TransactionKind,
};
use crate::notifications::{NewNotification, NotificationKind, NotificationManager};
use crate::storage::{Collection, Store, SyncConfig};

/// Id of the calendar reminder created for an urgent task.
pub fn companion_id(task_id: &str) -> String {
    format!("task-reminder-{task_id}")
}

/// What the built-in handlers may touch.
pub(super) struct HandlerContext<'a> {
    pub store: &'a Store,
    pub calendar: Collection<CalendarEvent>,
    pub transactions: Collection<Transaction>,
    pub notifications: &'a NotificationManager,
    pub clock: &'a dyn Clock,
    pub config: &'a SyncConfig,
}

pub(super) fn dispatch(ctx: &HandlerContext<'_>, payload: &SyncPayload) {
    match payload {
        SyncPayload::TaskCreated(task) => task_created(ctx, task),
        SyncPayload::TaskUpdated(task) => task_updated(ctx, task),
        SyncPayload::TaskCompleted(task) => task_completed(ctx, task),
        SyncPayload::EventCreated(event) => event_created(ctx, event),
        SyncPayload::EventUpdated(_) => {}
        SyncPayload::TransactionAdded(tx) => transaction_added(ctx, tx),
        SyncPayload::StudySessionCompleted(session) => study_session_completed(ctx, session),
    }
}

fn task_created(ctx: &HandlerContext<'_>, task: &Task) {
    let Some(due) = task.due_date else {
        return;
    };

    if task.priority == Priority::High {
        if let Err(e) = ctx.calendar.upsert(companion_reminder(ctx.config, task, due)) {
            warn!(task = %task.id, error = %e, "companion reminder not stored");
        }
        match local_instant(due.and_time(NaiveTime::MIN)) {
            Some(due_at) => {
                ctx.notifications.task_reminder(&task.title, due_at);
            }
            None => debug!(task = %task.id, %due, "due date has no local midnight"),
        }
    }

    if let Some(holiday) = holidays::holiday_on(due) {
        ctx.notifications.add(
            NewNotification::new(
                "Deadline on a holiday",
                format!(
                    "\"{}\" is due on {}. Consider moving the deadline.",
                    task.title, holiday.name
                ),
                NotificationKind::Warning,
            )
            .persistent(),
        );
    }
}

fn companion_reminder(config: &SyncConfig, task: &Task, due: NaiveDate) -> CalendarEvent {
    let time = hhmm::parse(&config.companion_reminder_time).unwrap_or_else(|| {
        debug!(value = %config.companion_reminder_time, "bad companion reminder time, using 09:00");
        NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
    });
    CalendarEvent {
        id: companion_id(&task.id),
        title: format!("Reminder: {}", task.title),
        date: day_before(due),
        time,
        kind: "Lembrete".into(),
        status: EventStatus::Scheduled,
        description: Some(format!(
            "{} task due tomorrow",
            task.context.label().to_lowercase()
        )),
        duration: Some(15),
        extra: Default::default(),
    }
}

fn day_before(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

fn task_updated(ctx: &HandlerContext<'_>, task: &Task) {
    let updated = ctx.calendar.update(&companion_id(&task.id), |reminder| {
        reminder.title = format!("Reminder: {}", task.title);
        if let Some(due) = task.due_date {
            reminder.date = day_before(due);
        }
    });
    match updated {
        Ok(()) => debug!(task = %task.id, "companion reminder updated"),
        Err(CollectionError::NotFound { .. }) => {}
        Err(e) => warn!(task = %task.id, error = %e, "companion reminder not updated"),
    }
}

fn task_completed(ctx: &HandlerContext<'_>, task: &Task) {
    match ctx.calendar.remove(&companion_id(&task.id)) {
        Ok(true) => debug!(task = %task.id, "companion reminder removed"),
        Ok(false) => {}
        Err(e) => warn!(task = %task.id, error = %e, "companion reminder not removed"),
    }

    ctx.notifications.add(NewNotification::new(
        "Task completed!",
        format!("\"{}\" was marked as done.", task.title),
        NotificationKind::Success,
    ));

    record(
        ctx,
        Activity::TaskCompleted {
            context: task.context.label(),
        },
    );
}

fn event_created(ctx: &HandlerContext<'_>, event: &CalendarEvent) {
    let window = i64::from(ctx.config.conflict_window_minutes);
    let conflicts = ctx
        .calendar
        .all()
        .into_iter()
        .filter(|existing| {
            existing.date == event.date
                && existing.id != event.id
                && existing.status == EventStatus::Scheduled
                && (existing.time - event.time).num_minutes().abs() < window
        })
        .count();

    if conflicts > 0 {
        debug!(event = %event.id, conflicts, "schedule conflict");
        ctx.notifications.add(
            NewNotification::new(
                "Schedule conflict detected",
                format!(
                    "\"{}\" overlaps with {} existing event(s).",
                    event.title, conflicts
                ),
                NotificationKind::Warning,
            )
            .persistent()
            .action_url("/calendar"),
        );
    }

    match local_instant(event.starts_at()) {
        Some(starts) => {
            ctx.notifications.event_reminder(&event.title, starts);
        }
        None => debug!(event = %event.id, "start time has no local instant"),
    }
}

fn transaction_added(ctx: &HandlerContext<'_>, tx: &Transaction) {
    let monthly_expenses = insights::monthly_expenses(&ctx.transactions.all(), ctx.clock.today());

    if tx.kind == TransactionKind::Expense && monthly_expenses > ctx.config.monthly_expense_alert {
        ctx.notifications.financial_alert(
            format!(
                "Monthly expenses reached R$ {monthly_expenses:.2}. Consider reviewing your budget."
            ),
            NotificationKind::Warning,
        );
    }

    if tx.amount.abs() > ctx.config.large_transaction {
        let (title, kind) = match tx.kind {
            TransactionKind::Income => ("Large income recorded", NotificationKind::Success),
            TransactionKind::Expense => ("Large expense recorded", NotificationKind::Warning),
        };
        ctx.notifications.add(
            NewNotification::new(
                title,
                format!(
                    "{}: {} - R$ {:.2}",
                    tx.kind.label(),
                    tx.description,
                    tx.amount.abs()
                ),
                kind,
            )
            .action_url("/finances"),
        );
    }
}

fn study_session_completed(ctx: &HandlerContext<'_>, session: &StudySession) {
    ctx.notifications.add(NewNotification::new(
        "Study session completed!",
        format!(
            "You studied {} for {} minutes.",
            session.subject, session.duration
        ),
        NotificationKind::Success,
    ));
    record(ctx, Activity::StudyCompleted);
}

fn record(ctx: &HandlerContext<'_>, activity: Activity<'_>) {
    let mut stats = ProductivityStats::load(ctx.store);
    stats.record(activity, ctx.clock.today());
    stats.save(ctx.store);
}
