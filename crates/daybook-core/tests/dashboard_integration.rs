//! Integration tests for the dashboard workflows.
//!
//! Each test drives the public API the way a host would: records are stored
//! through the dashboard, which announces them on the event bus, and the
//! observable effects land in the calendar, the notification list and the
//! stats.

use chrono::{Duration, NaiveDate, NaiveTime};
use daybook_core::notifications::{Permission, RecordingSurface, SettingsPatch};
use daybook_core::storage::{Config, StorageKey, Store};
use daybook_core::sync::companion_id;
use daybook_core::{
    CalendarEvent, Clock, Dashboard, EventStatus, ManualClock, NotificationKind, Priority,
    ProductivityStats, StudySession, SyncEventType, SyncPayload, Task, TaskContext, TaskStatus,
    Transaction, TransactionKind,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

// ============================================================================
// Test Helpers
// ============================================================================

struct Session {
    dash: Dashboard,
    clock: Rc<ManualClock>,
    surface: Rc<RecordingSurface>,
}

fn session_with(surface: RecordingSurface) -> Session {
    let clock = Rc::new(ManualClock::at(
        date(2025, 4, 14).and_hms_opt(8, 30, 0).unwrap(),
    ));
    let surface = Rc::new(surface);
    let dash = Dashboard::with_parts(
        Config::default(),
        Store::in_memory(),
        surface.clone(),
        clock.clone(),
    );
    Session {
        dash,
        clock,
        surface,
    }
}

fn session() -> Session {
    session_with(RecordingSurface::granted())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn task(id: &str, due: Option<NaiveDate>, priority: Priority) -> Task {
    Task {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: None,
        due_date: due,
        priority,
        context: TaskContext::College,
        status: TaskStatus::Todo,
        extra: Default::default(),
    }
}

fn event(id: &str, on: NaiveDate, at: NaiveTime) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        title: format!("Event {id}"),
        date: on,
        time: at,
        kind: "Reunião".to_string(),
        status: EventStatus::Scheduled,
        description: None,
        duration: Some(60),
        extra: Default::default(),
    }
}

fn titles(s: &Session) -> Vec<String> {
    s.dash
        .notifications()
        .all()
        .into_iter()
        .map(|n| n.title)
        .collect()
}

// ============================================================================
// Task workflows
// ============================================================================

#[test]
fn test_urgent_task_due_on_holiday() {
    let s = session();
    // Good Friday 2025
    s.dash
        .create_task(task("tcc", Some(date(2025, 4, 18)), Priority::High))
        .unwrap();

    let reminder = s.dash.events().get(&companion_id("tcc")).unwrap();
    assert_eq!(reminder.date, date(2025, 4, 17));
    assert_eq!(reminder.time, hm(9, 0));
    assert_eq!(reminder.kind, "Lembrete");

    let warning = s
        .dash
        .notifications()
        .all()
        .into_iter()
        .find(|n| n.title == "Deadline on a holiday")
        .unwrap();
    assert!(warning.persistent);
    assert_eq!(warning.kind, NotificationKind::Warning);
    assert!(warning.message.contains("Sexta-feira Santa"));
}

#[test]
fn test_task_lifecycle_keeps_companion_in_step() {
    let s = session();
    s.dash
        .schedule_event(event("lecture", date(2025, 4, 20), hm(19, 0)))
        .unwrap();
    let mut t = task("essay", Some(date(2025, 4, 25)), Priority::High);
    s.dash.create_task(t.clone()).unwrap();
    assert_eq!(s.dash.events().len(), 2);

    t.due_date = Some(date(2025, 4, 28));
    t.title = "Essay v2".to_string();
    s.dash.update_task(t).unwrap();
    let reminder = s.dash.events().get(&companion_id("essay")).unwrap();
    assert_eq!(reminder.date, date(2025, 4, 27));
    assert_eq!(reminder.title, "Reminder: Essay v2");

    s.dash.complete_task("essay").unwrap();
    let ids: Vec<String> = s.dash.events().all().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["lecture"]);
    assert_eq!(titles(&s)[0], "Task completed!");

    let stats = ProductivityStats::load(s.dash.store());
    assert_eq!(stats.tasks_completed, 1);
    assert_eq!(stats.context_stats["Faculdade"], 1);
}

// ============================================================================
// Calendar conflicts
// ============================================================================

#[test]
fn test_conflict_within_thirty_minutes() {
    let s = session();
    let day = date(2025, 4, 16);
    s.dash.schedule_event(event("a", day, hm(10, 0))).unwrap();
    s.dash.schedule_event(event("b", day, hm(10, 20))).unwrap();
    let conflicts = titles(&s)
        .iter()
        .filter(|t| *t == "Schedule conflict detected")
        .count();
    assert_eq!(conflicts, 1);
}

#[test]
fn test_no_conflict_an_hour_apart() {
    let s = session();
    let day = date(2025, 4, 16);
    s.dash.schedule_event(event("a", day, hm(10, 0))).unwrap();
    s.dash.schedule_event(event("b", day, hm(11, 0))).unwrap();
    assert!(!titles(&s).contains(&"Schedule conflict detected".to_string()));
}

// ============================================================================
// Finances
// ============================================================================

#[test]
fn test_spending_alerts() {
    let s = session();
    let tx = |id: &str, amount: f64, kind: TransactionKind| Transaction {
        id: id.to_string(),
        description: id.to_string(),
        amount,
        kind,
        category: "Casa".to_string(),
        date: date(2025, 4, 10),
        extra: Default::default(),
    };
    s.dash
        .record_transaction(tx("aluguel", 2000.0, TransactionKind::Expense))
        .unwrap();
    assert_eq!(titles(&s), vec!["Large expense recorded"]);

    s.dash
        .record_transaction(tx("mercado", 900.0, TransactionKind::Expense))
        .unwrap();
    assert_eq!(titles(&s).len(), 1);

    s.dash
        .record_transaction(tx("farmácia", 200.0, TransactionKind::Expense))
        .unwrap();
    assert_eq!(titles(&s)[0], "Financial alert");
}

// ============================================================================
// Event bus guarantees
// ============================================================================

#[test]
fn test_failing_subscriber_still_marks_processed() {
    let s = session();
    let seen = Rc::new(RefCell::new(Vec::new()));
    s.dash
        .sync()
        .subscribe(SyncEventType::TaskCreated, |_| Err("subscriber crashed".into()));
    let sink = Rc::clone(&seen);
    s.dash.sync().subscribe(SyncEventType::TaskCreated, move |e| {
        sink.borrow_mut().push(e.id.clone());
        Ok(())
    });

    let id = s
        .dash
        .sync()
        .emit(SyncPayload::TaskCreated(task("x", None, Priority::Low)));
    assert_eq!(*seen.borrow(), vec![id.clone()]);
    let log = s.dash.sync().events();
    assert_eq!(log[0].id, id);
    assert!(log[0].processed);
}

#[test]
fn test_streak_grows_day_by_day_and_resets_after_gap() {
    let s = session();
    let study = |id: &str, on: NaiveDate| StudySession {
        id: id.to_string(),
        subject: "Álgebra".to_string(),
        duration: 30,
        date: on,
        notes: None,
        extra: Default::default(),
    };
    s.dash.log_study_session(study("d1", s.clock.today())).unwrap();
    s.clock.advance(Duration::days(1));
    s.dash.log_study_session(study("d2", s.clock.today())).unwrap();
    assert_eq!(s.dash.insights().streak_days, 2);

    s.clock.advance(Duration::days(3));
    s.dash.log_study_session(study("d3", s.clock.today())).unwrap();
    assert_eq!(s.dash.insights().streak_days, 1);
    assert_eq!(ProductivityStats::load(s.dash.store()).study_sessions, 3);
}

// ============================================================================
// Reminders and the OS surface
// ============================================================================

#[test]
fn test_event_reminders_fire_through_the_sweep() {
    let s = session();
    s.dash
        .schedule_event(event("review", date(2025, 4, 14), hm(10, 0)))
        .unwrap();
    // 10:00 start at 08:30: only the 15 and 60 minute offsets are ahead
    let placeholders = s.dash.notifications().all().len();
    assert_eq!(placeholders, 2);

    s.clock.advance(Duration::minutes(31));
    assert_eq!(s.dash.tick().reminders_fired, 1);
    s.clock.advance(Duration::minutes(45));
    assert_eq!(s.dash.tick().reminders_fired, 1);
    assert_eq!(s.dash.notifications().all().len(), 4);
    assert_eq!(s.dash.notifications().unread_count(), 2);
}

#[tokio::test]
async fn test_permission_then_popups() {
    let s = session_with(RecordingSurface::new(Permission::Prompt, Permission::Granted));
    assert!(s.dash.notifications().request_os_permission().await);
    assert!(s.dash.notifications().request_os_permission().await);
    assert_eq!(s.surface.prompts(), 1);

    s.dash
        .create_task(task("hol", Some(date(2025, 5, 1)), Priority::Low))
        .unwrap();
    let shown = s.surface.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Deadline on a holiday");
    assert_eq!(shown[0].auto_dismiss, None);
}

#[tokio::test]
async fn test_denied_permission_is_final() {
    let s = session_with(RecordingSurface::new(Permission::Denied, Permission::Granted));
    assert!(!s.dash.notifications().request_os_permission().await);
    assert_eq!(s.surface.prompts(), 0);

    s.dash.notifications().update_settings(SettingsPatch {
        browser_notifications: Some(true),
        ..SettingsPatch::default()
    });
    s.dash
        .create_task(task("hol", Some(date(2025, 5, 1)), Priority::Low))
        .unwrap();
    assert!(s.surface.shown().is_empty());
    assert_eq!(s.dash.notifications().all().len(), 1);
}

// ============================================================================
// Export / import
// ============================================================================

#[test]
fn test_export_import_roundtrip_between_sessions() {
    let a = session();
    a.dash
        .create_task(task("t1", Some(date(2025, 6, 3)), Priority::High))
        .unwrap();
    a.dash
        .schedule_event(event("e1", date(2025, 6, 1), hm(14, 0)))
        .unwrap();
    let bundle = a.dash.export_all().unwrap();

    let b = session();
    let summary = b.dash.import_all(&bundle).unwrap();
    assert_eq!(summary.imported.len(), 10);
    assert_eq!(b.dash.tasks().all(), a.dash.tasks().all());
    assert_eq!(b.dash.events().all(), a.dash.events().all());

    assert!(b.dash.import_all("{not json").is_err());
    assert_eq!(b.dash.tasks().len(), 1);

    b.dash.clear_all();
    assert!(b.dash.tasks().is_empty());
    assert!(b.dash.events().is_empty());
}

// ============================================================================
// Records written by older versions
// ============================================================================

#[test]
fn test_completing_a_task_keeps_other_events_intact() {
    let s = session();
    s.dash.store().set(
        StorageKey::Events,
        &json!([{
            "id": "aula",
            "title": "Aula de Cálculo",
            "date": "2025-06-10",
            "time": "19:00",
            "type": "Aula",
            "status": "Agendado",
            "location": "Sala 1"
        }]),
    );

    s.dash
        .create_task(task("prova", Some(date(2025, 6, 12)), Priority::High))
        .unwrap();
    s.dash.complete_task("prova").unwrap();

    let stored: Value = s.dash.store().get(StorageKey::Events, Value::Null);
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["id"], "aula");
    assert_eq!(stored[0]["location"], "Sala 1");
}

#[test]
fn test_task_without_deadline_survives_new_task() {
    let s = session();
    s.dash.store().set(
        StorageKey::Tasks,
        &json!([{
            "id": "ler",
            "title": "Ler capítulo 3",
            "dueDate": "",
            "priority": "Média",
            "context": "Faculdade",
            "status": "A Fazer",
            "subject": "História"
        }]),
    );
    assert_eq!(s.dash.insights().total_tasks, 1);

    s.dash
        .create_task(task("novo", Some(date(2025, 4, 30)), Priority::Low))
        .unwrap();
    assert_eq!(s.dash.insights().total_tasks, 2);

    let stored: Value = s.dash.store().get(StorageKey::Tasks, Value::Null);
    assert_eq!(stored[0]["id"], "ler");
    assert_eq!(stored[0]["subject"], "História");
    assert_eq!(stored[1]["id"], "novo");
}

#[test]
fn test_undecodable_tasks_are_not_overwritten() {
    let s = session();
    let raw = json!([{"id": "x", "title": "sem prioridade"}]);
    s.dash.store().set(StorageKey::Tasks, &raw);

    assert!(s
        .dash
        .create_task(task("novo", None, Priority::Low))
        .is_err());
    let stored: Value = s.dash.store().get(StorageKey::Tasks, Value::Null);
    assert_eq!(stored, raw);
    assert!(s.dash.sync().events().is_empty());
}

#[test]
fn test_older_bundle_imports_and_feeds_insights() {
    let s = session();
    let bundle = json!({
        "tasks": [
            {"id": "a", "title": "Relatório", "dueDate": "", "priority": "Alta",
             "context": "Trabalho", "status": "Concluído", "type": "Entrega"},
            {"id": "b", "title": "Lista 2", "dueDate": "2025-04-20", "priority": "Baixa",
             "context": "Faculdade", "status": "A Fazer", "subject": "Física"}
        ],
        "events": [
            {"id": "e", "title": "Reunião", "date": "2025-04-14", "time": "15:00",
             "type": "Reunião", "status": "Agendado", "location": "Sala 2"}
        ],
        "transactions": [
            {"id": "t", "description": "Mercado", "amount": 180, "type": "Despesa",
             "category": "Casa", "date": "2025-04-12", "account": "Conta corrente"}
        ],
        "exportDate": "2025-04-13T22:00:00.000Z"
    })
    .to_string();

    s.dash.import_all(&bundle).unwrap();
    let insights = s.dash.insights();
    assert_eq!(insights.total_tasks, 2);
    assert_eq!(insights.completed_tasks, 1);
    assert_eq!(insights.today_events, 1);
    assert_eq!(insights.weekly_transactions, 1);

    let exported: Value = serde_json::from_str(&s.dash.export_all().unwrap()).unwrap();
    assert_eq!(exported["tasks"][1]["subject"], "Física");
    assert_eq!(exported["events"][0]["location"], "Sala 2");
    assert_eq!(exported["transactions"][0]["account"], "Conta corrente");
}
