//! Productivity insights.
//!
//! Recomputed from the collections and stats on every call; nothing is
//! cached here.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{CalendarEvent, EventStatus, Priority, Task, Transaction, TransactionKind};
use crate::storage::collection::read_records;
use crate::storage::{InsightsConfig, StorageKey, Store};
use crate::sync::{ProductivityStats, SyncEventType};

/// At most this many suggestions are returned.
pub const MAX_SUGGESTIONS: usize = 3;

/// Event types after which a watcher recomputes insights.
pub const WATCHED_EVENTS: [SyncEventType; 4] = [
    SyncEventType::TaskCompleted,
    SyncEventType::EventCreated,
    SyncEventType::TransactionAdded,
    SyncEventType::StudySessionCompleted,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityInsights {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Calendar entries dated today, any status.
    pub today_events: usize,
    /// Transactions dated within the last seven days.
    pub weekly_transactions: usize,
    pub streak_days: u32,
    /// 0..=100.
    pub productivity_score: u32,
    pub suggestions: Vec<String>,
}

/// Score = completion rate + streak bonus (max 20) + study bonus (max 15), capped at 100.
pub fn productivity_score(tasks: &[Task], stats: &ProductivityStats) -> u32 {
    let completion_rate = if tasks.is_empty() {
        0.0
    } else {
        let done = tasks.iter().filter(|t| t.is_done()).count();
        100.0 * done as f64 / tasks.len() as f64
    };
    let streak_bonus = (f64::from(stats.streak_days) * 2.0).min(20.0);
    let activity_bonus = (f64::from(stats.study_sessions) * 1.5).min(15.0);
    (completion_rate + streak_bonus + activity_bonus).round().min(100.0) as u32
}

/// Suggestions in fixed rule order, one per rule, truncated to [`MAX_SUGGESTIONS`].
pub fn suggestions(
    tasks: &[Task],
    events: &[CalendarEvent],
    transactions: &[Transaction],
    stats: &ProductivityStats,
    today: NaiveDate,
    config: &InsightsConfig,
) -> Vec<String> {
    let mut out = Vec::new();

    let open_high_priority = tasks
        .iter()
        .filter(|t| t.priority == Priority::High && !t.is_done())
        .count();
    if open_high_priority > config.high_priority_backlog {
        out.push(
            "You have many high-priority tasks. Consider focusing on the 3 most important ones."
                .to_string(),
        );
    }

    let scheduled_today = events
        .iter()
        .filter(|e| e.date == today && e.status == EventStatus::Scheduled)
        .count();
    if scheduled_today > config.crowded_agenda {
        out.push(
            "Your agenda is full today. Leave time for breaks between appointments.".to_string(),
        );
    }

    if monthly_expenses(transactions, today) > config.monthly_expense_warning {
        out.push("Your monthly expenses are high. Review your expense categories.".to_string());
    }

    if stats.streak_days > config.streak_celebration {
        out.push(format!(
            "Congratulations! You have kept a {}-day streak. Keep it up!",
            stats.streak_days
        ));
    } else if stats.streak_days == 0 {
        out.push("How about starting a new productivity streak today?".to_string());
    }

    out.truncate(MAX_SUGGESTIONS);
    out
}

/// Sum of expenses dated in the month and year of `today`.
pub fn monthly_expenses(transactions: &[Transaction], today: NaiveDate) -> f64 {
    transactions
        .iter()
        .filter(|t| {
            t.kind == TransactionKind::Expense
                && t.date.month() == today.month()
                && t.date.year() == today.year()
        })
        .map(|t| t.amount)
        .sum()
}

pub fn compute(
    tasks: &[Task],
    events: &[CalendarEvent],
    transactions: &[Transaction],
    stats: &ProductivityStats,
    today: NaiveDate,
    config: &InsightsConfig,
) -> ProductivityInsights {
    let week_start = today - Duration::days(7);
    ProductivityInsights {
        total_tasks: tasks.len(),
        completed_tasks: tasks.iter().filter(|t| t.is_done()).count(),
        today_events: events.iter().filter(|e| e.date == today).count(),
        weekly_transactions: transactions.iter().filter(|t| t.date >= week_start).count(),
        streak_days: stats.streak_days,
        productivity_score: productivity_score(tasks, stats),
        suggestions: suggestions(tasks, events, transactions, stats, today, config),
    }
}

/// Insights over whatever `store` currently holds.
pub fn snapshot(store: &Store, today: NaiveDate, config: &InsightsConfig) -> ProductivityInsights {
    let tasks: Vec<Task> = read_records(store, StorageKey::Tasks);
    let events: Vec<CalendarEvent> = read_records(store, StorageKey::Events);
    let transactions: Vec<Transaction> = read_records(store, StorageKey::Transactions);
    let stats = ProductivityStats::load(store);
    compute(&tasks, &events, &transactions, &stats, today, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskContext, TaskStatus};
    use chrono::NaiveTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()
    }

    fn task(id: &str, priority: Priority, done: bool) -> Task {
        Task {
            id: id.into(),
            title: id.into(),
            description: None,
            due_date: None,
            priority,
            context: TaskContext::Work,
            status: if done { TaskStatus::Done } else { TaskStatus::Todo },
            extra: Default::default(),
        }
    }

    fn event(id: &str, date: NaiveDate, status: EventStatus) -> CalendarEvent {
        CalendarEvent {
            id: id.into(),
            title: id.into(),
            date,
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            kind: "Reunião".into(),
            status,
            description: None,
            duration: None,
            extra: Default::default(),
        }
    }

    fn expense(id: &str, amount: f64, date: NaiveDate) -> Transaction {
        Transaction {
            id: id.into(),
            description: id.into(),
            amount,
            kind: TransactionKind::Expense,
            category: "Casa".into(),
            date,
            extra: Default::default(),
        }
    }

    fn stats(streak: u32, study: u32) -> ProductivityStats {
        ProductivityStats {
            streak_days: streak,
            study_sessions: study,
            ..ProductivityStats::default()
        }
    }

    #[test]
    fn score_without_tasks_uses_bonuses_only() {
        assert_eq!(productivity_score(&[], &stats(0, 0)), 0);
        assert_eq!(productivity_score(&[], &stats(3, 2)), 9);
        assert_eq!(productivity_score(&[], &stats(50, 50)), 35);
    }

    #[test]
    fn score_is_capped_at_100() {
        let tasks = vec![task("a", Priority::Low, true), task("b", Priority::Low, true)];
        assert_eq!(productivity_score(&tasks, &stats(10, 10)), 100);
    }

    #[test]
    fn score_rounds_completion_rate() {
        let tasks = vec![
            task("a", Priority::Low, true),
            task("b", Priority::Low, false),
            task("c", Priority::Low, false),
        ];
        // 33.33 + 2 + 1.5
        assert_eq!(productivity_score(&tasks, &stats(1, 1)), 37);
    }

    #[test]
    fn suggestions_follow_rule_order_and_cap() {
        let tasks: Vec<Task> = (0..4)
            .map(|i| task(&format!("t{i}"), Priority::High, false))
            .collect();
        let events: Vec<CalendarEvent> = (0..6)
            .map(|i| event(&format!("e{i}"), today(), EventStatus::Scheduled))
            .collect();
        let transactions = vec![expense("rent", 2600.0, today())];
        let out = suggestions(
            &tasks,
            &events,
            &transactions,
            &stats(0, 0),
            today(),
            &InsightsConfig::default(),
        );
        assert_eq!(out.len(), 3);
        assert!(out[0].contains("high-priority"));
        assert!(out[1].contains("agenda"));
        assert!(out[2].contains("expenses"));
    }

    #[test]
    fn streak_commentary() {
        let config = InsightsConfig::default();
        let long = suggestions(&[], &[], &[], &stats(8, 0), today(), &config);
        assert_eq!(
            long,
            vec!["Congratulations! You have kept a 8-day streak. Keep it up!".to_string()]
        );
        let none = suggestions(&[], &[], &[], &stats(0, 0), today(), &config);
        assert_eq!(none.len(), 1);
        let middling = suggestions(&[], &[], &[], &stats(7, 0), today(), &config);
        assert!(middling.is_empty());
    }

    #[test]
    fn cancelled_events_do_not_crowd_the_agenda() {
        let events: Vec<CalendarEvent> = (0..6)
            .map(|i| event(&format!("e{i}"), today(), EventStatus::Cancelled))
            .collect();
        let out = suggestions(&[], &events, &[], &stats(2, 0), today(), &InsightsConfig::default());
        assert!(out.is_empty());
    }

    #[test]
    fn monthly_expenses_ignore_other_years() {
        let last_year = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let transactions = vec![expense("a", 100.0, today()), expense("b", 900.0, last_year)];
        assert_eq!(monthly_expenses(&transactions, today()), 100.0);
    }

    #[test]
    fn snapshot_counts() {
        let store = Store::in_memory();
        store.set(
            StorageKey::Tasks,
            &vec![task("a", Priority::Low, true), task("b", Priority::Low, false)],
        );
        store.set(
            StorageKey::Events,
            &vec![
                event("today", today(), EventStatus::Completed),
                event("later", today() + Duration::days(1), EventStatus::Scheduled),
            ],
        );
        store.set(
            StorageKey::Transactions,
            &vec![
                expense("recent", 10.0, today() - Duration::days(7)),
                expense("old", 10.0, today() - Duration::days(8)),
            ],
        );
        let insights = snapshot(&store, today(), &InsightsConfig::default());
        assert_eq!(insights.total_tasks, 2);
        assert_eq!(insights.completed_tasks, 1);
        assert_eq!(insights.today_events, 1);
        assert_eq!(insights.weekly_transactions, 1);
        assert_eq!(insights.streak_days, 0);
        assert_eq!(insights.productivity_score, 50);
    }
}
