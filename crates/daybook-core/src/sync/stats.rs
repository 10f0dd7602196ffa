//! Running productivity counters and the activity streak.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::storage::{StorageKey, Store};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductivityStats {
    pub tasks_completed: u32,
    pub study_sessions: u32,
    pub streak_days: u32,
    pub last_activity: Option<NaiveDate>,
    /// Completed tasks per context label.
    pub context_stats: BTreeMap<String, u32>,
}

/// Something that counts toward the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity<'a> {
    TaskCompleted { context: &'a str },
    StudyCompleted,
}

impl ProductivityStats {
    pub fn load(store: &Store) -> Self {
        store.get(StorageKey::Stats, Self::default())
    }

    pub fn save(&self, store: &Store) {
        store.set(StorageKey::Stats, self);
    }

    /// Count `activity` on `today` and advance the streak.
    pub fn record(&mut self, activity: Activity<'_>, today: NaiveDate) {
        match activity {
            Activity::TaskCompleted { context } => {
                self.tasks_completed += 1;
                *self.context_stats.entry(context.to_string()).or_insert(0) += 1;
            }
            Activity::StudyCompleted => self.study_sessions += 1,
        }
        self.touch(today);
    }

    /// Yesterday extends the streak, today leaves it alone, a gap (or no
    /// previous activity) restarts it at one.
    fn touch(&mut self, today: NaiveDate) {
        if self.last_activity == Some(today) {
            return;
        }
        match self.last_activity.map(|last| (today - last).num_days()) {
            Some(1) => self.streak_days += 1,
            Some(gap) if gap < 0 => {}
            _ => self.streak_days = 1,
        }
        self.last_activity = Some(today);
    }
}
