//! Reminder checks.
//!
//! A fixed-period ticker asks the scheduler which notes are due; each due
//! note produces one notification and then has its reminder cleared. Notes
//! whose notification could not be shown keep their reminder and are
//! looked at again on the next tick.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::entity::{Note, NoteId};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);
pub const NOTIFICATION_TITLE: &str = "Rappel 📌";

pub fn notification_body(note: &Note) -> String {
    format!("N'oubliez pas : {}", note.title)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet.
    Default,
    /// The platform has no notification service.
    Unsupported,
}

/// Platform notification service.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Fire and forget.
    fn notify(&self, title: &str, body: &str);
}

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Prints notifications to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "Reminder fired");
        println!("{}  {}", title, body);
    }
}

/// Keeps every notification in memory. Clones share the same log.
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    permission: Permission,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission,
            sent: Arc::default(),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn notify(&self, title: &str, body: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((title.to_string(), body.to_string()));
        }
    }
}

pub struct ReminderScheduler<N> {
    notifier: N,
    period: Duration,
}

impl<N: Notifier> ReminderScheduler<N> {
    pub fn new(notifier: N, period: Duration) -> Self {
        Self { notifier, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Notes whose reminder is at or before `now`, in collection order.
    pub fn due(notes: &[Note], now: NaiveDateTime) -> impl Iterator<Item = &Note> {
        notes.iter().filter(move |note| note.reminder_due(now))
    }

    /// Run one check. Returns the ids whose notification fired; the caller
    /// clears their reminders.
    pub fn tick(&self, notes: &[Note], now: NaiveDateTime) -> Vec<NoteId> {
        let mut fired = Vec::new();
        for note in Self::due(notes, now) {
            match self.notifier.permission() {
                Permission::Granted => {
                    self.notifier
                        .notify(NOTIFICATION_TITLE, &notification_body(note));
                    fired.push(note.id);
                }
                Permission::Unsupported => {
                    tracing::warn!(id = note.id, "Notifications are not supported here");
                }
                Permission::Denied | Permission::Default => {
                    tracing::debug!(id = note.id, "Notification permission not granted");
                }
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn note_with_reminder(id: NoteId, title: &str, reminder: Option<NaiveDateTime>) -> Note {
        let mut note = Note::new(id);
        note.title = title.to_string();
        note.reminder = reminder;
        note
    }

    #[test]
    fn test_due_keeps_insertion_order() {
        let notes = vec![
            note_with_reminder(3, "c", Some(at(9))),
            note_with_reminder(1, "a", Some(at(8))),
            note_with_reminder(2, "b", Some(at(20))),
            note_with_reminder(4, "d", None),
        ];
        let due: Vec<_> = ReminderScheduler::<ConsoleNotifier>::due(&notes, at(12))
            .map(|n| n.id)
            .collect();
        assert_eq!(due, vec![3, 1]);
    }

    #[test]
    fn test_tick_notifies_when_granted() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let scheduler = ReminderScheduler::new(notifier.clone(), DEFAULT_PERIOD);
        let notes = vec![note_with_reminder(1, "Dentiste", Some(at(8)))];

        let fired = scheduler.tick(&notes, at(9));

        assert_eq!(fired, vec![1]);
        assert_eq!(
            notifier.sent(),
            vec![("Rappel 📌".to_string(), "N'oubliez pas : Dentiste".to_string())]
        );
    }

    #[test]
    fn test_tick_skips_without_permission() {
        for permission in [Permission::Denied, Permission::Default, Permission::Unsupported] {
            let notifier = RecordingNotifier::new(permission);
            let scheduler = ReminderScheduler::new(notifier.clone(), DEFAULT_PERIOD);
            let notes = vec![note_with_reminder(1, "x", Some(at(8)))];

            assert!(scheduler.tick(&notes, at(9)).is_empty());
            assert!(notifier.sent().is_empty());
        }
    }

    #[test]
    fn test_future_reminder_not_fired() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let scheduler = ReminderScheduler::new(notifier, DEFAULT_PERIOD);
        let notes = vec![note_with_reminder(1, "x", Some(at(10)))];
        assert!(scheduler.tick(&notes, at(9)).is_empty());
    }
}
