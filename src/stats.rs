//! Collection statistics: notes per month, per category and per priority.

use chrono::Datelike;
use serde::Serialize;

use crate::entity::{Note, CATEGORIES, PRIORITIES};

pub const MONTH_LABELS: [&str; 12] = [
    "Janvier", "Février", "Mars", "Avril", "Mai", "Juin", "Juillet", "Août", "Septembre",
    "Octobre", "Novembre", "Décembre",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteStats {
    pub total: usize,
    pub by_month: Vec<Bucket>,
    pub by_category: Vec<Bucket>,
    pub by_priority: Vec<Bucket>,
}

impl NoteStats {
    pub fn compute(notes: &[Note]) -> Self {
        let by_month = by_month(notes)
            .iter()
            .zip(MONTH_LABELS)
            .map(|(count, label)| Bucket {
                label: label.to_string(),
                count: *count,
            })
            .collect();

        Self {
            total: notes.len(),
            by_month,
            by_category: by_category(notes),
            by_priority: by_priority(notes),
        }
    }
}

/// Creation counts per calendar month (local time), January first.
/// Years are folded together.
pub fn by_month(notes: &[Note]) -> [usize; 12] {
    let mut months = [0; 12];
    for created in notes.iter().filter_map(Note::created_at) {
        months[created.month0() as usize] += 1;
    }
    months
}

/// Counts over the fixed category set; values outside it are not counted.
pub fn by_category(notes: &[Note]) -> Vec<Bucket> {
    CATEGORIES
        .iter()
        .map(|category| Bucket {
            label: category.to_string(),
            count: notes.iter().filter(|n| &n.category == category).count(),
        })
        .collect()
}

/// Counts over the fixed priority set; values outside it are not counted.
pub fn by_priority(notes: &[Note]) -> Vec<Bucket> {
    PRIORITIES
        .iter()
        .map(|priority| Bucket {
            label: priority.to_string(),
            count: notes.iter().filter(|n| &n.priority == priority).count(),
        })
        .collect()
}
