//! Displayed note list: category filter, then priority-then-recency sort.

use std::str::FromStr;

use crate::entity::{Category, Note};

/// Filter value meaning "every category".
pub const ALL_CATEGORIES: &str = "Toutes";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, note: &Note) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => &note.category == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ALL_CATEGORIES | "all" => Ok(CategoryFilter::All),
            other => Ok(CategoryFilter::Only(Category::from(other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Date,
    Priority,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortMode::Date),
            "priority" | "priorite" | "priorité" => Ok(SortMode::Priority),
            _ => Err(format!("Invalid sort mode: {}", s)),
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortMode::Date => write!(f, "date"),
            SortMode::Priority => write!(f, "priority"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewQuery {
    pub filter: CategoryFilter,
    /// Selected sort mode. Ordering is always priority-then-recency; this
    /// value is carried for display only.
    pub sort_by: SortMode,
}

impl ViewQuery {
    pub fn new(filter: CategoryFilter, sort_by: SortMode) -> Self {
        Self { filter, sort_by }
    }
}

/// Filter then sort a snapshot of the collection.
pub fn derive_view(notes: &[Note], query: &ViewQuery) -> Vec<Note> {
    let filtered = notes
        .iter()
        .filter(|note| query.filter.matches(note))
        .cloned()
        .collect();
    sort_notes(filtered)
}

/// Priority ascending (Haute first), then id descending (newest first).
pub fn sort_notes(mut notes: Vec<Note>) -> Vec<Note> {
    notes.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| b.id.cmp(&a.id))
    });
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Priority;
    use proptest::prelude::*;

    fn note(id: i64, priority: Priority, category: Category) -> Note {
        let mut note = Note::new(id);
        note.priority = priority;
        note.category = category;
        note
    }

    #[test]
    fn test_haute_before_moyenne() {
        let notes = vec![
            note(100, Priority::Moyenne, Category::Autres),
            note(200, Priority::Haute, Category::Autres),
        ];
        let view = derive_view(&notes, &ViewQuery::default());
        assert_eq!(view.iter().map(|n| n.id).collect::<Vec<_>>(), vec![200, 100]);
    }

    #[test]
    fn test_ties_newest_first() {
        let notes = vec![
            note(1, Priority::Basse, Category::Autres),
            note(3, Priority::Basse, Category::Autres),
            note(2, Priority::Basse, Category::Autres),
        ];
        let view = derive_view(&notes, &ViewQuery::default());
        assert_eq!(view.iter().map(|n| n.id).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_category_filter() {
        let notes = vec![
            note(1, Priority::Haute, Category::Travail),
            note(2, Priority::Haute, Category::Urgent),
            note(3, Priority::Basse, Category::Travail),
        ];
        let query = ViewQuery::new("Travail".parse().unwrap(), SortMode::Date);
        let view = derive_view(&notes, &query);
        assert_eq!(view.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_sort_mode_does_not_change_order() {
        let notes = vec![
            note(1, Priority::Basse, Category::Autres),
            note(2, Priority::Haute, Category::Autres),
        ];
        let by_date = derive_view(&notes, &ViewQuery::new(CategoryFilter::All, SortMode::Date));
        let by_priority =
            derive_view(&notes, &ViewQuery::new(CategoryFilter::All, SortMode::Priority));
        assert_eq!(by_date, by_priority);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("Toutes".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Idées".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Idees)
        );
        assert!("alphabetical".parse::<SortMode>().is_err());
    }

    fn priority_strategy() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Haute),
            Just(Priority::Moyenne),
            Just(Priority::Basse),
            "[a-z]{1,5}".prop_map(Priority::Other),
        ]
    }

    proptest! {
        #[test]
        fn prop_sort_law(entries in prop::collection::vec((0i64..1000, priority_strategy()), 0..40)) {
            let notes: Vec<Note> = entries
                .into_iter()
                .map(|(id, p)| note(id, p, Category::Autres))
                .collect();
            let view = derive_view(&notes, &ViewQuery::default());

            prop_assert_eq!(view.len(), notes.len());
            for pair in view.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let ordered = a.priority.rank() < b.priority.rank()
                    || (a.priority.rank() == b.priority.rank() && a.id >= b.id);
                prop_assert!(ordered);
            }
        }

        #[test]
        fn prop_view_is_deterministic(ids in prop::collection::vec(0i64..100, 0..30)) {
            let notes: Vec<Note> = ids.into_iter().map(Note::new).collect();
            let query = ViewQuery::default();
            prop_assert_eq!(derive_view(&notes, &query), derive_view(&notes, &query));
        }
    }
}
