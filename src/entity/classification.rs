// src/entity/classification.rs
//! Category and priority values attached to every note.
//!
//! Both sets are closed in the UI, but stored values are never rejected:
//! anything outside the set round-trips unchanged through `Other`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Travail,
    Personnel,
    Idees,
    Urgent,
    #[default]
    Autres,
    Other(String),
}

/// The fixed category set, in display order.
pub const CATEGORIES: [Category; 5] = [
    Category::Travail,
    Category::Personnel,
    Category::Idees,
    Category::Urgent,
    Category::Autres,
];

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Travail => "Travail",
            Category::Personnel => "Personnel",
            Category::Idees => "Idées",
            Category::Urgent => "Urgent",
            Category::Autres => "Autres",
            Category::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Travail" => Category::Travail,
            "Personnel" => Category::Personnel,
            "Idées" => Category::Idees,
            "Urgent" => Category::Urgent,
            "Autres" => Category::Autres,
            _ => Category::Other(raw),
        }
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        Category::from(raw.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Haute,
    #[default]
    Moyenne,
    Basse,
    Other(String),
}

/// The fixed priority set, most urgent first.
pub const PRIORITIES: [Priority; 3] = [Priority::Haute, Priority::Moyenne, Priority::Basse];

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::Haute => "Haute",
            Priority::Moyenne => "Moyenne",
            Priority::Basse => "Basse",
            Priority::Other(raw) => raw,
        }
    }

    /// Sort rank: Haute=1, Moyenne=2, Basse=3. Unrecognised values rank last.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Haute => 1,
            Priority::Moyenne => 2,
            Priority::Basse => 3,
            Priority::Other(_) => 4,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Priority::Other(_))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Priority {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Haute" => Priority::Haute,
            "Moyenne" => Priority::Moyenne,
            "Basse" => Priority::Basse,
            _ => Priority::Other(raw),
        }
    }
}

impl From<&str> for Priority {
    fn from(raw: &str) -> Self {
        Priority::from(raw.to_string())
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_accented_name() {
        let json = serde_json::to_string(&Category::Idees).unwrap();
        assert_eq!(json, "\"Idées\"");
        let parsed: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Category::Idees);
    }

    #[test]
    fn test_unknown_category_is_kept_verbatim() {
        let parsed: Category = serde_json::from_str("\"Courses\"").unwrap();
        assert_eq!(parsed, Category::Other("Courses".to_string()));
        assert!(!parsed.is_known());
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"Courses\"");
    }

    #[test]
    fn test_priority_rank_order() {
        assert!(Priority::Haute.rank() < Priority::Moyenne.rank());
        assert!(Priority::Moyenne.rank() < Priority::Basse.rank());
        assert!(Priority::Basse.rank() < Priority::from("urgent").rank());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Category::default(), Category::Autres);
        assert_eq!(Priority::default(), Priority::Moyenne);
    }
}
