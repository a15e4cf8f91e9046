// src/entity/note.rs
use std::path::Path;

use base64::Engine as _;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::{Category, Priority};
use crate::error::{CarnetError, Result};

/// Millisecond timestamp taken at creation; doubles as creation order.
pub type NoteId = i64;

pub const DEFAULT_TITLE: &str = "Nouvelle Note";
pub const DEFAULT_COLOR: &str = "#000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Describe a local file as an attachment pointing at its absolute path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let absolute = path.canonicalize()?;
        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| CarnetError::invalid("attachment", "path has no file name"))?;

        Ok(Self {
            name,
            url: format!("file://{}", absolute.display()),
            mime_type: guess_mime_type(&absolute).to_string(),
        })
    }
}

pub(crate) fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Markup appended to a note's content when an image is pasted into it.
pub fn inline_image_markup(mime_type: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!(
        "<img src=\"data:{};base64,{}\" alt=\"Collé\" style=\"max-width: 100%;\"/>",
        mime_type, encoded
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "reminder_format")]
    pub reminder: Option<NaiveDateTime>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Note {
    pub fn new(id: NoteId) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            content: String::new(),
            color: default_color(),
            category: Category::default(),
            priority: Priority::default(),
            reminder: None,
            attachments: Vec::new(),
        }
    }

    /// Creation time recovered from the id.
    pub fn created_at(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.id).single()
    }

    pub fn reminder_due(&self, now: NaiveDateTime) -> bool {
        matches!(self.reminder, Some(at) if at <= now)
    }

    /// Replace a single field.
    pub fn apply(&mut self, change: NoteChange) {
        match change {
            NoteChange::Title(title) => self.title = title,
            NoteChange::Content(content) => self.content = content,
            NoteChange::Color(color) => self.color = color,
            NoteChange::Category(category) => self.category = category,
            NoteChange::Priority(priority) => self.priority = priority,
            NoteChange::Reminder(reminder) => self.reminder = reminder,
            NoteChange::Attachments(attachments) => self.attachments = attachments,
        }
    }
}

/// Collection used when nothing has been stored yet.
pub fn welcome_notes() -> Vec<Note> {
    let mut welcome = Note::new(1);
    welcome.title = "Bienvenue".to_string();
    welcome.content = "Ceci est votre première note.".to_string();

    let mut example = Note::new(2);
    example.title = "Note Exemple".to_string();
    example.content = "Ajoutez un rappel !".to_string();
    example.category = Category::Travail;
    example.priority = Priority::Haute;

    vec![welcome, example]
}

/// A field-level replacement applied by `NoteStore::update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteChange {
    Title(String),
    Content(String),
    Color(String),
    Category(Category),
    Priority(Priority),
    Reminder(Option<NaiveDateTime>),
    Attachments(Vec<Attachment>),
}

impl NoteChange {
    /// Build a change from a field name and its textual value.
    ///
    /// Category and priority accept any text; only the reminder must be a
    /// parseable timestamp (or empty to clear it).
    pub fn parse(field: &str, value: &str) -> Result<Self> {
        match field {
            "title" => Ok(NoteChange::Title(value.to_string())),
            "content" => Ok(NoteChange::Content(value.to_string())),
            "color" => Ok(NoteChange::Color(value.to_string())),
            "category" => Ok(NoteChange::Category(Category::from(value))),
            "priority" => Ok(NoteChange::Priority(Priority::from(value))),
            "reminder" if value.is_empty() => Ok(NoteChange::Reminder(None)),
            "reminder" => reminder_format::parse(value)
                .map(|at| NoteChange::Reminder(Some(at)))
                .ok_or_else(|| {
                    CarnetError::invalid("reminder", format!("unrecognised timestamp '{}'", value))
                }),
            "attachments" => Err(CarnetError::invalid(
                "attachments",
                "use attach/detach to change attachments",
            )),
            other => Err(CarnetError::UnknownField(other.to_string())),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            NoteChange::Title(_) => "title",
            NoteChange::Content(_) => "content",
            NoteChange::Color(_) => "color",
            NoteChange::Category(_) => "category",
            NoteChange::Priority(_) => "priority",
            NoteChange::Reminder(_) => "reminder",
            NoteChange::Attachments(_) => "attachments",
        }
    }
}

/// Reminder timestamps are stored as `datetime-local` strings; the empty
/// string means no reminder is pending.
pub mod reminder_format {
    use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer, Serializer};

    const DATE_ONLY: &str = "%Y-%m-%d";
    const MINUTES: &str = "%Y-%m-%dT%H:%M";
    const SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
    const FRACTIONAL: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn format(at: &NaiveDateTime) -> String {
        if at.second() == 0 && at.nanosecond() == 0 {
            at.format(MINUTES).to_string()
        } else {
            at.format(SECONDS).to_string()
        }
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        for pattern in [MINUTES, SECONDS, FRACTIONAL] {
            if let Ok(at) = NaiveDateTime::parse_from_str(raw, pattern) {
                return Some(at);
            }
        }
        if let Ok(day) = NaiveDate::parse_from_str(raw, DATE_ONLY) {
            return day.and_hms_opt(0, 0, 0);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Local).naive_local())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Text(String),
        Other(IgnoredAny),
    }

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => s.serialize_str(&format(at)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<Stored>::deserialize(d)? {
            Some(Stored::Text(value)) => {
                let parsed = parse(&value);
                if parsed.is_none() && !value.trim().is_empty() {
                    tracing::warn!(reminder = %value, "Dropping unreadable reminder timestamp");
                }
                Ok(parsed)
            }
            Some(Stored::Other(_)) => {
                tracing::warn!("Dropping non-text reminder value");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
