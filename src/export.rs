//! Markdown export of a single note.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::entity::{reminder_format, Note};
use crate::Result;

#[derive(Serialize)]
struct NoteFrontmatter {
    id: i64,
    title: String,
    category: String,
    priority: String,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reminder: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<String>,
}

impl NoteFrontmatter {
    fn from_note(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            category: note.category.to_string(),
            priority: note.priority.to_string(),
            color: note.color.clone(),
            created: note
                .created_at()
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string()),
            reminder: note.reminder.as_ref().map(reminder_format::format),
            attachments: note.attachments.iter().map(|a| a.url.clone()).collect(),
        }
    }
}

/// Generate a YAML frontmatter block.
pub fn yaml_frontmatter<T: Serialize>(data: &T) -> Result<String> {
    let yaml = serde_yaml::to_string(data)?;
    Ok(format!("---\n{}---\n", yaml))
}

pub fn file_name(note: &Note) -> String {
    format!("note-{}.md", note.id)
}

pub fn render_markdown(note: &Note) -> Result<String> {
    let frontmatter = yaml_frontmatter(&NoteFrontmatter::from_note(note))?;
    Ok(format!("{}\n# {}\n\n{}\n", frontmatter, note.title, note.content))
}

/// Write `note-<id>.md` into `dir`, creating it if needed.
pub fn export_note(note: &Note, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name(note));
    fs::write(&path, render_markdown(note)?)?;
    tracing::debug!(id = note.id, path = %path.display(), "Exported note");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Attachment, Priority};
    use tempfile::TempDir;

    fn sample() -> Note {
        let mut note = Note::new(42);
        note.title = "Liste".to_string();
        note.content = "pain, lait".to_string();
        note.priority = Priority::Haute;
        note.attachments
            .push(Attachment::new("a.pdf", "file:///tmp/a.pdf", "application/pdf"));
        note
    }

    #[test]
    fn test_render_has_frontmatter_and_body() {
        let md = render_markdown(&sample()).unwrap();

        assert!(md.starts_with("---\n"));
        assert!(md.contains("id: 42\n"));
        assert!(md.contains("priority: Haute\n"));
        assert!(md.contains("- file:///tmp/a.pdf\n"));
        assert!(!md.contains("reminder:"));
        assert!(md.ends_with("# Liste\n\npain, lait\n"));
    }

    #[test]
    fn test_frontmatter_parses_back() {
        let md = render_markdown(&sample()).unwrap();
        let yaml = md.trim_start_matches("---\n").split("---\n").next().unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(value["title"].as_str(), Some("Liste"));
        assert_eq!(value["category"].as_str(), Some("Autres"));
    }

    #[test]
    fn test_export_writes_named_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("exports");

        let path = export_note(&sample(), &out).unwrap();

        assert_eq!(path, out.join("note-42.md"));
        assert!(fs::read_to_string(path).unwrap().contains("pain, lait"));
    }
}
