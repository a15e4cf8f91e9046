//! In-memory note collection owned by the running session.
//!
//! Every other component reads snapshots of this collection; only the
//! methods here mutate it.

use std::collections::HashSet;

use chrono::Utc;

use crate::entity::{Attachment, Note, NoteChange, NoteId};

#[derive(Debug, Default, Clone)]
pub struct NoteStore {
    notes: Vec<Note>,
    last_id: NoteId,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: Vec<Note>) -> Self {
        let mut store = Self::new();
        store.replace_all(notes);
        store
    }

    /// Append a note with default fields, stamped with the current time.
    pub fn create(&mut self) -> NoteId {
        self.create_at(Utc::now().timestamp_millis())
    }

    /// Append a note using `now_ms` as the id candidate.
    ///
    /// Ids stay strictly increasing within the session even when two notes
    /// are created in the same millisecond. Once the largest id is taken,
    /// the first unused id from `now_ms` onwards is chosen instead.
    pub fn create_at(&mut self, now_ms: i64) -> NoteId {
        let id = match self.last_id.checked_add(1) {
            Some(next) => now_ms.max(next),
            None => self.next_free_id(now_ms),
        };
        self.last_id = self.last_id.max(id);
        self.notes.push(Note::new(id));
        id
    }

    fn next_free_id(&self, from: NoteId) -> NoteId {
        let used: HashSet<NoteId> = self.notes.iter().map(|n| n.id).collect();
        let from = from.max(1);
        (from..=NoteId::MAX)
            .chain(1..from)
            .find(|id| !used.contains(id))
            .unwrap_or(from)
    }

    /// Replace one field. Returns false when no note has this id.
    pub fn update(&mut self, id: NoteId, change: NoteChange) -> bool {
        self.modify(id, |note| note.apply(change))
    }

    pub fn delete(&mut self, id: NoteId) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        self.notes.len() != before
    }

    pub fn replace_all(&mut self, notes: Vec<Note>) {
        if let Some(max) = notes.iter().map(|n| n.id).max() {
            self.last_id = self.last_id.max(max);
        }
        self.notes = notes;
    }

    pub fn add_attachments(&mut self, id: NoteId, attachments: Vec<Attachment>) -> bool {
        self.modify(id, |note| note.attachments.extend(attachments))
    }

    /// Drop the attachment at `index`, keeping the order of the rest.
    pub fn remove_attachment(&mut self, id: NoteId, index: usize) -> bool {
        self.modify(id, |note| {
            if index < note.attachments.len() {
                note.attachments.remove(index);
            }
        })
    }

    pub fn append_content(&mut self, id: NoteId, markup: &str) -> bool {
        self.modify(id, |note| note.content.push_str(markup))
    }

    fn modify(&mut self, id: NoteId, f: impl FnOnce(&mut Note)) -> bool {
        match self.notes.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                f(note);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.clone()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
