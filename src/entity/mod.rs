mod classification;
mod note;

pub use classification::{Category, Priority, CATEGORIES, PRIORITIES};
pub use note::{
    inline_image_markup, reminder_format, welcome_notes, Attachment, Note, NoteChange, NoteId,
    DEFAULT_COLOR, DEFAULT_TITLE,
};
pub(crate) use note::guess_mime_type;
