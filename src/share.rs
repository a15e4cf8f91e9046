//! Links for handing a note to someone else.

use crate::entity::Note;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// `<base>/shared-note/<id>`. A trailing slash on `base_url` is ignored.
pub fn share_link(base_url: &str, note: &Note) -> String {
    format!("{}/shared-note/{}", base_url.trim_end_matches('/'), note.id)
}

pub fn email_subject(note: &Note) -> String {
    format!("Partage de Note: {}", note.title)
}

pub fn email_body(note: &Note) -> String {
    format!(
        "Voici une note partagée avec vous : \n\nTitre : {}\nContenu : {}\n\n",
        note.title, note.content
    )
}

/// `mailto:` link with no recipient and an encoded subject and body.
pub fn mailto_link(note: &Note) -> String {
    format!(
        "mailto:?subject={}&body={}",
        urlencoding::encode(&email_subject(note)),
        urlencoding::encode(&email_body(note))
    )
}
