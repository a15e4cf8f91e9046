//! Display theme preference, kept in the local store next to the notes.

use crate::error::{CarnetError, Result};
use crate::storage::LocalBackend;

pub const THEME_KEY: &str = "theme";
pub const DEFAULT_THEME: &str = "light";
pub const THEMES: [&str; 8] = [
    "light", "dark", "blue", "pink", "green", "purple", "orange", "yellow",
];

/// Stored theme, or the default when unset or unreadable.
pub fn load_theme(local: &impl LocalBackend) -> String {
    match local.get(THEME_KEY) {
        Ok(Some(theme)) if !theme.is_empty() => theme,
        Ok(_) => DEFAULT_THEME.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read theme preference");
            DEFAULT_THEME.to_string()
        }
    }
}

pub fn save_theme(local: &impl LocalBackend, theme: &str) -> Result<()> {
    if !THEMES.contains(&theme) {
        return Err(CarnetError::invalid(
            THEME_KEY,
            format!("expected one of {}", THEMES.join(", ")),
        ));
    }
    local.set(THEME_KEY, theme)
}
