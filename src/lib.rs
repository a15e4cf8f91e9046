pub mod api;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod export;
pub mod preferences;
pub mod reminder;
pub mod share;
pub mod stats;
pub mod storage;
pub mod store;
pub mod sync;
pub mod view;

pub use config::CarnetConfig;
pub use entity::{Note, NoteChange, NoteId};
pub use error::{CarnetError, Result};
pub use store::NoteStore;
pub use sync::{Engine, EngineHandle, EngineOptions};
