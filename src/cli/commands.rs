use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "carnet")]
#[command(version, about = "An offline-first notebook with reminders and local sync")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to $CARNET_DIR, then ./.carnet)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Treat the network as unavailable for this run
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new note
    New {
        /// Note title
        title: Option<String>,

        /// Note body
        #[arg(long, short = 'c')]
        content: Option<String>,

        /// Category (Travail, Personnel, Idées, Urgent, Autres)
        #[arg(long)]
        category: Option<String>,

        /// Priority (Haute, Moyenne, Basse)
        #[arg(long, short = 'p')]
        priority: Option<String>,

        /// Text color, e.g. "#ff0000"
        #[arg(long)]
        color: Option<String>,

        /// Reminder time, e.g. "2024-06-01T09:30"
        #[arg(long)]
        remind: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes, highest priority and newest first
    List {
        /// Only show this category ("Toutes" for all)
        #[arg(long)]
        category: Option<String>,

        /// Sort selector (date or priority)
        #[arg(long, default_value = "date")]
        sort: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Show {
        /// Note id
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace one field of a note
    Edit {
        /// Note id
        id: i64,

        /// Field name (title, content, color, category, priority, reminder)
        field: String,

        /// New value; an empty reminder clears it
        value: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note
    Delete {
        /// Note id
        id: i64,

        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Attach files to a note
    Attach {
        /// Note id
        id: i64,

        /// Files to attach
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove an attachment by position
    Detach {
        /// Note id
        id: i64,

        /// Zero-based attachment index
        index: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append an image file to a note's content as inline markup
    Paste {
        /// Note id
        id: i64,

        /// Image file
        image: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fire due reminders now
    Remind,

    /// Run a reconciliation pass with the record store
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Keep running: fire reminders on schedule and read "online"/"offline"
    /// transitions from stdin
    Watch,

    /// Note counts per month, category and priority
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a share link for a note
    Share {
        /// Note id
        id: i64,

        /// Print a mailto: link instead
        #[arg(long)]
        email: bool,
    },

    /// Export a note as Markdown (note-<id>.md)
    Export {
        /// Note id
        id: i64,

        /// Output directory (defaults to the current directory)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Show or set the display theme
    Theme {
        /// light, dark, blue, pink, green, purple, orange or yellow
        name: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the REST API server
    Serve {
        /// Port to listen on (defaults to $PORT, then the config)
        #[arg(long)]
        port: Option<u16>,
    },
}
