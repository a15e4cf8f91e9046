mod commands;
mod handlers;

pub use commands::{Cli, Commands};
pub use handlers::{
    handle_attach, handle_delete, handle_detach, handle_edit, handle_export, handle_list,
    handle_new, handle_paste, handle_remind, handle_serve, handle_share, handle_show, handle_stats,
    handle_sync, handle_theme, handle_watch, Context,
};
