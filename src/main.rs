use clap::Parser;
use carnet::cli::{
    handle_attach, handle_delete, handle_detach, handle_edit, handle_export, handle_list,
    handle_new, handle_paste, handle_remind, handle_serve, handle_share, handle_show, handle_stats,
    handle_sync, handle_theme, handle_watch, Cli, Commands, Context,
};
use carnet::config::env_vars;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env(env_vars::LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let ctx = Context::new(cli.data_dir, cli.offline);

    let result = match cli.command {
        Commands::New {
            title,
            content,
            category,
            priority,
            color,
            remind,
            json,
        } => handle_new(&ctx, title, content, category, priority, color, remind, json).await,
        Commands::List {
            category,
            sort,
            json,
        } => handle_list(&ctx, category, sort, json).await,
        Commands::Show { id, json } => handle_show(&ctx, id, json).await,
        Commands::Edit {
            id,
            field,
            value,
            json,
        } => handle_edit(&ctx, id, field, value, json).await,
        Commands::Delete { id, force } => handle_delete(&ctx, id, force).await,
        Commands::Attach { id, files, json } => handle_attach(&ctx, id, files, json).await,
        Commands::Detach { id, index, json } => handle_detach(&ctx, id, index, json).await,
        Commands::Paste { id, image, json } => handle_paste(&ctx, id, image, json).await,
        Commands::Remind => handle_remind(&ctx).await,
        Commands::Sync { json } => handle_sync(&ctx, json).await,
        Commands::Watch => handle_watch(&ctx).await,
        Commands::Stats { json } => handle_stats(&ctx, json).await,
        Commands::Share { id, email } => handle_share(&ctx, id, email).await,
        Commands::Export { id, out } => handle_export(&ctx, id, out).await,
        Commands::Theme { name, json } => handle_theme(&ctx, name, json),
        Commands::Serve { port } => handle_serve(&ctx, port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
