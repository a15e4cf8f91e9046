use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::api::{self, NoteRepository};
use crate::config::{resolve_data_dir, CarnetConfig};
use crate::entity::{guess_mime_type, inline_image_markup, reminder_format, Attachment, Note, NoteChange, NoteId};
use crate::error::{CarnetError, Result};
use crate::export::export_note;
use crate::preferences::{load_theme, save_theme};
use crate::reminder::{ConsoleNotifier, SystemClock};
use crate::share::{mailto_link, share_link};
use crate::stats::NoteStats;
use crate::storage::{FileLocalStore, SqliteRecordStore};
use crate::sync::{Connectivity, ConnectivitySignal, Engine, EngineHandle, EngineOptions, PersistenceBridge};
use crate::view::{CategoryFilter, SortMode, ViewQuery};

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub data_dir: PathBuf,
    pub offline: bool,
}

impl Context {
    pub fn new(data_dir: Option<PathBuf>, offline: bool) -> Self {
        Self {
            data_dir: resolve_data_dir(data_dir),
            offline,
        }
    }

    fn config(&self) -> Result<CarnetConfig> {
        fs::create_dir_all(&self.data_dir)?;
        CarnetConfig::load(&self.data_dir)
    }
}

/// A running engine over the on-disk backends.
struct Session {
    config: CarnetConfig,
    handle: EngineHandle,
    join: JoinHandle<()>,
    signal: ConnectivitySignal,
}

impl Session {
    async fn open(ctx: &Context) -> Result<Self> {
        let config = ctx.config()?;
        let local = FileLocalStore::open(&ctx.data_dir, config.local_capacity_bytes)?;
        let records = SqliteRecordStore::open(&ctx.data_dir, &config.database)?;
        let bridge =
            PersistenceBridge::with_names(local, records, &config.local_key, &config.store_name);

        let initial = if ctx.offline {
            Connectivity::Offline
        } else {
            config.connectivity
        };
        let signal = ConnectivitySignal::new(initial);
        let options = EngineOptions {
            reminder_period: config.reminder_period(),
        };
        let (handle, join) = Engine::spawn(
            bridge,
            signal.clone(),
            ConsoleNotifier,
            Arc::new(SystemClock),
            options,
        );

        Ok(Self {
            config,
            handle,
            join,
            signal,
        })
    }

    async fn find(&self, id: NoteId) -> Result<Note> {
        self.handle
            .snapshot()
            .await?
            .into_iter()
            .find(|note| note.id == id)
            .ok_or(CarnetError::NoteNotFound(id))
    }

    /// Drain pending work and stop the engine, then hand back `outcome`.
    async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        let closed = self.close().await;
        let value = outcome?;
        closed?;
        Ok(value)
    }

    async fn close(self) -> Result<()> {
        self.handle.flush().await?;
        self.handle.shutdown().await?;
        let _ = self.join.await;
        Ok(())
    }
}

fn print_note_line(note: &Note) {
    let reminder = note
        .reminder
        .as_ref()
        .map(|at| format!("  ⏰ {}", reminder_format::format(at)))
        .unwrap_or_default();
    println!(
        "  {}  [{}] {} ({}){}",
        note.id, note.priority, note.title, note.category, reminder
    );
}

fn print_note(note: &Note) {
    println!("Note {}", note.id);
    println!("Title: {}", note.title);
    println!("Category: {}", note.category);
    println!("Priority: {}", note.priority);
    println!("Color: {}", note.color);
    if let Some(created) = note.created_at() {
        println!("Created: {}", created.format("%Y-%m-%d %H:%M"));
    }
    if let Some(reminder) = &note.reminder {
        println!("Reminder: {}", reminder_format::format(reminder));
    }
    if !note.attachments.is_empty() {
        println!("Attachments:");
        for (index, attachment) in note.attachments.iter().enumerate() {
            println!("  {}. {} ({})", index, attachment.name, attachment.mime_type);
        }
    }
    if !note.content.is_empty() {
        println!("\n{}", note.content);
    }
}

fn print_result(note: &Note, json: bool, verb: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(note)?);
    } else {
        println!("{} note {} - {}", verb, note.id, note.title);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_new(
    ctx: &Context,
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    color: Option<String>,
    remind: Option<String>,
    json: bool,
) -> Result<()> {
    // Validate everything before touching the collection.
    let fields = [
        ("title", title),
        ("content", content),
        ("category", category),
        ("priority", priority),
        ("color", color),
        ("reminder", remind),
    ];
    let changes = fields
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| NoteChange::parse(field, &v)))
        .collect::<Result<Vec<_>>>()?;

    let session = Session::open(ctx).await?;
    let outcome = async {
        let id = session.handle.create().await?;
        for change in changes {
            session.handle.update(id, change)?;
        }
        session.handle.flush().await?;
        session.find(id).await
    }
    .await;
    let note = session.finish(outcome).await?;

    print_result(&note, json, "Created")
}

pub async fn handle_list(
    ctx: &Context,
    category: Option<String>,
    sort: String,
    json: bool,
) -> Result<()> {
    let filter = match category {
        Some(category) => category
            .parse::<CategoryFilter>()
            .map_err(|e| CarnetError::invalid("category", e))?,
        None => CategoryFilter::All,
    };
    let sort_by = sort
        .parse::<SortMode>()
        .map_err(|e| CarnetError::invalid("sort", e))?;

    let session = Session::open(ctx).await?;
    let outcome = session.handle.view(ViewQuery::new(filter, sort_by)).await;
    let notes = session.finish(outcome).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else if notes.is_empty() {
        println!("No notes found.");
    } else {
        println!("Notes:\n");
        for note in &notes {
            print_note_line(note);
        }
    }

    Ok(())
}

pub async fn handle_show(ctx: &Context, id: NoteId, json: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = session.find(id).await;
    let note = session.finish(outcome).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        print_note(&note);
    }
    Ok(())
}

pub async fn handle_edit(
    ctx: &Context,
    id: NoteId,
    field: String,
    value: String,
    json: bool,
) -> Result<()> {
    let change = NoteChange::parse(&field, &value)?;

    let session = Session::open(ctx).await?;
    let outcome = async {
        session.find(id).await?;
        session.handle.update(id, change)?;
        session.handle.flush().await?;
        session.find(id).await
    }
    .await;
    let note = session.finish(outcome).await?;

    print_result(&note, json, "Updated")
}

pub async fn handle_delete(ctx: &Context, id: NoteId, force: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = async {
        let note = session.find(id).await?;

        // Confirm deletion unless --force is used
        if !force {
            eprintln!("Delete note {} - {}? [y/N] ", note.id, note.title);

            if atty::is(atty::Stream::Stdin) {
                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                if !input.trim().eq_ignore_ascii_case("y") {
                    return Ok(None);
                }
            } else {
                return Err(CarnetError::invalid(
                    "delete",
                    "use --force to delete in non-interactive mode",
                ));
            }
        }

        session.handle.delete(id)?;
        Ok::<_, CarnetError>(Some(note))
    }
    .await;

    match session.finish(outcome).await? {
        Some(note) => println!("Deleted note {} - {}", note.id, note.title),
        None => println!("Cancelled."),
    }
    Ok(())
}

pub async fn handle_attach(
    ctx: &Context,
    id: NoteId,
    files: Vec<PathBuf>,
    json: bool,
) -> Result<()> {
    let attachments = files
        .iter()
        .map(|path| Attachment::from_path(path))
        .collect::<Result<Vec<_>>>()?;

    let session = Session::open(ctx).await?;
    let outcome = async {
        session.find(id).await?;
        session.handle.add_attachments(id, attachments)?;
        session.handle.flush().await?;
        session.find(id).await
    }
    .await;
    let note = session.finish(outcome).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note.attachments)?);
    } else {
        println!(
            "Attached {} file(s) to note {} ({} total)",
            files.len(),
            note.id,
            note.attachments.len()
        );
    }
    Ok(())
}

pub async fn handle_detach(ctx: &Context, id: NoteId, index: usize, json: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = async {
        let note = session.find(id).await?;
        if index >= note.attachments.len() {
            return Err(CarnetError::invalid(
                "index",
                format!("note {} has {} attachment(s)", id, note.attachments.len()),
            ));
        }
        session.handle.remove_attachment(id, index)?;
        session.handle.flush().await?;
        session.find(id).await
    }
    .await;
    let note = session.finish(outcome).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note.attachments)?);
    } else {
        println!(
            "Removed attachment {} from note {} ({} left)",
            index,
            note.id,
            note.attachments.len()
        );
    }
    Ok(())
}

pub async fn handle_paste(ctx: &Context, id: NoteId, image: PathBuf, json: bool) -> Result<()> {
    let mime_type = guess_mime_type(&image);
    if !mime_type.starts_with("image/") {
        return Err(CarnetError::invalid(
            "image",
            format!("{} is not an image", image.display()),
        ));
    }
    let bytes = fs::read(&image)?;
    let markup = inline_image_markup(mime_type, &bytes);

    let session = Session::open(ctx).await?;
    let outcome = async {
        session.find(id).await?;
        session.handle.append_content(id, markup)?;
        session.handle.flush().await?;
        session.find(id).await
    }
    .await;
    let note = session.finish(outcome).await?;

    print_result(&note, json, "Pasted image into")
}

pub async fn handle_remind(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = async {
        let before = session.handle.snapshot().await?;
        session.handle.tick_reminders()?;
        session.handle.flush().await?;
        let after = session.handle.snapshot().await?;

        let cleared = before
            .iter()
            .filter(|note| note.reminder.is_some())
            .filter(|note| {
                after
                    .iter()
                    .any(|later| later.id == note.id && later.reminder.is_none())
            })
            .count();
        Ok::<_, CarnetError>(cleared)
    }
    .await;
    let fired = session.finish(outcome).await?;

    if fired == 0 {
        println!("No reminders due.");
    } else {
        println!("{} reminder(s) fired.", fired);
    }
    Ok(())
}

pub async fn handle_sync(ctx: &Context, json: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = async {
        // The startup pass is already queued; wait for it.
        session.handle.flush().await?;
        let connectivity = session.handle.connectivity().await?;
        let notes = session.handle.snapshot().await?;
        Ok::<_, CarnetError>((connectivity, notes.len()))
    }
    .await;
    let (connectivity, count) = session.finish(outcome).await?;

    if json {
        let summary = serde_json::json!({ "connectivity": connectivity, "notes": count });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Synchronized {} note(s) ({})", count, connectivity);
    }
    Ok(())
}

pub async fn handle_watch(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = async {
        let count = session.handle.snapshot().await?.len();
        let connectivity = session.handle.connectivity().await?;
        eprintln!(
            "Watching {} note(s), {}. Type \"online\" or \"offline\" to switch, Ctrl-C to stop.",
            count, connectivity
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => match line.trim() {
                        "online" => session.signal.set(Connectivity::Online),
                        "offline" => session.signal.set(Connectivity::Offline),
                        "" => {}
                        other => eprintln!("Unknown input '{}' (expected online or offline)", other),
                    },
                    Ok(None) | Err(_) => stdin_open = false,
                },
            }
        }
        Ok::<_, CarnetError>(())
    }
    .await;
    session.finish(outcome).await
}

pub async fn handle_stats(ctx: &Context, json: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = session.handle.snapshot().await;
    let notes = session.finish(outcome).await?;
    let stats = NoteStats::compute(&notes);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total: {}", stats.total);
    for (heading, buckets) in [
        ("Notes par mois", &stats.by_month),
        ("Catégories", &stats.by_category),
        ("Priorités", &stats.by_priority),
    ] {
        println!("\n{}:", heading);
        for bucket in buckets {
            println!("  {:<10} {:>4}", bucket.label, bucket.count);
        }
    }
    Ok(())
}

pub async fn handle_share(ctx: &Context, id: NoteId, email: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = session.find(id).await;
    let base_url = session.config.share_base_url.clone();
    let note = session.finish(outcome).await?;

    if email {
        println!("{}", mailto_link(&note));
    } else {
        println!("{}", share_link(&base_url, &note));
    }
    Ok(())
}

pub async fn handle_export(ctx: &Context, id: NoteId, out: Option<PathBuf>) -> Result<()> {
    let session = Session::open(ctx).await?;
    let outcome = session.find(id).await;
    let note = session.finish(outcome).await?;

    let dir = match out {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let path = export_note(&note, &dir)?;
    println!("Exported note {} to {}", note.id, path.display());
    Ok(())
}

pub fn handle_theme(ctx: &Context, name: Option<String>, json: bool) -> Result<()> {
    let config = ctx.config()?;
    let local = FileLocalStore::open(&ctx.data_dir, config.local_capacity_bytes)?;

    if let Some(name) = name {
        save_theme(&local, &name)?;
    }
    let theme = load_theme(&local);

    if json {
        println!("{}", serde_json::json!({ "theme": theme }));
    } else {
        println!("Theme: {}", theme);
    }
    Ok(())
}

pub async fn handle_serve(ctx: &Context, port: Option<u16>) -> Result<()> {
    let config = ctx.config()?;
    let repository = NoteRepository::open(&ctx.data_dir.join(&config.api.database))?;
    api::serve(repository, port.unwrap_or(config.api.port)).await
}
