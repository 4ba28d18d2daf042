//! shelf: command-line client for starred items and notes.
//!
//! Reads credentials and settings from the environment (a `.env` file is
//! loaded when present):
//!   SHELF_GITHUB_USER / SHELF_GITHUB_TOKEN - account owning the data repository
//!   SHELF_CACHE_DIR   - local cache directory (default: ".shelf-cache")
//!   SHELF_SECRET_KEY  - secret for signing and verifying action links
//!   SHELF_LOG_FORMAT  - "json" or "text" (default: "text")
//!   RUST_LOG          - standard env filter (default: "shelf=info")

mod output;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelf_core::defaults::CACHE_DIR;
use shelf_core::logging;
use shelf_core::{
    ActionLink, ContentType, DocumentKind, LinkAction, NoteDraft, NotePatch, StarItem,
};
use shelf_remote::{GitHubStore, TokenAuth};
use shelf_store::{FileStorage, Shelf, ShelfConfig};

use output::{print_json, print_notes, print_stars, print_stats, star_line};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(author, version, about = "Stars and notes kept in your own GitHub repository")]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Local cache directory
    #[arg(long, env = "SHELF_CACHE_DIR", default_value = CACHE_DIR, global = true)]
    cache_dir: PathBuf,

    /// Name of the backing repository (default: shelf-data)
    #[arg(long, global = true)]
    repo: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage starred items
    #[command(subcommand)]
    Stars(StarCommands),

    /// Manage notes
    #[command(subcommand)]
    Notes(NoteCommands),

    /// Show collection statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Sign, verify and follow action links
    #[command(subcommand)]
    Link(LinkCommands),

    /// Overwrite a document with an empty collection (recovers corrupt data)
    Reset {
        #[arg(value_enum)]
        document: DocumentArg,
    },

    /// Drop the local cache of the current user
    PurgeCache,
}

#[derive(Subcommand)]
enum StarCommands {
    /// List stars, newest first
    List {
        #[arg(long)]
        json: bool,

        /// Print the cached copy when it is still fresh
        #[arg(long)]
        cached: bool,
    },

    /// Star an item (replaces an existing star with the same id)
    Add {
        #[arg(long)]
        id: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        url: String,

        /// repo, paper, model or post (source names like "github" work too)
        #[arg(long = "type", default_value = "post")]
        content_type: ContentType,

        /// Origin date of the content (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        date: String,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Remove a star (its note is kept)
    Remove { id: String },

    /// Replace the tags of a star
    Tag { id: String, tags: Vec<String> },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// List notes, newest first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Write the note of a content item (updates it if one exists)
    Add {
        /// Id of the starred content
        content_id: String,

        #[arg(long, default_value = "")]
        thoughts: String,

        #[arg(long, default_value = "")]
        questions: String,

        #[arg(long, default_value = "")]
        todos: String,

        /// Content title when the item is not starred
        #[arg(long)]
        title: Option<String>,

        /// Content URL when the item is not starred
        #[arg(long)]
        url: Option<String>,

        /// Content type when the item is not starred
        #[arg(long = "type")]
        content_type: Option<ContentType>,
    },

    /// Change fields of a note
    Update {
        id: String,

        #[arg(long)]
        thoughts: Option<String>,

        #[arg(long)]
        questions: Option<String>,

        #[arg(long)]
        todos: Option<String>,

        /// Mark the note as enhanced (or not)
        #[arg(long)]
        enhanced: Option<bool>,
    },

    /// Delete a note
    Delete { id: String },
}

#[derive(Subcommand)]
enum LinkCommands {
    /// Produce a signed action link
    Sign {
        #[arg(long, value_enum, default_value = "star")]
        action: ActionArg,

        #[arg(long)]
        id: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        url: String,

        #[arg(long = "type", default_value = "post")]
        content_type: ContentType,

        #[arg(long, default_value = "")]
        date: String,

        /// Base URL the action path is appended to
        #[arg(long, env = "SHELF_LINK_BASE_URL", default_value = "http://localhost:8080")]
        base: String,

        #[arg(long, env = "SHELF_SECRET_KEY", hide_env_values = true)]
        secret: String,
    },

    /// Check the signature of an action link
    Verify {
        link: String,

        #[arg(long, env = "SHELF_SECRET_KEY", hide_env_values = true)]
        secret: String,
    },

    /// Star the item described by a signed action link
    Star {
        link: String,

        #[arg(long, env = "SHELF_SECRET_KEY", hide_env_values = true)]
        secret: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DocumentArg {
    Stars,
    Notes,
}

impl From<DocumentArg> for DocumentKind {
    fn from(arg: DocumentArg) -> Self {
        match arg {
            DocumentArg::Stars => DocumentKind::Stars,
            DocumentArg::Notes => DocumentKind::Notes,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Star,
    Note,
}

impl From<ActionArg> for LinkAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Star => LinkAction::Star,
            ActionArg::Note => LinkAction::Note,
        }
    }
}

fn init_tracing() {
    let log_format =
        std::env::var(logging::LOG_FORMAT_ENV).unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging::DEFAULT_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn open_shelf(global: &GlobalArgs) -> anyhow::Result<Shelf> {
    let auth = Arc::new(TokenAuth::from_env());
    let store = GitHubStore::from_env(auth.clone()).context("failed to create GitHub client")?;

    let mut config = ShelfConfig::from_env();
    if let Some(ref repo) = global.repo {
        config.repo_name = repo.clone();
    }
    debug!(
        cache_dir = %global.cache_dir.display(),
        repo_name = %config.repo_name,
        "Opening shelf"
    );

    Ok(Shelf::new(
        Arc::new(store),
        auth,
        Arc::new(FileStorage::new(&global.cache_dir)),
        config,
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(shelf_err) = e.downcast_ref::<shelf_core::Error>() {
                eprintln!("{}", shelf_err.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Stars(cmd) => run_stars(&open_shelf(&cli.global)?, cmd).await,
        Commands::Notes(cmd) => run_notes(&open_shelf(&cli.global)?, cmd).await,
        Commands::Stats { json } => {
            let stats = open_shelf(&cli.global)?.get_stats().await?;
            print_stats(&stats, json)
        }
        Commands::Link(cmd) => run_link(&cli.global, cmd).await,
        Commands::Reset { document } => {
            let kind = DocumentKind::from(document);
            open_shelf(&cli.global)?.reset_document(kind).await?;
            println!("Reset {}.", kind);
            Ok(())
        }
        Commands::PurgeCache => {
            open_shelf(&cli.global)?.purge_cache().await;
            println!("Cache purged.");
            Ok(())
        }
    }
}

async fn run_stars(shelf: &Shelf, cmd: StarCommands) -> anyhow::Result<()> {
    match cmd {
        StarCommands::List { json, cached } => {
            if cached {
                if let Some(stars) = shelf.cached_stars().await {
                    return print_stars(&stars, json);
                }
            }
            print_stars(&shelf.list_stars().await?, json)
        }
        StarCommands::Add {
            id,
            title,
            url,
            content_type,
            date,
            tags,
        } => {
            let item =
                StarItem::new(id, title, url, content_type, date, Utc::now()).with_tags(tags);
            let star = shelf.add_star(item).await?;
            println!("Starred {}", star_line(&star));
            Ok(())
        }
        StarCommands::Remove { id } => {
            let star = shelf.remove_star(&id).await?;
            println!("Removed {}", star_line(&star));
            Ok(())
        }
        StarCommands::Tag { id, tags } => {
            let star = shelf.update_star_tags(&id, tags).await?;
            println!("{}", star_line(&star));
            Ok(())
        }
    }
}

async fn run_notes(shelf: &Shelf, cmd: NoteCommands) -> anyhow::Result<()> {
    match cmd {
        NoteCommands::List { json } => print_notes(&shelf.list_notes().await?, json),
        NoteCommands::Add {
            content_id,
            thoughts,
            questions,
            todos,
            title,
            url,
            content_type,
        } => {
            let starred = shelf
                .list_stars()
                .await?
                .into_iter()
                .find(|s| s.id == content_id);
            let draft = match starred {
                Some(star) => NoteDraft::for_star(&star),
                None => NoteDraft {
                    title: title.unwrap_or_else(|| content_id.clone()),
                    url: url.unwrap_or_default(),
                    content_type,
                    content_id,
                    ..Default::default()
                },
            }
            .with_text(thoughts, questions, todos);

            let note = shelf.add_note(draft).await?;
            println!("Saved note {} on {}", note.id, note.content_id);
            Ok(())
        }
        NoteCommands::Update {
            id,
            thoughts,
            questions,
            todos,
            enhanced,
        } => {
            let patch = NotePatch {
                thoughts,
                questions,
                todos,
                ai_enhanced: enhanced,
            };
            if patch.is_empty() {
                bail!("nothing to update, pass at least one field");
            }
            let note = shelf.update_note(&id, patch).await?;
            println!("Updated note {}", note.id);
            Ok(())
        }
        NoteCommands::Delete { id } => {
            let note = shelf.delete_note(&id).await?;
            println!("Deleted note {} on {}", note.id, note.content_id);
            Ok(())
        }
    }
}

async fn run_link(global: &GlobalArgs, cmd: LinkCommands) -> anyhow::Result<()> {
    match cmd {
        LinkCommands::Sign {
            action,
            id,
            title,
            url,
            content_type,
            date,
            base,
            secret,
        } => {
            let link =
                ActionLink::signed(action.into(), id, title, url, content_type, date, &secret)?;
            println!("{}", link.to_url(&base));
            Ok(())
        }
        LinkCommands::Verify { link, secret } => {
            let parsed = ActionLink::parse(&link)?;
            if !parsed.verify(&secret) {
                return Err(anyhow!("invalid signature for {}", parsed.content_id));
            }
            print_json(&serde_json::json!({
                "action": parsed.action.as_str(),
                "id": parsed.content_id,
                "title": parsed.title,
                "url": parsed.url,
                "type": parsed.content_type,
                "date": parsed.date,
                "valid": true,
            }))
        }
        LinkCommands::Star { link, secret } => {
            let star = open_shelf(global)?.star_from_link(&link, &secret).await?;
            println!("Starred {}", star_line(&star));
            Ok(())
        }
    }
}
