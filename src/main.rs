use clap::{Parser, Subcommand};
use retrace::constants::{NOTES_PATH_ENV, PROJECTS_PATH_ENV};
use retrace::{
    APP_NAME, Config, DEFAULT_LIMIT, ReadRequest, RecentOptions, Retrace, SearchMode,
    SearchOptions, SessionFilter,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(about = "Search and navigate past coding-agent sessions from their transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root holding one directory per project.
    #[arg(long, env = PROJECTS_PATH_ENV)]
    projects_path: Option<PathBuf>,

    /// JSON document holding breadcrumb notes.
    #[arg(long, env = NOTES_PATH_ENV)]
    notes_path: Option<PathBuf>,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Substring the project directory name must contain.
    #[arg(short, long)]
    project: Option<String>,

    /// Only sessions at or after this ISO-8601 time.
    #[arg(long)]
    after: Option<String>,

    /// Only sessions at or before this ISO-8601 time.
    #[arg(long)]
    before: Option<String>,
}

impl From<FilterArgs> for SessionFilter {
    fn from(args: FilterArgs) -> Self {
        SessionFilter {
            project: args.project,
            after: args.after,
            before: args.before,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Most recent sessions first.
    Recent {
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        #[command(flatten)]
        filter: FilterArgs,
    },
    Search {
        query: String,

        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        #[arg(short, long, value_enum, default_value_t = SearchMode::Smart)]
        mode: SearchMode,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Attach a breadcrumb note to a session.
    Note {
        session_id: String,
        note: String,
    },
    Chapters {
        session_id: String,
    },
    /// Read messages by chapter, user turn, or index range.
    Read {
        session_id: String,

        #[arg(short, long)]
        chapter: Option<usize>,

        #[arg(short, long)]
        turn: Option<usize>,

        #[arg(long)]
        start: Option<usize>,

        #[arg(long)]
        end: Option<usize>,

        /// Extra messages on each side of a chapter or range window.
        #[arg(short, long, default_value_t = 0)]
        expand: usize,

        /// Only return user messages.
        #[arg(long)]
        user_only: bool,
    },
    Projects {},
    /// Re-extract stale sessions and print the refresh report.
    Refresh {},
}

/// Merge `payload` into a success envelope. Non-object payloads land under `key`.
fn success<T: Serialize>(key: &str, payload: &T) -> Result<Value, retrace::Error> {
    let mut envelope = Map::new();
    envelope.insert("success".to_string(), Value::Bool(true));
    match serde_json::to_value(payload)? {
        Value::Object(fields) => envelope.extend(fields),
        other => {
            envelope.insert(key.to_string(), other);
        }
    }
    Ok(Value::Object(envelope))
}

async fn run(cli: Cli) -> Result<Value, retrace::Error> {
    let defaults = Config::default();
    let config = Config::new(
        cli.projects_path.unwrap_or(defaults.projects_path),
        cli.notes_path.unwrap_or(defaults.notes_path),
    );
    let memory = Retrace::new(config);

    match cli.command {
        Commands::Recent { limit, filter } => {
            let options = RecentOptions {
                limit,
                filter: filter.into(),
            };
            let sessions = memory.list_recent(options).await?;
            success("sessions", &sessions)
        }
        Commands::Search {
            query,
            limit,
            mode,
            filter,
        } => {
            let options = SearchOptions {
                limit,
                mode,
                filter: filter.into(),
            };
            success("results", &memory.search_memory(&query, options).await?)
        }
        Commands::Note { session_id, note } => {
            success("note", &memory.add_note(&session_id, &note).await?)
        }
        Commands::Chapters { session_id } => {
            success("chapters", &memory.list_chapters(&session_id).await?)
        }
        Commands::Read {
            session_id,
            chapter,
            turn,
            start,
            end,
            expand,
            user_only,
        } => {
            let request = ReadRequest {
                chapter,
                turn,
                start,
                end,
                expand,
                include_assistant: !user_only,
            };
            success("messages", &memory.read_messages(&session_id, request).await?)
        }
        Commands::Projects {} => success("projects", &memory.list_projects().await?),
        Commands::Refresh {} => success("report", &memory.refresh().await?),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(envelope) => {
            println!("{envelope:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let envelope = json!({
                "success": false,
                "kind": e.kind(),
                "error": e.to_string(),
            });
            println!("{envelope:#}");
            ExitCode::FAILURE
        }
    }
}
