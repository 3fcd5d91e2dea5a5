//! cinechat - conversational movie and TV recommendations
//!
//! A terminal chat where an agent searches a media catalog and your
//! watchlist through tools, and results show up as selectable cards.

mod agent;
mod config;
mod display;
mod editor;
mod focus;
mod llm;
mod materializer;
mod media;
mod plain;
mod runtime;
mod session;
mod session_store;
mod state_machine;
mod tools;
mod tui;

use agent::Coordinator;
use clap::Parser;
use config::AppConfig;
use llm::LlmService;
use materializer::Materializer;
use media::{LlmRecommender, MediaCatalog, Recommender, TmdbCatalog, TraktWatchlist, Watchlist};
use runtime::ChatRuntime;
use session::Session;
use session_store::SessionStore;
use state_machine::RoundContext;
use std::sync::Arc;
use tools::ToolDispatcher;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SHORT_ID: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "cinechat", version)]
#[command(about = "Find something to watch by chatting with an agent", long_about = None)]
struct Cli {
    /// What you are in the mood for; omit to start the interactive chat
    query: Option<String>,

    /// Number of results to print in one-shot mode (1-10)
    #[arg(short = 'n', long = "number", default_value_t = 10)]
    number: usize,

    /// Resume a saved session by id prefix, or the most recent one
    #[arg(long, value_name = "ID", num_args = 0..=1, default_missing_value = "latest")]
    resume: Option<String>,

    /// List saved sessions and exit
    #[arg(long)]
    list_sessions: bool,

    /// Delete a saved session by id prefix and exit
    #[arg(long, value_name = "ID")]
    delete_session: Option<String>,
}

fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID).collect()
}

/// Install the global subscriber
///
/// The TUI owns stdout, so interactive runs log to a file in the data dir;
/// every other mode logs to stderr.
fn init_logging(config: &AppConfig, interactive: bool) -> std::io::Result<Option<WorkerGuard>> {
    let default_filter = if interactive { "cinechat=info" } else { "cinechat=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(false)
        .with_span_list(false);

    if interactive {
        std::fs::create_dir_all(&config.data_dir)?;
        let appender = tracing_appender::rolling::never(&config.data_dir, config.log_file_name());
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(writer))
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(std::io::stderr))
            .init();
        Ok(None)
    }
}

/// Wire the configured collaborators into a dispatcher
///
/// Missing credentials leave a collaborator out; its tools then answer with
/// a "not configured" error instead of failing startup.
fn build_dispatcher(config: &AppConfig, llm: Arc<dyn LlmService>) -> ToolDispatcher {
    let catalog: Option<Arc<dyn MediaCatalog>> = match &config.tmdb_api_key {
        Some(key) => match TmdbCatalog::new(key.clone(), config.region.clone(), config.language.clone()) {
            Ok(catalog) => Some(Arc::new(catalog)),
            Err(e) => {
                tracing::warn!(error = %e, "TMDb client unavailable");
                None
            }
        },
        None => {
            tracing::info!("TMDb not configured, catalog tools disabled");
            None
        }
    };

    let watchlist: Option<Arc<dyn Watchlist>> = match config.trakt_credentials() {
        Some((client_id, token)) => match TraktWatchlist::new(client_id, token) {
            Ok(watchlist) => Some(Arc::new(watchlist)),
            Err(e) => {
                tracing::warn!(error = %e, "Trakt client unavailable");
                None
            }
        },
        None => {
            tracing::info!("Trakt not configured, watchlist tools disabled");
            None
        }
    };

    let recommender: Arc<dyn Recommender> = Arc::new(LlmRecommender::new(llm));
    ToolDispatcher::new(catalog, watchlist, Some(recommender))
}

fn list_sessions(store: &SessionStore) -> Result<(), session_store::SessionStoreError> {
    let sessions = store.list()?;
    if sessions.is_empty() {
        println!("No saved sessions in {}", store.dir().display());
        return Ok(());
    }
    for summary in sessions {
        let title = if summary.title.is_empty() {
            "(untitled)"
        } else {
            summary.title.as_str()
        };
        println!(
            "{}  {}  {:>3} turns  {title}",
            short_id(&summary.id),
            summary.updated_at.format("%Y-%m-%d %H:%M"),
            summary.turn_count,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let interactive = cli.query.is_none() && !cli.list_sessions && cli.delete_session.is_none();
    let _log_guard = init_logging(&config, interactive)?;

    let store = SessionStore::new(config.sessions_dir());

    if cli.list_sessions {
        list_sessions(&store)?;
        return Ok(());
    }
    if let Some(id) = cli.delete_session {
        store.delete(&id)?;
        println!("Deleted session {id}");
        return Ok(());
    }

    // The only unrecoverable startup failure: no agent backend
    let llm = llm::build_service(&config.llm)?;

    let tools = build_dispatcher(&config, llm.clone());
    let coordinator = Coordinator::new(llm);
    let materializer = Materializer::default();

    if let Some(query) = cli.query {
        let mut stdout = std::io::stdout().lock();
        let session =
            plain::run(&coordinator, &tools, &materializer, &query, cli.number, &mut stdout).await?;
        if let Err(e) = store.save(&session) {
            tracing::warn!(error = %e, "Could not save one-shot session");
        }
        return Ok(());
    }

    let session = match cli.resume.as_deref() {
        None => Session::new(),
        Some("latest") => store.latest()?.unwrap_or_else(|| {
            tracing::info!("No saved sessions, starting fresh");
            Session::new()
        }),
        Some(id) => store.load(id)?,
    };
    tracing::info!(session = %session.id, turns = session.turns().len(), "Opening session");

    let runtime = ChatRuntime::new(
        session,
        coordinator,
        tools,
        store,
        RoundContext::new(materializer),
    );
    let session = tui::run(runtime).await?;

    if !session.is_empty() {
        println!(
            "Session {} saved. Resume with: cinechat --resume {}",
            short_id(&session.id),
            short_id(&session.id)
        );
    }
    Ok(())
}
