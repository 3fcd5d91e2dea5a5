//! Tool dispatch for the recommendation agent
//!
//! Tools are identified by a closed [`ToolId`] union. Wire names the agent
//! invents land in [`ToolId::Unknown`] and fail like any other tool error:
//! as an `is_error` result the agent gets to read.

mod catalog;
mod handlers;
mod schema;

pub use catalog::all_specs;
pub use schema::ToolSpec;

use crate::llm::ToolDefinition;
use crate::media::{CatalogError, MediaCatalog, RecommendError, Recommender, Watchlist, WatchlistError};
use crate::session::{ToolRequest, ToolResult};
use futures::future::join_all;
use handlers::Args;
use std::sync::Arc;
use std::time::Instant;

/// Known tools plus an explicit variant for anything else
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolId {
    SearchMedia,
    GetMediaDetails,
    GetStreamingProviders,
    GetSimilar,
    SearchByTitle,
    GetTraktWatchlist,
    GetTraktHistory,
    GenerateRecommendations,
    Unknown(String),
}

impl ToolId {
    /// Every known tool, in the order offered to the agent
    pub const KNOWN: [ToolId; 8] = [
        ToolId::SearchMedia,
        ToolId::GetMediaDetails,
        ToolId::GetStreamingProviders,
        ToolId::GetSimilar,
        ToolId::SearchByTitle,
        ToolId::GetTraktWatchlist,
        ToolId::GetTraktHistory,
        ToolId::GenerateRecommendations,
    ];

    pub fn from_wire(name: &str) -> Self {
        match name {
            "search_media" => ToolId::SearchMedia,
            "get_media_details" => ToolId::GetMediaDetails,
            "get_streaming_providers" => ToolId::GetStreamingProviders,
            "get_similar" => ToolId::GetSimilar,
            "search_by_title" => ToolId::SearchByTitle,
            "get_trakt_watchlist" => ToolId::GetTraktWatchlist,
            "get_trakt_history" => ToolId::GetTraktHistory,
            "generate_recommendations" => ToolId::GenerateRecommendations,
            other => ToolId::Unknown(other.to_string()),
        }
    }

    pub fn wire_name(&self) -> &str {
        match self {
            ToolId::SearchMedia => "search_media",
            ToolId::GetMediaDetails => "get_media_details",
            ToolId::GetStreamingProviders => "get_streaming_providers",
            ToolId::GetSimilar => "get_similar",
            ToolId::SearchByTitle => "search_by_title",
            ToolId::GetTraktWatchlist => "get_trakt_watchlist",
            ToolId::GetTraktHistory => "get_trakt_history",
            ToolId::GenerateRecommendations => "generate_recommendations",
            ToolId::Unknown(name) => name,
        }
    }

    /// Whether results of this tool are worth attempting as media cards
    pub fn produces_media(&self) -> bool {
        matches!(
            self,
            ToolId::SearchMedia
                | ToolId::GetSimilar
                | ToolId::SearchByTitle
                | ToolId::GenerateRecommendations
        )
    }
}

/// Handler failure; always reported to the agent as an error result
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error("{0}")]
    NotConfigured(&'static str),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Watchlist(#[from] WatchlistError),
    #[error(transparent)]
    Recommend(#[from] RecommendError),
    #[error("could not format result: {0}")]
    Format(String),
}

impl ToolError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Text placed in the error result the agent reads
    pub fn payload(&self) -> String {
        match self {
            ToolError::UnknownTool(_) => self.to_string(),
            other => format!("Error: {other}"),
        }
    }
}

const CATALOG_MISSING: &str = "TMDb is not configured. Set TMDB_API_KEY to enable catalog search.";
const WATCHLIST_MISSING: &str =
    "Trakt is not configured. Set TRAKT_CLIENT_ID and TRAKT_ACCESS_TOKEN to connect your account.";
const RECOMMENDER_MISSING: &str = "Recommendation generation is not configured.";

/// Maps tool requests to handlers and their collaborators
///
/// Any collaborator may be absent; dependent tools then fail with a
/// "not configured" error result instead of the whole round failing.
#[derive(Clone, Default)]
pub struct ToolDispatcher {
    catalog: Option<Arc<dyn MediaCatalog>>,
    watchlist: Option<Arc<dyn Watchlist>>,
    recommender: Option<Arc<dyn Recommender>>,
}

impl ToolDispatcher {
    pub fn new(
        catalog: Option<Arc<dyn MediaCatalog>>,
        watchlist: Option<Arc<dyn Watchlist>>,
        recommender: Option<Arc<dyn Recommender>>,
    ) -> Self {
        Self {
            catalog,
            watchlist,
            recommender,
        }
    }

    /// Tool definitions for the agent backend
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        all_specs().iter().map(ToolSpec::definition).collect()
    }

    fn catalog(&self) -> Result<&dyn MediaCatalog, ToolError> {
        self.catalog
            .as_deref()
            .ok_or(ToolError::NotConfigured(CATALOG_MISSING))
    }

    fn watchlist(&self) -> Result<&dyn Watchlist, ToolError> {
        self.watchlist
            .as_deref()
            .ok_or(ToolError::NotConfigured(WATCHLIST_MISSING))
    }

    fn recommender(&self) -> Result<&dyn Recommender, ToolError> {
        self.recommender
            .as_deref()
            .ok_or(ToolError::NotConfigured(RECOMMENDER_MISSING))
    }

    async fn run(&self, request: &ToolRequest) -> Result<String, ToolError> {
        let args = Args::new(&request.arguments);
        match ToolId::from_wire(&request.tool_name) {
            ToolId::SearchMedia => handlers::search_media(self.catalog()?, &args).await,
            ToolId::GetMediaDetails => handlers::get_media_details(self.catalog()?, &args).await,
            ToolId::GetStreamingProviders => {
                handlers::get_streaming_providers(self.catalog()?, &args).await
            }
            ToolId::GetSimilar => handlers::get_similar(self.catalog()?, &args).await,
            ToolId::SearchByTitle => handlers::search_by_title(self.catalog()?, &args).await,
            ToolId::GetTraktWatchlist => {
                handlers::get_trakt_watchlist(self.watchlist()?, &args).await
            }
            ToolId::GetTraktHistory => handlers::get_trakt_history(self.watchlist()?, &args).await,
            ToolId::GenerateRecommendations => {
                handlers::generate_recommendations(self.recommender()?, &args).await
            }
            ToolId::Unknown(name) => Err(ToolError::UnknownTool(name)),
        }
    }

    /// Execute one request; failures become error results, never panics
    pub async fn execute(&self, request: &ToolRequest) -> ToolResult {
        let started = Instant::now();
        tracing::info!(tool = %request.tool_name, id = %request.id, "Executing tool");

        match self.run(request).await {
            Ok(payload) => {
                tracing::info!(
                    tool = %request.tool_name,
                    id = %request.id,
                    duration_ms = started.elapsed().as_millis(),
                    bytes = payload.len(),
                    "Tool completed"
                );
                ToolResult::ok(&request.id, payload)
            }
            Err(e) => {
                tracing::warn!(
                    tool = %request.tool_name,
                    id = %request.id,
                    duration_ms = started.elapsed().as_millis(),
                    error = %e,
                    "Tool failed"
                );
                ToolResult::error(&request.id, e.payload())
            }
        }
    }

    /// Execute a batch concurrently; results come back in request order
    pub async fn execute_batch(&self, requests: &[ToolRequest]) -> Vec<ToolResult> {
        join_all(requests.iter().map(|r| self.execute(r))).await
    }
}
