//! Tool catalog offered to the agent

use super::schema::{ToolParameter, ToolSpec};
use super::ToolId;

const MEDIA_KINDS: &[&str] = &["movie", "tv"];
const WATCH_FILTERS: &[&str] = &["movies", "shows", ""];

fn id_and_kind() -> Vec<ToolParameter> {
    vec![
        ToolParameter::integer("id", "The TMDb ID of the movie or TV show").required(),
        ToolParameter::string("media_type", "Whether it's a movie or TV show")
            .required()
            .one_of(MEDIA_KINDS),
    ]
}

/// Spec for a known tool; `None` for [`ToolId::Unknown`]
pub fn spec(id: &ToolId) -> Option<ToolSpec> {
    let (description, parameters) = match id {
        ToolId::SearchMedia => (
            "Search for movies or TV shows with various filters. Use this when the user wants to discover content based on preferences like genre, year, rating, language, or streaming service.",
            vec![
                ToolParameter::string_list("keywords", "Search keywords or terms"),
                ToolParameter::string_list(
                    "genres",
                    "Genre filters: action, comedy, drama, horror, thriller, sci-fi, romance, documentary, animation, fantasy, mystery, crime, war, western, family, history",
                ),
                ToolParameter::string("media_type", "Type of media to search for")
                    .one_of(&["movie", "tv", "all"]),
                ToolParameter::integer("year_from", "Start year for release date filter"),
                ToolParameter::integer("year_to", "End year for release date filter"),
                ToolParameter::number("min_rating", "Minimum rating (0-10 scale)"),
                ToolParameter::string(
                    "language",
                    "Original language ISO code (e.g., 'en', 'ko', 'ja', 'fr', 'es')",
                ),
                ToolParameter::string_list(
                    "providers",
                    "Streaming providers to filter by: Netflix, Disney Plus, HBO Max, Amazon Prime Video, Hulu, Apple TV Plus, etc.",
                ),
                ToolParameter::string_list("actors", "Actor names to filter by"),
                ToolParameter::string_list(
                    "studios",
                    "Production studios: Pixar, A24, Marvel, Studio Ghibli, etc.",
                ),
            ],
        ),
        ToolId::GetMediaDetails => (
            "Get detailed information about a specific movie or TV show by its TMDb ID. Use this when you need more information about a specific title.",
            id_and_kind(),
        ),
        ToolId::GetStreamingProviders => (
            "Get streaming availability for a specific movie or TV show. Shows where it can be watched, rented, or purchased.",
            id_and_kind(),
        ),
        ToolId::GetSimilar => (
            "Find movies or TV shows similar to a given title. Use this when the user likes a specific title and wants similar recommendations.",
            id_and_kind(),
        ),
        ToolId::SearchByTitle => (
            "Search for a movie or TV show by its title. Use this to find the TMDb ID of a specific title the user mentions.",
            vec![ToolParameter::string("title", "The title to search for").required()],
        ),
        ToolId::GetTraktWatchlist => (
            "Get items from the user's Trakt watchlist. Only works if the user has connected their Trakt account.",
            vec![ToolParameter::string(
                "media_type",
                "Filter by media type, or leave empty for all",
            )
            .one_of(WATCH_FILTERS)],
        ),
        ToolId::GetTraktHistory => (
            "Get the user's recently watched items from Trakt. Only works if the user has connected their Trakt account.",
            vec![
                ToolParameter::string("media_type", "Filter by media type, or leave empty for all")
                    .one_of(WATCH_FILTERS),
                ToolParameter::integer(
                    "limit",
                    "Maximum number of items to return (default 20)",
                ),
            ],
        ),
        ToolId::GenerateRecommendations => (
            "Generate AI recommendations directly based on a description. Use this when catalog search filters aren't sufficient or for subjective/mood-based requests.",
            vec![
                ToolParameter::string("description", "Description of what the user is looking for")
                    .required(),
                ToolParameter::integer(
                    "count",
                    "Number of recommendations to generate (default 5)",
                ),
            ],
        ),
        ToolId::Unknown(_) => return None,
    };

    Some(ToolSpec {
        id: id.clone(),
        description,
        parameters,
    })
}

/// Every known tool, in advertising order
pub fn all_specs() -> Vec<ToolSpec> {
    ToolId::KNOWN.iter().filter_map(spec).collect()
}
