//! TMDb catalog client

use super::{
    Availability, CatalogError, DiscoverFilters, MediaCatalog, MediaDetails, MediaEntry,
    MediaKind,
};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

const BASE_URL: &str = "https://api.themoviedb.org/3";
const MIN_VOTE_COUNT: u32 = 100;
const MAX_RESULTS: usize = 10;

const GENRES: &[(&str, u32)] = &[
    ("action", 28),
    ("adventure", 12),
    ("animation", 16),
    ("comedy", 35),
    ("crime", 80),
    ("documentary", 99),
    ("drama", 18),
    ("family", 10751),
    ("fantasy", 14),
    ("history", 36),
    ("horror", 27),
    ("music", 10402),
    ("mystery", 9648),
    ("romance", 10749),
    ("sci-fi", 878),
    ("science fiction", 878),
    ("thriller", 53),
    ("war", 10752),
    ("western", 37),
    ("action & adventure", 10759),
    ("kids", 10762),
    ("reality", 10764),
    ("war & politics", 10768),
];

const PROVIDERS: &[(&str, u32)] = &[
    ("netflix", 8),
    ("amazon prime", 9),
    ("amazon prime video", 9),
    ("prime video", 9),
    ("disney+", 337),
    ("disney plus", 337),
    ("hbo max", 384),
    ("max", 1899),
    ("hulu", 15),
    ("apple tv+", 350),
    ("apple tv plus", 350),
    ("paramount+", 531),
    ("paramount plus", 531),
    ("peacock", 386),
    ("criterion channel", 258),
    ("mubi", 11),
    ("shudder", 99),
    ("tubi", 73),
    ("crunchyroll", 283),
];

const STUDIOS: &[(&str, u32)] = &[
    ("pixar", 3),
    ("disney", 2),
    ("warner bros", 174),
    ("universal", 33),
    ("paramount", 4),
    ("sony", 34),
    ("columbia", 5),
    ("20th century", 25),
    ("lionsgate", 1632),
    ("a24", 41077),
    ("neon", 90733),
    ("searchlight", 43),
    ("focus features", 10146),
    ("blumhouse", 3172),
    ("legendary", 923),
    ("dreamworks", 521),
    ("illumination", 6704),
    ("laika", 11537),
    ("studio ghibli", 10342),
    ("ghibli", 10342),
    ("marvel", 420),
    ("marvel studios", 420),
    ("lucasfilm", 1),
];

fn lookup_ids(table: &[(&str, u32)], names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter_map(|name| {
            let wanted = name.trim().to_ascii_lowercase();
            table.iter().find(|(key, _)| *key == wanted).map(|(_, id)| *id)
        })
        .filter(|id| seen.insert(*id))
        .map(|id| id.to_string())
        .collect()
}

/// TMDb-backed [`MediaCatalog`]
pub struct TmdbCatalog {
    client: Client,
    api_key: String,
    region: String,
    language: String,
    base_url: String,
}

impl TmdbCatalog {
    pub fn new(api_key: String, region: String, language: String) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            region,
            language,
            base_url: BASE_URL.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(format!("{}{endpoint}", self.base_url))
            .query(&[("api_key", &self.api_key), ("language", &self.language)])
            .query(params)
            .send()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    async fn person_id(&self, name: &str) -> Option<u64> {
        let params = vec![("query".to_string(), name.to_string())];
        match self.get::<Page<PersonHit>>("/search/person", &params).await {
            Ok(page) => page.results.first().map(|p| p.id),
            Err(e) => {
                tracing::debug!(person = %name, error = %e, "Person lookup failed");
                None
            }
        }
    }

    async fn discover_kind(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
        people: &[String],
    ) -> Result<Vec<MediaEntry>, CatalogError> {
        let params = discover_params(kind, filters, people, &self.region);
        let page: Page<RawMedia> = self
            .get(&format!("/discover/{}", kind.as_tmdb()), &params)
            .await?;
        Ok(page
            .results
            .into_iter()
            .filter_map(|raw| raw.into_entry(Some(kind)))
            .collect())
    }

    async fn enrich(&self, entries: &mut [MediaEntry]) {
        let lookups = entries
            .iter()
            .map(|entry| self.availability(entry.media_type, entry.id));
        let found = join_all(lookups).await;
        for (entry, availability) in entries.iter_mut().zip(found) {
            match availability {
                Ok(a) => entry.providers = a.providers,
                Err(e) => tracing::debug!(id = entry.id, error = %e, "Provider lookup failed"),
            }
        }
    }
}

#[async_trait]
impl MediaCatalog for TmdbCatalog {
    async fn discover(&self, filters: &DiscoverFilters) -> Result<Vec<MediaEntry>, CatalogError> {
        let kinds: &[MediaKind] = match filters.media_type {
            Some(MediaKind::Movie) => &[MediaKind::Movie],
            Some(MediaKind::Show) => &[MediaKind::Show],
            None => &[MediaKind::Movie, MediaKind::Show],
        };

        let mut people = Vec::new();
        for actor in &filters.actors {
            if let Some(id) = self.person_id(actor).await {
                people.push(id.to_string());
            }
        }

        let mut all = Vec::new();
        let mut last_error = None;
        for kind in kinds {
            match self.discover_kind(*kind, filters, &people).await {
                Ok(entries) => all.extend(entries),
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "Discover endpoint failed");
                    last_error = Some(e);
                }
            }
        }

        if !filters.keywords.is_empty() {
            match self.search_title(&filters.keywords.join(" ")).await {
                Ok(entries) => all.extend(entries.into_iter().filter(|e| {
                    filters.media_type.map_or(true, |kind| e.media_type == kind)
                })),
                Err(e) => last_error = Some(e),
            }
        }

        if all.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let mut ranked = rank_entries(all, filters.min_rating.unwrap_or(0.0));
        ranked.truncate(MAX_RESULTS);
        self.enrich(&mut ranked).await;
        Ok(ranked)
    }

    async fn search_title(&self, title: &str) -> Result<Vec<MediaEntry>, CatalogError> {
        let params = vec![
            ("query".to_string(), title.to_string()),
            ("include_adult".to_string(), "false".to_string()),
        ];
        let page: Page<RawMedia> = self.get("/search/multi", &params).await?;
        // Multi-search also returns people; into_entry drops them
        Ok(page
            .results
            .into_iter()
            .filter_map(|raw| raw.into_entry(None))
            .collect())
    }

    async fn similar(&self, kind: MediaKind, id: u64) -> Result<Vec<MediaEntry>, CatalogError> {
        let page: Page<RawMedia> = self
            .get(&format!("/{}/{id}/similar", kind.as_tmdb()), &[])
            .await?;
        let mut entries: Vec<MediaEntry> = page
            .results
            .into_iter()
            .filter_map(|raw| raw.into_entry(Some(kind)))
            .take(MAX_RESULTS)
            .collect();
        self.enrich(&mut entries).await;
        Ok(entries)
    }

    async fn availability(&self, kind: MediaKind, id: u64) -> Result<Availability, CatalogError> {
        let resp: ProvidersResponse = self
            .get(&format!("/{}/{id}/watch/providers", kind.as_tmdb()), &[])
            .await?;
        let region = if self.region.is_empty() {
            "US"
        } else {
            self.region.as_str()
        };
        Ok(resp
            .results
            .get(region)
            .map(CountryProviders::merged)
            .unwrap_or_default())
    }

    async fn details(&self, kind: MediaKind, id: u64) -> Result<MediaDetails, CatalogError> {
        let raw: RawDetails = self.get(&format!("/{}/{id}", kind.as_tmdb()), &[]).await?;
        let providers = match self.availability(kind, id).await {
            Ok(a) => a.providers,
            Err(e) => {
                tracing::debug!(id, error = %e, "Provider lookup failed");
                Vec::new()
            }
        };
        Ok(raw.into_details(kind, providers))
    }
}

/// Query parameters for one discover endpoint
fn discover_params(
    kind: MediaKind,
    filters: &DiscoverFilters,
    people: &[String],
    region: &str,
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("sort_by".into(), "vote_average.desc".into()),
        ("vote_count.gte".into(), MIN_VOTE_COUNT.to_string()),
    ];
    let mut set = |key: &str, value: String| params.push((key.to_string(), value));

    let genres = lookup_ids(GENRES, &filters.genres);
    if !genres.is_empty() {
        set("with_genres", genres.join(","));
    }

    let date_key = match kind {
        MediaKind::Movie => "primary_release_date",
        MediaKind::Show => "first_air_date",
    };
    if let Some(year) = filters.year_from.filter(|y| *y > 0) {
        set(&format!("{date_key}.gte"), format!("{year}-01-01"));
    }
    if let Some(year) = filters.year_to.filter(|y| *y > 0) {
        set(&format!("{date_key}.lte"), format!("{year}-12-31"));
    }
    if let Some(rating) = filters.min_rating.filter(|r| *r > 0.0) {
        set("vote_average.gte", format!("{rating:.1}"));
    }
    if let Some(lang) = filters.language.as_deref().filter(|l| !l.is_empty()) {
        set("with_original_language", lang.to_string());
    }

    let studios = lookup_ids(STUDIOS, &filters.studios);
    if !studios.is_empty() {
        set("with_companies", studios.join("|"));
    }
    // TV discover has no people filter
    if kind == MediaKind::Movie && !people.is_empty() {
        set("with_people", people.join(","));
    }

    let providers = lookup_ids(PROVIDERS, &filters.providers);
    if !providers.is_empty() {
        set("with_watch_providers", providers.join("|"));
    }
    if !region.is_empty() {
        set("watch_region", region.to_string());
    }
    params
}

/// Drop duplicates and low ratings, then order by rating weighted by popularity.
///
/// The exact order is advisory; ties keep their original relative order.
fn rank_entries(entries: Vec<MediaEntry>, min_rating: f64) -> Vec<MediaEntry> {
    let mut seen = HashSet::new();
    let mut kept: Vec<MediaEntry> = entries
        .into_iter()
        .filter(|e| e.rating >= min_rating)
        .filter(|e| seen.insert((e.media_type, e.id)))
        .collect();
    let score = |e: &MediaEntry| e.rating * (1.0 + e.popularity / 100.0);
    kept.sort_by(|a, b| score(b).total_cmp(&score(a)));
    kept
}

fn year_of(date: Option<&str>) -> String {
    date.map(|d| d.chars().take(4).collect::<String>())
        .filter(|y| y.len() == 4)
        .unwrap_or_default()
}

// TMDb API types

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PersonHit {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
    release_date: Option<String>,
    first_air_date: Option<String>,
    media_type: Option<String>,
    #[serde(default)]
    popularity: f64,
}

impl RawMedia {
    /// `fallback_kind` applies when the payload has no `media_type` of its own
    fn into_entry(self, fallback_kind: Option<MediaKind>) -> Option<MediaEntry> {
        let kind = match self.media_type.as_deref() {
            Some("movie") => MediaKind::Movie,
            Some("tv") => MediaKind::Show,
            Some(_) => return None,
            None => fallback_kind?,
        };
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .or(self.name)
            .unwrap_or_default();
        let year = year_of(self.release_date.as_deref().or(self.first_air_date.as_deref()));
        Some(MediaEntry {
            id: self.id,
            title,
            year,
            media_type: kind,
            rating: self.vote_average,
            vote_count: self.vote_count,
            overview: self.overview.unwrap_or_default(),
            providers: Vec::new(),
            popularity: self.popularity,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawDetails {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    genres: Vec<NamedGenre>,
    runtime: Option<u64>,
    #[serde(default)]
    episode_run_time: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct NamedGenre {
    name: String,
}

impl RawDetails {
    fn into_details(self, kind: MediaKind, providers: Vec<String>) -> MediaDetails {
        MediaDetails {
            id: self.id,
            title: self
                .title
                .filter(|t| !t.is_empty())
                .or(self.name)
                .unwrap_or_default(),
            year: year_of(self.release_date.as_deref().or(self.first_air_date.as_deref())),
            media_type: kind,
            rating: self.vote_average,
            vote_count: self.vote_count,
            overview: self.overview.unwrap_or_default(),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            runtime: self.runtime.or_else(|| self.episode_run_time.first().copied()),
            providers,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProvidersResponse {
    #[serde(default)]
    results: HashMap<String, CountryProviders>,
}

#[derive(Debug, Default, Deserialize)]
struct CountryProviders {
    #[serde(default)]
    link: String,
    #[serde(default)]
    flatrate: Vec<ProviderHit>,
    #[serde(default)]
    free: Vec<ProviderHit>,
    #[serde(default)]
    rent: Vec<ProviderHit>,
    #[serde(default)]
    buy: Vec<ProviderHit>,
}

#[derive(Debug, Deserialize)]
struct ProviderHit {
    provider_id: u64,
    provider_name: String,
}

impl CountryProviders {
    /// Streaming first, then free, rent and buy; each provider once
    fn merged(&self) -> Availability {
        let mut seen = HashSet::new();
        let providers = [&self.flatrate, &self.free, &self.rent, &self.buy]
            .into_iter()
            .flatten()
            .filter(|p| seen.insert(p.provider_id))
            .map(|p| p.provider_name.clone())
            .collect();
        Availability {
            providers,
            link: self.link.clone(),
        }
    }
}
