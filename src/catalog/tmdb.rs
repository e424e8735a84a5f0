//! TMDB-backed implementation of the catalog interface.

use std::collections::HashMap;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_with::{DefaultOnNull, serde_as};

use super::{CatalogError, CatalogMovie, CatalogResult, Enrichment, MovieCatalog};

const API_BASE: &str = "https://api.themoviedb.org/3";
const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Thin HTTP client against The Movie Database.
#[derive(Clone)]
pub struct TmdbCatalog {
    http: reqwest::Client,
    api_key: String,
    region: String,
}

impl TmdbCatalog {
    /// Build a client for the given API key and watch-provider region
    /// (ISO 3166-1 code, e.g. `US`).
    pub fn new(api_key: String, region: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            region,
        }
    }

    async fn search_inner(&self, query: &str) -> CatalogResult<Vec<CatalogMovie>> {
        let response = self
            .http
            .get(format!("{API_BASE}/search/movie"))
            .query(&[("api_key", self.api_key.as_str()), ("query", query)])
            .send()
            .await
            .map_err(request_error)?
            .error_for_status()
            .map_err(request_error)?;

        let page: SearchPage = response.json().await.map_err(request_error)?;
        Ok(page
            .results
            .into_iter()
            .map(SearchResult::into_movie)
            .collect())
    }

    async fn details_inner(&self, id: &str) -> CatalogResult<CatalogMovie> {
        let response = self
            .http
            .get(format!("{API_BASE}/movie/{id}"))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("append_to_response", "watch/providers"),
            ])
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound { id: id.to_owned() });
        }

        let detail: MovieDetail = response
            .error_for_status()
            .map_err(request_error)?
            .json()
            .await
            .map_err(request_error)?;

        Ok(detail.into_movie(&self.region))
    }
}

impl MovieCatalog for TmdbCatalog {
    fn search(&self, query: &str) -> BoxFuture<'static, CatalogResult<Vec<CatalogMovie>>> {
        let catalog = self.clone();
        let query = query.to_owned();
        Box::pin(async move { catalog.search_inner(&query).await })
    }

    fn details(&self, id: &str) -> BoxFuture<'static, CatalogResult<CatalogMovie>> {
        let catalog = self.clone();
        let id = id.to_owned();
        Box::pin(async move { catalog.details_inner(&id).await })
    }
}

fn request_error(err: reqwest::Error) -> CatalogError {
    let message = err.to_string();
    CatalogError::provider(message, err)
}

fn poster_url(path: Option<String>) -> Option<String> {
    path.map(|path| format!("{POSTER_BASE}{path}"))
}

fn release_year(date: Option<&str>) -> Option<i32> {
    date?.get(..4)?.parse().ok()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    title: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    overview: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
}

impl SearchResult {
    fn into_movie(self) -> CatalogMovie {
        CatalogMovie {
            id: self.id.to_string(),
            title: self.title,
            runtime_minutes: None,
            release_year: release_year(self.release_date.as_deref()),
            genres: Vec::new(),
            poster_url: poster_url(self.poster_path),
            description: non_empty(self.overview),
            streaming_providers: Vec::new(),
            streamable: false,
            enrichment: Enrichment::Pending,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct MovieDetail {
    id: u64,
    title: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    overview: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    // TMDB reports `null` for movies without a known runtime.
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    runtime: u32,
    #[serde(default)]
    genres: Vec<GenreEntry>,
    #[serde(default, rename = "watch/providers")]
    watch_providers: Option<ProvidersEnvelope>,
}

impl MovieDetail {
    fn into_movie(self, region: &str) -> CatalogMovie {
        let streaming_providers: Vec<String> = self
            .watch_providers
            .and_then(|envelope| envelope.results.get(region).cloned())
            .map(|providers| {
                providers
                    .flatrate
                    .into_iter()
                    .map(|entry| entry.provider_name)
                    .collect()
            })
            .unwrap_or_default();

        CatalogMovie {
            id: self.id.to_string(),
            title: self.title,
            runtime_minutes: (self.runtime > 0).then_some(self.runtime),
            release_year: release_year(self.release_date.as_deref()),
            genres: self.genres.into_iter().map(|genre| genre.name).collect(),
            poster_url: poster_url(self.poster_path),
            description: non_empty(self.overview),
            streamable: !streaming_providers.is_empty(),
            streaming_providers,
            enrichment: Enrichment::Enriched,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenreEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProvidersEnvelope {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Clone, Deserialize)]
struct RegionProviders {
    #[serde(default)]
    flatrate: Vec<ProviderEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProviderEntry {
    provider_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_results_stay_enrichment_pending() {
        let page: SearchPage = serde_json::from_str(
            r#"{"results": [{"id": 603, "title": "The Matrix", "overview": null,
                "release_date": "1999-03-30", "poster_path": "/matrix.jpg"}]}"#,
        )
        .unwrap();

        let movie = page.results.into_iter().next().unwrap().into_movie();
        assert_eq!(movie.id, "603");
        assert_eq!(movie.enrichment, Enrichment::Pending);
        assert_eq!(movie.runtime_minutes, None);
        assert_eq!(movie.release_year, Some(1999));
        assert_eq!(movie.description, None);
        assert_eq!(
            movie.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/matrix.jpg")
        );
    }

    #[test]
    fn detail_extracts_runtime_and_region_providers() {
        let detail: MovieDetail = serde_json::from_str(
            r#"{"id": 603, "title": "The Matrix", "overview": "Hacker discovers reality.",
                "release_date": "1999-03-30", "runtime": 136,
                "genres": [{"id": 878, "name": "Science Fiction"}],
                "watch/providers": {"results": {"US": {"flatrate": [{"provider_name": "Max"}]}}}}"#,
        )
        .unwrap();

        let movie = detail.into_movie("US");
        assert_eq!(movie.enrichment, Enrichment::Enriched);
        assert_eq!(movie.runtime_minutes, Some(136));
        assert_eq!(movie.genres, vec!["Science Fiction"]);
        assert_eq!(movie.streaming_providers, vec!["Max"]);
        assert!(movie.streamable);
    }

    #[test]
    fn null_runtime_means_unresolvable() {
        let detail: MovieDetail = serde_json::from_str(
            r#"{"id": 1, "title": "Obscure", "runtime": null}"#,
        )
        .unwrap();

        let movie = detail.into_movie("US");
        assert_eq!(movie.runtime_minutes, None);
        assert!(!movie.streamable);
    }
}
