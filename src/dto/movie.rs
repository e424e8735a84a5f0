use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    catalog::{CatalogMovie, Enrichment},
    dao::models::{LibraryMovieEntity, SharedMovieEntity},
    dto::format_system_time,
};

/// Payload adding a movie to the caller's library.
///
/// The runtime is mandatory and strictly positive: a movie without a
/// known runtime can neither be scheduled nor tie-broken, so it never
/// becomes nominable.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddMovieRequest {
    /// Identifier in the external catalog, when the entry came from a
    /// lookup.
    #[serde(default)]
    pub catalog_id: Option<String>,
    /// Display title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Poster image URL.
    #[serde(default)]
    #[validate(url)]
    pub poster_url: Option<String>,
    /// Runtime in minutes.
    #[validate(range(min = 1))]
    pub runtime_minutes: u32,
    /// Release year, when known.
    #[serde(default)]
    pub release_year: Option<i32>,
    /// Genre names.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Short synopsis.
    #[serde(default)]
    pub description: Option<String>,
}

/// Payload overwriting a movie's nomination streak.
///
/// The automatic bookkeeping only ever increments the streak; resets
/// and decrements are a caller policy applied through this operation.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StreakUpdateRequest {
    /// New streak value.
    pub nomination_streak: u32,
}

/// Library movie projection exposed to the owning user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LibraryMovieSummary {
    /// Stable identifier for the movie entry.
    pub id: Uuid,
    /// Identifier in the external catalog, when known.
    pub catalog_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Poster image URL.
    pub poster_url: Option<String>,
    /// Runtime in minutes.
    pub runtime_minutes: u32,
    /// Release year, when known.
    pub release_year: Option<i32>,
    /// Genre names.
    pub genres: Vec<String>,
    /// Short synopsis.
    pub description: Option<String>,
    /// Consecutive-cycle nomination counter.
    pub nomination_streak: u32,
    /// When the movie was added, RFC 3339.
    pub added_at: String,
}

impl From<LibraryMovieEntity> for LibraryMovieSummary {
    fn from(value: LibraryMovieEntity) -> Self {
        Self {
            id: value.id,
            catalog_id: value.catalog_id,
            title: value.title,
            poster_url: value.poster_url,
            runtime_minutes: value.runtime_minutes,
            release_year: value.release_year,
            genres: value.genres,
            description: value.description,
            nomination_streak: value.nomination_streak,
            added_at: format_system_time(value.added_at),
        }
    }
}

/// Shared-pool movie projection visible to every participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SharedMovieSummary {
    /// Identifier shared with the originating library entry.
    pub id: Uuid,
    /// Identifier in the external catalog, when known.
    pub catalog_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Poster image URL.
    pub poster_url: Option<String>,
    /// Runtime in minutes.
    pub runtime_minutes: u32,
    /// Release year, when known.
    pub release_year: Option<i32>,
    /// Genre names.
    pub genres: Vec<String>,
    /// Short synopsis.
    pub description: Option<String>,
    /// Streak carried over from the library at nomination time.
    pub nomination_streak: u32,
    /// User whose library the movie came from.
    pub original_owner: String,
    /// When the movie first entered the pool, RFC 3339.
    pub shared_at: String,
}

impl From<SharedMovieEntity> for SharedMovieSummary {
    fn from(value: SharedMovieEntity) -> Self {
        Self {
            id: value.id,
            catalog_id: value.catalog_id,
            title: value.title,
            poster_url: value.poster_url,
            runtime_minutes: value.runtime_minutes,
            release_year: value.release_year,
            genres: value.genres,
            description: value.description,
            nomination_streak: value.nomination_streak,
            original_owner: value.original_owner,
            shared_at: format_system_time(value.shared_at),
        }
    }
}

/// Query string for catalog searches.
#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct CatalogSearchQuery {
    /// Free-text title query.
    #[validate(length(min = 1, max = 100))]
    pub query: String,
}

/// Enrichment status as exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Search-level data only.
    Pending,
    /// Full detail lookup performed.
    Enriched,
}

impl From<Enrichment> for EnrichmentStatus {
    fn from(value: Enrichment) -> Self {
        match value {
            Enrichment::Pending => EnrichmentStatus::Pending,
            Enrichment::Enriched => EnrichmentStatus::Enriched,
        }
    }
}

/// Catalog movie projection exposed by the search and lookup routes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogMovieSummary {
    /// Provider-scoped identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Runtime in minutes, present once enriched.
    pub runtime_minutes: Option<u32>,
    /// Release year, when known.
    pub release_year: Option<i32>,
    /// Genre names.
    pub genres: Vec<String>,
    /// Poster image URL.
    pub poster_url: Option<String>,
    /// Short synopsis.
    pub description: Option<String>,
    /// Streaming services carrying the movie in the configured region.
    pub streaming_providers: Vec<String>,
    /// Whether at least one streaming service carries the movie.
    pub streamable: bool,
    /// Whether this record has been through the detail lookup.
    pub enrichment: EnrichmentStatus,
}

impl From<CatalogMovie> for CatalogMovieSummary {
    fn from(value: CatalogMovie) -> Self {
        Self {
            id: value.id,
            title: value.title,
            runtime_minutes: value.runtime_minutes,
            release_year: value.release_year,
            genres: value.genres,
            poster_url: value.poster_url,
            description: value.description,
            streaming_providers: value.streaming_providers,
            streamable: value.streamable,
            enrichment: value.enrichment.into(),
        }
    }
}
