//! Movie catalog provider interface.
//!
//! The backend never scrapes metadata itself; it consumes a provider
//! through [`MovieCatalog`] and treats partially-populated records as
//! first-class via an explicit enrichment status instead of ad hoc
//! missing-field checks.

#[cfg(feature = "tmdb-catalog")]
pub mod tmdb;

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;

/// How much provider metadata a record currently carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    /// Search-level data only; runtime and streaming providers have
    /// not been fetched yet.
    Pending,
    /// A full detail lookup has been performed.
    Enriched,
}

/// Movie record returned by the catalog provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMovie {
    /// Provider-scoped identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Runtime in minutes; only present on enriched records and
    /// required to be positive before a movie may enter a library.
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
    pub enrichment: Enrichment,
}

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error raised by catalog providers.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The provider could not service the request.
    #[error("catalog request failed: {message}")]
    Provider {
        /// Human readable description of the failure.
        message: String,
        /// Underlying provider failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The requested movie does not exist at the provider.
    #[error("movie `{id}` not found in the catalog")]
    NotFound {
        /// Provider-scoped identifier that missed.
        id: String,
    },
    /// No provider has been configured for this deployment.
    #[error("no movie catalog provider configured")]
    Unconfigured,
}

impl CatalogError {
    /// Construct a provider error from any backend failure.
    pub fn provider(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        CatalogError::Provider {
            message,
            source: Box::new(source),
        }
    }
}

/// Search and lookup of candidate movies with runtime and streaming
/// metadata.
pub trait MovieCatalog: Send + Sync {
    /// Free-text title search. Results are unenriched.
    fn search(&self, query: &str) -> BoxFuture<'static, CatalogResult<Vec<CatalogMovie>>>;
    /// Full detail lookup for one movie, including runtime and
    /// streaming availability.
    fn details(&self, id: &str) -> BoxFuture<'static, CatalogResult<CatalogMovie>>;
}
