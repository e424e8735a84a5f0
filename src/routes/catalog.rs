use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::movie::{CatalogMovieSummary, CatalogSearchQuery},
    error::AppError,
    services::library_service,
    state::SharedState,
};

/// Routes exposing the external movie catalog.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/catalog/search", get(search))
        .route("/catalog/movies/{id}", get(lookup))
}

/// Free-text title search against the configured catalog.
#[utoipa::path(
    get,
    path = "/catalog/search",
    tag = "catalog",
    params(CatalogSearchQuery),
    responses(
        (status = 200, description = "Search results", body = [CatalogMovieSummary]),
        (status = 503, description = "No catalog provider configured")
    )
)]
pub async fn search(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<CatalogSearchQuery>>,
) -> Result<Json<Vec<CatalogMovieSummary>>, AppError> {
    let movies = library_service::search_catalog(&state, &query.query).await?;
    Ok(Json(movies))
}

/// Full catalog lookup for one movie.
#[utoipa::path(
    get,
    path = "/catalog/movies/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Catalog movie identifier")),
    responses(
        (status = 200, description = "Movie details", body = CatalogMovieSummary),
        (status = 404, description = "Movie not found in the catalog")
    )
)]
pub async fn lookup(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<CatalogMovieSummary>, AppError> {
    let movie = library_service::lookup_catalog_movie(&state, &id).await?;
    Ok(Json(movie))
}
