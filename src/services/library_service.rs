//! Per-user movie library operations and shared-pool reads.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::LibraryMovieEntity,
    dto::{
        movie::{
            AddMovieRequest, CatalogMovieSummary, LibraryMovieSummary, SharedMovieSummary,
            StreakUpdateRequest,
        },
        validation::validate_user_id,
    },
    error::ServiceError,
    state::SharedState,
};

/// List a user's library.
pub async fn list_library(
    state: &SharedState,
    user_id: &str,
) -> Result<Vec<LibraryMovieSummary>, ServiceError> {
    let user_id = sanitize_user_id(user_id)?;
    let store = state.require_night_store().await?;
    let movies = store.list_library(&user_id).await?;
    Ok(movies.into_iter().map(Into::into).collect())
}

/// Add a movie to a user's library.
pub async fn add_movie(
    state: &SharedState,
    user_id: &str,
    request: AddMovieRequest,
) -> Result<LibraryMovieSummary, ServiceError> {
    let user_id = sanitize_user_id(user_id)?;
    let store = state.require_night_store().await?;

    let movie = LibraryMovieEntity {
        id: Uuid::new_v4(),
        owner: user_id,
        catalog_id: request.catalog_id,
        title: request.title,
        poster_url: request.poster_url,
        runtime_minutes: request.runtime_minutes,
        release_year: request.release_year,
        genres: request.genres,
        description: request.description,
        nomination_streak: 0,
        last_nominated_cycle: None,
        added_at: SystemTime::now(),
    };
    store.save_library_movie(movie.clone()).await?;

    info!(owner = %movie.owner, movie_id = %movie.id, title = %movie.title, "movie added to library");
    Ok(movie.into())
}

/// Remove a movie from a user's library.
///
/// The shared pool keeps any copy that was already projected into it;
/// mid-cycle candidates never disappear under the voters.
pub async fn remove_movie(
    state: &SharedState,
    user_id: &str,
    movie_id: Uuid,
) -> Result<(), ServiceError> {
    let user_id = sanitize_user_id(user_id)?;
    let store = state.require_night_store().await?;

    if !store.delete_library_movie(&user_id, movie_id).await? {
        return Err(ServiceError::NotFound(format!(
            "movie `{movie_id}` is not in `{user_id}`'s library"
        )));
    }
    Ok(())
}

/// Overwrite a movie's nomination streak.
pub async fn set_streak(
    state: &SharedState,
    user_id: &str,
    movie_id: Uuid,
    request: StreakUpdateRequest,
) -> Result<LibraryMovieSummary, ServiceError> {
    let user_id = sanitize_user_id(user_id)?;
    let store = state.require_night_store().await?;

    let Some(mut movie) = store.find_library_movie(&user_id, movie_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "movie `{movie_id}` is not in `{user_id}`'s library"
        )));
    };
    movie.nomination_streak = request.nomination_streak;
    store.save_library_movie(movie.clone()).await?;
    Ok(movie.into())
}

/// List the shared movie pool visible to every participant.
pub async fn list_shared(state: &SharedState) -> Result<Vec<SharedMovieSummary>, ServiceError> {
    let store = state.require_night_store().await?;
    let movies = store.list_shared_movies().await?;
    Ok(movies.into_iter().map(Into::into).collect())
}

/// Free-text search against the configured movie catalog.
pub async fn search_catalog(
    state: &SharedState,
    query: &str,
) -> Result<Vec<CatalogMovieSummary>, ServiceError> {
    let catalog = state.require_catalog().await?;
    let movies = catalog.search(query).await?;
    Ok(movies.into_iter().map(Into::into).collect())
}

/// Full catalog lookup for one movie, including runtime and streaming
/// availability.
pub async fn lookup_catalog_movie(
    state: &SharedState,
    id: &str,
) -> Result<CatalogMovieSummary, ServiceError> {
    let catalog = state.require_catalog().await?;
    let movie = catalog.details(id).await?;
    Ok(movie.into())
}

fn sanitize_user_id(user_id: &str) -> Result<String, ServiceError> {
    validate_user_id(user_id)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid user id: {err}")))?;
    Ok(user_id.to_owned())
}
