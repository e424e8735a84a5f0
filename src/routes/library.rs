use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::movie::{
        AddMovieRequest, LibraryMovieSummary, SharedMovieSummary, StreakUpdateRequest,
    },
    error::AppError,
    services::library_service,
    state::SharedState,
};

/// Routes handling per-user libraries and the shared pool.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/library/{user_id}", get(list_library).post(add_movie))
        .route("/library/{user_id}/{movie_id}", delete(remove_movie))
        .route("/library/{user_id}/{movie_id}/streak", put(set_streak))
        .route("/shared-movies", get(list_shared))
}

/// List a member's movie library.
#[utoipa::path(
    get,
    path = "/library/{user_id}",
    tag = "library",
    params(("user_id" = String, Path, description = "Library owner")),
    responses(
        (status = 200, description = "Library contents", body = [LibraryMovieSummary])
    )
)]
pub async fn list_library(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<LibraryMovieSummary>>, AppError> {
    let movies = library_service::list_library(&state, &user_id).await?;
    Ok(Json(movies))
}

/// Add a movie to a member's library.
#[utoipa::path(
    post,
    path = "/library/{user_id}",
    tag = "library",
    params(("user_id" = String, Path, description = "Library owner")),
    request_body = AddMovieRequest,
    responses(
        (status = 200, description = "Movie added", body = LibraryMovieSummary)
    )
)]
pub async fn add_movie(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Valid(Json(payload)): Valid<Json<AddMovieRequest>>,
) -> Result<Json<LibraryMovieSummary>, AppError> {
    let movie = library_service::add_movie(&state, &user_id, payload).await?;
    Ok(Json(movie))
}

/// Remove a movie from a member's library.
#[utoipa::path(
    delete,
    path = "/library/{user_id}/{movie_id}",
    tag = "library",
    params(
        ("user_id" = String, Path, description = "Library owner"),
        ("movie_id" = Uuid, Path, description = "Movie to remove")
    ),
    responses(
        (status = 204, description = "Movie removed"),
        (status = 404, description = "Movie not in the library")
    )
)]
pub async fn remove_movie(
    State(state): State<SharedState>,
    Path((user_id, movie_id)): Path<(String, Uuid)>,
) -> Result<axum::http::StatusCode, AppError> {
    library_service::remove_movie(&state, &user_id, movie_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Overwrite a movie's nomination streak.
#[utoipa::path(
    put,
    path = "/library/{user_id}/{movie_id}/streak",
    tag = "library",
    params(
        ("user_id" = String, Path, description = "Library owner"),
        ("movie_id" = Uuid, Path, description = "Movie to update")
    ),
    request_body = StreakUpdateRequest,
    responses(
        (status = 200, description = "Streak updated", body = LibraryMovieSummary)
    )
)]
pub async fn set_streak(
    State(state): State<SharedState>,
    Path((user_id, movie_id)): Path<(String, Uuid)>,
    Valid(Json(payload)): Valid<Json<StreakUpdateRequest>>,
) -> Result<Json<LibraryMovieSummary>, AppError> {
    let movie = library_service::set_streak(&state, &user_id, movie_id, payload).await?;
    Ok(Json(movie))
}

/// List the shared pool of nominated movies.
#[utoipa::path(
    get,
    path = "/shared-movies",
    tag = "library",
    responses(
        (status = 200, description = "Shared pool contents", body = [SharedMovieSummary])
    )
)]
pub async fn list_shared(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SharedMovieSummary>>, AppError> {
    let movies = library_service::list_shared(&state).await?;
    Ok(Json(movies))
}
