use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::cycle::{
        CycleSnapshot, DecisionRequest, NominationsRequest, ScheduleResponse,
        ScheduleSettingsRequest, StatusOverrideRequest, VoteRequest,
    },
    error::AppError,
    services::cycle_service,
    state::SharedState,
};

/// Routes handling today's cycle: participation writes, operator
/// controls and snapshot reads.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/cycles/today", get(today))
        .route("/cycles/today/schedule", get(winning_schedule))
        .route("/cycles/today/decisions/{user_id}", put(record_decision))
        .route(
            "/cycles/today/nominations/{user_id}",
            put(submit_nominations),
        )
        .route("/cycles/today/votes/{user_id}", put(submit_vote))
        .route(
            "/cycles/today/schedule-settings",
            put(update_schedule_settings),
        )
        .route("/cycles/today/status", post(override_status))
        .route("/cycles/today/reset", post(reset_cycle))
}

/// Return today's cycle snapshot, creating the document if needed.
#[utoipa::path(
    get,
    path = "/cycles/today",
    tag = "cycle",
    responses(
        (status = 200, description = "Current cycle snapshot", body = CycleSnapshot)
    )
)]
pub async fn today(State(state): State<SharedState>) -> Result<Json<CycleSnapshot>, AppError> {
    let snapshot = cycle_service::today_snapshot(&state).await?;
    Ok(Json(snapshot))
}

/// Return the viewing schedule computed for the revealed winner.
#[utoipa::path(
    get,
    path = "/cycles/today/schedule",
    tag = "cycle",
    responses(
        (status = 200, description = "Viewing schedule for the winner", body = ScheduleResponse),
        (status = 404, description = "No winner revealed yet")
    )
)]
pub async fn winning_schedule(
    State(state): State<SharedState>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let schedule = cycle_service::winning_schedule(&state).await?;
    Ok(Json(schedule))
}

/// Record whether a member will watch tonight.
#[utoipa::path(
    put,
    path = "/cycles/today/decisions/{user_id}",
    tag = "cycle",
    params(("user_id" = String, Path, description = "Member recording the decision")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = CycleSnapshot)
    )
)]
pub async fn record_decision(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Valid(Json(payload)): Valid<Json<DecisionRequest>>,
) -> Result<Json<CycleSnapshot>, AppError> {
    let snapshot = cycle_service::record_decision(&state, &user_id, payload).await?;
    Ok(Json(snapshot))
}

/// Replace a member's nomination list for today's cycle.
#[utoipa::path(
    put,
    path = "/cycles/today/nominations/{user_id}",
    tag = "cycle",
    params(("user_id" = String, Path, description = "Nominating member")),
    request_body = NominationsRequest,
    responses(
        (status = 200, description = "Nominations recorded", body = CycleSnapshot)
    )
)]
pub async fn submit_nominations(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Valid(Json(payload)): Valid<Json<NominationsRequest>>,
) -> Result<Json<CycleSnapshot>, AppError> {
    let snapshot = cycle_service::submit_nominations(&state, &user_id, payload).await?;
    Ok(Json(snapshot))
}

/// Replace a member's ranked picks for today's cycle.
#[utoipa::path(
    put,
    path = "/cycles/today/votes/{user_id}",
    tag = "cycle",
    params(("user_id" = String, Path, description = "Voting member")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = CycleSnapshot)
    )
)]
pub async fn submit_vote(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<Json<CycleSnapshot>, AppError> {
    let snapshot = cycle_service::submit_vote(&state, &user_id, payload).await?;
    Ok(Json(snapshot))
}

/// Update the night's target finish time.
#[utoipa::path(
    put,
    path = "/cycles/today/schedule-settings",
    tag = "cycle",
    request_body = ScheduleSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = CycleSnapshot)
    )
)]
pub async fn update_schedule_settings(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ScheduleSettingsRequest>>,
) -> Result<Json<CycleSnapshot>, AppError> {
    let snapshot = cycle_service::update_schedule_settings(&state, payload).await?;
    Ok(Json(snapshot))
}

/// Force today's cycle into a later phase (operator control).
#[utoipa::path(
    post,
    path = "/cycles/today/status",
    tag = "cycle",
    request_body = StatusOverrideRequest,
    responses(
        (status = 200, description = "Status overridden", body = CycleSnapshot),
        (status = 409, description = "Requested status is not ahead of the current one")
    )
)]
pub async fn override_status(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StatusOverrideRequest>>,
) -> Result<Json<CycleSnapshot>, AppError> {
    let snapshot = cycle_service::override_status(&state, payload).await?;
    Ok(Json(snapshot))
}

/// Delete today's cycle and recreate it in the initial status
/// (operator control).
#[utoipa::path(
    post,
    path = "/cycles/today/reset",
    tag = "cycle",
    responses(
        (status = 200, description = "Cycle reset", body = CycleSnapshot)
    )
)]
pub async fn reset_cycle(
    State(state): State<SharedState>,
) -> Result<Json<CycleSnapshot>, AppError> {
    let snapshot = cycle_service::reset_cycle(&state).await?;
    Ok(Json(snapshot))
}
