//! Participation operations against today's cycle document.
//!
//! Every write here is a single partial update keyed by the acting
//! user, validated before anything touches the store. Resubmission is
//! allowed throughout and overwrites the user's previous entry. The
//! automatic phase transitions are the cycle engine's job, not ours;
//! the engine observes the snapshot produced by these writes and
//! reacts.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::info;

use crate::{
    config::AppConfig,
    dao::{
        models::{CycleEntity, ScheduleSettingsEntity, SharedMovieEntity},
        night_store::{CycleUpdate, NightStore},
        storage::StorageResult,
    },
    dto::{
        cycle::{
            CycleSnapshot, DecisionRequest, NominationsRequest, ScheduleResponse,
            ScheduleSettingsRequest, StatusOverrideRequest, VoteRequest,
        },
        validation::validate_user_id,
    },
    error::ServiceError,
    services::{cycle_engine, schedule::calculate_schedule},
    state::{
        SharedState,
        cycle::{DailyCycle, cycle_date_key},
        state_machine::{CycleStatus, ensure_forward},
    },
};

/// Load today's cycle, creating it with the initial status when no
/// participant has touched it yet. Creation is first-writer-wins, so
/// concurrent callers all end up with the same stored document.
pub(crate) async fn ensure_cycle(
    store: &Arc<dyn NightStore>,
    config: &AppConfig,
) -> StorageResult<CycleEntity> {
    let id = cycle_date_key(config.local_now(), config.day_boundary_hour());
    if let Some(existing) = store.find_cycle(&id).await? {
        return Ok(existing);
    }

    let cycle = CycleEntity {
        id,
        current_status: CycleStatus::initial(),
        decisions: Default::default(),
        nominations: Default::default(),
        votes: Default::default(),
        winning_movie: None,
        schedule_settings: ScheduleSettingsEntity {
            finish_by: config.default_finish_by().to_owned(),
        },
        reveal_ends_at: None,
        created_at: SystemTime::now(),
    };
    store.create_cycle(cycle).await
}

/// Return today's cycle snapshot, creating the document if needed.
pub async fn today_snapshot(state: &SharedState) -> Result<CycleSnapshot, ServiceError> {
    let store = state.require_night_store().await?;
    let cycle = ensure_cycle(&store, state.config()).await?;
    Ok(cycle.into())
}

/// Record one user's yes/no decision for tonight.
pub async fn record_decision(
    state: &SharedState,
    user_id: &str,
    request: DecisionRequest,
) -> Result<CycleSnapshot, ServiceError> {
    let user_id = sanitize_user_id(user_id)?;
    let store = state.require_night_store().await?;
    let cycle = ensure_cycle(&store, state.config()).await?;
    ensure_status(&cycle, CycleStatus::WaitingForDecisions, "decisions")?;

    apply_and_fetch(
        &store,
        &cycle.id,
        CycleUpdate::SetDecision {
            user_id,
            interested: request.interested,
        },
    )
    .await
}

/// Replace one user's nomination list for today's cycle.
///
/// Each nominated movie must exist in the caller's library with a
/// positive runtime. Nominating projects the movie into the shared
/// pool and bumps its streak, once per cycle, before the list is
/// written, so the pool the voters see always carries the current
/// streak.
pub async fn submit_nominations(
    state: &SharedState,
    user_id: &str,
    request: NominationsRequest,
) -> Result<CycleSnapshot, ServiceError> {
    let user_id = sanitize_user_id(user_id)?;
    let store = state.require_night_store().await?;
    let cycle = ensure_cycle(&store, state.config()).await?;
    ensure_status(&cycle, CycleStatus::GatheringNominations, "nominations")?;

    let max = state.config().max_nominations();
    if request.movie_ids.len() > max {
        return Err(ServiceError::InvalidInput(format!(
            "at most {max} movies can be nominated per cycle"
        )));
    }

    for movie_id in &request.movie_ids {
        let Some(mut movie) = store.find_library_movie(&user_id, *movie_id).await? else {
            return Err(ServiceError::NotFound(format!(
                "movie `{movie_id}` is not in `{user_id}`'s library"
            )));
        };
        if movie.runtime_minutes == 0 {
            return Err(ServiceError::InvalidInput(format!(
                "movie `{}` has no runtime and cannot be nominated",
                movie.title
            )));
        }

        if movie.last_nominated_cycle.as_deref() != Some(cycle.id.as_str()) {
            movie.nomination_streak += 1;
            movie.last_nominated_cycle = Some(cycle.id.clone());
            store.save_library_movie(movie.clone()).await?;
        }

        let shared = match store.find_shared_movie(*movie_id).await? {
            Some(existing) => SharedMovieEntity {
                nomination_streak: movie.nomination_streak,
                ..existing
            },
            None => SharedMovieEntity::from_library(&movie, SystemTime::now()),
        };
        store.save_shared_movie(shared).await?;
    }

    apply_and_fetch(
        &store,
        &cycle.id,
        CycleUpdate::SetNominations {
            user_id,
            movie_ids: request.movie_ids,
        },
    )
    .await
}

/// Replace one user's ranked picks for today's cycle.
pub async fn submit_vote(
    state: &SharedState,
    user_id: &str,
    request: VoteRequest,
) -> Result<CycleSnapshot, ServiceError> {
    let user_id = sanitize_user_id(user_id)?;
    let store = state.require_night_store().await?;
    let cycle = ensure_cycle(&store, state.config()).await?;
    ensure_status(&cycle, CycleStatus::GatheringVotes, "votes")?;

    for movie_id in request.picks() {
        if store.find_shared_movie(movie_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "movie `{movie_id}` is not in the shared pool"
            )));
        }
    }

    apply_and_fetch(
        &store,
        &cycle.id,
        CycleUpdate::SetVote {
            user_id,
            vote: request.into(),
        },
    )
    .await
}

/// Update the night's target finish time.
pub async fn update_schedule_settings(
    state: &SharedState,
    request: ScheduleSettingsRequest,
) -> Result<CycleSnapshot, ServiceError> {
    let store = state.require_night_store().await?;
    let cycle = ensure_cycle(&store, state.config()).await?;
    if cycle.current_status.rank() >= CycleStatus::Reveal.rank() {
        return Err(ServiceError::InvalidState(
            "the schedule is locked once the winner is revealed".into(),
        ));
    }

    apply_and_fetch(
        &store,
        &cycle.id,
        CycleUpdate::SetScheduleSettings {
            settings: ScheduleSettingsEntity {
                finish_by: request.finish_by,
            },
        },
    )
    .await
}

/// Force today's cycle into a later phase.
///
/// The override goes through the same conditional write as the
/// automatic transitions, so racing against the engine is harmless; a
/// lost race surfaces as a conflict instead of a silent regression.
pub async fn override_status(
    state: &SharedState,
    request: StatusOverrideRequest,
) -> Result<CycleSnapshot, ServiceError> {
    let store = state.require_night_store().await?;
    let entity = ensure_cycle(&store, state.config()).await?;
    ensure_forward(entity.current_status, request.status)?;

    let cycle = DailyCycle::try_from(entity)?;
    let update =
        cycle_engine::build_advance(&store, state.config(), &cycle, request.status).await?;

    if !store.apply_cycle_update(&cycle.id, update).await? {
        return Err(ServiceError::InvalidState(
            "the cycle advanced concurrently; re-check its status and retry".into(),
        ));
    }

    info!(cycle_id = %cycle.id, status = ?request.status, "cycle status overridden");
    fetch_snapshot(&store, &cycle.id).await
}

/// Delete today's cycle and recreate it in the initial status.
pub async fn reset_cycle(state: &SharedState) -> Result<CycleSnapshot, ServiceError> {
    let store = state.require_night_store().await?;
    let id = cycle_date_key(
        state.config().local_now(),
        state.config().day_boundary_hour(),
    );
    store.delete_cycle(&id).await?;
    state.clear_current_cycle().await;

    let cycle = ensure_cycle(&store, state.config()).await?;
    info!(cycle_id = %cycle.id, "cycle reset to initial status");
    Ok(cycle.into())
}

/// Compute the viewing schedule for the revealed winner.
pub async fn winning_schedule(state: &SharedState) -> Result<ScheduleResponse, ServiceError> {
    let store = state.require_night_store().await?;
    let entity = ensure_cycle(&store, state.config()).await?;
    let cycle = DailyCycle::try_from(entity)?;

    let winner = cycle.winning_movie.ok_or_else(|| {
        ServiceError::NotFound("no winner has been revealed yet".into())
    })?;
    let movie = store
        .find_shared_movie(winner.movie_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound("the winning movie is missing from the shared pool".into())
        })?;

    let schedule = calculate_schedule(
        movie.runtime_minutes,
        cycle.schedule_settings.finish_by,
        state.config().local_now().date(),
        state.config().break_rule(),
    );

    Ok(ScheduleResponse::new(
        winner.movie_id,
        movie.runtime_minutes,
        &schedule,
    ))
}

fn sanitize_user_id(user_id: &str) -> Result<String, ServiceError> {
    validate_user_id(user_id)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid user id: {err}")))?;
    Ok(user_id.to_owned())
}

fn ensure_status(
    cycle: &CycleEntity,
    expected: CycleStatus,
    operation: &str,
) -> Result<(), ServiceError> {
    if cycle.current_status != expected {
        return Err(ServiceError::InvalidState(format!(
            "{operation} are not being gathered right now (cycle is in {:?})",
            cycle.current_status
        )));
    }
    Ok(())
}

async fn apply_and_fetch(
    store: &Arc<dyn NightStore>,
    id: &str,
    update: CycleUpdate,
) -> Result<CycleSnapshot, ServiceError> {
    store.apply_cycle_update(id, update).await?;
    fetch_snapshot(store, id).await
}

async fn fetch_snapshot(
    store: &Arc<dyn NightStore>,
    id: &str,
) -> Result<CycleSnapshot, ServiceError> {
    let cycle = store
        .find_cycle(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("cycle `{id}` not found")))?;
    Ok(cycle.into())
}
