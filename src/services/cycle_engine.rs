//! Automatic phase advancement for the daily cycle.
//!
//! The engine subscribes to today's cycle document and re-evaluates
//! the advance conditions on every snapshot it observes. There is no
//! leader: every process running this loop against the same store
//! performs the same evaluation and races to apply the same
//! conditional write, so duplicates collapse into no-ops. A failed
//! write is only logged; the next snapshot re-derives the decision
//! from scratch.
//!
//! A periodic tick covers the two cases no document change announces:
//! the reveal dwell deadline passing, and the date key rolling over to
//! the next day.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dao::{
        models::{CycleEntity, WinnerEntity},
        night_store::{CycleUpdate, NightStore},
        storage::StorageResult,
    },
    services::{
        cycle_service, sse_events,
        winner::{CandidateFacts, calculate_winner},
    },
    state::{
        SharedState,
        cycle::{DailyCycle, cycle_date_key},
        state_machine::{CycleStatus, next_status},
    },
};

const STORE_RETRY_DELAY: Duration = Duration::from_secs(1);
const EVALUATION_TICK: Duration = Duration::from_secs(1);

/// Run the engine until the process shuts down.
pub async fn run(state: SharedState) {
    loop {
        let Some(store) = state.night_store().await else {
            tokio::time::sleep(STORE_RETRY_DELAY).await;
            continue;
        };

        let date_key = cycle_date_key(
            state.config().local_now(),
            state.config().day_boundary_hour(),
        );

        let entity = match cycle_service::ensure_cycle(&store, state.config()).await {
            Ok(entity) => entity,
            Err(err) => {
                warn!(cycle_id = %date_key, error = %err, "failed to open today's cycle");
                tokio::time::sleep(STORE_RETRY_DELAY).await;
                continue;
            }
        };

        let mut snapshots = match store.watch_cycle(&date_key).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(cycle_id = %date_key, error = %err, "failed to watch today's cycle");
                tokio::time::sleep(STORE_RETRY_DELAY).await;
                continue;
            }
        };

        info!(cycle_id = %date_key, "watching daily cycle");
        handle_snapshot(&state, &store, entity).await;

        loop {
            tokio::select! {
                next = snapshots.next() => match next {
                    Some(entity) => handle_snapshot(&state, &store, entity).await,
                    None => break,
                },
                _ = tokio::time::sleep(EVALUATION_TICK) => {
                    let now_key = cycle_date_key(
                        state.config().local_now(),
                        state.config().day_boundary_hour(),
                    );
                    if now_key != date_key {
                        if let Some(cycle) = state.current_cycle().await {
                            if !cycle.current_status.is_terminal() {
                                debug!(cycle_id = %cycle.id, "previous cycle never reached the dashboard");
                            }
                        }
                        info!(from = %date_key, to = %now_key, "rolling over to a new cycle");
                        state.clear_current_cycle().await;
                        break;
                    }
                    if let Some(cycle) = state.current_cycle().await {
                        evaluate(&state, &store, &cycle).await;
                    }
                }
            }

            // Resubscribe when the supervisor swapped the backend.
            match state.night_store().await {
                Some(current) if Arc::ptr_eq(&current, &store) => {}
                _ => break,
            }
        }
    }
}

/// Cache and broadcast a fresh snapshot, then re-evaluate transitions.
async fn handle_snapshot(state: &SharedState, store: &Arc<dyn NightStore>, entity: CycleEntity) {
    let previous = state.replace_current_cycle(entity.clone()).await;

    sse_events::broadcast_cycle_updated(state, &entity);
    if previous.map(|cycle| cycle.current_status) != Some(entity.current_status) {
        sse_events::broadcast_status_changed(state, &entity);
    }

    evaluate(state, store, &entity).await;
}

/// Apply the next due transition for a snapshot, if any.
async fn evaluate(state: &SharedState, store: &Arc<dyn NightStore>, entity: &CycleEntity) {
    let cycle = match DailyCycle::try_from(entity.clone()) {
        Ok(cycle) => cycle,
        Err(err) => {
            warn!(cycle_id = %entity.id, error = %err, "ignoring malformed cycle snapshot");
            return;
        }
    };

    let Some(target) = next_status(
        &cycle,
        state.config().advance_thresholds(),
        SystemTime::now(),
    ) else {
        return;
    };

    let update = match build_advance(store, state.config(), &cycle, target).await {
        Ok(update) => update,
        Err(err) => {
            warn!(cycle_id = %cycle.id, error = %err, "failed to prepare cycle advance");
            return;
        }
    };

    match store.apply_cycle_update(&cycle.id, update).await {
        Ok(true) => {
            info!(cycle_id = %cycle.id, from = ?cycle.status, to = ?target, "cycle advanced");
        }
        Ok(false) => {
            debug!(cycle_id = %cycle.id, to = ?target, "another participant advanced the cycle first");
        }
        Err(err) => {
            warn!(
                cycle_id = %cycle.id,
                error = %err,
                "cycle advance failed; retrying on the next snapshot"
            );
        }
    }
}

/// Build the conditional advance for a target status. Moving into
/// reveal tallies the winner from the shared pool and stamps the dwell
/// deadline so the two land atomically with the status.
pub(crate) async fn build_advance(
    store: &Arc<dyn NightStore>,
    config: &AppConfig,
    cycle: &DailyCycle,
    target: CycleStatus,
) -> StorageResult<CycleUpdate> {
    let (winner, reveal_ends_at) = if target == CycleStatus::Reveal {
        let winner = reveal_winner(store, config, cycle).await?;
        (winner, Some(SystemTime::now() + config.reveal_dwell()))
    } else {
        (None, None)
    };

    Ok(CycleUpdate::AdvanceStatus {
        from: cycle.status,
        to: target,
        winner,
        reveal_ends_at,
    })
}

async fn reveal_winner(
    store: &Arc<dyn NightStore>,
    config: &AppConfig,
    cycle: &DailyCycle,
) -> StorageResult<Option<WinnerEntity>> {
    let shared = store.list_shared_movies().await?;
    let facts: HashMap<_, _> = shared
        .into_iter()
        .map(|movie| {
            (
                movie.id,
                CandidateFacts {
                    runtime_minutes: Some(movie.runtime_minutes),
                    nomination_streak: movie.nomination_streak,
                },
            )
        })
        .collect();

    Ok(calculate_winner(
        &cycle.nominations,
        &cycle.votes,
        &facts,
        config.underdog_boost(),
    )
    .map(Into::into))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        dao::{models::LibraryMovieEntity, night_store::memory::MemoryNightStore},
        dto::cycle::{DecisionRequest, NominationsRequest, VoteRequest},
        state::AppState,
    };

    async fn state_with_memory_store() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_night_store(Arc::new(MemoryNightStore::new()))
            .await;
        state
    }

    async fn add_library_movie(
        state: &SharedState,
        owner: &str,
        title: &str,
        runtime_minutes: u32,
    ) -> Uuid {
        let store = state.night_store().await.unwrap();
        let movie = LibraryMovieEntity {
            id: Uuid::new_v4(),
            owner: owner.into(),
            catalog_id: None,
            title: title.into(),
            poster_url: None,
            runtime_minutes,
            release_year: None,
            genres: Vec::new(),
            description: None,
            nomination_streak: 0,
            last_nominated_cycle: None,
            added_at: SystemTime::now(),
        };
        store.save_library_movie(movie.clone()).await.unwrap();
        movie.id
    }

    async fn latest_cycle(state: &SharedState) -> CycleEntity {
        let store = state.night_store().await.unwrap();
        cycle_service::ensure_cycle(&store, state.config())
            .await
            .unwrap()
    }

    async fn evaluate_latest(state: &SharedState) {
        let store = state.night_store().await.unwrap();
        let entity = latest_cycle(state).await;
        evaluate(state, &store, &entity).await;
    }

    #[tokio::test]
    async fn full_cycle_advances_to_reveal_with_a_winner() {
        let state = state_with_memory_store().await;

        // Three decisions, two of them yes: nominations open.
        for (user, interested) in [("ana", true), ("ben", true), ("caro", false)] {
            cycle_service::record_decision(
                &state,
                user,
                DecisionRequest { interested },
            )
            .await
            .unwrap();
        }
        evaluate_latest(&state).await;
        assert_eq!(
            latest_cycle(&state).await.current_status,
            CycleStatus::GatheringNominations
        );

        // Both interested members nominate from their libraries.
        let short = add_library_movie(&state, "ana", "Short One", 90).await;
        let long = add_library_movie(&state, "ben", "Long One", 120).await;
        cycle_service::submit_nominations(
            &state,
            "ana",
            NominationsRequest {
                movie_ids: vec![short],
            },
        )
        .await
        .unwrap();
        cycle_service::submit_nominations(
            &state,
            "ben",
            NominationsRequest {
                movie_ids: vec![long],
            },
        )
        .await
        .unwrap();
        evaluate_latest(&state).await;
        assert_eq!(
            latest_cycle(&state).await.current_status,
            CycleStatus::GatheringVotes
        );

        // Mirror-image votes tie on points; the shorter runtime wins.
        cycle_service::submit_vote(
            &state,
            "ana",
            VoteRequest {
                top_pick: Some(short),
                second_pick: Some(long),
                third_pick: None,
            },
        )
        .await
        .unwrap();
        cycle_service::submit_vote(
            &state,
            "ben",
            VoteRequest {
                top_pick: Some(long),
                second_pick: Some(short),
                third_pick: None,
            },
        )
        .await
        .unwrap();
        evaluate_latest(&state).await;

        let cycle = latest_cycle(&state).await;
        assert_eq!(cycle.current_status, CycleStatus::Reveal);
        let winner = cycle.winning_movie.expect("winner recorded at reveal");
        assert_eq!(winner.movie_id, short);
        assert_eq!(winner.score, 5);
        assert!(cycle.reveal_ends_at.is_some());
    }

    #[tokio::test]
    async fn reveal_without_nominations_records_no_winner() {
        let state = state_with_memory_store().await;

        for (user, interested) in [("ana", true), ("ben", true), ("caro", false)] {
            cycle_service::record_decision(
                &state,
                user,
                DecisionRequest { interested },
            )
            .await
            .unwrap();
        }
        evaluate_latest(&state).await;

        // Both interested members pass, then submit empty votes.
        for user in ["ana", "ben"] {
            cycle_service::submit_nominations(
                &state,
                user,
                NominationsRequest { movie_ids: vec![] },
            )
            .await
            .unwrap();
        }
        evaluate_latest(&state).await;
        for user in ["ana", "ben"] {
            cycle_service::submit_vote(
                &state,
                user,
                VoteRequest {
                    top_pick: None,
                    second_pick: None,
                    third_pick: None,
                },
            )
            .await
            .unwrap();
        }
        evaluate_latest(&state).await;

        let cycle = latest_cycle(&state).await;
        assert_eq!(cycle.current_status, CycleStatus::Reveal);
        assert_eq!(cycle.winning_movie, None);

        let err = cycle_service::winning_schedule(&state).await.unwrap_err();
        assert!(matches!(err, crate::error::ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn evaluation_is_idempotent_under_repeated_invocation() {
        let state = state_with_memory_store().await;

        for (user, interested) in [("ana", true), ("ben", true), ("caro", false)] {
            cycle_service::record_decision(
                &state,
                user,
                DecisionRequest { interested },
            )
            .await
            .unwrap();
        }

        // Several participants race the same stale snapshot; the
        // status moves forward exactly once.
        let store = state.night_store().await.unwrap();
        let entity = latest_cycle(&state).await;
        for _ in 0..3 {
            evaluate(&state, &store, &entity).await;
        }
        assert_eq!(
            latest_cycle(&state).await.current_status,
            CycleStatus::GatheringNominations
        );
    }

    #[tokio::test]
    async fn insufficient_interest_never_advances() {
        let state = state_with_memory_store().await;

        for (user, interested) in [("ana", true), ("ben", false), ("caro", false)] {
            cycle_service::record_decision(
                &state,
                user,
                DecisionRequest { interested },
            )
            .await
            .unwrap();
        }
        evaluate_latest(&state).await;

        assert_eq!(
            latest_cycle(&state).await.current_status,
            CycleStatus::WaitingForDecisions
        );
    }
}
