/// In-memory backend for single-process deployments and tests.
pub mod memory;
/// MongoDB-backed store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::{future::BoxFuture, stream::BoxStream};
use uuid::Uuid;

use crate::dao::models::{
    CycleEntity, LibraryMovieEntity, ScheduleSettingsEntity, SharedMovieEntity, VoteEntity,
    WinnerEntity,
};
use crate::dao::storage::StorageResult;
use crate::state::state_machine::CycleStatus;

/// Typed partial update against a single cycle document.
///
/// Every variant touches fields owned by one writer: the per-user
/// variants write that user's own map entry, and `AdvanceStatus`
/// writes the contended status fields conditionally so duplicate
/// attempts from racing participants degrade to no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleUpdate {
    /// Record one user's yes/no decision.
    SetDecision {
        /// User making the decision.
        user_id: String,
        /// Whether the user will watch tonight.
        interested: bool,
    },
    /// Replace one user's nomination list.
    SetNominations {
        /// Nominating user.
        user_id: String,
        /// Nominated movie identifiers; may be empty.
        movie_ids: Vec<Uuid>,
    },
    /// Replace one user's ranked picks.
    SetVote {
        /// Voting user.
        user_id: String,
        /// The submitted picks.
        vote: VoteEntity,
    },
    /// Replace the night's scheduling preferences.
    SetScheduleSettings {
        /// New settings.
        settings: ScheduleSettingsEntity,
    },
    /// Move the cycle to a later phase, conditional on it still being
    /// in `from`. Winner and reveal deadline ride along atomically when
    /// the target phase is reveal.
    AdvanceStatus {
        /// Status the writer observed; the update applies only if the
        /// document still carries it.
        from: CycleStatus,
        /// Target status.
        to: CycleStatus,
        /// Winner to record, when advancing into reveal.
        winner: Option<WinnerEntity>,
        /// Deadline for leaving reveal, when advancing into reveal.
        reveal_ends_at: Option<SystemTime>,
    },
}

impl CycleUpdate {
    /// Apply the update to an in-memory document.
    ///
    /// Returns `false` when a conditional advance found the document
    /// already past `from`; the document is left untouched in that
    /// case.
    pub fn apply_to(self, cycle: &mut CycleEntity) -> bool {
        match self {
            CycleUpdate::SetDecision {
                user_id,
                interested,
            } => {
                cycle.decisions.insert(user_id, interested);
                true
            }
            CycleUpdate::SetNominations { user_id, movie_ids } => {
                cycle.nominations.insert(user_id, movie_ids);
                true
            }
            CycleUpdate::SetVote { user_id, vote } => {
                cycle.votes.insert(user_id, vote);
                true
            }
            CycleUpdate::SetScheduleSettings { settings } => {
                cycle.schedule_settings = settings;
                true
            }
            CycleUpdate::AdvanceStatus {
                from,
                to,
                winner,
                reveal_ends_at,
            } => {
                if cycle.current_status != from {
                    return false;
                }
                cycle.current_status = to;
                if let Some(winner) = winner {
                    cycle.winning_movie = Some(winner);
                }
                if let Some(deadline) = reveal_ends_at {
                    cycle.reveal_ends_at = Some(deadline);
                }
                true
            }
        }
    }
}

/// Abstraction over the shared document store coordinating all
/// participants: cycle documents with live-update subscriptions plus
/// the per-user libraries and the shared movie pool.
pub trait NightStore: Send + Sync {
    /// Load a cycle document by date key.
    fn find_cycle(&self, id: &str) -> BoxFuture<'static, StorageResult<Option<CycleEntity>>>;
    /// Insert a cycle document if absent, returning the stored version
    /// (the existing one when another participant created it first).
    fn create_cycle(&self, cycle: CycleEntity) -> BoxFuture<'static, StorageResult<CycleEntity>>;
    /// Apply a partial update; `Ok(false)` means a conditional advance
    /// found the document already moved on.
    fn apply_cycle_update(
        &self,
        id: &str,
        update: CycleUpdate,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a cycle document, returning whether it existed.
    fn delete_cycle(&self, id: &str) -> BoxFuture<'static, StorageResult<bool>>;
    /// Subscribe to snapshots of a cycle document. The stream yields
    /// the current state first (when the document exists) and then a
    /// snapshot after every observed change, at-least-once.
    fn watch_cycle(
        &self,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<BoxStream<'static, CycleEntity>>>;

    /// Load one movie from a user's library.
    fn find_library_movie(
        &self,
        owner: &str,
        movie_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LibraryMovieEntity>>>;
    /// List a user's library.
    fn list_library(
        &self,
        owner: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<LibraryMovieEntity>>>;
    /// Insert or replace a library movie.
    fn save_library_movie(
        &self,
        movie: LibraryMovieEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove a movie from a user's library, returning whether it existed.
    fn delete_library_movie(
        &self,
        owner: &str,
        movie_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Load one movie from the shared pool.
    fn find_shared_movie(
        &self,
        movie_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SharedMovieEntity>>>;
    /// List the shared pool.
    fn list_shared_movies(&self) -> BoxFuture<'static, StorageResult<Vec<SharedMovieEntity>>>;
    /// Insert or replace a shared-pool movie.
    fn save_shared_movie(&self, movie: SharedMovieEntity)
    -> BoxFuture<'static, StorageResult<()>>;

    /// Probe backend connectivity.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle() -> CycleEntity {
        CycleEntity {
            id: "2026-08-04".into(),
            current_status: CycleStatus::WaitingForDecisions,
            decisions: Default::default(),
            nominations: Default::default(),
            votes: Default::default(),
            winning_movie: None,
            schedule_settings: ScheduleSettingsEntity {
                finish_by: "21:30".into(),
            },
            reveal_ends_at: None,
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn per_user_updates_do_not_clobber_siblings() {
        let mut doc = cycle();
        assert!(
            CycleUpdate::SetDecision {
                user_id: "ana".into(),
                interested: true,
            }
            .apply_to(&mut doc)
        );
        assert!(
            CycleUpdate::SetDecision {
                user_id: "ben".into(),
                interested: false,
            }
            .apply_to(&mut doc)
        );
        assert!(
            CycleUpdate::SetVote {
                user_id: "ana".into(),
                vote: VoteEntity::default(),
            }
            .apply_to(&mut doc)
        );

        assert_eq!(doc.decisions.get("ana"), Some(&true));
        assert_eq!(doc.decisions.get("ben"), Some(&false));
        assert!(doc.votes.contains_key("ana"));
    }

    #[test]
    fn decision_resubmission_overwrites() {
        let mut doc = cycle();
        for interested in [true, false] {
            CycleUpdate::SetDecision {
                user_id: "ana".into(),
                interested,
            }
            .apply_to(&mut doc);
        }
        assert_eq!(doc.decisions.get("ana"), Some(&false));
        assert_eq!(doc.decisions.len(), 1);
    }

    #[test]
    fn duplicate_advance_is_a_no_op() {
        let mut doc = cycle();
        let advance = CycleUpdate::AdvanceStatus {
            from: CycleStatus::WaitingForDecisions,
            to: CycleStatus::GatheringNominations,
            winner: None,
            reveal_ends_at: None,
        };

        assert!(advance.clone().apply_to(&mut doc));
        let after_first = doc.clone();

        assert!(!advance.apply_to(&mut doc));
        assert_eq!(doc, after_first);
        assert_eq!(doc.current_status, CycleStatus::GatheringNominations);
    }

    #[test]
    fn stale_advance_does_not_regress() {
        let mut doc = cycle();
        doc.current_status = CycleStatus::GatheringVotes;

        let stale = CycleUpdate::AdvanceStatus {
            from: CycleStatus::WaitingForDecisions,
            to: CycleStatus::GatheringNominations,
            winner: None,
            reveal_ends_at: None,
        };
        assert!(!stale.apply_to(&mut doc));
        assert_eq!(doc.current_status, CycleStatus::GatheringVotes);
    }

    #[test]
    fn reveal_advance_writes_winner_and_deadline_atomically() {
        let mut doc = cycle();
        doc.current_status = CycleStatus::GatheringVotes;
        let deadline = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(10);
        let winner = WinnerEntity {
            movie_id: Uuid::new_v4(),
            score: 8,
        };

        assert!(
            CycleUpdate::AdvanceStatus {
                from: CycleStatus::GatheringVotes,
                to: CycleStatus::Reveal,
                winner: Some(winner),
                reveal_ends_at: Some(deadline),
            }
            .apply_to(&mut doc)
        );

        assert_eq!(doc.current_status, CycleStatus::Reveal);
        assert_eq!(doc.winning_movie, Some(winner));
        assert_eq!(doc.reveal_ends_at, Some(deadline));
    }
}
