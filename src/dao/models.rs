use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::state_machine::CycleStatus;

/// One day's cycle document shared by every participant.
///
/// Per-user map entries (`decisions.<uid>`, `nominations.<uid>`,
/// `votes.<uid>`) are each written by exactly one user, so concurrent
/// writers never collide on them. Only `current_status`,
/// `winning_movie` and `reveal_ends_at` are contended, and those are
/// written together through a conditional update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleEntity {
    /// Date key in `YYYY-MM-DD` form.
    pub id: String,
    /// Phase the cycle is currently in.
    pub current_status: CycleStatus,
    /// Per-user yes/no "will you watch tonight" answers.
    #[serde(default)]
    pub decisions: IndexMap<String, bool>,
    /// Per-user ordered nomination lists; an empty list still counts as submitted.
    #[serde(default)]
    pub nominations: IndexMap<String, Vec<Uuid>>,
    /// Per-user ranked picks.
    #[serde(default)]
    pub votes: IndexMap<String, VoteEntity>,
    /// Winner reference, written once when the cycle reaches reveal.
    #[serde(default)]
    pub winning_movie: Option<WinnerEntity>,
    /// Scheduling preferences for the night.
    pub schedule_settings: ScheduleSettingsEntity,
    /// Deadline after which any subscriber may move reveal to the dashboard.
    #[serde(default)]
    pub reveal_ends_at: Option<SystemTime>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Ranked picks submitted by a single user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEntity {
    /// First choice, worth the most points.
    #[serde(default)]
    pub top_pick: Option<Uuid>,
    /// Second choice.
    #[serde(default)]
    pub second_pick: Option<Uuid>,
    /// Third choice.
    #[serde(default)]
    pub third_pick: Option<Uuid>,
}

/// Winning movie reference with its final tally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinnerEntity {
    /// Identifier of the winning movie in the shared pool.
    pub movie_id: Uuid,
    /// Final score after ranked points and any underdog bonus.
    pub score: u32,
}

/// Per-cycle scheduling preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleSettingsEntity {
    /// Target finish time in 24h `HH:MM` form.
    pub finish_by: String,
}

/// Movie owned by a single user's personal library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryMovieEntity {
    /// Stable identifier for the movie entry.
    pub id: Uuid,
    /// User owning this entry; only that user may mutate it.
    pub owner: String,
    /// Identifier in the external catalog, when the entry came from a lookup.
    #[serde(default)]
    pub catalog_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Poster image URL.
    #[serde(default)]
    pub poster_url: Option<String>,
    /// Runtime in minutes; strictly positive for nominable movies.
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
    /// Consecutive-cycle nomination counter feeding the underdog bonus.
    #[serde(default)]
    pub nomination_streak: u32,
    /// Date key of the last cycle that bumped the streak, making the
    /// bump idempotent when a nomination list is resubmitted.
    #[serde(default)]
    pub last_nominated_cycle: Option<String>,
    /// When the movie was added to the library.
    pub added_at: SystemTime,
}

/// A library movie projected into the pool visible to all participants.
///
/// Created by copy-on-nominate and never deleted mid-cycle; the winner
/// calculation reads runtimes and streaks from here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedMovieEntity {
    /// Identifier shared with the originating library entry.
    pub id: Uuid,
    /// Identifier in the external catalog, when known.
    #[serde(default)]
    pub catalog_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Poster image URL.
    #[serde(default)]
    pub poster_url: Option<String>,
    /// Runtime in minutes.
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
    /// Streak carried over from the library entry at nomination time.
    #[serde(default)]
    pub nomination_streak: u32,
    /// User whose library the movie came from.
    pub original_owner: String,
    /// When the movie first entered the shared pool.
    pub shared_at: SystemTime,
}

impl SharedMovieEntity {
    /// Project a library movie into the shared pool.
    pub fn from_library(movie: &LibraryMovieEntity, shared_at: SystemTime) -> Self {
        Self {
            id: movie.id,
            catalog_id: movie.catalog_id.clone(),
            title: movie.title.clone(),
            poster_url: movie.poster_url.clone(),
            runtime_minutes: movie.runtime_minutes,
            release_year: movie.release_year,
            genres: movie.genres.clone(),
            description: movie.description.clone(),
            nomination_streak: movie.nomination_streak,
            original_owner: movie.owner.clone(),
            shared_at,
        }
    }
}
