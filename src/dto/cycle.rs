use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{CycleEntity, VoteEntity, WinnerEntity},
    dto::{format_system_time, validation::validate_clock_time},
    services::schedule::Schedule,
    state::state_machine::CycleStatus,
};

/// Payload recording whether a member will watch tonight.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DecisionRequest {
    /// `true` means "I'm in".
    pub interested: bool,
}

/// Payload replacing the caller's nomination list for the cycle.
///
/// Resubmission is allowed and overwrites the previous list; the
/// per-cycle cap is enforced in the service layer because it is
/// configurable.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NominationsRequest {
    /// Nominated movie identifiers; may be empty to pass.
    #[serde(default)]
    pub movie_ids: Vec<Uuid>,
}

impl Validate for NominationsRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let mut seen = HashSet::new();
        if self.movie_ids.iter().any(|id| !seen.insert(*id)) {
            let mut err = ValidationError::new("duplicate_nomination");
            err.message = Some("nominated movies must be distinct".into());
            errors.add("movie_ids", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Ranked picks for the night's vote.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VoteRequest {
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

impl VoteRequest {
    /// The picks that were actually filled in.
    pub fn picks(&self) -> impl Iterator<Item = Uuid> {
        [self.top_pick, self.second_pick, self.third_pick]
            .into_iter()
            .flatten()
    }
}

impl Validate for VoteRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let mut seen = HashSet::new();
        if self.picks().any(|id| !seen.insert(id)) {
            let mut err = ValidationError::new("duplicate_pick");
            err.message = Some("vote picks must be pairwise distinct".into());
            errors.add("picks", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl From<VoteRequest> for VoteEntity {
    fn from(value: VoteRequest) -> Self {
        Self {
            top_pick: value.top_pick,
            second_pick: value.second_pick,
            third_pick: value.third_pick,
        }
    }
}

/// Update to the night's target finish time.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScheduleSettingsRequest {
    /// Target finish time in 24h `HH:MM` form.
    #[validate(custom(function = validate_clock_time))]
    pub finish_by: String,
}

/// Operator override forcing the cycle into a later phase.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StatusOverrideRequest {
    /// Target status; must be strictly ahead of the current one.
    pub status: CycleStatus,
}

/// Ranked picks as exposed in snapshots.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VoteSummary {
    /// First choice.
    pub top_pick: Option<Uuid>,
    /// Second choice.
    pub second_pick: Option<Uuid>,
    /// Third choice.
    pub third_pick: Option<Uuid>,
}

impl From<VoteEntity> for VoteSummary {
    fn from(value: VoteEntity) -> Self {
        Self {
            top_pick: value.top_pick,
            second_pick: value.second_pick,
            third_pick: value.third_pick,
        }
    }
}

/// Winning movie projection.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct WinnerSummary {
    /// Identifier of the winning movie in the shared pool.
    pub movie_id: Uuid,
    /// Final score.
    pub score: u32,
}

impl From<WinnerEntity> for WinnerSummary {
    fn from(value: WinnerEntity) -> Self {
        Self {
            movie_id: value.movie_id,
            score: value.score,
        }
    }
}

/// Schedule settings projection.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleSettingsSummary {
    /// Target finish time in 24h `HH:MM` form.
    pub finish_by: String,
}

/// Full cycle snapshot returned by the REST routes and pushed over SSE.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CycleSnapshot {
    /// Date key in `YYYY-MM-DD` form.
    pub id: String,
    /// Phase the cycle is currently in.
    pub current_status: CycleStatus,
    /// Per-user yes/no answers.
    pub decisions: IndexMap<String, bool>,
    /// Per-user nomination lists.
    pub nominations: IndexMap<String, Vec<Uuid>>,
    /// Per-user ranked picks.
    pub votes: IndexMap<String, VoteSummary>,
    /// Winner, once revealed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_movie: Option<WinnerSummary>,
    /// Scheduling preferences.
    pub schedule_settings: ScheduleSettingsSummary,
    /// Deadline for leaving the reveal phase, RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal_ends_at: Option<String>,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

impl From<CycleEntity> for CycleSnapshot {
    fn from(value: CycleEntity) -> Self {
        Self {
            id: value.id,
            current_status: value.current_status,
            decisions: value.decisions,
            nominations: value.nominations,
            votes: value
                .votes
                .into_iter()
                .map(|(user, vote)| (user, vote.into()))
                .collect(),
            winning_movie: value.winning_movie.map(Into::into),
            schedule_settings: ScheduleSettingsSummary {
                finish_by: value.schedule_settings.finish_by,
            },
            reveal_ends_at: value.reveal_ends_at.map(format_system_time),
            created_at: format_system_time(value.created_at),
        }
    }
}

/// Computed viewing schedule for the winning movie.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleResponse {
    /// Movie the schedule was computed for.
    pub movie_id: Uuid,
    /// Runtime in minutes.
    pub runtime_minutes: u32,
    /// When playback has to start, local time.
    pub start_at: String,
    /// When the night wraps up, local time.
    pub finish_at: String,
    /// Number of breaks interleaved into the runtime.
    pub break_count: u32,
    /// Total break time in minutes.
    pub break_total_minutes: u32,
}

impl ScheduleResponse {
    /// Assemble the response from a computed schedule.
    pub fn new(movie_id: Uuid, runtime_minutes: u32, schedule: &Schedule) -> Self {
        Self {
            movie_id,
            runtime_minutes,
            start_at: format_local(schedule.start_at),
            finish_at: format_local(schedule.finish_at),
            break_count: schedule.break_count,
            break_total_minutes: schedule.break_total_minutes,
        }
    }
}

fn format_local(value: time::PrimitiveDateTime) -> String {
    use time::macros::format_description;

    value
        .format(format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_request_rejects_duplicate_picks() {
        let movie = Uuid::new_v4();
        let duplicate = VoteRequest {
            top_pick: Some(movie),
            second_pick: Some(movie),
            third_pick: None,
        };
        assert!(duplicate.validate().is_err());

        let distinct = VoteRequest {
            top_pick: Some(movie),
            second_pick: Some(Uuid::new_v4()),
            third_pick: None,
        };
        assert!(distinct.validate().is_ok());

        // Absent picks never collide with each other.
        let empty = VoteRequest {
            top_pick: None,
            second_pick: None,
            third_pick: None,
        };
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn nominations_request_rejects_duplicates() {
        let movie = Uuid::new_v4();
        let duplicate = NominationsRequest {
            movie_ids: vec![movie, movie],
        };
        assert!(duplicate.validate().is_err());

        let empty = NominationsRequest { movie_ids: vec![] };
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn schedule_settings_request_requires_hh_mm() {
        let good = ScheduleSettingsRequest {
            finish_by: "22:15".into(),
        };
        assert!(good.validate().is_ok());

        let bad = ScheduleSettingsRequest {
            finish_by: "late".into(),
        };
        assert!(bad.validate().is_err());
    }
}
