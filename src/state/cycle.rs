use std::time::SystemTime;

use indexmap::IndexMap;
use thiserror::Error;
use time::{
    OffsetDateTime, Time,
    format_description::BorrowedFormatItem,
    macros::format_description,
};
use uuid::Uuid;

use crate::dao::models::{
    CycleEntity, ScheduleSettingsEntity, VoteEntity, WinnerEntity,
};
use crate::state::state_machine::CycleStatus;

const DATE_KEY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");
const CLOCK_TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Parse a 24h `HH:MM` wall-clock time.
pub fn parse_clock_time(value: &str) -> Result<Time, time::error::Parse> {
    Time::parse(value, CLOCK_TIME_FORMAT)
}

/// Render a wall-clock time back to its `HH:MM` wire form.
pub fn format_clock_time(value: Time) -> String {
    value
        .format(CLOCK_TIME_FORMAT)
        .unwrap_or_else(|_| "00:00".into())
}

/// Compute the cycle date key for `now`.
///
/// A night regularly runs past midnight, so times before
/// `day_boundary_hour` still belong to the previous day's cycle.
pub fn cycle_date_key(now: OffsetDateTime, day_boundary_hour: u8) -> String {
    let date = if now.hour() < day_boundary_hour {
        now.date().previous_day().unwrap_or_else(|| now.date())
    } else {
        now.date()
    };
    date.format(DATE_KEY_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Ranked picks submitted by a single participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vote {
    /// First choice.
    pub top_pick: Option<Uuid>,
    /// Second choice.
    pub second_pick: Option<Uuid>,
    /// Third choice.
    pub third_pick: Option<Uuid>,
}

/// Winning movie reference with its final tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinningMovie {
    /// Identifier of the winning movie in the shared pool.
    pub movie_id: Uuid,
    /// Final score after ranked points and any underdog bonus.
    pub score: u32,
}

/// Per-cycle scheduling preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Target finish time for the night.
    pub finish_by: Time,
}

/// Runtime view of one day's cycle document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCycle {
    /// Date key in `YYYY-MM-DD` form.
    pub id: String,
    /// Phase the cycle is currently in.
    pub status: CycleStatus,
    /// Per-user yes/no answers.
    pub decisions: IndexMap<String, bool>,
    /// Per-user nomination lists.
    pub nominations: IndexMap<String, Vec<Uuid>>,
    /// Per-user ranked picks.
    pub votes: IndexMap<String, Vote>,
    /// Winner, once revealed.
    pub winning_movie: Option<WinningMovie>,
    /// Scheduling preferences.
    pub schedule_settings: ScheduleSettings,
    /// Deadline for leaving the reveal phase.
    pub reveal_ends_at: Option<SystemTime>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl DailyCycle {
    /// Members who answered yes.
    pub fn interested_count(&self) -> usize {
        self.decisions.values().filter(|yes| **yes).count()
    }

    /// Members who answered at all.
    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }

    /// Members who submitted a nomination list, empty lists included.
    pub fn nominator_count(&self) -> usize {
        self.nominations.len()
    }

    /// Members who submitted a vote.
    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    #[cfg(test)]
    pub(crate) fn for_tests(id: &str) -> Self {
        Self {
            id: id.into(),
            status: CycleStatus::initial(),
            decisions: IndexMap::new(),
            nominations: IndexMap::new(),
            votes: IndexMap::new(),
            winning_movie: None,
            schedule_settings: ScheduleSettings {
                finish_by: Time::from_hms(21, 30, 0).unwrap(),
            },
            reveal_ends_at: None,
            created_at: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Error raised when a persisted cycle document cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleDataError {
    /// The stored finish-by time is not a valid `HH:MM` value.
    #[error("cycle `{id}` carries an invalid finish-by time `{value}`")]
    InvalidFinishBy {
        /// Cycle the bad value was read from.
        id: String,
        /// The offending raw value.
        value: String,
    },
}

impl TryFrom<CycleEntity> for DailyCycle {
    type Error = CycleDataError;

    fn try_from(value: CycleEntity) -> Result<Self, Self::Error> {
        let finish_by = parse_clock_time(&value.schedule_settings.finish_by).map_err(|_| {
            CycleDataError::InvalidFinishBy {
                id: value.id.clone(),
                value: value.schedule_settings.finish_by.clone(),
            }
        })?;

        Ok(Self {
            id: value.id,
            status: value.current_status,
            decisions: value.decisions,
            nominations: value.nominations,
            votes: value.votes.into_iter().map(|(k, v)| (k, v.into())).collect(),
            winning_movie: value.winning_movie.map(Into::into),
            schedule_settings: ScheduleSettings { finish_by },
            reveal_ends_at: value.reveal_ends_at,
            created_at: value.created_at,
        })
    }
}

impl From<DailyCycle> for CycleEntity {
    fn from(value: DailyCycle) -> Self {
        Self {
            id: value.id,
            current_status: value.status,
            decisions: value.decisions,
            nominations: value.nominations,
            votes: value.votes.into_iter().map(|(k, v)| (k, v.into())).collect(),
            winning_movie: value.winning_movie.map(Into::into),
            schedule_settings: ScheduleSettingsEntity {
                finish_by: format_clock_time(value.schedule_settings.finish_by),
            },
            reveal_ends_at: value.reveal_ends_at,
            created_at: value.created_at,
        }
    }
}

impl From<VoteEntity> for Vote {
    fn from(value: VoteEntity) -> Self {
        Self {
            top_pick: value.top_pick,
            second_pick: value.second_pick,
            third_pick: value.third_pick,
        }
    }
}

impl From<Vote> for VoteEntity {
    fn from(value: Vote) -> Self {
        Self {
            top_pick: value.top_pick,
            second_pick: value.second_pick,
            third_pick: value.third_pick,
        }
    }
}

impl From<WinnerEntity> for WinningMovie {
    fn from(value: WinnerEntity) -> Self {
        Self {
            movie_id: value.movie_id,
            score: value.score,
        }
    }
}

impl From<WinningMovie> for WinnerEntity {
    fn from(value: WinningMovie) -> Self {
        Self {
            movie_id: value.movie_id,
            score: value.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn date_key_uses_previous_day_before_the_boundary() {
        assert_eq!(cycle_date_key(datetime!(2026-08-04 03:59 UTC), 4), "2026-08-03");
        assert_eq!(cycle_date_key(datetime!(2026-08-04 04:00 UTC), 4), "2026-08-04");
        assert_eq!(cycle_date_key(datetime!(2026-08-04 23:15 UTC), 4), "2026-08-04");
    }

    #[test]
    fn date_key_boundary_crosses_months_and_years() {
        assert_eq!(cycle_date_key(datetime!(2026-08-01 01:00 UTC), 4), "2026-07-31");
        assert_eq!(cycle_date_key(datetime!(2026-01-01 00:30 UTC), 4), "2025-12-31");
    }

    #[test]
    fn clock_time_round_trips() {
        let parsed = parse_clock_time("03:30").unwrap();
        assert_eq!(parsed, Time::from_hms(3, 30, 0).unwrap());
        assert_eq!(format_clock_time(parsed), "03:30");
        assert!(parse_clock_time("24:00").is_err());
        assert!(parse_clock_time("9:30").is_err());
    }

    #[test]
    fn counts_reflect_participation() {
        let mut cycle = DailyCycle::for_tests("2026-08-04");
        cycle.decisions.insert("ana".into(), true);
        cycle.decisions.insert("ben".into(), false);
        cycle.decisions.insert("caro".into(), true);
        cycle.nominations.insert("ana".into(), Vec::new());
        cycle.votes.insert("caro".into(), Vote::default());

        assert_eq!(cycle.interested_count(), 2);
        assert_eq!(cycle.decision_count(), 3);
        assert_eq!(cycle.nominator_count(), 1);
        assert_eq!(cycle.voter_count(), 1);
    }

    #[test]
    fn entity_with_bad_finish_by_is_rejected() {
        let mut entity: CycleEntity = DailyCycle::for_tests("2026-08-04").into();
        entity.schedule_settings.finish_by = "late".into();

        let err = DailyCycle::try_from(entity).unwrap_err();
        assert_eq!(
            err,
            CycleDataError::InvalidFinishBy {
                id: "2026-08-04".into(),
                value: "late".into(),
            }
        );
    }

    #[test]
    fn entity_round_trip_preserves_fields() {
        let mut cycle = DailyCycle::for_tests("2026-08-04");
        cycle.decisions.insert("ana".into(), true);
        cycle.nominations.insert("ana".into(), vec![Uuid::new_v4()]);
        cycle.votes.insert(
            "ana".into(),
            Vote {
                top_pick: Some(Uuid::new_v4()),
                ..Vote::default()
            },
        );

        let entity: CycleEntity = cycle.clone().into();
        let back = DailyCycle::try_from(entity).unwrap();
        assert_eq!(back, cycle);
    }
}
