use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::cycle::DailyCycle;

/// Phases a daily cycle moves through.
///
/// The status only ever moves forward; the single way back to
/// [`CycleStatus::WaitingForDecisions`] is an explicit operator reset
/// that deletes and recreates the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    /// Collecting yes/no "will you watch tonight" answers.
    WaitingForDecisions,
    /// Collecting nomination lists from the interested members.
    GatheringNominations,
    /// Collecting ranked votes on the shared pool.
    GatheringVotes,
    /// Winner computed and on display for a short dwell.
    Reveal,
    /// Terminal dashboard for the rest of the day.
    DashboardView,
}

impl CycleStatus {
    /// Initial status of a freshly created cycle.
    pub fn initial() -> Self {
        CycleStatus::WaitingForDecisions
    }

    /// Position in the forward-only progression.
    pub fn rank(self) -> u8 {
        match self {
            CycleStatus::WaitingForDecisions => 0,
            CycleStatus::GatheringNominations => 1,
            CycleStatus::GatheringVotes => 2,
            CycleStatus::Reveal => 3,
            CycleStatus::DashboardView => 4,
        }
    }

    /// Whether the cycle has reached its terminal phase for the day.
    pub fn is_terminal(self) -> bool {
        self == CycleStatus::DashboardView
    }
}

/// Participation thresholds gating the first automatic transition.
#[derive(Debug, Clone, Copy)]
pub struct AdvanceThresholds {
    /// Minimum number of yes decisions before nominations may open.
    pub min_interested: usize,
    /// Minimum number of total decisions (yes and no) before the cycle
    /// may leave the decision phase.
    pub decision_quorum: usize,
}

impl Default for AdvanceThresholds {
    fn default() -> Self {
        Self {
            min_interested: 2,
            decision_quorum: 3,
        }
    }
}

/// Error returned when an explicit status override would move the
/// cycle backwards or nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cycle status cannot move from {from:?} to {to:?}")]
pub struct InvalidAdvance {
    /// Status the cycle currently carries.
    pub from: CycleStatus,
    /// Requested target status.
    pub to: CycleStatus,
}

/// Check that an explicit override moves the cycle strictly forward.
pub fn ensure_forward(from: CycleStatus, to: CycleStatus) -> Result<(), InvalidAdvance> {
    if to.rank() > from.rank() {
        Ok(())
    } else {
        Err(InvalidAdvance { from, to })
    }
}

/// Decide whether an automatic transition is due for the given
/// snapshot.
///
/// Every subscriber runs this against every snapshot it observes and
/// races to apply the same conditional write, so the result must
/// depend only on the snapshot, the configured thresholds and `now`
/// (used solely for the reveal dwell deadline). Quorum without enough
/// interested members keeps the cycle waiting; surfacing that stall is
/// left to an external reset or notification path.
pub fn next_status(
    cycle: &DailyCycle,
    thresholds: &AdvanceThresholds,
    now: SystemTime,
) -> Option<CycleStatus> {
    match cycle.status {
        CycleStatus::WaitingForDecisions => (cycle.decision_count() >= thresholds.decision_quorum
            && cycle.interested_count() >= thresholds.min_interested)
            .then_some(CycleStatus::GatheringNominations),
        CycleStatus::GatheringNominations => (cycle.nominator_count()
            >= cycle.interested_count())
            .then_some(CycleStatus::GatheringVotes),
        CycleStatus::GatheringVotes => {
            (cycle.voter_count() >= cycle.interested_count()).then_some(CycleStatus::Reveal)
        }
        CycleStatus::Reveal => cycle
            .reveal_ends_at
            .is_some_and(|deadline| now >= deadline)
            .then_some(CycleStatus::DashboardView),
        CycleStatus::DashboardView => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::state::cycle::Vote;

    fn cycle() -> DailyCycle {
        DailyCycle::for_tests("2026-08-04")
    }

    fn decide(cycle: &mut DailyCycle, user: &str, interested: bool) {
        cycle.decisions.insert(user.into(), interested);
    }

    #[test]
    fn waits_until_quorum_and_interest() {
        let thresholds = AdvanceThresholds::default();
        let now = SystemTime::UNIX_EPOCH;
        let mut c = cycle();

        assert_eq!(next_status(&c, &thresholds, now), None);

        decide(&mut c, "ana", true);
        decide(&mut c, "ben", true);
        // Two yes answers but only two decisions: below quorum.
        assert_eq!(next_status(&c, &thresholds, now), None);

        decide(&mut c, "caro", false);
        assert_eq!(
            next_status(&c, &thresholds, now),
            Some(CycleStatus::GatheringNominations)
        );
    }

    #[test]
    fn quorum_without_interest_keeps_waiting() {
        let thresholds = AdvanceThresholds::default();
        let now = SystemTime::UNIX_EPOCH;
        let mut c = cycle();

        decide(&mut c, "ana", true);
        decide(&mut c, "ben", false);
        decide(&mut c, "caro", false);
        decide(&mut c, "dan", false);

        assert_eq!(next_status(&c, &thresholds, now), None);
    }

    #[test]
    fn nominations_close_when_every_interested_member_submitted() {
        let thresholds = AdvanceThresholds::default();
        let now = SystemTime::UNIX_EPOCH;
        let mut c = cycle();
        c.status = CycleStatus::GatheringNominations;
        decide(&mut c, "ana", true);
        decide(&mut c, "ben", true);
        decide(&mut c, "caro", false);

        c.nominations.insert("ana".into(), vec![Uuid::new_v4()]);
        assert_eq!(next_status(&c, &thresholds, now), None);

        // An empty list still counts as a submission.
        c.nominations.insert("ben".into(), Vec::new());
        assert_eq!(
            next_status(&c, &thresholds, now),
            Some(CycleStatus::GatheringVotes)
        );
    }

    #[test]
    fn votes_close_when_every_interested_member_voted() {
        let thresholds = AdvanceThresholds::default();
        let now = SystemTime::UNIX_EPOCH;
        let mut c = cycle();
        c.status = CycleStatus::GatheringVotes;
        decide(&mut c, "ana", true);
        decide(&mut c, "ben", true);

        c.votes.insert("ana".into(), Vote::default());
        assert_eq!(next_status(&c, &thresholds, now), None);

        c.votes.insert("ben".into(), Vote::default());
        assert_eq!(next_status(&c, &thresholds, now), Some(CycleStatus::Reveal));
    }

    #[test]
    fn reveal_advances_only_after_the_deadline() {
        let thresholds = AdvanceThresholds::default();
        let deadline = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let mut c = cycle();
        c.status = CycleStatus::Reveal;

        // Without a recorded deadline nothing fires automatically.
        assert_eq!(next_status(&c, &thresholds, deadline), None);

        c.reveal_ends_at = Some(deadline);
        assert_eq!(
            next_status(&c, &thresholds, deadline - Duration::from_secs(1)),
            None
        );
        assert_eq!(
            next_status(&c, &thresholds, deadline),
            Some(CycleStatus::DashboardView)
        );
    }

    #[test]
    fn dashboard_is_terminal() {
        let thresholds = AdvanceThresholds::default();
        let mut c = cycle();
        c.status = CycleStatus::DashboardView;
        decide(&mut c, "ana", true);
        decide(&mut c, "ben", true);
        decide(&mut c, "caro", true);

        assert_eq!(next_status(&c, &thresholds, SystemTime::UNIX_EPOCH), None);
        assert!(CycleStatus::DashboardView.is_terminal());
    }

    #[test]
    fn overrides_must_move_forward() {
        assert!(ensure_forward(CycleStatus::WaitingForDecisions, CycleStatus::Reveal).is_ok());
        assert_eq!(
            ensure_forward(CycleStatus::Reveal, CycleStatus::Reveal),
            Err(InvalidAdvance {
                from: CycleStatus::Reveal,
                to: CycleStatus::Reveal,
            })
        );
        assert!(
            ensure_forward(CycleStatus::DashboardView, CycleStatus::GatheringVotes).is_err()
        );
    }

    #[test]
    fn status_serializes_in_wire_form() {
        let json = serde_json::to_string(&CycleStatus::WaitingForDecisions).unwrap();
        assert_eq!(json, "\"WAITING_FOR_DECISIONS\"");
        let back: CycleStatus = serde_json::from_str("\"DASHBOARD_VIEW\"").unwrap();
        assert_eq!(back, CycleStatus::DashboardView);
    }
}
