//! Ranked-choice winner calculation.
//!
//! Pure and deterministic: the same nominations, votes and candidate
//! facts always produce the same winner, independent of map iteration
//! order, so every participant racing to apply the reveal transition
//! computes an identical result.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::state::cycle::{Vote, WinningMovie};

const TOP_PICK_POINTS: u32 = 3;
const SECOND_PICK_POINTS: u32 = 2;
const THIRD_PICK_POINTS: u32 = 1;

/// Additive bonus for frequently passed-over movies.
#[derive(Debug, Clone, Copy)]
pub struct UnderdogBoost {
    /// Nomination streak at which the bonus kicks in.
    pub streak_threshold: u32,
    /// Extra points per vote slot naming the movie.
    pub bonus_per_vote: u32,
}

impl Default for UnderdogBoost {
    fn default() -> Self {
        Self {
            streak_threshold: 5,
            bonus_per_vote: 1,
        }
    }
}

/// What the tally needs to know about one candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateFacts {
    /// Runtime in minutes, when the movie resolves in the shared pool.
    pub runtime_minutes: Option<u32>,
    /// Current nomination streak.
    pub nomination_streak: u32,
}

/// Compute the winning movie for a cycle.
///
/// Candidates are the union of every nomination list. Votes award
/// 3/2/1 points for top/second/third picks; picks naming a movie
/// outside the candidate set contribute nothing. Candidates whose
/// streak reached the boost threshold gain `bonus_per_vote` extra
/// points per vote slot that named them. Ties break towards the
/// shorter runtime, candidates without a resolvable runtime rank after
/// every resolvable one, and an exact tie falls back to ascending
/// movie id so the result stays stable.
///
/// Returns `None` when nobody nominated anything.
pub fn calculate_winner(
    nominations: &IndexMap<String, Vec<Uuid>>,
    votes: &IndexMap<String, Vote>,
    facts: &HashMap<Uuid, CandidateFacts>,
    boost: UnderdogBoost,
) -> Option<WinningMovie> {
    let candidates: BTreeSet<Uuid> = nominations.values().flatten().copied().collect();
    if candidates.is_empty() {
        return None;
    }

    let mut scores: HashMap<Uuid, u32> = candidates.iter().map(|id| (*id, 0)).collect();
    let mut slots_received: HashMap<Uuid, u32> = HashMap::new();

    for vote in votes.values() {
        let weighted = [
            (vote.top_pick, TOP_PICK_POINTS),
            (vote.second_pick, SECOND_PICK_POINTS),
            (vote.third_pick, THIRD_PICK_POINTS),
        ];
        for (pick, points) in weighted {
            let Some(movie_id) = pick else { continue };
            let Some(score) = scores.get_mut(&movie_id) else {
                continue;
            };
            *score += points;
            *slots_received.entry(movie_id).or_default() += 1;
        }
    }

    for movie_id in &candidates {
        let streak = facts
            .get(movie_id)
            .map(|facts| facts.nomination_streak)
            .unwrap_or_default();
        if streak < boost.streak_threshold {
            continue;
        }
        if let (Some(score), Some(received)) =
            (scores.get_mut(movie_id), slots_received.get(movie_id))
        {
            *score += received * boost.bonus_per_vote;
        }
    }

    let runtime = |id: &Uuid| facts.get(id).and_then(|facts| facts.runtime_minutes);
    let mut ranked: Vec<Uuid> = candidates.into_iter().collect();
    ranked.sort_by(|a, b| {
        scores[b]
            .cmp(&scores[a])
            .then_with(|| compare_runtimes(runtime(a), runtime(b)))
            .then_with(|| a.cmp(b))
    });

    let winner = *ranked.first()?;
    Some(WinningMovie {
        movie_id: winner,
        score: scores[&winner],
    })
}

/// Shorter runtimes rank first; a candidate without a resolvable
/// runtime ranks after every resolvable one.
fn compare_runtimes(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominate(entries: &[(&str, &[Uuid])]) -> IndexMap<String, Vec<Uuid>> {
        entries
            .iter()
            .map(|(user, movies)| (user.to_string(), movies.to_vec()))
            .collect()
    }

    fn facts_for(entries: &[(Uuid, Option<u32>, u32)]) -> HashMap<Uuid, CandidateFacts> {
        entries
            .iter()
            .map(|(id, runtime_minutes, nomination_streak)| {
                (
                    *id,
                    CandidateFacts {
                        runtime_minutes: *runtime_minutes,
                        nomination_streak: *nomination_streak,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn no_nominations_means_no_winner() {
        let winner = calculate_winner(
            &IndexMap::new(),
            &IndexMap::new(),
            &HashMap::new(),
            UnderdogBoost::default(),
        );
        assert_eq!(winner, None);
    }

    #[test]
    fn unanimous_votes_stack_all_three_slots() {
        let movie = Uuid::new_v4();
        let nominations = nominate(&[("ana", &[movie])]);
        let vote = Vote {
            top_pick: Some(movie),
            second_pick: Some(movie),
            third_pick: Some(movie),
        };
        let votes: IndexMap<String, Vote> =
            [("ana".to_string(), vote), ("ben".to_string(), vote)]
                .into_iter()
                .collect();

        let winner = calculate_winner(
            &nominations,
            &votes,
            &facts_for(&[(movie, Some(120), 0)]),
            UnderdogBoost::default(),
        )
        .unwrap();

        assert_eq!(winner.movie_id, movie);
        assert_eq!(winner.score, 12);
    }

    #[test]
    fn score_tie_breaks_on_shorter_runtime() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let nominations = nominate(&[("ana", &[a]), ("ben", &[b])]);
        let votes: IndexMap<String, Vote> = [
            (
                "u1".to_string(),
                Vote {
                    top_pick: Some(a),
                    second_pick: Some(b),
                    third_pick: None,
                },
            ),
            (
                "u2".to_string(),
                Vote {
                    top_pick: Some(b),
                    second_pick: Some(a),
                    third_pick: None,
                },
            ),
        ]
        .into_iter()
        .collect();
        let facts = facts_for(&[(a, Some(90), 0), (b, Some(120), 0)]);

        let winner =
            calculate_winner(&nominations, &votes, &facts, UnderdogBoost::default()).unwrap();

        // Both sit at 5 points; the 90-minute movie wins.
        assert_eq!(winner.movie_id, a);
        assert_eq!(winner.score, 5);
    }

    #[test]
    fn streak_threshold_adds_one_point_per_received_slot() {
        let movie = Uuid::new_v4();
        let nominations = nominate(&[("ana", &[movie])]);
        let votes: IndexMap<String, Vote> = [(
            "ben".to_string(),
            Vote {
                top_pick: Some(movie),
                second_pick: None,
                third_pick: None,
            },
        )]
        .into_iter()
        .collect();

        let boosted = calculate_winner(
            &nominations,
            &votes,
            &facts_for(&[(movie, Some(100), 5)]),
            UnderdogBoost::default(),
        )
        .unwrap();
        assert_eq!(boosted.score, 4);

        let plain = calculate_winner(
            &nominations,
            &votes,
            &facts_for(&[(movie, Some(100), 4)]),
            UnderdogBoost::default(),
        )
        .unwrap();
        assert_eq!(plain.score, 3);
    }

    #[test]
    fn boosted_underdog_overtakes_higher_raw_score() {
        let favourite = Uuid::new_v4();
        let underdog = Uuid::new_v4();
        let nominations = nominate(&[("ana", &[favourite]), ("ben", &[underdog])]);
        let votes: IndexMap<String, Vote> = [
            (
                "u1".to_string(),
                Vote {
                    top_pick: Some(favourite),
                    second_pick: Some(underdog),
                    third_pick: None,
                },
            ),
            (
                "u2".to_string(),
                Vote {
                    top_pick: Some(favourite),
                    second_pick: None,
                    third_pick: None,
                },
            ),
            (
                "u3".to_string(),
                Vote {
                    top_pick: Some(underdog),
                    second_pick: None,
                    third_pick: None,
                },
            ),
        ]
        .into_iter()
        .collect();

        let facts = facts_for(&[(favourite, Some(100), 0), (underdog, Some(100), 6)]);
        let winner =
            calculate_winner(&nominations, &votes, &facts, UnderdogBoost::default()).unwrap();

        // favourite raw 6; underdog raw 5 plus 2 boosted slots = 7.
        assert_eq!(winner.movie_id, underdog);
        assert_eq!(winner.score, 7);
    }

    #[test]
    fn vote_map_order_does_not_change_the_result() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let nominations = nominate(&[("ana", &[a, b])]);
        let vote_entries = [
            (
                "u1".to_string(),
                Vote {
                    top_pick: Some(a),
                    second_pick: Some(b),
                    third_pick: None,
                },
            ),
            (
                "u2".to_string(),
                Vote {
                    top_pick: Some(b),
                    second_pick: None,
                    third_pick: Some(a),
                },
            ),
        ];
        let facts = facts_for(&[(a, Some(95), 0), (b, Some(110), 0)]);

        let forward: IndexMap<String, Vote> = vote_entries.iter().cloned().collect();
        let reversed: IndexMap<String, Vote> = vote_entries.iter().rev().cloned().collect();

        assert_eq!(
            calculate_winner(&nominations, &forward, &facts, UnderdogBoost::default()),
            calculate_winner(&nominations, &reversed, &facts, UnderdogBoost::default()),
        );
    }

    #[test]
    fn exact_tie_is_stable_by_ascending_id() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let [low, high] = ids;
        let nominations = nominate(&[("ana", &[high, low])]);
        let facts = facts_for(&[(low, Some(100), 0), (high, Some(100), 0)]);

        let winner = calculate_winner(
            &nominations,
            &IndexMap::new(),
            &facts,
            UnderdogBoost::default(),
        )
        .unwrap();

        assert_eq!(winner.movie_id, low);
        assert_eq!(winner.score, 0);
    }

    #[test]
    fn unresolvable_runtime_ranks_after_resolvable() {
        let resolvable = Uuid::new_v4();
        let phantom = Uuid::new_v4();
        let nominations = nominate(&[("ana", &[phantom, resolvable])]);
        // Only the resolvable movie has facts; both sit at zero points.
        let facts = facts_for(&[(resolvable, Some(130), 0)]);

        let winner = calculate_winner(
            &nominations,
            &IndexMap::new(),
            &facts,
            UnderdogBoost::default(),
        )
        .unwrap();

        assert_eq!(winner.movie_id, resolvable);
    }

    #[test]
    fn picks_outside_the_candidate_set_are_ignored() {
        let candidate = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let nominations = nominate(&[("ana", &[candidate])]);
        let votes: IndexMap<String, Vote> = [(
            "ben".to_string(),
            Vote {
                top_pick: Some(stranger),
                second_pick: Some(candidate),
                third_pick: None,
            },
        )]
        .into_iter()
        .collect();

        let winner = calculate_winner(
            &nominations,
            &votes,
            &facts_for(&[(candidate, Some(100), 0)]),
            UnderdogBoost::default(),
        )
        .unwrap();

        assert_eq!(winner.movie_id, candidate);
        assert_eq!(winner.score, 2);
    }
}
