use crate::models::{Nomination, Vote};
use crate::tally::VoteCount;
use std::collections::{BTreeMap, BTreeSet};

// Distinct set of collaborator ids nominated in one event. BTreeSet keeps
// later iteration deterministic regardless of nomination order.
pub fn nominee_pool(nominations: &[Nomination]) -> BTreeSet<String> {
    nominations
        .iter()
        .map(|n| n.collaborator_id.clone())
        .collect()
}

// Count one vote per selected id per ballot. Ids outside the nominee pool
// are ignored rather than counted. Every pool member gets an entry, even
// at zero.
pub fn vote_counts(pool: &BTreeSet<String>, votes: &[Vote]) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> = pool.iter().map(|id| (id.clone(), 0)).collect();

    for vote in votes {
        for id in &vote.voted_for {
            if let Some(count) = counts.get_mut(id) {
                *count += 1;
            }
        }
    }

    counts
}

// Fallback tally when nobody voted: how many times each pool member was
// nominated.
pub fn nomination_counts(
    pool: &BTreeSet<String>,
    nominations: &[Nomination],
) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> = pool.iter().map(|id| (id.clone(), 0)).collect();

    for nomination in nominations {
        if let Some(count) = counts.get_mut(&nomination.collaborator_id) {
            *count += 1;
        }
    }

    counts
}

// Winner of a closed event: highest vote count, falling back to nomination
// counts when no vote selected anyone in the pool. Ties go to the lowest
// collaborator id, so the result does not depend on input order.
pub fn event_winner(nominations: &[Nomination], votes: &[Vote]) -> Option<String> {
    let pool = nominee_pool(nominations);
    if pool.is_empty() {
        return None;
    }

    let counts = vote_counts(&pool, votes);
    if counts.values().sum::<u64>() > 0 {
        return max_by_count(&counts);
    }

    max_by_count(&nomination_counts(&pool, nominations))
}

// First maximum in ascending-id order, i.e. lowest id among tied counts.
fn max_by_count(counts: &BTreeMap<String, u64>) -> Option<String> {
    let mut best: Option<(&String, u64)> = None;
    for (id, &count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((id, count)),
        }
    }
    best.map(|(id, _)| id.clone())
}

// Full ranking for display: descending count, ties in ascending id order,
// 1-based ranks.
pub fn ranked_counts(counts: &BTreeMap<String, u64>) -> Vec<VoteCount> {
    let mut sorted: Vec<(String, u64)> = counts
        .iter()
        .map(|(id, &count)| (id.clone(), count))
        .collect();
    // Already ascending by id; a stable sort on count keeps that order
    // within ties.
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    sorted
        .into_iter()
        .enumerate()
        .map(|(i, (collaborator_id, count))| VoteCount {
            collaborator_id,
            count,
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Nomination, Vote};

    fn nomination(collaborator: &str) -> Nomination {
        Nomination::new("event-1".into(), collaborator.into(), "supervisor-1".into())
    }

    fn ballot(voter: &str, picks: &[&str]) -> Vote {
        Vote::new(
            "event-1".into(),
            voter.into(),
            picks.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn pool_deduplicates_collaborators() {
        let nominations = vec![nomination("a"), nomination("b"), nomination("a")];
        let pool = nominee_pool(&nominations);
        assert_eq!(pool.len(), 2);
        assert!(pool.contains("a") && pool.contains("b"));
    }

    #[test]
    fn counts_every_selection_in_pool() {
        let nominations = vec![nomination("a"), nomination("b"), nomination("c")];
        let pool = nominee_pool(&nominations);
        let votes = vec![
            ballot("v1", &["a", "b"]),
            ballot("v2", &["a", "c"]),
            ballot("v3", &["b"]),
        ];
        let counts = vote_counts(&pool, &votes);
        assert_eq!(counts["a"], 2);
        assert_eq!(counts["b"], 2);
        assert_eq!(counts["c"], 1);
    }

    #[test]
    fn ids_outside_pool_are_ignored() {
        let nominations = vec![nomination("a"), nomination("b")];
        let pool = nominee_pool(&nominations);
        let counts = vote_counts(&pool, &[ballot("v1", &["a", "z"])]);
        assert_eq!(counts["a"], 1);
        assert_eq!(counts["b"], 0);
        assert!(!counts.contains_key("z"));
    }

    #[test]
    fn tie_breaks_to_lowest_id() {
        let nominations = vec![nomination("a"), nomination("b"), nomination("c")];
        let votes = vec![
            ballot("v1", &["a", "b"]),
            ballot("v2", &["a", "c"]),
            ballot("v3", &["b"]),
        ];
        // a and b tie at 2; lowest id wins.
        assert_eq!(event_winner(&nominations, &votes), Some("a".into()));
    }

    #[test]
    fn no_votes_falls_back_to_nomination_counts() {
        let nominations = vec![
            nomination("a"),
            nomination("a"),
            nomination("a"),
            nomination("b"),
        ];
        assert_eq!(event_winner(&nominations, &[]), Some("a".into()));
    }

    #[test]
    fn votes_for_strangers_only_also_fall_back() {
        let nominations = vec![nomination("b"), nomination("a")];
        let votes = vec![ballot("v1", &["z"])];
        // Nomination counts tie 1-1; lowest id wins.
        assert_eq!(event_winner(&nominations, &votes), Some("a".into()));
    }

    #[test]
    fn empty_pool_has_no_winner() {
        assert_eq!(event_winner(&[], &[ballot("v1", &["a"])]), None);
    }

    #[test]
    fn ranking_is_descending_with_one_based_ranks() {
        let nominations = vec![nomination("a"), nomination("b"), nomination("c")];
        let pool = nominee_pool(&nominations);
        let votes = vec![ballot("v1", &["b", "c"]), ballot("v2", &["b"])];
        let ranked = ranked_counts(&vote_counts(&pool, &votes));
        assert_eq!(ranked[0].collaborator_id, "b");
        assert_eq!(ranked[0].count, 2);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].collaborator_id, "c");
        assert_eq!(ranked[2].collaborator_id, "a");
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn tally_is_idempotent() {
        let nominations = vec![nomination("a"), nomination("b")];
        let votes = vec![ballot("v1", &["a"]), ballot("v2", &["b"]), ballot("v3", &["a"])];
        let first = event_winner(&nominations, &votes);
        let second = event_winner(&nominations, &votes);
        assert_eq!(first, second);
        assert_eq!(first, Some("a".into()));
    }
}
