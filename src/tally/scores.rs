use crate::models::SurveyEvaluation;
use crate::tally::Standing;
use std::collections::BTreeSet;

// Mean of one evaluation's answers. None for an empty answer list.
fn evaluation_mean(scores: &[u8]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: u32 = scores.iter().map(|&s| s as u32).sum();
    Some(sum as f64 / scores.len() as f64)
}

// A nominee's standing score: mean of their per-evaluation means, rescaled
// from the 1-10 survey scale onto 0-100 for display. None until at least
// one evaluation exists; the placeholder shown in that case is the
// caller's business.
pub fn standing_score(nominee_id: &str, evaluations: &[SurveyEvaluation]) -> Option<u8> {
    let means: Vec<f64> = evaluations
        .iter()
        .filter(|e| e.evaluated_user_id == nominee_id)
        .filter_map(|e| evaluation_mean(&e.scores))
        .collect();

    if means.is_empty() {
        return None;
    }

    let mean_of_means = means.iter().sum::<f64>() / means.len() as f64;
    Some((mean_of_means / 10.0 * 100.0).round() as u8)
}

// Real-time standings for an active event: pool members sorted by standing
// score descending, unevaluated nominees after all scored ones. The sort is
// stable, so equal scores keep ascending-id order. Positions are 1-based.
pub fn rank_standings(
    pool: &BTreeSet<String>,
    evaluations: &[SurveyEvaluation],
) -> Vec<Standing> {
    let mut standings: Vec<Standing> = pool
        .iter()
        .map(|id| Standing {
            collaborator_id: id.clone(),
            score: standing_score(id, evaluations),
            position: 0,
        })
        .collect();

    standings.sort_by(|a, b| b.score.cmp(&a.score));

    for (i, standing) in standings.iter_mut().enumerate() {
        standing.position = i + 1;
    }

    standings
}
