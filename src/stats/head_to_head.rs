//! Head-to-head projection between two teams.
//!
//! Every past meeting is reduced to a signed differential in [-1, 1]: how
//! lopsided the score was (`1 - loser / winner`) and, via the sign, whether it
//! went team 1's way. The sample's mean and spread then give:
//!
//! - a projected score split on a 0–100 scale, where the favoured side stays
//!   at 100 and the other side is reduced by the mean differential,
//! - a 95% margin of error on that projection,
//! - P(team 1 wins) from the normal CDF at the standardized mean.
//!
//! No history means no information: 100–100, zero margin, 50%.

use serde::{Deserialize, Serialize};

use super::normal::{margin_of_error, mean, normal_cdf, std_dev};
use crate::db::models::MatchResult;

/// Projection of the next meeting between two teams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Team 1's projected score on a 0–100 display scale
    pub team1_score: f64,
    /// Team 2's projected score on a 0–100 display scale
    pub team2_score: f64,
    /// 95% margin of error, in the same units as the projected scores
    pub margin_of_error: f64,
    /// Probability that team 1 wins (0.0–1.0)
    pub chance: f64,
    /// Mean signed differential of the sample
    pub mean: f64,
    pub standard_deviation: f64,
    /// Number of matches the projection is based on
    pub samples: usize,
}

/// Signed score differential of one match from team 1's point of view.
///
/// Positive only when team 1 outscored its opponent. A tie keeps the negative
/// branch, which is harmless because its magnitude is zero.
pub fn signed_differential(m: &MatchResult, team1_id: i64) -> f64 {
    let (own, other) = if m.challenging_team_id == team1_id {
        (m.challenging_team_score, m.challenged_team_score)
    } else {
        (m.challenged_team_score, m.challenging_team_score)
    };

    let winner = own.max(other) as f64;
    let loser = own.min(other) as f64;
    let ratio = if winner == 0.0 { 1.0 } else { loser / winner };
    let magnitude = 1.0 - ratio;

    if own > other { magnitude } else { -magnitude }
}

/// Project the next match between `team1_id` and `team2_id` from their history.
///
/// Every match is expected to involve both teams; that is not checked in
/// release builds.
pub fn project(matches: &[MatchResult], team1_id: i64, team2_id: i64) -> Projection {
    debug_assert!(
        matches.iter().all(|m| {
            (m.challenging_team_id == team1_id && m.challenged_team_id == team2_id)
                || (m.challenging_team_id == team2_id && m.challenged_team_id == team1_id)
        }),
        "head-to-head sample contains a match not between {} and {}",
        team1_id,
        team2_id
    );

    let diffs: Vec<f64> = matches
        .iter()
        .map(|m| signed_differential(m, team1_id))
        .collect();
    let n = diffs.len();
    let mean = mean(&diffs);
    let sd = std_dev(&diffs);

    let team1_score = if mean >= 0.0 { 100.0 } else { 100.0 + mean * 100.0 };
    let team2_score = if mean <= 0.0 { 100.0 } else { 100.0 - mean * 100.0 };

    Projection {
        team1_score,
        team2_score,
        margin_of_error: margin_of_error(sd, n) * 100.0,
        chance: win_chance(mean, sd, n),
        mean,
        standard_deviation: sd,
        samples: n,
    }
}

fn win_chance(mean: f64, sd: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.5;
    }
    if sd == 0.0 {
        // Every sample identical: the normal collapses to a step.
        return if mean > 0.0 {
            1.0
        } else if mean < 0.0 {
            0.0
        } else {
            0.5
        };
    }
    normal_cdf(mean / sd)
}
