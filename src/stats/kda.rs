use serde::{Deserialize, Serialize};

use crate::db::models::PlayerTotals;

/// (Kills + Assists) / Deaths, with deaths floored at 1 so a deathless
/// player rates as their raw kill+assist count.
pub fn kda(kills: u32, assists: u32, deaths: u32) -> f64 {
    (kills as f64 + assists as f64) / deaths.max(1) as f64
}

/// One row of the KDA leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdaEntry {
    pub rank: usize,
    pub player_id: i64,
    pub name: String,
    pub games: u32,
    pub kills: u32,
    pub assists: u32,
    pub deaths: u32,
    pub kda: f64,
    pub damage_per_game: f64,
}

/// Rank players by KDA, dropping anyone with fewer than `min_games` games.
/// Ties on KDA go to the player with more games, then by name.
pub fn leaderboard(totals: &[PlayerTotals], min_games: u32) -> Vec<KdaEntry> {
    let mut entries: Vec<KdaEntry> = totals
        .iter()
        .filter(|t| t.games > 0 && t.games >= min_games)
        .map(|t| KdaEntry {
            rank: 0,
            player_id: t.player_id,
            name: t.name.clone(),
            games: t.games,
            kills: t.kills,
            assists: t.assists,
            deaths: t.deaths,
            kda: kda(t.kills, t.assists, t.deaths),
            damage_per_game: t.damage / t.games as f64,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.kda
            .total_cmp(&a.kda)
            .then_with(|| b.games.cmp(&a.games))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    for (i, e) in entries.iter_mut().enumerate() {
        e.rank = i + 1;
    }
    entries
}
