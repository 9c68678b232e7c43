//! Random demo league for local development.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::db::models::{Match, Player, PlayerStat, Team};
use crate::db::Database;

const TEAM_WORDS: [&str; 16] = [
    "Juggernaut", "Vanguard", "Overclocked", "Pyro", "Phoenix", "Mercury", "Vortex", "Flare",
    "Helix", "Smart", "Fusion", "Omega", "Cyclone", "Thunder", "Plasma", "Reactor",
];
const TEAM_SUFFIXES: [&str; 6] = ["Squadron", "Collective", "Legion", "Syndicate", "Crew", "Unit"];
const MAPS: [&str; 8] = [
    "Vault", "Abyss", "Foundry", "Cistern", "Wreckage", "Ascent", "Backfire", "Lunar Outpost",
];
/// Kill limit of a standard league game.
const KILL_LIMIT: i32 = 20;

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub teams: usize,
    pub players_per_team: usize,
    pub seasons: i32,
    pub matches_per_season: usize,
    /// Share of each season's matches that are postseason (0.0–1.0)
    pub postseason_fraction: f64,
    /// Fixed RNG seed for reproducible data
    pub seed: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            teams: 8,
            players_per_team: 5,
            seasons: 2,
            matches_per_season: 40,
            postseason_fraction: 0.15,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub teams: usize,
    pub players: usize,
    pub matches: usize,
}

struct Roster {
    team_id: i64,
    player_ids: Vec<i64>,
}

/// Fill an empty `db` with a generated league.
pub fn seed(db: &Database, opts: &SeedOptions) -> Result<SeedSummary> {
    let existing = db.list_teams()?.len();
    if existing > 0 {
        bail!(
            "database already holds {} team(s); seed needs an empty database",
            existing
        );
    }

    let mut rng = match opts.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let mut summary = SeedSummary::default();

    let mut rosters = Vec::with_capacity(opts.teams);
    for (i, name) in team_names(&mut rng, opts.teams).into_iter().enumerate() {
        let initials: String = name
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .collect::<String>()
            .to_uppercase();
        let tag = format!("{}{}", initials, i + 1);
        let team_id = db
            .insert_team(&Team::new(&name, &tag))
            .with_context(|| format!("failed to insert team {}", name))?;
        summary.teams += 1;

        let mut player_ids = Vec::with_capacity(opts.players_per_team);
        for p in 0..opts.players_per_team {
            player_ids.push(db.insert_player(&Player {
                id: None,
                name: format!("{}_{}", tag.to_lowercase(), p + 1),
            })?);
            summary.players += 1;
        }
        rosters.push(Roster { team_id, player_ids });
    }

    if rosters.len() < 2 {
        info!("Seeded {} team(s); not enough for matches", rosters.len());
        return Ok(summary);
    }

    for season in 1..=opts.seasons {
        let start = season_start(season)?;
        let postseason_from =
            ((opts.matches_per_season as f64) * (1.0 - opts.postseason_fraction)).round() as usize;
        for n in 0..opts.matches_per_season {
            let pair: Vec<&Roster> = rosters.choose_multiple(&mut rng, 2).collect();
            let (home, away) = (pair[0], pair[1]);
            let max_size = home.player_ids.len().min(away.player_ids.len()).clamp(2, 4) as i32;
            let team_size = rng.gen_range(2..=max_size);
            let (home_score, away_score) = random_score(&mut rng);

            let m = Match {
                id: None,
                season,
                postseason: n >= postseason_from,
                team_size,
                challenging_team_id: home.team_id,
                challenged_team_id: away.team_id,
                challenging_team_score: home_score,
                challenged_team_score: away_score,
                map: MAPS.choose(&mut rng).map(|m| m.to_string()),
                played_at: start + Duration::hours(n as i64 * 30),
            };
            let match_id = db.insert_match(&m)?;
            summary.matches += 1;

            let sides = [(home, home_score, away_score), (away, away_score, home_score)];
            for (side, kills, deaths) in sides {
                insert_side_stats(db, &mut rng, match_id, side, team_size as usize, kills, deaths)?;
            }
        }
        debug!("Seeded season {}", season);
    }

    info!(
        "Seeded {} teams, {} players, {} matches",
        summary.teams, summary.players, summary.matches
    );
    Ok(summary)
}

fn team_names(rng: &mut StdRng, count: usize) -> Vec<String> {
    let mut words: Vec<&str> = TEAM_WORDS.to_vec();
    words.shuffle(rng);
    (0..count)
        .map(|i| {
            let word = words[i % words.len()];
            let suffix = TEAM_SUFFIXES[rng.gen_range(0..TEAM_SUFFIXES.len())];
            if i < words.len() {
                format!("{} {}", word, suffix)
            } else {
                format!("{} {} {}", word, suffix, i / words.len() + 1)
            }
        })
        .collect()
}

/// Winner usually reaches the kill limit; a few games end on time.
fn random_score(rng: &mut StdRng) -> (i32, i32) {
    if rng.gen_bool(0.05) {
        let s = rng.gen_range(5..KILL_LIMIT);
        return (s, s);
    }
    let winner = if rng.gen_bool(0.85) {
        KILL_LIMIT
    } else {
        rng.gen_range(8..KILL_LIMIT)
    };
    let loser = rng.gen_range(0..winner);
    if rng.gen_bool(0.5) {
        (winner, loser)
    } else {
        (loser, winner)
    }
}

/// Spread a team's kills and deaths over the players who took part.
fn insert_side_stats(
    db: &Database,
    rng: &mut StdRng,
    match_id: i64,
    side: &Roster,
    team_size: usize,
    kills: i32,
    deaths: i32,
) -> Result<()> {
    let lineup: Vec<i64> = side
        .player_ids
        .choose_multiple(rng, team_size)
        .copied()
        .collect();
    if lineup.is_empty() {
        return Ok(());
    }
    let mut lines = vec![(0u32, 0u32); lineup.len()];
    for _ in 0..kills.max(0) {
        lines[rng.gen_range(0..lineup.len())].0 += 1;
    }
    for _ in 0..deaths.max(0) {
        lines[rng.gen_range(0..lineup.len())].1 += 1;
    }
    for (player_id, (k, d)) in lineup.into_iter().zip(lines) {
        let assists = rng.gen_range(0..=k);
        db.insert_player_stat(&PlayerStat {
            match_id,
            player_id,
            team_id: side.team_id,
            kills: k,
            assists,
            deaths: d,
            damage: (k as f64 * rng.gen_range(90.0..140.0) + rng.gen_range(50.0..200.0)).round(),
        })?;
    }
    Ok(())
}

fn season_start(season: i32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2019 + season, 1, 6, 20, 0, 0)
        .single()
        .with_context(|| format!("invalid start date for season {}", season))
}
