//! Standings: win/loss/tie records with team-size and postseason splits.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

use crate::db::models::RecordSplit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub score_for: i64,
    pub score_against: i64,
}

impl Record {
    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Winning percentage with ties worth half a win; 0 with no games played.
    pub fn win_pct(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            return 0.0;
        }
        (self.wins as f64 + 0.5 * self.ties as f64) / games as f64
    }

    pub fn score_diff(&self) -> i64 {
        self.score_for - self.score_against
    }
}

impl From<&RecordSplit> for Record {
    fn from(split: &RecordSplit) -> Self {
        Record {
            wins: split.wins,
            losses: split.losses,
            ties: split.ties,
            score_for: split.score_for,
            score_against: split.score_against,
        }
    }
}

impl AddAssign for Record {
    fn add_assign(&mut self, other: Record) {
        self.wins += other.wins;
        self.losses += other.losses;
        self.ties += other.ties;
        self.score_for += other.score_for;
        self.score_against += other.score_against;
    }
}

/// One team's row in the standings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    /// 1-based position after sorting
    pub rank: usize,
    pub team_id: i64,
    pub overall: Record,
    pub regular_season: Record,
    pub postseason: Record,
    /// Keyed by players per side
    pub by_team_size: BTreeMap<i32, Record>,
}

impl TeamStanding {
    fn empty(team_id: i64) -> Self {
        TeamStanding {
            rank: 0,
            team_id,
            overall: Record::default(),
            regular_season: Record::default(),
            postseason: Record::default(),
            by_team_size: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, split: &RecordSplit) {
        let record = Record::from(split);
        self.overall += record;
        if split.postseason {
            self.postseason += record;
        } else {
            self.regular_season += record;
        }
        *self.by_team_size.entry(split.team_size).or_default() += record;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    pub rows: Vec<TeamStanding>,
}

impl Standings {
    /// Fold per-split aggregates into ranked standings.
    ///
    /// `team_ids` lists teams that must appear even without games; teams
    /// that only show up in `splits` are included as well.
    pub fn build(team_ids: &[i64], splits: &[RecordSplit]) -> Self {
        let mut by_team: HashMap<i64, TeamStanding> = team_ids
            .iter()
            .map(|&id| (id, TeamStanding::empty(id)))
            .collect();
        for split in splits {
            by_team
                .entry(split.team_id)
                .or_insert_with(|| TeamStanding::empty(split.team_id))
                .absorb(split);
        }

        let mut rows: Vec<TeamStanding> = by_team.into_values().collect();
        rows.sort_by(compare_standing);
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i + 1;
        }
        Standings { rows }
    }

    pub fn get(&self, team_id: i64) -> Option<&TeamStanding> {
        self.rows.iter().find(|r| r.team_id == team_id)
    }
}

/// Teams with games first, then win% desc, wins desc, score diff desc, id asc.
fn compare_standing(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    let (ra, rb) = (&a.overall, &b.overall);
    (rb.games() > 0)
        .cmp(&(ra.games() > 0))
        .then_with(|| rb.win_pct().total_cmp(&ra.win_pct()))
        .then_with(|| rb.wins.cmp(&ra.wins))
        .then_with(|| rb.score_diff().cmp(&ra.score_diff()))
        .then_with(|| a.team_id.cmp(&b.team_id))
}
