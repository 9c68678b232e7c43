use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest and largest supported players-per-side.
pub const MIN_TEAM_SIZE: i32 = 2;
pub const MAX_TEAM_SIZE: i32 = 8;

/// A row that failed validation while crossing the database boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },

    #[error("match {match_id:?} pits team {team_id} against itself")]
    SameTeam { match_id: Option<i64>, team_id: i64 },

    #[error("team size {0} outside {MIN_TEAM_SIZE}..={MAX_TEAM_SIZE}")]
    TeamSize(i32),
}

/// A league team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
    /// Short clan tag shown in tables, e.g. "JOA"
    pub tag: String,
    pub disbanded: bool,
}

impl Team {
    pub fn new(name: &str, tag: &str) -> Self {
        Team {
            id: None,
            name: name.trim().to_string(),
            tag: tag.trim().to_string(),
            disbanded: false,
        }
    }

    pub fn validate(&self) -> Result<(), RowError> {
        if self.name.trim().is_empty() {
            return Err(RowError::EmptyField { field: "team name" });
        }
        if self.tag.trim().is_empty() {
            return Err(RowError::EmptyField { field: "team tag" });
        }
        Ok(())
    }
}

/// A registered player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Option<i64>,
    pub name: String,
}

impl Player {
    pub fn validate(&self) -> Result<(), RowError> {
        if self.name.trim().is_empty() {
            return Err(RowError::EmptyField { field: "player name" });
        }
        Ok(())
    }
}

/// A completed match between a challenging and a challenged team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Option<i64>,
    pub season: i32,
    pub postseason: bool,
    /// Players per side (2 = 2v2, 3 = 3v3, ...)
    pub team_size: i32,
    pub challenging_team_id: i64,
    pub challenged_team_id: i64,
    pub challenging_team_score: i32,
    pub challenged_team_score: i32,
    pub map: Option<String>,
    pub played_at: DateTime<Utc>,
}

impl Match {
    pub fn validate(&self) -> Result<(), RowError> {
        if self.challenging_team_id == self.challenged_team_id {
            return Err(RowError::SameTeam {
                match_id: self.id,
                team_id: self.challenging_team_id,
            });
        }
        if self.challenging_team_score < 0 {
            return Err(RowError::Negative {
                field: "challenging team score",
                value: self.challenging_team_score as i64,
            });
        }
        if self.challenged_team_score < 0 {
            return Err(RowError::Negative {
                field: "challenged team score",
                value: self.challenged_team_score as i64,
            });
        }
        if !(MIN_TEAM_SIZE..=MAX_TEAM_SIZE).contains(&self.team_size) {
            return Err(RowError::TeamSize(self.team_size));
        }
        Ok(())
    }

    /// The scoring sample used by the head-to-head projection.
    pub fn result(&self) -> MatchResult {
        MatchResult {
            challenging_team_id: self.challenging_team_id,
            challenged_team_id: self.challenged_team_id,
            challenging_team_score: self.challenging_team_score,
            challenged_team_score: self.challenged_team_score,
        }
    }

    /// Score as seen from `team_id`: (own score, opponent score, opponent id).
    /// Returns `None` when the team did not play in this match.
    pub fn from_side_of(&self, team_id: i64) -> Option<(i32, i32, i64)> {
        if self.challenging_team_id == team_id {
            Some((
                self.challenging_team_score,
                self.challenged_team_score,
                self.challenged_team_id,
            ))
        } else if self.challenged_team_id == team_id {
            Some((
                self.challenged_team_score,
                self.challenging_team_score,
                self.challenging_team_id,
            ))
        } else {
            None
        }
    }
}

/// One completed match reduced to the two participants and their final scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub challenging_team_id: i64,
    pub challenged_team_id: i64,
    pub challenging_team_score: i32,
    pub challenged_team_score: i32,
}

/// Per-player line from a single match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStat {
    pub match_id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub kills: u32,
    pub assists: u32,
    pub deaths: u32,
    pub damage: f64,
}

impl PlayerStat {
    pub fn validate(&self) -> Result<(), RowError> {
        if self.damage < 0.0 {
            return Err(RowError::Negative {
                field: "damage",
                value: self.damage as i64,
            });
        }
        Ok(())
    }
}

/// Aggregated record of one team within one (team size, postseason) split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSplit {
    pub team_id: i64,
    pub team_size: i32,
    pub postseason: bool,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub score_for: i64,
    pub score_against: i64,
}

/// Summed player stats over the matches selected by a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTotals {
    pub player_id: i64,
    pub name: String,
    pub games: u32,
    pub kills: u32,
    pub assists: u32,
    pub deaths: u32,
    pub damage: f64,
}

/// Split dimensions applied by the store's match queries. `None` = no filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFilter {
    pub season: Option<i32>,
    pub postseason: Option<bool>,
    pub team_size: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_match(a: i64, b: i64, sa: i32, sb: i32) -> Match {
        Match {
            id: None,
            season: 1,
            postseason: false,
            team_size: 3,
            challenging_team_id: a,
            challenged_team_id: b,
            challenging_team_score: sa,
            challenged_team_score: sb,
            map: None,
            played_at: Utc::now(),
        }
    }

    #[test]
    fn match_validation_rejects_bad_rows() {
        assert!(make_match(1, 2, 20, 15).validate().is_ok());
        assert_eq!(
            make_match(1, 1, 20, 15).validate(),
            Err(RowError::SameTeam {
                match_id: None,
                team_id: 1
            })
        );
        assert!(matches!(
            make_match(1, 2, -1, 15).validate(),
            Err(RowError::Negative { .. })
        ));
        let mut m = make_match(1, 2, 20, 15);
        m.team_size = 1;
        assert_eq!(m.validate(), Err(RowError::TeamSize(1)));
    }

    #[test]
    fn team_validation_rejects_blank_names() {
        assert!(Team::new("  ", "X").validate().is_err());
        assert!(Team::new("Juggernaut", "").validate().is_err());
        let t = Team::new("  Juggernaut ", " JUG ");
        assert_eq!(t.name, "Juggernaut");
        assert_eq!(t.tag, "JUG");
        assert!(t.validate().is_ok());
    }

    #[test]
    fn from_side_of_orients_scores() {
        let m = make_match(1, 2, 20, 15);
        assert_eq!(m.from_side_of(1), Some((20, 15, 2)));
        assert_eq!(m.from_side_of(2), Some((15, 20, 1)));
        assert_eq!(m.from_side_of(3), None);
    }
}
