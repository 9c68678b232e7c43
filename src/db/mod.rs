use anyhow::{anyhow, Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

pub mod models;
use models::*;

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::from_connection(conn)
    }

    /// Fresh in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    // ── Teams ─────────────────────────────────────────────────────────────────

    pub fn insert_team(&self, team: &Team) -> Result<i64> {
        team.validate()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO teams (name, tag, disbanded) VALUES (?1, ?2, ?3)",
            params![team.name.trim(), team.tag.trim(), team.disbanded],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, tag, disbanded FROM teams ORDER BY name COLLATE NOCASE")?;
        let teams = stmt
            .query_map([], map_team)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(teams)
    }

    pub fn get_team(&self, id: i64) -> Result<Option<Team>> {
        let conn = self.conn()?;
        let team = conn
            .query_row(
                "SELECT id, name, tag, disbanded FROM teams WHERE id = ?1",
                params![id],
                map_team,
            )
            .optional()?;
        Ok(team)
    }

    // ── Players ───────────────────────────────────────────────────────────────

    pub fn insert_player(&self, player: &Player) -> Result<i64> {
        player.validate()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO players (name) VALUES (?1)",
            params![player.name.trim()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_player_stat(&self, stat: &PlayerStat) -> Result<()> {
        stat.validate()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO player_stats (match_id, player_id, team_id, kills, assists, deaths, damage)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                stat.match_id,
                stat.player_id,
                stat.team_id,
                stat.kills,
                stat.assists,
                stat.deaths,
                stat.damage,
            ],
        )?;
        Ok(())
    }

    /// Per-player totals over the matches selected by `filter`.
    pub fn player_totals(&self, filter: &MatchFilter) -> Result<Vec<PlayerTotals>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, COUNT(DISTINCT s.match_id),
                    SUM(s.kills), SUM(s.assists), SUM(s.deaths), SUM(s.damage)
             FROM player_stats s
             JOIN players p ON p.id = s.player_id
             JOIN matches m ON m.id = s.match_id
             WHERE (?1 IS NULL OR m.season = ?1)
               AND (?2 IS NULL OR m.postseason = ?2)
               AND (?3 IS NULL OR m.team_size = ?3)
             GROUP BY p.id, p.name
             ORDER BY p.id",
        )?;
        let rows = stmt
            .query_map(
                params![filter.season, filter.postseason, filter.team_size],
                map_player_totals,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Matches ───────────────────────────────────────────────────────────────

    pub fn insert_match(&self, m: &Match) -> Result<i64> {
        m.validate()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO matches (
                season, postseason, team_size,
                challenging_team_id, challenged_team_id,
                challenging_team_score, challenged_team_score,
                map, played_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                m.season,
                m.postseason,
                m.team_size,
                m.challenging_team_id,
                m.challenged_team_id,
                m.challenging_team_score,
                m.challenged_team_score,
                m.map,
                m.played_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Every completed match between two teams, in either role, oldest first.
    pub fn head_to_head_matches(
        &self,
        team1_id: i64,
        team2_id: i64,
        filter: &MatchFilter,
    ) -> Result<Vec<Match>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE ((challenging_team_id = ?1 AND challenged_team_id = ?2)
                 OR (challenging_team_id = ?2 AND challenged_team_id = ?1))
               AND (?3 IS NULL OR season = ?3)
               AND (?4 IS NULL OR postseason = ?4)
               AND (?5 IS NULL OR team_size = ?5)
             ORDER BY played_at, id"
        ))?;
        let matches = stmt
            .query_map(
                params![
                    team1_id,
                    team2_id,
                    filter.season,
                    filter.postseason,
                    filter.team_size
                ],
                map_match,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(
            "head-to-head {} vs {}: {} match(es)",
            team1_id,
            team2_id,
            matches.len()
        );
        Ok(matches)
    }

    /// Most recent matches under `filter`, optionally only those involving `team_id`.
    pub fn recent_matches(
        &self,
        team_id: Option<i64>,
        filter: &MatchFilter,
        limit: i64,
    ) -> Result<Vec<Match>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE (?1 IS NULL OR challenging_team_id = ?1 OR challenged_team_id = ?1)
               AND (?2 IS NULL OR season = ?2)
               AND (?3 IS NULL OR postseason = ?3)
               AND (?4 IS NULL OR team_size = ?4)
             ORDER BY played_at DESC, id DESC LIMIT ?5"
        ))?;
        let matches = stmt
            .query_map(
                params![
                    team_id,
                    filter.season,
                    filter.postseason,
                    filter.team_size,
                    limit
                ],
                map_match,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(matches)
    }

    /// Seasons with at least one match, newest first.
    pub fn seasons(&self) -> Result<Vec<i32>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT season FROM matches ORDER BY season DESC")?;
        let seasons = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i32>>>()?;
        Ok(seasons)
    }

    // ── Records ───────────────────────────────────────────────────────────────

    /// Win/loss/tie aggregates per team × team size × postseason.
    pub fn record_splits(&self, filter: &MatchFilter) -> Result<Vec<RecordSplit>> {
        self.query_record_splits(None, filter)
    }

    /// The same aggregates for a single team.
    pub fn team_record_splits(
        &self,
        team_id: i64,
        filter: &MatchFilter,
    ) -> Result<Vec<RecordSplit>> {
        self.query_record_splits(Some(team_id), filter)
    }

    fn query_record_splits(
        &self,
        team_id: Option<i64>,
        filter: &MatchFilter,
    ) -> Result<Vec<RecordSplit>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(RECORD_SPLITS_SQL)?;
        let rows = stmt
            .query_map(
                params![filter.season, filter.postseason, filter.team_size, team_id],
                map_record_split,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const MATCH_COLUMNS: &str = "id, season, postseason, team_size,
    challenging_team_id, challenged_team_id,
    challenging_team_score, challenged_team_score, map, played_at";

/// Each match contributes one row per side; the outer query folds them per split.
const RECORD_SPLITS_SQL: &str = "
WITH sides AS (
    SELECT challenging_team_id AS team_id, team_size, postseason,
           challenging_team_score AS score_for, challenged_team_score AS score_against
    FROM matches
    WHERE (?1 IS NULL OR season = ?1)
      AND (?2 IS NULL OR postseason = ?2)
      AND (?3 IS NULL OR team_size = ?3)
    UNION ALL
    SELECT challenged_team_id, team_size, postseason,
           challenged_team_score, challenging_team_score
    FROM matches
    WHERE (?1 IS NULL OR season = ?1)
      AND (?2 IS NULL OR postseason = ?2)
      AND (?3 IS NULL OR team_size = ?3)
)
SELECT team_id, team_size, postseason,
       SUM(score_for > score_against),
       SUM(score_for < score_against),
       SUM(score_for = score_against),
       SUM(score_for),
       SUM(score_against)
FROM sides
WHERE ?4 IS NULL OR team_id = ?4
GROUP BY team_id, team_size, postseason
ORDER BY team_id, team_size, postseason";

/// Surface a validation failure as a rusqlite conversion error on `column`.
fn reject(column: usize, err: RowError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Integer, Box::new(err))
}

fn map_team(row: &rusqlite::Row) -> rusqlite::Result<Team> {
    let team = Team {
        id: row.get(0)?,
        name: row.get::<_, String>(1)?.trim().to_string(),
        tag: row.get::<_, String>(2)?.trim().to_string(),
        disbanded: row.get(3)?,
    };
    team.validate().map_err(|e| reject(1, e))?;
    Ok(team)
}

fn map_match(row: &rusqlite::Row) -> rusqlite::Result<Match> {
    let m = Match {
        id: row.get(0)?,
        season: row.get(1)?,
        postseason: row.get(2)?,
        team_size: row.get(3)?,
        challenging_team_id: row.get(4)?,
        challenged_team_id: row.get(5)?,
        challenging_team_score: row.get(6)?,
        challenged_team_score: row.get(7)?,
        map: row
            .get::<_, Option<String>>(8)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        played_at: row.get(9)?,
    };
    m.validate().map_err(|e| reject(0, e))?;
    Ok(m)
}

fn map_record_split(row: &rusqlite::Row) -> rusqlite::Result<RecordSplit> {
    Ok(RecordSplit {
        team_id: row.get(0)?,
        team_size: row.get(1)?,
        postseason: row.get(2)?,
        wins: row.get(3)?,
        losses: row.get(4)?,
        ties: row.get(5)?,
        score_for: row.get(6)?,
        score_against: row.get(7)?,
    })
}

fn map_player_totals(row: &rusqlite::Row) -> rusqlite::Result<PlayerTotals> {
    Ok(PlayerTotals {
        player_id: row.get(0)?,
        name: row.get(1)?,
        games: row.get(2)?,
        kills: row.get(3)?,
        assists: row.get(4)?,
        deaths: row.get(5)?,
        damage: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS teams (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT    NOT NULL UNIQUE,
    tag       TEXT    NOT NULL,
    disbanded INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS players (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS matches (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    season                 INTEGER NOT NULL,
    postseason             INTEGER NOT NULL DEFAULT 0,
    team_size              INTEGER NOT NULL,
    challenging_team_id    INTEGER NOT NULL,
    challenged_team_id     INTEGER NOT NULL,
    challenging_team_score INTEGER NOT NULL,
    challenged_team_score  INTEGER NOT NULL,
    map                    TEXT,
    played_at              TEXT    NOT NULL,
    FOREIGN KEY (challenging_team_id) REFERENCES teams(id),
    FOREIGN KEY (challenged_team_id)  REFERENCES teams(id)
);

CREATE TABLE IF NOT EXISTS player_stats (
    match_id  INTEGER NOT NULL,
    player_id INTEGER NOT NULL,
    team_id   INTEGER NOT NULL,
    kills     INTEGER NOT NULL DEFAULT 0,
    assists   INTEGER NOT NULL DEFAULT 0,
    deaths    INTEGER NOT NULL DEFAULT 0,
    damage    REAL    NOT NULL DEFAULT 0,
    PRIMARY KEY (match_id, player_id),
    FOREIGN KEY (match_id)  REFERENCES matches(id),
    FOREIGN KEY (player_id) REFERENCES players(id),
    FOREIGN KEY (team_id)   REFERENCES teams(id)
);

CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season, postseason);
CREATE INDEX IF NOT EXISTS idx_matches_challenging ON matches(challenging_team_id);
CREATE INDEX IF NOT EXISTS idx_matches_challenged ON matches(challenged_team_id);
CREATE INDEX IF NOT EXISTS idx_player_stats_player ON player_stats(player_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn season(season: i32) -> MatchFilter {
        MatchFilter {
            season: Some(season),
            ..Default::default()
        }
    }

    fn make_match(a: i64, b: i64, sa: i32, sb: i32, day: u32) -> Match {
        Match {
            id: None,
            season: 1,
            postseason: false,
            team_size: 3,
            challenging_team_id: a,
            challenged_team_id: b,
            challenging_team_score: sa,
            challenged_team_score: sb,
            map: Some("Vault".into()),
            played_at: Utc.with_ymd_and_hms(2021, 3, day, 20, 0, 0).unwrap(),
        }
    }

    fn seed_teams(db: &Database) -> (i64, i64, i64) {
        let a = db.insert_team(&Team::new("Juggernaut", "JUG")).unwrap();
        let b = db.insert_team(&Team::new("Vanguard", "VAN")).unwrap();
        let c = db.insert_team(&Team::new("Overclocked", "OC")).unwrap();
        (a, b, c)
    }

    #[test]
    fn head_to_head_returns_both_orientations() {
        let db = Database::open_in_memory().unwrap();
        let (a, b, c) = seed_teams(&db);
        db.insert_match(&make_match(a, b, 20, 10, 1)).unwrap();
        db.insert_match(&make_match(b, a, 20, 18, 2)).unwrap();
        db.insert_match(&make_match(a, c, 20, 5, 3)).unwrap();

        let h2h = db.head_to_head_matches(a, b, &MatchFilter::default()).unwrap();
        assert_eq!(h2h.len(), 2);
        assert_eq!(h2h[0].challenging_team_id, a);
        assert_eq!(h2h[1].challenging_team_id, b);

        let reversed = db.head_to_head_matches(b, a, &MatchFilter::default()).unwrap();
        assert_eq!(reversed, h2h);
    }

    #[test]
    fn head_to_head_applies_filter() {
        let db = Database::open_in_memory().unwrap();
        let (a, b, _) = seed_teams(&db);
        db.insert_match(&make_match(a, b, 20, 10, 1)).unwrap();
        let mut playoff = make_match(a, b, 15, 20, 2);
        playoff.postseason = true;
        db.insert_match(&playoff).unwrap();

        let filter = MatchFilter {
            postseason: Some(true),
            ..Default::default()
        };
        let h2h = db.head_to_head_matches(a, b, &filter).unwrap();
        assert_eq!(h2h.len(), 1);
        assert!(h2h[0].postseason);
    }

    #[test]
    fn record_splits_count_both_sides() {
        let db = Database::open_in_memory().unwrap();
        let (a, b, c) = seed_teams(&db);
        db.insert_match(&make_match(a, b, 20, 10, 1)).unwrap();
        db.insert_match(&make_match(b, a, 20, 18, 2)).unwrap();
        db.insert_match(&make_match(a, b, 12, 12, 3)).unwrap();

        let splits = db.record_splits(&season(1)).unwrap();
        assert_eq!(splits.len(), 2);
        let a_split = splits.iter().find(|s| s.team_id == a).unwrap();
        assert_eq!((a_split.wins, a_split.losses, a_split.ties), (1, 1, 1));
        assert_eq!(a_split.score_for, 20 + 18 + 12);
        assert_eq!(a_split.score_against, 10 + 20 + 12);

        assert!(db.record_splits(&season(2)).unwrap().is_empty());

        let only_a = db.team_record_splits(a, &season(1)).unwrap();
        assert_eq!(only_a, vec![a_split.clone()]);
        assert!(db.team_record_splits(c, &season(1)).unwrap().is_empty());
    }

    #[test]
    fn player_totals_sum_over_matches() {
        let db = Database::open_in_memory().unwrap();
        let (a, b, _) = seed_teams(&db);
        let m1 = db.insert_match(&make_match(a, b, 20, 10, 1)).unwrap();
        let m2 = db.insert_match(&make_match(a, b, 20, 15, 2)).unwrap();
        let p = db
            .insert_player(&Player {
                id: None,
                name: "roncli".into(),
            })
            .unwrap();
        for (match_id, kills) in [(m1, 8), (m2, 4)] {
            db.insert_player_stat(&PlayerStat {
                match_id,
                player_id: p,
                team_id: a,
                kills,
                assists: 2,
                deaths: 3,
                damage: 500.0,
            })
            .unwrap();
        }

        let totals = db.player_totals(&MatchFilter::default()).unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].games, 2);
        assert_eq!(totals[0].kills, 12);
        assert_eq!(totals[0].deaths, 6);
        assert_eq!(totals[0].damage, 1000.0);
    }

    #[test]
    fn invalid_rows_are_rejected_at_both_edges() {
        let db = Database::open_in_memory().unwrap();
        let (a, _, _) = seed_teams(&db);
        assert!(db.insert_match(&make_match(a, a, 20, 10, 1)).is_err());
        assert!(db.insert_team(&Team::new("", "X")).is_err());

        // A row written behind the store's back is refused when read.
        {
            let conn = db.conn().unwrap();
            conn.execute(
                "INSERT INTO teams (name, tag, disbanded) VALUES ('   ', 'BAD', 0)",
                [],
            )
            .unwrap();
        }
        assert!(db.list_teams().is_err());
    }

    #[test]
    fn recent_matches_and_seasons() {
        let db = Database::open_in_memory().unwrap();
        let (a, b, c) = seed_teams(&db);
        db.insert_match(&make_match(a, b, 20, 10, 1)).unwrap();
        let mut later = make_match(b, c, 20, 10, 5);
        later.season = 2;
        db.insert_match(&later).unwrap();

        let all = MatchFilter::default();
        let recent = db.recent_matches(None, &all, 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].season, 2);
        assert_eq!(db.recent_matches(Some(a), &all, 10).unwrap().len(), 1);
        assert_eq!(db.recent_matches(Some(b), &all, 10).unwrap().len(), 2);
        let first = db.recent_matches(Some(b), &season(1), 10).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].season, 1);
        assert!(db.recent_matches(Some(a), &season(2), 10).unwrap().is_empty());
        assert_eq!(db.seasons().unwrap(), vec![2, 1]);
        assert!(db.get_team(a).unwrap().is_some());
        assert!(db.get_team(999).unwrap().is_none());
    }
}
