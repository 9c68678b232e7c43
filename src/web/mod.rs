use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error};

use crate::cache::TeamCache;
use crate::db::models::{Match, MatchFilter, Team};
use crate::db::Database;
use crate::stats::{self, KdaEntry, Projection, Standings, TeamStanding};

pub mod views;

use views::MatchLine;

/// Number of matches listed on a team page.
const RECENT_MATCHES: i64 = 20;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Season shown when a request does not name one; `None` = all seasons
    pub current_season: Option<i32>,
    pub min_kda_games: u32,
}

/// Query-string split filter shared by every page.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub season: Option<i32>,
    pub postseason: Option<bool>,
    pub team_size: Option<i32>,
    /// Ignore the default season and look at every season
    #[serde(default)]
    pub all: bool,
}

impl FilterQuery {
    fn to_filter(&self, default_season: Option<i32>) -> MatchFilter {
        let season = if self.all {
            None
        } else {
            self.season.or(default_season)
        };
        MatchFilter {
            season,
            postseason: self.postseason,
            team_size: self.team_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HeadToHead {
    pub team1: Team,
    pub team2: Team,
    pub filter: MatchFilter,
    pub matches: Vec<Match>,
    pub projection: Projection,
}

#[derive(Debug, Serialize)]
pub struct NamedStanding {
    pub name: String,
    pub tag: String,
    #[serde(flatten)]
    pub standing: TeamStanding,
}

type HandlerError = (StatusCode, String);

/// Build the Axum router for the league site.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(standings_handler))
        .route("/standings", get(standings_handler))
        .route("/players", get(players_handler))
        .route("/team/:id", get(team_handler))
        .route("/team/:id/opponent/:opponent_id", get(opponent_handler))
        .route("/api/teams", get(api_teams_handler))
        .route("/api/standings", get(api_standings_handler))
        .route("/api/players/kda", get(api_kda_handler))
        .route("/api/head-to-head/:team1/:team2", get(api_head_to_head_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

// ── Loaders shared by HTML and JSON handlers ─────────────────────────────────

fn load_standings(db: &Database, filter: &MatchFilter) -> Result<Vec<NamedStanding>> {
    let teams = db.list_teams()?;
    let splits = db.record_splits(filter)?;
    // Teams without games are listed only when they are still active.
    let active: Vec<i64> = teams
        .iter()
        .filter(|t| !t.disbanded)
        .filter_map(|t| t.id)
        .collect();
    let standings = Standings::build(&active, &splits);

    let mut cache = TeamCache::new();
    cache.prime(teams);
    let mut rows = Vec::with_capacity(standings.rows.len());
    for standing in standings.rows {
        let (name, tag) = match cache.get(db, standing.team_id)? {
            Some(t) => (t.name.clone(), t.tag.clone()),
            None => (format!("Team #{}", standing.team_id), String::new()),
        };
        rows.push(NamedStanding { name, tag, standing });
    }
    Ok(rows)
}

/// Head-to-head history and projection; `None` when either team is unknown.
pub fn load_head_to_head(
    db: &Database,
    team1_id: i64,
    team2_id: i64,
    filter: MatchFilter,
) -> Result<Option<HeadToHead>> {
    let mut cache = TeamCache::new();
    let team1 = cache.get(db, team1_id)?.cloned();
    let team2 = cache.get(db, team2_id)?.cloned();
    let (Some(team1), Some(team2)) = (team1, team2) else {
        return Ok(None);
    };
    let matches = db.head_to_head_matches(team1_id, team2_id, &filter)?;
    let results: Vec<_> = matches.iter().map(Match::result).collect();
    let projection = stats::project(&results, team1_id, team2_id);
    debug!(
        "projection {} vs {}: {:.1}-{:.1}, chance {:.3}",
        team1_id, team2_id, projection.team1_score, projection.team2_score, projection.chance
    );
    Ok(Some(HeadToHead {
        team1,
        team2,
        filter,
        matches,
        projection,
    }))
}

fn load_leaderboard(db: &Database, filter: &MatchFilter, min_games: u32) -> Result<Vec<KdaEntry>> {
    let totals = db.player_totals(filter)?;
    Ok(stats::leaderboard(&totals, min_games))
}

fn internal_error(err: anyhow::Error) -> HandlerError {
    error!("Request failed: {:#}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn not_found(what: String) -> Response {
    (StatusCode::NOT_FOUND, Html(views::not_found_page(&what))).into_response()
}

// ── HTML ──────────────────────────────────────────────────────────────────────

/// GET / and GET /standings?season=&postseason=&team_size=
async fn standings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Html<String>, HandlerError> {
    let filter = query.to_filter(state.current_season);
    let rows = load_standings(&state.db, &filter).map_err(internal_error)?;
    let seasons = state.db.seasons().map_err(internal_error)?;
    let rows: Vec<(String, TeamStanding)> =
        rows.into_iter().map(|r| (r.name, r.standing)).collect();
    Ok(Html(views::standings_page(&filter, &seasons, &rows)))
}

/// GET /team/:id?season=&postseason=
async fn team_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, HandlerError> {
    let db = &state.db;
    let mut cache = TeamCache::new();
    let Some(team) = cache.get(db, id).map_err(internal_error)?.cloned() else {
        return Ok(not_found(format!("Team {}", id)));
    };

    let filter = query.to_filter(state.current_season);
    let splits = db.team_record_splits(id, &filter).map_err(internal_error)?;
    let standings = Standings::build(&[id], &splits);

    let recent = db
        .recent_matches(Some(id), &filter, RECENT_MATCHES)
        .map_err(internal_error)?;
    let mut lines = Vec::with_capacity(recent.len());
    for m in &recent {
        let Some((own_score, opponent_score, opponent_id)) = m.from_side_of(id) else {
            continue;
        };
        let opponent_name = cache.name(db, opponent_id).map_err(internal_error)?;
        lines.push(MatchLine {
            m,
            own_score,
            opponent_score,
            opponent_id,
            opponent_name,
        });
    }

    Ok(Html(views::team_page(&team, &filter, standings.get(id), &lines)).into_response())
}

/// GET /team/:id/opponent/:opponent_id?season=&postseason=
async fn opponent_handler(
    State(state): State<Arc<AppState>>,
    Path((id, opponent_id)): Path<(i64, i64)>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, HandlerError> {
    // Head-to-head spans every season unless one is asked for explicitly.
    let filter = query.to_filter(None);
    match load_head_to_head(&state.db, id, opponent_id, filter).map_err(internal_error)? {
        Some(h2h) => Ok(Html(views::opponent_page(
            &h2h.team1,
            &h2h.team2,
            &h2h.filter,
            &h2h.matches,
            &h2h.projection,
        ))
        .into_response()),
        None => Ok(not_found(format!("Team {} or {}", id, opponent_id))),
    }
}

/// GET /players?season=&postseason=
async fn players_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Html<String>, HandlerError> {
    let filter = query.to_filter(state.current_season);
    let entries =
        load_leaderboard(&state.db, &filter, state.min_kda_games).map_err(internal_error)?;
    Ok(Html(views::players_page(&filter, state.min_kda_games, &entries)))
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// GET /api/teams
async fn api_teams_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    state.db.list_teams().map(Json).map_err(internal_error)
}

/// GET /api/standings
async fn api_standings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let filter = query.to_filter(state.current_season);
    load_standings(&state.db, &filter)
        .map(Json)
        .map_err(internal_error)
}

/// GET /api/players/kda
async fn api_kda_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let filter = query.to_filter(state.current_season);
    load_leaderboard(&state.db, &filter, state.min_kda_games)
        .map(Json)
        .map_err(internal_error)
}

/// GET /api/head-to-head/:team1/:team2
async fn api_head_to_head_handler(
    State(state): State<Arc<AppState>>,
    Path((team1, team2)): Path<(i64, i64)>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<HeadToHead>, HandlerError> {
    let filter = query.to_filter(None);
    load_head_to_head(&state.db, team1, team2, filter)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("team {} or {} not found", team1, team2),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    fn setup() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_team(&Team::new("Juggernaut", "JUG")).unwrap();
        let b = db.insert_team(&Team::new("Vanguard", "VAN")).unwrap();
        let mut gone = Team::new("Defunct", "DEF");
        gone.disbanded = true;
        let c = db.insert_team(&gone).unwrap();
        for (day, (sa, sb)) in [(20, 10), (15, 20), (20, 16)].into_iter().enumerate() {
            db.insert_match(&Match {
                id: None,
                season: 1,
                postseason: false,
                team_size: 3,
                challenging_team_id: a,
                challenged_team_id: b,
                challenging_team_score: sa,
                challenged_team_score: sb,
                map: None,
                played_at: Utc
                    .with_ymd_and_hms(2021, 2, day as u32 + 1, 20, 0, 0)
                    .unwrap(),
            })
            .unwrap();
        }
        (db, a, b, c)
    }

    #[test]
    fn filter_query_defaults_to_current_season() {
        let q = FilterQuery::default();
        assert_eq!(q.to_filter(Some(4)).season, Some(4));
        let q = FilterQuery {
            season: Some(2),
            ..Default::default()
        };
        assert_eq!(q.to_filter(Some(4)).season, Some(2));
        let q = FilterQuery {
            season: Some(2),
            all: true,
            ..Default::default()
        };
        assert_eq!(q.to_filter(Some(4)).season, None);
    }

    #[test]
    fn standings_skip_idle_disbanded_teams() {
        let (db, a, b, c) = setup();
        let season1 = MatchFilter {
            season: Some(1),
            ..Default::default()
        };
        let rows = load_standings(&db, &season1).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.standing.team_id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(!ids.contains(&c));
        assert_eq!(rows[0].name, "Juggernaut");
        assert_eq!(rows[0].standing.overall.wins, 2);
    }

    #[test]
    fn head_to_head_projection_is_mirrored() {
        let (db, a, b, _) = setup();
        let ab = load_head_to_head(&db, a, b, MatchFilter::default())
            .unwrap()
            .unwrap();
        let ba = load_head_to_head(&db, b, a, MatchFilter::default())
            .unwrap()
            .unwrap();
        assert_eq!(ab.matches.len(), 3);
        assert_eq!(ab.team1.name, "Juggernaut");
        assert!(ab.projection.chance > 0.5);
        assert!((ab.projection.chance + ba.projection.chance - 1.0).abs() < 1e-12);
    }

    #[test]
    fn head_to_head_unknown_team_is_none() {
        let (db, a, _, _) = setup();
        assert!(load_head_to_head(&db, a, 999, MatchFilter::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn leaderboard_empty_without_stats() {
        let (db, _, _, _) = setup();
        assert!(load_leaderboard(&db, &MatchFilter::default(), 1)
            .unwrap()
            .is_empty());
    }

    fn app(db: Database) -> Router {
        router(AppState {
            db,
            current_season: None,
            min_kda_games: 1,
        })
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn unknown_team_pages_are_not_found() {
        let (db, a, _, _) = setup();
        let app = app(db);

        let (status, body) = get(app.clone(), "/team/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Team 999"));

        let (status, _) = get(app.clone(), &format!("/team/{}/opponent/999", a)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get(app.clone(), &format!("/api/head-to-head/{}/999", a)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, format!("team {} or 999 not found", a));

        let (status, _) = get(app, "/team/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn head_to_head_api_returns_projection() {
        let (db, a, b, _) = setup();
        let (status, body) = get(app(db), &format!("/api/head-to-head/{}/{}", a, b)).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["team1"]["name"], "Juggernaut");
        assert_eq!(json["matches"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["projection"]["samples"], 3);
        assert_eq!(json["projection"]["team1_score"], 100.0);
        let chance = json["projection"]["chance"].as_f64().unwrap();
        assert!(chance > 0.5 && chance < 1.0);
    }

    #[tokio::test]
    async fn html_pages_render_for_known_teams() {
        let (db, a, b, _) = setup();
        let app = app(db);
        for uri in [
            "/".to_string(),
            "/standings?season=1".to_string(),
            "/players".to_string(),
            format!("/team/{}", a),
            format!("/team/{}/opponent/{}", a, b),
        ] {
            let (status, body) = get(app.clone(), &uri).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert!(body.contains("<html"), "{}", uri);
        }
    }

    #[tokio::test]
    async fn team_page_lists_matches_of_the_requested_season() {
        let (db, a, b, _) = setup();
        db.insert_match(&Match {
            id: None,
            season: 2,
            postseason: false,
            team_size: 2,
            challenging_team_id: b,
            challenged_team_id: a,
            challenging_team_score: 20,
            challenged_team_score: 4,
            map: None,
            played_at: Utc.with_ymd_and_hms(2022, 3, 1, 20, 0, 0).unwrap(),
        })
        .unwrap();
        let app = app(db);

        let (_, season1) = get(app.clone(), &format!("/team/{}?season=1", a)).await;
        assert!(season1.contains("2021-02-01"));
        assert!(!season1.contains("2022-03-01"));
        assert!(season1.contains("Record 2-1"));

        let (_, season2) = get(app, &format!("/team/{}?season=2", a)).await;
        assert!(season2.contains("2022-03-01"));
        assert!(!season2.contains("2021-02-01"));
        assert!(season2.contains("Record 0-1"));
    }

    #[tokio::test]
    async fn store_failures_are_internal_errors() {
        let path = std::env::temp_dir().join(format!("otl-web-{}.db", std::process::id()));
        let path = path.to_str().unwrap().to_string();
        let cleanup = |p: &str| {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{}", p, suffix));
            }
        };
        cleanup(&path);

        let db = Database::open(&path).unwrap();
        // A blank name slips past the schema but not past row decoding.
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute("INSERT INTO teams (name, tag) VALUES ('   ', 'X')", [])
            .unwrap();

        let app = app(db);
        let (status, _) = get(app.clone(), "/api/teams").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (status, _) = get(app, "/standings").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        cleanup(&path);
    }
}
