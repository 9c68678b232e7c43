//! Server-rendered HTML pages. Every interpolated value goes through
//! [`escape`]; numbers are formatted here rather than in handlers.

use std::fmt::Write;

use crate::db::models::{Match, MatchFilter, Team};
use crate::stats::{KdaEntry, Projection, Record, TeamStanding};

/// A match as rendered on a team page, oriented to that team.
pub struct MatchLine<'a> {
    pub m: &'a Match,
    pub own_score: i32,
    pub opponent_score: i32,
    pub opponent_id: i64,
    pub opponent_name: String,
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn record(r: &Record) -> String {
    if r.ties > 0 {
        format!("{}-{}-{}", r.wins, r.losses, r.ties)
    } else {
        format!("{}-{}", r.wins, r.losses)
    }
}

fn pct(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

fn signed(n: i64) -> String {
    if n > 0 {
        format!("+{}", n)
    } else {
        n.to_string()
    }
}

fn filter_label(filter: &MatchFilter) -> String {
    let season = filter
        .season
        .map(|s| format!("Season {}", s))
        .unwrap_or_else(|| "All seasons".to_string());
    let phase = match filter.postseason {
        Some(true) => ", postseason",
        Some(false) => ", regular season",
        None => "",
    };
    let size = filter
        .team_size
        .map(|n| format!(", {}v{}", n, n))
        .unwrap_or_default();
    format!("{}{}{}", season, phase, size)
}

fn result_class(own: i32, other: i32) -> &'static str {
    match own.cmp(&other) {
        std::cmp::Ordering::Greater => "win",
        std::cmp::Ordering::Less => "loss",
        std::cmp::Ordering::Equal => "tie",
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} | Overload Teams League</title>
<style>{STYLE}</style>
</head>
<body>
<header>
  <h1><a href="/">Overload Teams League</a></h1>
  <nav><a href="/standings">Standings</a><a href="/players">Players</a></nav>
</header>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        body = body,
    )
}

pub fn standings_page(
    filter: &MatchFilter,
    seasons: &[i32],
    rows: &[(String, TeamStanding)],
) -> String {
    let mut body = String::new();
    let _ = write!(body, "<h2>Standings <small>{}</small></h2>", escape(&filter_label(filter)));

    if !seasons.is_empty() {
        body.push_str(r#"<p class="seasons">"#);
        for s in seasons {
            let _ = write!(body, r#"<a href="/standings?season={s}">Season {s}</a>"#);
        }
        body.push_str(r#"<a href="/standings?all=true">All</a></p>"#);
    }

    if rows.is_empty() {
        body.push_str(r#"<p class="empty">No matches played yet.</p>"#);
        return layout("Standings", &body);
    }

    body.push_str(
        "<table><thead><tr><th>#</th><th>Team</th><th>Record</th><th>Win %</th>\
         <th>Diff</th><th>Regular</th><th>Postseason</th><th>By size</th></tr></thead><tbody>",
    );
    for (name, s) in rows {
        let sizes = s
            .by_team_size
            .iter()
            .map(|(n, r)| format!("{}v{}: {}", n, n, record(r)))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(
            body,
            r#"<tr><td>{}</td><td><a href="/team/{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            s.rank,
            s.team_id,
            escape(name),
            record(&s.overall),
            pct(s.overall.win_pct()),
            signed(s.overall.score_diff()),
            record(&s.regular_season),
            record(&s.postseason),
            escape(&sizes),
        );
    }
    body.push_str("</tbody></table>");
    layout("Standings", &body)
}

pub fn team_page(
    team: &Team,
    filter: &MatchFilter,
    standing: Option<&TeamStanding>,
    matches: &[MatchLine],
) -> String {
    let team_id = team.id.unwrap_or_default();
    let mut body = String::new();
    let _ = write!(
        body,
        "<h2>{} <small>[{}]</small>{} <small>{}</small></h2>",
        escape(&team.name),
        escape(&team.tag),
        if team.disbanded { " <em>(disbanded)</em>" } else { "" },
        escape(&filter_label(filter))
    );

    match standing {
        Some(s) if s.overall.games() > 0 => {
            let _ = write!(
                body,
                "<p>Record {} ({}), score differential {}. Regular season {}, postseason {}.</p>",
                record(&s.overall),
                pct(s.overall.win_pct()),
                signed(s.overall.score_diff()),
                record(&s.regular_season),
                record(&s.postseason),
            );
        }
        _ => body.push_str(r#"<p class="empty">No matches played yet.</p>"#),
    }

    if !matches.is_empty() {
        body.push_str(
            "<h3>Recent matches</h3><table><thead><tr><th>Date</th><th>Opponent</th>\
             <th>Score</th><th>Size</th><th>Map</th><th></th></tr></thead><tbody>",
        );
        for line in matches {
            let _ = write!(
                body,
                r#"<tr class="{}"><td>{}</td><td><a href="/team/{}">{}</a></td><td>{}–{}</td><td>{}v{}</td><td>{}</td><td><a href="/team/{}/opponent/{}">head-to-head</a></td></tr>"#,
                result_class(line.own_score, line.opponent_score),
                line.m.played_at.format("%Y-%m-%d"),
                line.opponent_id,
                escape(&line.opponent_name),
                line.own_score,
                line.opponent_score,
                line.m.team_size,
                line.m.team_size,
                escape(line.m.map.as_deref().unwrap_or("–")),
                team_id,
                line.opponent_id,
            );
        }
        body.push_str("</tbody></table>");
    }
    layout(&team.name, &body)
}

pub fn opponent_page(
    team: &Team,
    opponent: &Team,
    filter: &MatchFilter,
    history: &[Match],
    projection: &Projection,
) -> String {
    let team_id = team.id.unwrap_or_default();
    let mut body = String::new();
    let _ = write!(
        body,
        "<h2>{} vs {} <small>{}</small></h2>",
        escape(&team.name),
        escape(&opponent.name),
        escape(&filter_label(filter)),
    );

    let _ = write!(
        body,
        r#"<div class="projection">
  <div><span class="label">Projected score</span><span class="value">{:.0} – {:.0}</span></div>
  <div><span class="label">Margin of error</span><span class="value">±{:.1}</span></div>
  <div><span class="label">{} win chance</span><span class="value">{}</span></div>
  <div><span class="label">Based on</span><span class="value">{} match{}</span></div>
</div>"#,
        projection.team1_score,
        projection.team2_score,
        projection.margin_of_error,
        escape(&team.tag),
        pct(projection.chance),
        projection.samples,
        if projection.samples == 1 { "" } else { "es" },
    );

    if history.is_empty() {
        body.push_str(r#"<p class="empty">These teams have not played each other.</p>"#);
        return layout("Head to head", &body);
    }

    body.push_str(
        "<table><thead><tr><th>Date</th><th>Season</th><th>Score</th><th>Size</th>\
         <th>Map</th></tr></thead><tbody>",
    );
    for m in history.iter().rev() {
        let Some((own, other, _)) = m.from_side_of(team_id) else {
            continue;
        };
        let _ = write!(
            body,
            r#"<tr class="{}"><td>{}</td><td>{}{}</td><td>{}–{}</td><td>{}v{}</td><td>{}</td></tr>"#,
            result_class(own, other),
            m.played_at.format("%Y-%m-%d"),
            m.season,
            if m.postseason { " (post)" } else { "" },
            own,
            other,
            m.team_size,
            m.team_size,
            escape(m.map.as_deref().unwrap_or("–")),
        );
    }
    body.push_str("</tbody></table>");
    layout("Head to head", &body)
}

pub fn players_page(filter: &MatchFilter, min_games: u32, entries: &[KdaEntry]) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<h2>KDA leaders <small>{}, minimum {} game{}</small></h2>",
        escape(&filter_label(filter)),
        min_games,
        if min_games == 1 { "" } else { "s" },
    );
    if entries.is_empty() {
        body.push_str(r#"<p class="empty">No qualifying players.</p>"#);
        return layout("Players", &body);
    }
    body.push_str(
        "<table><thead><tr><th>#</th><th>Player</th><th>Games</th><th>K</th><th>A</th>\
         <th>D</th><th>KDA</th><th>Dmg/game</th></tr></thead><tbody>",
    );
    for e in entries {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.3}</td><td>{:.0}</td></tr>",
            e.rank,
            escape(&e.name),
            e.games,
            e.kills,
            e.assists,
            e.deaths,
            e.kda,
            e.damage_per_game,
        );
    }
    body.push_str("</tbody></table>");
    layout("Players", &body)
}

pub fn not_found_page(what: &str) -> String {
    layout(
        "Not found",
        &format!(r#"<p class="empty">{} not found.</p>"#, escape(what)),
    )
}

const STYLE: &str = r#"
  :root { --bg: #0f1117; --card: #1a1d27; --border: #2a2d3a; --accent: #ff9d2e; --green: #00c896; --red: #ff4f6a; --text: #e0e0e0; --muted: #8888aa; }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  a { color: var(--accent); text-decoration: none; }
  header { display: flex; align-items: center; gap: 2rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.3rem; }
  nav a { margin-right: 1rem; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.2rem; }
  h2 small, h3 small { color: var(--muted); font-weight: 400; font-size: .8rem; margin-left: .5rem; }
  table { width: 100%; border-collapse: collapse; background: var(--card); border: 1px solid var(--border); }
  th { padding: .6rem .9rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .55rem .9rem; font-size: .9rem; border-bottom: 1px solid #1e2130; }
  tr.win td:nth-child(3) { color: var(--green); }
  tr.loss td:nth-child(3) { color: var(--red); }
  .seasons a { margin-right: .8rem; }
  .empty { color: var(--muted); padding: 1.5rem 0; }
  .projection { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; }
  .projection div { background: var(--card); border: 1px solid var(--border); border-radius: 8px; padding: 1rem; }
  .projection .label { display: block; color: var(--muted); font-size: .75rem; text-transform: uppercase; }
  .projection .value { font-size: 1.5rem; font-weight: 700; }
"#;
