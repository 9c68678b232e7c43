use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

use crate::db::models::MatchFilter;
use crate::seed::SeedOptions;

/// Overload Teams League stats site
#[derive(Parser, Debug, Clone)]
#[command(name = "otl-stats", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "otl.db", global = true)]
    pub database_path: String,

    /// Web server listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Season shown by default; omit to show every season
    #[arg(long, env = "CURRENT_SEASON")]
    pub current_season: Option<i32>,

    /// Minimum games played to appear on the KDA leaderboard
    #[arg(long, env = "MIN_KDA_GAMES", default_value = "3")]
    pub min_kda_games: u32,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the web server (default)
    Serve,
    /// Fill the database with a generated demo league
    Seed(SeedArgs),
    /// Print the head-to-head projection for two team ids as JSON
    HeadToHead(HeadToHeadArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    /// Number of teams
    #[arg(long, default_value = "8")]
    pub teams: usize,

    /// Players on each roster
    #[arg(long, default_value = "5")]
    pub players_per_team: usize,

    /// Number of seasons
    #[arg(long, default_value = "2")]
    pub seasons: i32,

    /// Matches per season
    #[arg(long, default_value = "40")]
    pub matches: usize,

    /// Share of each season played as postseason (0.0–1.0)
    #[arg(long, default_value = "0.15")]
    pub postseason_fraction: f64,

    /// RNG seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct HeadToHeadArgs {
    /// Team id projected as team 1
    pub team1: i64,
    /// Team id projected as team 2
    pub team2: i64,

    /// Only count matches from this season
    #[arg(long)]
    pub season: Option<i32>,

    /// Only postseason (true) or regular season (false) matches
    #[arg(long)]
    pub postseason: Option<bool>,

    /// Only matches with this many players per side
    #[arg(long)]
    pub team_size: Option<i32>,
}

impl SeedArgs {
    pub fn options(&self) -> SeedOptions {
        SeedOptions {
            teams: self.teams,
            players_per_team: self.players_per_team,
            seasons: self.seasons,
            matches_per_season: self.matches,
            postseason_fraction: self.postseason_fraction,
            seed: self.seed,
        }
    }
}

impl HeadToHeadArgs {
    pub fn filter(&self) -> MatchFilter {
        MatchFilter {
            season: self.season,
            postseason: self.postseason,
            team_size: self.team_size,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_path.trim().is_empty() {
            anyhow::bail!("database_path must not be empty");
        }
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("listen_addr '{}' is not a valid socket address", self.listen_addr);
        }
        if let Some(season) = self.current_season {
            if season < 1 {
                anyhow::bail!("current_season must be 1 or greater");
            }
        }
        match &self.command {
            Some(Command::Seed(args)) => {
                if args.teams < 2 {
                    anyhow::bail!("seed needs at least 2 teams");
                }
                if args.players_per_team < 2 {
                    anyhow::bail!("seed needs at least 2 players per team");
                }
                if args.seasons < 1 {
                    anyhow::bail!("seed needs at least 1 season");
                }
                if !(0.0..=1.0).contains(&args.postseason_fraction) {
                    anyhow::bail!("postseason_fraction must be between 0.0 and 1.0");
                }
            }
            Some(Command::HeadToHead(args)) => {
                if args.team1 == args.team2 {
                    anyhow::bail!("head-to-head needs two different teams");
                }
            }
            Some(Command::Serve) | None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("otl-stats").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_to_serving() {
        let config = parse(&["--database-path", "league.db"]);
        assert!(config.command.is_none());
        assert_eq!(config.database_path, "league.db");
        assert_eq!(config.min_kda_games, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_head_to_head() {
        let config = parse(&["head-to-head", "3", "7", "--postseason", "true"]);
        let Some(Command::HeadToHead(args)) = &config.command else {
            panic!("expected head-to-head, got {:?}", config.command);
        };
        assert_eq!((args.team1, args.team2), (3, 7));
        assert_eq!(args.filter().postseason, Some(true));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["head-to-head", "3", "3"]).validate().is_err());
        assert!(parse(&["--listen-addr", "nope"]).validate().is_err());
        assert!(parse(&["seed", "--teams", "1"]).validate().is_err());
        assert!(parse(&["seed", "--postseason-fraction", "1.5"]).validate().is_err());
        assert!(parse(&["--current-season", "0"]).validate().is_err());
    }

    #[test]
    fn seed_args_map_to_options() {
        let config = parse(&["seed", "--matches", "12", "--seed", "9"]);
        let Some(Command::Seed(args)) = &config.command else {
            panic!("expected seed");
        };
        let opts = args.options();
        assert_eq!(opts.matches_per_season, 12);
        assert_eq!(opts.seed, Some(9));
        assert_eq!(opts.teams, 8);
    }
}
