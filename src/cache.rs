use anyhow::Result;
use std::collections::HashMap;

use crate::db::models::Team;
use crate::db::Database;

/// Anything that can look a team up by id.
pub trait TeamSource {
    fn load_team(&self, id: i64) -> Result<Option<Team>>;
}

impl TeamSource for Database {
    fn load_team(&self, id: i64) -> Result<Option<Team>> {
        self.get_team(id)
    }
}

/// Per-request memo of team lookups. Build one per request and drop it with
/// the response; it is never shared between requests.
#[derive(Debug, Default)]
pub struct TeamCache {
    /// `None` records a lookup that found nothing
    teams: HashMap<i64, Option<Team>>,
}

impl TeamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache from an already-loaded team list.
    pub fn prime(&mut self, teams: impl IntoIterator<Item = Team>) {
        for team in teams {
            if let Some(id) = team.id {
                self.teams.insert(id, Some(team));
            }
        }
    }

    pub fn get<S: TeamSource + ?Sized>(&mut self, source: &S, id: i64) -> Result<Option<&Team>> {
        if !self.teams.contains_key(&id) {
            let team = source.load_team(id)?;
            self.teams.insert(id, team);
        }
        Ok(self.teams.get(&id).and_then(|t| t.as_ref()))
    }

    /// Display name for `id`, or a placeholder when the team does not exist.
    pub fn name<S: TeamSource + ?Sized>(&mut self, source: &S, id: i64) -> Result<String> {
        Ok(self
            .get(source, id)?
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("Team #{}", id)))
    }
}
