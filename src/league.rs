use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::team::{random_seed, Team, TeamDraft};
use crate::error::AppError;
use crate::http;

// ============================================================================
// Request / response types
// ============================================================================

/// League hosts the import endpoint knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Sleeper,
    Mfl,
    Espn,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::Sleeper => "sleeper",
            Provider::Mfl => "mfl",
            Provider::Espn => "espn",
        })
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sleeper" => Ok(Provider::Sleeper),
            "mfl" => Ok(Provider::Mfl),
            "espn" => Ok(Provider::Espn),
            other => Err(AppError::Validation(format!("Unsupported provider '{other}'"))),
        }
    }
}

/// Import request. ESPN private leagues additionally need the SWID / espn_s2 cookies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueRequest {
    pub provider: Provider,
    pub league_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s2: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeagueInfo {
    #[serde(default)]
    pub name: Option<String>,
}

/// A team as the import endpoint reports it. Ids may arrive as numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportedTeam {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeagueResponse {
    #[serde(default)]
    pub league: LeagueInfo,
    #[serde(default)]
    pub teams: Vec<ImportedTeam>,
}

fn string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// An imported league, normalized into generation-ready teams.
#[derive(Debug, Clone)]
pub struct League {
    pub name: String,
    pub teams: Vec<Team>,
}

/// Assign every team a distinct id. Provider ids win; missing or repeated ids
/// fall back to the 1-based position, suffixed until unused.
fn unique_ids(raw: &[Option<String>]) -> Vec<String> {
    let reserved: HashSet<&str> = raw
        .iter()
        .flatten()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(raw.len());

    raw.iter()
        .enumerate()
        .map(|(i, id)| {
            let provided = id.as_deref().map(str::trim).filter(|id| !id.is_empty());
            let id = match provided {
                Some(id) if !taken.contains(id) => id.to_string(),
                _ => {
                    let base = (i + 1).to_string();
                    let mut candidate = base.clone();
                    let mut n = 1;
                    while taken.contains(&candidate) || reserved.contains(candidate.as_str()) {
                        candidate = format!("{base}-{n}");
                        n += 1;
                    }
                    candidate
                }
            };
            taken.insert(id.clone());
            id
        })
        .collect()
}

impl LeagueResponse {
    pub fn into_league(self) -> League {
        let ids = unique_ids(&self.teams.iter().map(|t| t.id.clone()).collect::<Vec<_>>());
        let teams = self
            .teams
            .into_iter()
            .zip(ids)
            .enumerate()
            .map(|(i, (t, id))| {
                TeamDraft {
                    id: Some(id),
                    name: t.name,
                    owner: t.owner,
                    seed: Some(random_seed() as i64),
                    ..Default::default()
                }
                .normalize(i)
            })
            .collect();
        League {
            name: self.league.name.unwrap_or_else(|| "League".into()),
            teams,
        }
    }
}

// ============================================================================
// LeagueClient
// ============================================================================

/// HTTP client for the league-import endpoint.
pub struct LeagueClient {
    http: reqwest::Client,
    endpoint: String,
}

impl LeagueClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// `POST {endpoint}` -- fetch and normalize a league's teams.
    pub async fn load(&self, request: &LeagueRequest) -> Result<League, AppError> {
        if request.league_id.trim().is_empty() {
            return Err(AppError::Validation("leagueId cannot be empty".into()));
        }
        let request = LeagueRequest {
            league_id: request.league_id.trim().to_string(),
            ..request.clone()
        };

        tracing::info!(provider = %request.provider, league_id = %request.league_id, "Loading league");
        let resp: LeagueResponse = http::send_json(self.http.post(&self.endpoint).json(&request)).await?;
        let league = resp.into_league();
        tracing::info!(league = %league.name, teams = league.teams.len(), "League loaded");
        Ok(league)
    }
}
