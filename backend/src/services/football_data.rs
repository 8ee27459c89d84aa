use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};

// ── football-data.org structures ────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCompetition {
    pub id: i64,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiTeams {
    pub teams: Vec<ApiTeam>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTeam {
    pub id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub tla: Option<String>,
    pub crest: Option<String>,
    pub website: Option<String>,
    pub founded: Option<i32>,
    pub club_colors: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTeamDetail {
    #[serde(default)]
    pub squad: Vec<ApiSquadMember>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSquadMember {
    pub id: i64,
    pub name: String,
    pub position: Option<String>,
    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
}

/// The subset of `/persons/{id}` used to enrich a squad member.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPerson {
    pub section: Option<String>,
    pub shirt_number: Option<i32>,
}

// ── FootballApi ──────────────────────────────────────────────────────────────

/// The four upstream resources the importer reads.
#[async_trait]
pub trait FootballApi: Send + Sync {
    async fn competition(&self, code: &str) -> Result<ApiCompetition>;

    async fn competition_teams(&self, competition_id: i64) -> Result<Vec<ApiTeam>>;

    async fn team_squad(&self, team_id: i64) -> Result<Vec<ApiSquadMember>>;

    /// `Ok(None)` when the upstream answers with an empty body.
    async fn person(&self, person_id: i64) -> Result<Option<ApiPerson>>;
}

pub struct FootballDataClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl FootballDataClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.football_data_url.clone(),
            token: config.football_data_token.clone(),
            max_attempts: config.throttle.max_attempts,
            retry_backoff: config.throttle.retry_backoff,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// GET `path`, retrying 429s with exponential backoff. Returns the raw body.
    async fn get(&self, path: &str) -> Result<String> {
        let token = self.token.as_ref().ok_or(Error::MissingToken)?;
        let url = format!("{}{}", self.base_url, path);

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let response = self.client
                .get(&url)
                .header("X-Auth-Token", token)
                .send().await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempts >= self.max_attempts {
                    return Err(Error::RateLimited { attempts });
                }
                let wait = retry_delay(self.retry_backoff, attempts);
                tracing::warn!("football-data 429 on {} — waiting {:?} (attempt {})", path, wait, attempts);
                tokio::time::sleep(wait).await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Upstream { status, path: path.to_string(), body });
            }

            return Ok(response.text().await?);
        }
    }
}

/// `backoff * 2^(attempt - 1)`, saturating instead of overflowing.
fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    backoff.saturating_mul(factor)
}

#[async_trait]
impl FootballApi for FootballDataClient {
    async fn competition(&self, code: &str) -> Result<ApiCompetition> {
        tracing::info!("Fetching competition {} from football-data.org…", code);
        let body = self.get(&format!("/competitions/{}", code)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn competition_teams(&self, competition_id: i64) -> Result<Vec<ApiTeam>> {
        tracing::info!("Fetching teams of competition {}…", competition_id);
        let body = self.get(&format!("/competitions/{}/teams", competition_id)).await?;
        let data: ApiTeams = serde_json::from_str(&body)?;
        Ok(data.teams)
    }

    async fn team_squad(&self, team_id: i64) -> Result<Vec<ApiSquadMember>> {
        tracing::info!("Fetching squad of team {}…", team_id);
        let body = self.get(&format!("/teams/{}", team_id)).await?;
        let data: ApiTeamDetail = serde_json::from_str(&body)?;
        Ok(data.squad)
    }

    async fn person(&self, person_id: i64) -> Result<Option<ApiPerson>> {
        let body = self.get(&format!("/persons/{}", person_id)).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
