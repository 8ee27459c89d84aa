//! Competition → teams → players import.
//!
//! The walk is depth-first and strictly sequential: every squad member of a
//! team is settled before the next team starts, and teams are handled in the
//! order football-data.org lists them. Entity writes are insert-if-absent on
//! the external id, and reference sets are written through the link tables, so
//! running the same import twice leaves the store unchanged.
//!
//! Failures inside one team (its squad fetch, or any single player) are logged,
//! recorded in the [`ImportSummary`] and skipped. Failures above that level
//! abort the call; if the team list itself cannot be fetched, the competition
//! row is removed again so the next import retries from scratch.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::models::{
    EntityKind, ImportFailure, ImportStage, ImportSummary, NewCompetition, NewPlayer, NewTeam,
};
use crate::services::football_data::{ApiPerson, ApiSquadMember, ApiTeam, FootballApi, FootballDataClient};
use crate::services::rate_limiter::RateLimiter;
use crate::utils::parse_birth_date;

/// Per-invocation state. Nothing here outlives one `import_competition` call.
struct ImportRun {
    summary: ImportSummary,
    warmed_up: bool,
}

/// An error tagged with the last stage its entity reached.
struct StageError {
    stage: ImportStage,
    error: Error,
}

trait AtStage<T> {
    fn at(self, stage: ImportStage) -> std::result::Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: ImportStage) -> std::result::Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created,
    Linked,
}

pub struct Importer<A> {
    pool: SqlitePool,
    api: A,
    limiter: Arc<RateLimiter>,
    warmup: Duration,
}

impl Importer<FootballDataClient> {
    /// Production wiring: one limiter per importer, and one importer per process.
    pub fn from_config(pool: SqlitePool, config: &Config) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.throttle.min_interval));
        tracing::info!(
            "football-data throttle: {:?} between person lookups, {:?} warm-up",
            limiter.min_interval(),
            config.throttle.warmup
        );
        let client = FootballDataClient::new(config);
        if !client.has_token() {
            tracing::warn!("FOOTBALL_DATA_TOKEN not set — imports will fail until it is configured");
        }
        Self::new(pool, client, limiter, config.throttle.warmup)
    }
}

impl<A: FootballApi> Importer<A> {
    pub fn new(pool: SqlitePool, api: A, limiter: Arc<RateLimiter>, warmup: Duration) -> Self {
        Self { pool, api, limiter, warmup }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Import a competition by its code ("PL", "CL", ...).
    ///
    /// A code that is already stored is a no-op reported through
    /// `already_imported`.
    pub async fn import_competition(&self, code: &str) -> Result<ImportSummary> {
        let mut run = ImportRun { summary: ImportSummary::new(code), warmed_up: false };

        if db::get_competition_by_code(&self.pool, code).await?.is_some() {
            tracing::info!("Competition {} already imported", code);
            run.summary.already_imported = true;
            return Ok(run.summary);
        }

        let data = self.api.competition(code).await.map_err(|e| {
            tracing::error!("Error importing competition {}: {}", code, e);
            e
        })?;

        let stored = db::insert_competition(&self.pool, &NewCompetition {
            external_id: data.id,
            code: data.code.clone(),
            name: data.name.clone(),
        }).await?;

        // Lost a race with a concurrent import of the same code
        if !stored.created {
            tracing::info!("Competition {} already imported", code);
            run.summary.already_imported = true;
            return Ok(run.summary);
        }

        tracing::info!("Stored competition {} ({})", data.code, data.name);

        if let Err(e) = self.import_teams(data.id, &stored.id, &mut run).await {
            tracing::error!("Error importing teams of {}: {}", code, e);
            // No team linked yet: drop the row so a later import starts over
            match db::delete_competition_without_teams(&self.pool, &stored.id).await {
                Ok(true) => tracing::info!("Rolled back competition {}", code),
                Ok(false) => {}
                Err(cleanup) => tracing::error!("Could not roll back competition {}: {}", code, cleanup),
            }
            return Err(e);
        }

        let summary = run.summary;
        tracing::info!(
            "Imported {}: {} teams created, {} linked, {} players created, {} linked, {} failures",
            code,
            summary.teams_created,
            summary.teams_linked,
            summary.players_created,
            summary.players_linked,
            summary.failures.len()
        );
        Ok(summary)
    }

    async fn import_teams(&self, competition_external_id: i64, competition_id: &str, run: &mut ImportRun) -> Result<()> {
        let teams = self.api.competition_teams(competition_external_id).await?;
        tracing::info!("{} teams listed for competition {}", teams.len(), competition_external_id);

        for team in &teams {
            match self.import_team(team, competition_id, run).await {
                Ok(Outcome::Created) => run.summary.teams_created += 1,
                Ok(Outcome::Linked) => run.summary.teams_linked += 1,
                Err(StageError { stage, error }) => {
                    tracing::error!("Error importing team {} ({}): {}", team.id, team.name, error);
                    run.summary.failures.push(ImportFailure {
                        entity: EntityKind::Team,
                        external_id: team.id,
                        stage,
                        error: error.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Upsert one team and mirror it onto the competition. Only a newly
    /// created team gets its squad imported.
    async fn import_team(&self, team: &ApiTeam, competition_id: &str, run: &mut ImportRun) -> std::result::Result<Outcome, StageError> {
        let stored = db::upsert_team(&self.pool, &NewTeam {
            external_id: team.id,
            tla: team.tla.clone(),
            name: team.name.clone(),
            short_name: team.short_name.clone(),
            crest: team.crest.clone(),
            website: team.website.clone(),
            founded: team.founded,
            club_colors: team.club_colors.clone(),
        }).await.at(ImportStage::Unseen)?;

        db::link_competition_team(&self.pool, competition_id, &stored.id)
            .await
            .at(ImportStage::Persisted)?;

        if !stored.created {
            tracing::info!("Team {} already stored, linked to competition", team.name);
            return Ok(Outcome::Linked);
        }

        tracing::info!("Stored team {} ({})", team.name, team.id);
        self.import_players(team.id, &stored.id, run).await.at(ImportStage::Linked)?;
        Ok(Outcome::Created)
    }

    async fn import_players(&self, team_external_id: i64, team_id: &str, run: &mut ImportRun) -> Result<()> {
        let squad = self.api.team_squad(team_external_id).await?;

        for member in &squad {
            match self.import_player(member, team_id, run).await {
                Ok(Outcome::Created) => run.summary.players_created += 1,
                Ok(Outcome::Linked) => run.summary.players_linked += 1,
                Err(StageError { stage, error }) => {
                    tracing::error!("Error importing player {} ({}): {}", member.id, member.name, error);
                    run.summary.failures.push(ImportFailure {
                        entity: EntityKind::Player,
                        external_id: member.id,
                        stage,
                        error: error.to_string(),
                    });
                }
            }
        }

        tracing::info!("Squad of team {} done ({} members)", team_external_id, squad.len());
        Ok(())
    }

    async fn import_player(&self, member: &ApiSquadMember, team_id: &str, run: &mut ImportRun) -> std::result::Result<Outcome, StageError> {
        let existing = db::find_player_id(&self.pool, member.id).await.at(ImportStage::Unseen)?;

        let (player_id, outcome) = match existing {
            Some(player_id) => (player_id, Outcome::Linked),
            None => {
                let details = self.fetch_person(member.id, run).await;
                let stored = db::insert_player(&self.pool, &new_player(member, details))
                    .await
                    .at(ImportStage::Fetching)?;
                // A concurrent import may have stored the same player in between
                let outcome = if stored.created { Outcome::Created } else { Outcome::Linked };
                (stored.id, outcome)
            }
        };

        db::link_team_player(&self.pool, team_id, &player_id)
            .await
            .at(ImportStage::Persisted)?;

        Ok(outcome)
    }

    /// Throttled `/persons/{id}` lookup. Errors are recovered here: the squad
    /// entry alone is enough to store the player.
    async fn fetch_person(&self, person_id: i64, run: &mut ImportRun) -> Option<ApiPerson> {
        if !run.warmed_up {
            tracing::debug!("Warm-up {:?} before first throttled call", self.warmup);
            tokio::time::sleep(self.warmup).await;
            run.warmed_up = true;
        }

        match self.limiter.schedule(|| self.api.person(person_id)).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Enrichment for player {} unavailable, storing squad fields only: {}", person_id, e);
                run.summary.enrichment_failures += 1;
                None
            }
        }
    }
}

fn new_player(member: &ApiSquadMember, details: Option<ApiPerson>) -> NewPlayer {
    let details = details.unwrap_or_default();
    NewPlayer {
        external_id: member.id,
        name: member.name.clone(),
        position: member.position.clone(),
        date_of_birth: parse_birth_date(member.date_of_birth.as_deref()),
        nationality: member.nationality.clone(),
        shirt_number: details.shirt_number,
        section: details.section,
    }
}
