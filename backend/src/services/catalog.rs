use sqlx::SqlitePool;

use crate::db;
use crate::error::{Error, Result};
use crate::models::{Competition, PageRequest, Player, Team};
use crate::utils::{name_matches, paginate};

pub async fn list_competitions(pool: &SqlitePool) -> Result<Vec<Competition>> {
    db::get_all_competitions(pool).await
}

/// Teams of a competition, optionally filtered by a case-insensitive name substring.
pub async fn teams_by_competition(
    pool: &SqlitePool,
    competition_code: &str,
    name_filter: Option<&str>,
    page: PageRequest,
) -> Result<Vec<Team>> {
    let competition = db::get_competition_by_code(pool, competition_code)
        .await?
        .ok_or_else(|| Error::CompetitionNotFound(competition_code.to_string()))?;

    let teams = db::get_competition_teams(pool, &competition.id).await?;
    let teams = match name_filter.filter(|n| !n.is_empty()) {
        Some(filter) => teams.into_iter().filter(|t| name_matches(&t.name, filter)).collect(),
        None => teams,
    };

    Ok(paginate(teams, page))
}

/// Players of every team in a competition, team by team, optionally narrowed to one TLA.
pub async fn players_by_competition(
    pool: &SqlitePool,
    competition_code: &str,
    team_tla: Option<&str>,
    page: PageRequest,
) -> Result<Vec<Player>> {
    let competition = db::get_competition_by_code(pool, competition_code)
        .await?
        .ok_or_else(|| Error::CompetitionNotFound(competition_code.to_string()))?;

    let mut teams = db::get_competition_teams(pool, &competition.id).await?;
    if let Some(tla) = team_tla {
        teams.retain(|t| t.tla.as_deref() == Some(tla));
        if teams.is_empty() {
            return Err(Error::TeamNotFound(tla.to_string()));
        }
    }

    let mut players = Vec::new();
    for team in &teams {
        players.extend(db::get_team_players(pool, &team.id).await?);
    }

    Ok(paginate(players, page))
}

pub async fn players_by_team(pool: &SqlitePool, team_tla: &str) -> Result<Vec<Player>> {
    let team = db::get_team_by_tla(pool, team_tla)
        .await?
        .ok_or_else(|| Error::TeamNotFound(team_tla.to_string()))?;

    db::get_team_players(pool, &team.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::models::{NewCompetition, NewPlayer, NewTeam};

    fn page(page: usize, limit: usize) -> PageRequest {
        PageRequest { page, limit }
    }

    async fn seed_team(pool: &SqlitePool, competition_id: &str, external_id: i64, tla: &str, name: &str) -> String {
        let team = db::upsert_team(pool, &NewTeam {
            external_id,
            tla: Some(tla.to_string()),
            name: name.to_string(),
            short_name: None,
            crest: None,
            website: None,
            founded: None,
            club_colors: None,
        }).await.unwrap();
        db::link_competition_team(pool, competition_id, &team.id).await.unwrap();
        team.id
    }

    async fn seed_players(pool: &SqlitePool, team_id: &str, external_ids: std::ops::Range<i64>) {
        for external_id in external_ids {
            let player = db::insert_player(pool, &NewPlayer {
                external_id,
                name: format!("Player {}", external_id),
                position: None,
                date_of_birth: None,
                nationality: None,
                shirt_number: None,
                section: None,
            }).await.unwrap();
            db::link_team_player(pool, team_id, &player.id).await.unwrap();
        }
    }

    /// PL with ARS (players 0..15) and CHE (players 15..25): 25 players total.
    async fn seeded_pool() -> SqlitePool {
        let pool = create_memory_pool().await.unwrap();
        let pl = db::insert_competition(&pool, &NewCompetition {
            external_id: 2021,
            code: "PL".into(),
            name: "Premier League".into(),
        }).await.unwrap();
        let ars = seed_team(&pool, &pl.id, 57, "ARS", "Arsenal FC").await;
        let che = seed_team(&pool, &pl.id, 61, "CHE", "Chelsea FC").await;
        seed_players(&pool, &ars, 0..15).await;
        seed_players(&pool, &che, 15..25).await;
        pool
    }

    fn external_ids(players: &[Player]) -> Vec<i64> {
        players.iter().map(|p| p.external_id).collect()
    }

    #[tokio::test]
    async fn test_players_pagination() {
        let pool = seeded_pool().await;

        let first = players_by_competition(&pool, "PL", None, page(1, 12)).await.unwrap();
        assert_eq!(external_ids(&first), (0..12).collect::<Vec<_>>());

        let third = players_by_competition(&pool, "PL", None, page(3, 12)).await.unwrap();
        assert_eq!(external_ids(&third), vec![24]);

        let fourth = players_by_competition(&pool, "PL", None, page(4, 12)).await.unwrap();
        assert!(fourth.is_empty());
    }

    #[tokio::test]
    async fn test_players_filtered_by_tla() {
        let pool = seeded_pool().await;
        let chelsea = players_by_competition(&pool, "PL", Some("CHE"), PageRequest::default()).await.unwrap();
        assert_eq!(external_ids(&chelsea), (15..25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_unknown_tla_is_team_not_found() {
        let pool = seeded_pool().await;
        let err = players_by_competition(&pool, "PL", Some("LIV"), PageRequest::default()).await.unwrap_err();
        assert!(matches!(err, Error::TeamNotFound(ref tla) if tla == "LIV"));
    }

    #[tokio::test]
    async fn test_unknown_competition_is_competition_not_found() {
        let pool = seeded_pool().await;
        let err = players_by_competition(&pool, "SA", Some("CHE"), PageRequest::default()).await.unwrap_err();
        assert!(matches!(err, Error::CompetitionNotFound(_)));

        let err = teams_by_competition(&pool, "SA", None, PageRequest::default()).await.unwrap_err();
        assert!(matches!(err, Error::CompetitionNotFound(_)));
    }

    #[tokio::test]
    async fn test_team_name_filter_is_case_insensitive() {
        let pool = seeded_pool().await;
        let teams = teams_by_competition(&pool, "PL", Some("chel"), PageRequest::default()).await.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].tla.as_deref(), Some("CHE"));

        let all = teams_by_competition(&pool, "PL", None, page(1, 1)).await.unwrap();
        assert_eq!(all[0].tla.as_deref(), Some("ARS"));
        assert_eq!(all[0].players.len(), 15);
    }

    #[tokio::test]
    async fn test_players_by_team() {
        let pool = seeded_pool().await;
        assert_eq!(players_by_team(&pool, "ARS").await.unwrap().len(), 15);
        assert!(matches!(players_by_team(&pool, "LIV").await.unwrap_err(), Error::TeamNotFound(_)));
    }
}
