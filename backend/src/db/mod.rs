use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if let Some(parent) = std::path::Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Single-connection in-memory database; every extra connection would see its own empty db.
#[cfg(test)]
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    init_database(&pool).await?;
    Ok(pool)
}

pub async fn init_database(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS competitions (
            id TEXT PRIMARY KEY,
            external_id INTEGER NOT NULL UNIQUE,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            external_id INTEGER NOT NULL UNIQUE,
            tla TEXT,
            name TEXT NOT NULL,
            short_name TEXT,
            crest TEXT,
            website TEXT,
            founded INTEGER,
            club_colors TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id TEXT PRIMARY KEY,
            external_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            position TEXT,
            date_of_birth TEXT,
            nationality TEXT,
            shirt_number INTEGER,
            section TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per mirrored pair: competition.teams <-> team.competitions
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS competition_teams (
            competition_id TEXT NOT NULL,
            team_id TEXT NOT NULL,
            linked_at TEXT NOT NULL,
            PRIMARY KEY (competition_id, team_id),
            FOREIGN KEY (competition_id) REFERENCES competitions (id),
            FOREIGN KEY (team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // team.players <-> player.teams
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_players (
            team_id TEXT NOT NULL,
            player_id TEXT NOT NULL,
            linked_at TEXT NOT NULL,
            PRIMARY KEY (team_id, player_id),
            FOREIGN KEY (team_id) REFERENCES teams (id),
            FOREIGN KEY (player_id) REFERENCES players (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_teams_tla ON teams(tla)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_competition_teams_team ON competition_teams(team_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_team_players_player ON team_players(player_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

// Competition operations

/// Insert-if-absent keyed on code/external id. Never touches an existing row.
pub async fn insert_competition(pool: &SqlitePool, competition: &NewCompetition) -> Result<Upserted> {
    let result = sqlx::query(
        r#"
        INSERT INTO competitions (id, external_id, code, name, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(competition.external_id)
    .bind(&competition.code)
    .bind(&competition.name)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let id: String = sqlx::query_scalar(
        "SELECT id FROM competitions WHERE code = ? OR external_id = ? LIMIT 1",
    )
    .bind(&competition.code)
    .bind(competition.external_id)
    .fetch_one(pool)
    .await?;

    Ok(Upserted { id, created: result.rows_affected() == 1 })
}

/// Drops a competition row that never got a team linked. Returns whether it was removed.
pub async fn delete_competition_without_teams(pool: &SqlitePool, competition_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM competitions
        WHERE id = ?
          AND NOT EXISTS (SELECT 1 FROM competition_teams WHERE competition_id = ?)
        "#,
    )
    .bind(competition_id)
    .bind(competition_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_competition_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Competition>> {
    let row = sqlx::query("SELECT * FROM competitions WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(competition_from_row(pool, &row).await?)),
        None => Ok(None),
    }
}

pub async fn get_all_competitions(pool: &SqlitePool) -> Result<Vec<Competition>> {
    let rows = sqlx::query("SELECT * FROM competitions ORDER BY created_at, code")
        .fetch_all(pool)
        .await?;

    let mut competitions = Vec::new();
    for row in rows {
        competitions.push(competition_from_row(pool, &row).await?);
    }
    Ok(competitions)
}

async fn competition_from_row(pool: &SqlitePool, row: &SqliteRow) -> Result<Competition> {
    let id: String = row.get("id");
    let teams = sqlx::query_scalar(
        "SELECT team_id FROM competition_teams WHERE competition_id = ? ORDER BY rowid",
    )
    .bind(&id)
    .fetch_all(pool)
    .await?;

    Ok(Competition {
        id,
        external_id: row.get("external_id"),
        code: row.get("code"),
        name: row.get("name"),
        teams,
        created_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))?.with_timezone(&Utc),
    })
}

// Team operations

pub async fn upsert_team(pool: &SqlitePool, team: &NewTeam) -> Result<Upserted> {
    let result = sqlx::query(
        r#"
        INSERT INTO teams
        (id, external_id, tla, name, short_name, crest, website, founded, club_colors, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(external_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(team.external_id)
    .bind(&team.tla)
    .bind(&team.name)
    .bind(&team.short_name)
    .bind(&team.crest)
    .bind(&team.website)
    .bind(team.founded)
    .bind(&team.club_colors)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let id: String = sqlx::query_scalar("SELECT id FROM teams WHERE external_id = ?")
        .bind(team.external_id)
        .fetch_one(pool)
        .await?;

    Ok(Upserted { id, created: result.rows_affected() == 1 })
}

/// Adds the pair to both reference sets. Returns false when it was already there.
pub async fn link_competition_team(pool: &SqlitePool, competition_id: &str, team_id: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO competition_teams (competition_id, team_id, linked_at) VALUES (?, ?, ?)",
    )
    .bind(competition_id)
    .bind(team_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
pub async fn get_team_by_id(pool: &SqlitePool, team_id: &str) -> Result<Option<Team>> {
    let row = sqlx::query("SELECT * FROM teams WHERE id = ?")
        .bind(team_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(team_from_row(pool, &row).await?)),
        None => Ok(None),
    }
}

/// TLAs are not unique across football-data.org; on a clash the lowest external id wins.
pub async fn get_team_by_tla(pool: &SqlitePool, tla: &str) -> Result<Option<Team>> {
    let row = sqlx::query("SELECT * FROM teams WHERE tla = ? ORDER BY external_id LIMIT 1")
        .bind(tla)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(team_from_row(pool, &row).await?)),
        None => Ok(None),
    }
}

/// Teams of a competition in the order they were linked.
pub async fn get_competition_teams(pool: &SqlitePool, competition_id: &str) -> Result<Vec<Team>> {
    let rows = sqlx::query(
        r#"SELECT t.* FROM teams t
           JOIN competition_teams ct ON ct.team_id = t.id
           WHERE ct.competition_id = ?
           ORDER BY ct.rowid"#,
    )
    .bind(competition_id)
    .fetch_all(pool)
    .await?;

    let mut teams = Vec::new();
    for row in rows {
        teams.push(team_from_row(pool, &row).await?);
    }
    Ok(teams)
}

async fn team_from_row(pool: &SqlitePool, row: &SqliteRow) -> Result<Team> {
    let id: String = row.get("id");
    let competitions = sqlx::query_scalar(
        "SELECT competition_id FROM competition_teams WHERE team_id = ? ORDER BY rowid",
    )
    .bind(&id)
    .fetch_all(pool)
    .await?;
    let players = sqlx::query_scalar("SELECT player_id FROM team_players WHERE team_id = ? ORDER BY rowid")
        .bind(&id)
        .fetch_all(pool)
        .await?;

    Ok(Team {
        id,
        external_id: row.get("external_id"),
        tla: row.get("tla"),
        name: row.get("name"),
        short_name: row.get("short_name"),
        crest: row.get("crest"),
        website: row.get("website"),
        founded: row.get("founded"),
        club_colors: row.get("club_colors"),
        competitions,
        players,
        created_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))?.with_timezone(&Utc),
    })
}

// Player operations

pub async fn find_player_id(pool: &SqlitePool, external_id: i64) -> Result<Option<String>> {
    let id = sqlx::query_scalar("SELECT id FROM players WHERE external_id = ?")
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

pub async fn insert_player(pool: &SqlitePool, player: &NewPlayer) -> Result<Upserted> {
    let result = sqlx::query(
        r#"
        INSERT INTO players
        (id, external_id, name, position, date_of_birth, nationality, shirt_number, section, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(external_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(player.external_id)
    .bind(&player.name)
    .bind(&player.position)
    .bind(player.date_of_birth)
    .bind(&player.nationality)
    .bind(player.shirt_number)
    .bind(&player.section)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let id: String = sqlx::query_scalar("SELECT id FROM players WHERE external_id = ?")
        .bind(player.external_id)
        .fetch_one(pool)
        .await?;

    Ok(Upserted { id, created: result.rows_affected() == 1 })
}

pub async fn link_team_player(pool: &SqlitePool, team_id: &str, player_id: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO team_players (team_id, player_id, linked_at) VALUES (?, ?, ?)",
    )
    .bind(team_id)
    .bind(player_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
pub async fn get_player_by_external_id(pool: &SqlitePool, external_id: i64) -> Result<Option<Player>> {
    let row = sqlx::query("SELECT * FROM players WHERE external_id = ?")
        .bind(external_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(player_from_row(pool, &row).await?)),
        None => Ok(None),
    }
}

/// Squad of one team in the order players were linked.
pub async fn get_team_players(pool: &SqlitePool, team_id: &str) -> Result<Vec<Player>> {
    let rows = sqlx::query(
        r#"SELECT p.* FROM players p
           JOIN team_players tp ON tp.player_id = p.id
           WHERE tp.team_id = ?
           ORDER BY tp.rowid"#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    let mut players = Vec::new();
    for row in rows {
        players.push(player_from_row(pool, &row).await?);
    }
    Ok(players)
}

async fn player_from_row(pool: &SqlitePool, row: &SqliteRow) -> Result<Player> {
    let id: String = row.get("id");
    let teams = sqlx::query_scalar("SELECT team_id FROM team_players WHERE player_id = ? ORDER BY rowid")
        .bind(&id)
        .fetch_all(pool)
        .await?;

    Ok(Player {
        id,
        external_id: row.get("external_id"),
        name: row.get("name"),
        position: row.get("position"),
        date_of_birth: row.get("date_of_birth"),
        nationality: row.get("nationality"),
        shirt_number: row.get("shirt_number"),
        section: row.get("section"),
        teams,
        created_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))?.with_timezone(&Utc),
    })
}

#[cfg(test)]
pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_team(external_id: i64, tla: &str) -> NewTeam {
        NewTeam {
            external_id,
            tla: Some(tla.to_string()),
            name: format!("{} FC", tla),
            short_name: None,
            crest: None,
            website: None,
            founded: Some(1886),
            club_colors: None,
        }
    }

    fn new_player(external_id: i64, name: &str) -> NewPlayer {
        NewPlayer {
            external_id,
            name: name.to_string(),
            position: Some("Midfield".to_string()),
            date_of_birth: chrono::NaiveDate::from_ymd_opt(1995, 5, 17),
            nationality: Some("England".to_string()),
            shirt_number: Some(8),
            section: None,
        }
    }

    #[tokio::test]
    async fn test_insert_competition_is_idempotent() {
        let pool = create_memory_pool().await.unwrap();
        let pl = NewCompetition { external_id: 2021, code: "PL".into(), name: "Premier League".into() };

        let first = insert_competition(&pool, &pl).await.unwrap();
        let second = insert_competition(&pool, &pl).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(count_rows(&pool, "competitions").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_competition_only_without_teams() {
        let pool = create_memory_pool().await.unwrap();
        let pl = NewCompetition { external_id: 2021, code: "PL".into(), name: "Premier League".into() };
        let cl = NewCompetition { external_id: 2001, code: "CL".into(), name: "Champions League".into() };
        let empty = insert_competition(&pool, &pl).await.unwrap();
        let linked = insert_competition(&pool, &cl).await.unwrap();
        let team = upsert_team(&pool, &new_team(57, "ARS")).await.unwrap();
        link_competition_team(&pool, &linked.id, &team.id).await.unwrap();

        assert!(delete_competition_without_teams(&pool, &empty.id).await.unwrap());
        assert!(!delete_competition_without_teams(&pool, &linked.id).await.unwrap());
        assert!(get_competition_by_code(&pool, "PL").await.unwrap().is_none());
        assert!(get_competition_by_code(&pool, "CL").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_upsert_team_keeps_original_fields() {
        let pool = create_memory_pool().await.unwrap();
        let first = upsert_team(&pool, &new_team(57, "ARS")).await.unwrap();

        let mut renamed = new_team(57, "ARS");
        renamed.name = "Renamed".into();
        let second = upsert_team(&pool, &renamed).await.unwrap();

        assert!(first.created && !second.created);
        let stored = get_team_by_id(&pool, &first.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "ARS FC");
        assert_eq!(stored.founded, Some(1886));
    }

    #[tokio::test]
    async fn test_links_are_mirrored_sets() {
        let pool = create_memory_pool().await.unwrap();
        let pl = NewCompetition { external_id: 2021, code: "PL".into(), name: "Premier League".into() };
        let competition = insert_competition(&pool, &pl).await.unwrap();
        let team = upsert_team(&pool, &new_team(57, "ARS")).await.unwrap();
        let player = insert_player(&pool, &new_player(7784, "Declan Rice")).await.unwrap();

        assert!(link_competition_team(&pool, &competition.id, &team.id).await.unwrap());
        assert!(!link_competition_team(&pool, &competition.id, &team.id).await.unwrap());
        assert!(link_team_player(&pool, &team.id, &player.id).await.unwrap());
        assert!(!link_team_player(&pool, &team.id, &player.id).await.unwrap());

        let stored_competition = get_competition_by_code(&pool, "PL").await.unwrap().unwrap();
        assert_eq!(stored_competition.teams, vec![team.id.clone()]);

        let stored_team = get_team_by_id(&pool, &team.id).await.unwrap().unwrap();
        assert_eq!(stored_team.competitions, vec![competition.id.clone()]);
        assert_eq!(stored_team.players, vec![player.id.clone()]);

        let stored_player = get_player_by_external_id(&pool, 7784).await.unwrap().unwrap();
        assert_eq!(stored_player.teams, vec![team.id]);
        assert_eq!(stored_player.date_of_birth, chrono::NaiveDate::from_ymd_opt(1995, 5, 17));
    }

    #[tokio::test]
    async fn test_team_players_follow_link_order() {
        let pool = create_memory_pool().await.unwrap();
        let team = upsert_team(&pool, &new_team(57, "ARS")).await.unwrap();
        for (external_id, name) in [(3, "Saka"), (1, "Raya"), (2, "Saliba")] {
            let player = insert_player(&pool, &new_player(external_id, name)).await.unwrap();
            link_team_player(&pool, &team.id, &player.id).await.unwrap();
        }

        let names: Vec<String> = get_team_players(&pool, &team.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Saka", "Raya", "Saliba"]);
    }

    #[tokio::test]
    async fn test_tla_clash_resolves_to_lowest_external_id() {
        let pool = create_memory_pool().await.unwrap();
        upsert_team(&pool, &new_team(1044, "AFC")).await.unwrap();
        upsert_team(&pool, &new_team(1016, "AFC")).await.unwrap();

        let team = get_team_by_tla(&pool, "AFC").await.unwrap().unwrap();
        assert_eq!(team.external_id, 1016);
    }

    #[tokio::test]
    async fn test_find_player_id_missing() {
        let pool = create_memory_pool().await.unwrap();
        assert!(find_player_id(&pool, 42).await.unwrap().is_none());
    }
}
