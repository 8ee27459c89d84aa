use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::{create_pool, init_database};
use crate::models::PageRequest;
use crate::services::{catalog, Importer};

async fn open_pool(config: &Config) -> Result<SqlitePool> {
    let pool = create_pool(&config.database_url).await?;
    init_database(&pool).await?;
    Ok(pool)
}

pub async fn import_competition(config: &Config, code: &str) -> Result<()> {
    let pool = open_pool(config).await?;
    let importer = Importer::from_config(pool, config);

    println!("📥 Importing competition {}...", code);
    println!("   (person lookups are throttled, a full league takes a while)");

    let summary = importer.import_competition(code).await?;

    if summary.already_imported {
        println!("ℹ️  Competition {} already imported, nothing to do", code);
        return Ok(());
    }

    println!("✅ Imported {}", code);
    println!("   Teams:   {} created, {} linked", summary.teams_created, summary.teams_linked);
    println!("   Players: {} created, {} linked", summary.players_created, summary.players_linked);
    if summary.enrichment_failures > 0 {
        println!("   ⚠️  {} players stored without person details", summary.enrichment_failures);
    }

    if !summary.is_complete() {
        println!("\n❌ {} entities failed:", summary.failures.len());
        for failure in &summary.failures {
            println!("   • {:?} {} (reached {:?}): {}", failure.entity, failure.external_id, failure.stage, failure.error);
        }
    }

    Ok(())
}

pub async fn list_competitions(config: &Config) -> Result<()> {
    let pool = open_pool(config).await?;
    let competitions = catalog::list_competitions(&pool).await?;

    if competitions.is_empty() {
        println!("📭 No competitions imported yet. Try: footimport import --code PL");
        return Ok(());
    }

    println!("🏆 Imported competitions:\n");
    for competition in competitions {
        println!("   • {} - {} ({} teams)", competition.code, competition.name, competition.teams.len());
    }

    Ok(())
}

pub async fn list_teams(config: &Config, competition: &str, name: Option<&str>, page: PageRequest) -> Result<()> {
    let pool = open_pool(config).await?;
    let teams = catalog::teams_by_competition(&pool, competition, name, page).await?;

    if teams.is_empty() {
        println!("📭 No teams on page {} for {}", page.page, competition);
        return Ok(());
    }

    println!("📋 Teams in {} (page {}):\n", competition, page.page);
    for team in teams {
        println!(
            "   • {} {} - founded {} ({} players)",
            team.tla.as_deref().unwrap_or("---"),
            team.name,
            team.founded.map_or("?".to_string(), |y| y.to_string()),
            team.players.len()
        );
    }

    Ok(())
}

pub async fn list_players(config: &Config, competition: &str, team: Option<&str>, page: PageRequest) -> Result<()> {
    let pool = open_pool(config).await?;
    let players = catalog::players_by_competition(&pool, competition, team, page).await?;

    if players.is_empty() {
        println!("📭 No players on page {} for {}", page.page, competition);
        return Ok(());
    }

    println!("👟 Players in {}{} (page {}):\n", competition, team.map_or(String::new(), |t| format!(" / {}", t)), page.page);
    for player in players {
        println!(
            "   {:>3} {} - {} ({})",
            player.shirt_number.map_or("-".to_string(), |n| n.to_string()),
            player.name,
            player.position.as_deref().unwrap_or("?"),
            player.nationality.as_deref().unwrap_or("?")
        );
    }

    Ok(())
}
