use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competition {
    pub id: String,
    pub external_id: i64,
    pub code: String, // "PL", "CL", ...
    pub name: String,
    pub teams: Vec<String>, // team ids, in link order
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub external_id: i64,
    pub tla: Option<String>,
    pub name: String,
    pub short_name: Option<String>,
    pub crest: Option<String>,
    pub website: Option<String>,
    pub founded: Option<i32>,
    pub club_colors: Option<String>,
    pub competitions: Vec<String>,
    pub players: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub external_id: i64,
    pub name: String,
    pub position: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub shirt_number: Option<i32>,
    pub section: Option<String>,
    pub teams: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// Insert payloads: scalar fields only, references are written through the link tables.

#[derive(Debug, Clone)]
pub struct NewCompetition {
    pub external_id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewTeam {
    pub external_id: i64,
    pub tla: Option<String>,
    pub name: String,
    pub short_name: Option<String>,
    pub crest: Option<String>,
    pub website: Option<String>,
    pub founded: Option<i32>,
    pub club_colors: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub external_id: i64,
    pub name: String,
    pub position: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub shirt_number: Option<i32>,
    pub section: Option<String>,
}

/// Result of an insert-if-absent: the stored row's local id and whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub id: String,
    pub created: bool,
}

// ── Import reporting ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Team,
    Player,
}

/// Per-entity import progress. Only ever moves forward within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStage {
    Unseen,
    Fetching,
    Persisted,
    Linked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFailure {
    pub entity: EntityKind,
    pub external_id: i64,
    /// Last stage the entity reached before the error.
    pub stage: ImportStage,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub competition_code: String,
    pub already_imported: bool,
    pub teams_created: usize,
    pub teams_linked: usize,
    pub players_created: usize,
    pub players_linked: usize,
    pub enrichment_failures: usize,
    pub failures: Vec<ImportFailure>,
}

impl ImportSummary {
    pub fn new(competition_code: &str) -> Self {
        Self {
            competition_code: competition_code.to_string(),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// ── Read layer ───────────────────────────────────────────────────────────────

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: usize, // 1-based
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
    }
}

impl PageRequest {
    pub fn new(page: Option<usize>, limit: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
        }
    }
}

// API Response types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
