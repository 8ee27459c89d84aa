use axum::http::StatusCode;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Competition with code {0} not found")]
    CompetitionNotFound(String),

    #[error("Team with tla {0} not found")]
    TeamNotFound(String),

    #[error("FOOTBALL_DATA_TOKEN not set")]
    MissingToken,

    #[error("football-data API error {status} on {path}: {body}")]
    Upstream { status: u16, path: String, body: String },

    #[error("football-data API rate limit exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("invalid value '{value}' for {key}")]
    Config { key: String, value: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Timestamp(#[from] chrono::ParseError),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::CompetitionNotFound(_) | Error::TeamNotFound(_))
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        assert_eq!(Error::CompetitionNotFound("PL".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::TeamNotFound("ARS".into()).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upstream_maps_to_500() {
        let err = Error::Upstream { status: 403, path: "/competitions/PL".into(), body: "forbidden".into() };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_messages_distinguish_competition_and_team() {
        assert_eq!(Error::CompetitionNotFound("PL".into()).to_string(), "Competition with code PL not found");
        assert_eq!(Error::TeamNotFound("XYZ".into()).to_string(), "Team with tla XYZ not found");
    }
}
