pub mod catalog;
pub mod football_data;
pub mod importer;
pub mod rate_limiter;

pub use football_data::FootballDataClient;
pub use importer::Importer;
