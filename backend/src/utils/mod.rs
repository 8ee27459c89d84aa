use chrono::NaiveDate;

use crate::models::PageRequest;

/// Slice one page out of an already ordered list.
///
/// Pages are 1-based; a page below 1 is treated as the first page. Pages past
/// the end come back empty.
pub fn paginate<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    let start = page.page.max(1).saturating_sub(1).saturating_mul(page.limit);
    items.into_iter().skip(start).take(page.limit).collect()
}

/// Case-insensitive substring match used by the team name filter.
pub fn name_matches(name: &str, filter: &str) -> bool {
    name.to_lowercase().contains(&filter.to_lowercase())
}

/// football-data.org sends birth dates as "YYYY-MM-DD", occasionally with a
/// time suffix. Anything unparseable is dropped rather than failing the player.
pub fn parse_birth_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
