use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDate};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "todo-dev",
            Profile::Prod => "todo",
        }
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "todo-dev" instead of "todo"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "todo-lists", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path
/// If profile is Dev, uses "todo-dev" instead of "todo"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "todo-lists", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a calendar date.
///
/// Accepts ISO 8601 dates (`YYYY-MM-DD`) and RFC 3339 date-times; for the
/// latter the time of day is dropped, keeping the date as written.
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let trimmed = date_str.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

/// The local calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Format a date as an ISO 8601 string (YYYY-MM-DD)
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format a date with a user-supplied chrono format, falling back to ISO 8601
/// when the format string is invalid
pub fn format_date_with(date: NaiveDate, format: &str) -> String {
    let invalid = StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    if invalid {
        return format_date(date);
    }
    date.format(format).to_string()
}

/// Upper-case the first character of every whitespace-separated word.
/// Everything else, including the whitespace itself, is kept as is.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for c in input.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.push(c);
        }
    }
    out
}
