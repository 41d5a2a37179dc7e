use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::ids::Id;
use crate::utils;

/// The list every item falls back to. It always exists and cannot be deleted.
pub const DEFAULT_LIST_ID: Id = 1;
pub const DEFAULT_LIST_TITLE: &str = "Main";
pub const MAX_PRIORITY: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid date: '{0}'")]
    InvalidDate(String),
    #[error("Invalid priority: '{0}' (expected an integer from 0 to 5)")]
    InvalidPriority(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Type mismatch: expected {expected}, got '{found}'")]
    TypeMismatch { expected: &'static str, found: String },
}

/// Task priority, 0 (none) through 5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub fn value(self) -> u8 {
        self.0
    }

    /// Parse a priority from text. Integral floats such as `"3.0"` are accepted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidPriority(input.to_string());
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::try_from(n).map_err(|_| invalid());
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 => {
                Self::try_from(f as i64).map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<i64> for Priority {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(p) if p <= MAX_PRIORITY => Ok(Priority(p)),
            _ => Err(ValidationError::InvalidPriority(value.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read a completion flag from text. Only `true` and `false` are accepted.
pub fn parse_flag(input: &str) -> Result<bool, ValidationError> {
    match input.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ValidationError::TypeMismatch {
            expected: "boolean",
            found: other.to_string(),
        }),
    }
}

fn parse_due_date(input: &str) -> Result<NaiveDate, ValidationError> {
    utils::parse_date(input).ok_or_else(|| ValidationError::InvalidDate(input.to_string()))
}

fn non_negative(name: &str, value: i64) -> Result<u64, ValidationError> {
    u64::try_from(value).map_err(|_| {
        ValidationError::InvalidArgument(format!("{name} must be a non-negative integer, got {value}"))
    })
}

/// Attributes for a new item, as they arrive from a form or the command line.
/// Every field is optional; missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub id: Option<Id>,
    pub list_id: Option<Id>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<i64>,
    pub is_complete: Option<bool>,
}

impl ItemDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Field-level update for an item. Identity and completion are not editable here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub list_id: Option<Id>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<i64>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Form details applied to an existing item: identity and completion are dropped
impl From<ItemDraft> for ItemPatch {
    fn from(draft: ItemDraft) -> Self {
        Self {
            list_id: draft.list_id,
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            priority: draft.priority,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPatch {
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    id: Id,
    list_id: Id,
    title: String,
    description: String,
    due_date: NaiveDate,
    priority: Priority,
    is_complete: bool,
}

impl TodoItem {
    /// Build an item from a draft, validating every field first.
    /// `id` wins over `draft.id`; the caller owns id allocation.
    pub fn from_draft(id: Id, draft: ItemDraft) -> Result<Self, ValidationError> {
        let due_date = match draft.due_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_due_date(raw)?,
            _ => utils::today(),
        };
        let priority = match draft.priority {
            Some(p) => Priority::try_from(p)?,
            None => Priority::default(),
        };

        Ok(Self {
            id,
            list_id: draft.list_id.unwrap_or(DEFAULT_LIST_ID),
            title: draft.title.unwrap_or_default(),
            description: draft.description.unwrap_or_default(),
            due_date,
            priority,
            is_complete: draft.is_complete.unwrap_or(false),
        })
    }

    /// Rebuild an item from its persisted form, applying the same validation
    pub fn from_record(record: ItemRecord) -> Result<Self, ValidationError> {
        let priority = if record.priority.trim().is_empty() {
            Priority::default()
        } else {
            Priority::parse(&record.priority)?
        };
        Ok(Self {
            id: record.id,
            list_id: record.list_id,
            title: record.title,
            description: record.description,
            due_date: parse_due_date(&record.due_date)?,
            priority,
            is_complete: record.is_complete,
        })
    }

    pub fn to_record(&self) -> ItemRecord {
        ItemRecord {
            id: self.id,
            list_id: self.list_id,
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: utils::format_date(self.due_date),
            priority: self.priority.to_string(),
            is_complete: self.is_complete,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn list_id(&self) -> Id {
        self.list_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_due_date(&mut self, raw: &str) -> Result<(), ValidationError> {
        self.due_date = parse_due_date(raw)?;
        Ok(())
    }

    pub fn set_priority(&mut self, priority: i64) -> Result<(), ValidationError> {
        self.priority = Priority::try_from(priority)?;
        Ok(())
    }

    pub(crate) fn assign_id(&mut self, id: Id) {
        self.id = id;
    }

    pub(crate) fn set_list_id(&mut self, list_id: Id) {
        self.list_id = list_id;
    }

    /// Flip completion, or force it to `value` when one is given
    pub fn toggle_complete(&mut self, value: Option<bool>) -> bool {
        self.is_complete = value.unwrap_or(!self.is_complete);
        self.is_complete
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_on(utils::today())
    }

    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.due_date < today
    }

    pub fn is_due_in_exactly(&self, days: i64) -> Result<bool, ValidationError> {
        self.is_due_in_exactly_on(utils::today(), days)
    }

    pub fn is_due_in_exactly_on(&self, today: NaiveDate, days: i64) -> Result<bool, ValidationError> {
        let days = non_negative("days", days)?;
        Ok(today.checked_add_days(Days::new(days)) == Some(self.due_date))
    }

    pub fn is_due_within(&self, days: i64) -> Result<bool, ValidationError> {
        self.is_due_within_on(utils::today(), days)
    }

    /// Due today or within the next `days` days, inclusive
    pub fn is_due_within_on(&self, today: NaiveDate, days: i64) -> Result<bool, ValidationError> {
        let days = non_negative("days", days)?;
        if self.due_date < today {
            return Ok(false);
        }
        Ok(match today.checked_add_days(Days::new(days)) {
            Some(limit) => self.due_date <= limit,
            None => true,
        })
    }

    pub fn matches_priority(&self, priority: i64) -> Result<bool, ValidationError> {
        let priority = non_negative("priority", priority)?;
        Ok(u64::from(self.priority.value()) == priority)
    }

    pub fn compare_due_date(&self, other: &TodoItem) -> Ordering {
        self.due_date.cmp(&other.due_date)
    }

    pub fn compare_priority(&self, other: &TodoItem) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoList {
    id: Id,
    title: String,
    can_delete: bool,
}

impl TodoList {
    /// A missing title falls back to the default list's title
    pub fn new(title: Option<&str>, id: Id) -> Self {
        Self {
            id,
            title: utils::title_case(title.unwrap_or(DEFAULT_LIST_TITLE)),
            can_delete: id != DEFAULT_LIST_ID,
        }
    }

    pub fn default_list() -> Self {
        Self::new(None, DEFAULT_LIST_ID)
    }

    pub fn from_record(record: ListRecord) -> Self {
        Self::new(Some(&record.title), record.id)
    }

    pub fn to_record(&self) -> ListRecord {
        ListRecord {
            id: self.id,
            title: self.title.clone(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn can_delete(&self) -> bool {
        self.can_delete
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = utils::title_case(title);
    }
}

/// Persisted shape of an item. Dates are ISO calendar dates and the priority
/// is an integer string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: Id,
    pub list_id: Id,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub priority: String,
    #[serde(default)]
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRecord {
    pub id: Id,
    #[serde(default)]
    pub title: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}
