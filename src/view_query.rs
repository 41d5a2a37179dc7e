//! Display state: which list is selected and how its items are filtered and
//! ordered. The state is persisted under [`VIEW_OPTIONS_KEY`] on every change
//! and reloaded at startup, option by option, falling back to defaults for
//! anything missing or unreadable.

use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

use crate::ids::Id;
use crate::models::{Priority, TodoItem, TodoList};
use crate::storage::{KeyValueStore, VIEW_OPTIONS_KEY};
use crate::utils;

/// Selector value for the pseudo-list holding every item
pub const ALL_LISTS: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewQueryError {
    #[error("Option '{0}' does not exist in the view query")]
    UnknownOption(String),
    #[error("'{selection}' is not a valid selection for {option}")]
    InvalidSelection { option: OptionKey, selection: String },
}

/// Either every item, or the items of one list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ListSelection {
    #[default]
    All,
    List(Id),
}

impl ListSelection {
    /// `None` for the all-items pseudo-list
    pub fn list_id(self) -> Option<Id> {
        match self {
            ListSelection::All => None,
            ListSelection::List(id) => Some(id),
        }
    }

    /// Read `"all"` or a positive numeric id
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case(ALL_LISTS) {
            return Some(ListSelection::All);
        }
        match trimmed.parse::<Id>() {
            Ok(id) if id > 0 => Some(ListSelection::List(id)),
            _ => None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().filter(|id| *id > 0).map(ListSelection::List),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    fn to_value(self) -> Value {
        match self {
            ListSelection::All => json!(ALL_LISTS),
            ListSelection::List(id) => json!(id),
        }
    }
}

impl From<Id> for ListSelection {
    fn from(id: Id) -> Self {
        ListSelection::List(id)
    }
}

impl From<&TodoList> for ListSelection {
    fn from(list: &TodoList) -> Self {
        ListSelection::List(list.id())
    }
}

impl fmt::Display for ListSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListSelection::All => write!(f, "{ALL_LISTS}"),
            ListSelection::List(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DueDateFilter {
    #[default]
    All,
    Overdue,
    Today,
    Tomorrow,
    Week,
    Month,
}

impl DueDateFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            DueDateFilter::All => "all",
            DueDateFilter::Overdue => "overdue",
            DueDateFilter::Today => "today",
            DueDateFilter::Tomorrow => "tomorrow",
            DueDateFilter::Week => "week",
            DueDateFilter::Month => "month",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "all" => Some(DueDateFilter::All),
            "overdue" => Some(DueDateFilter::Overdue),
            "today" => Some(DueDateFilter::Today),
            "tomorrow" => Some(DueDateFilter::Tomorrow),
            "week" => Some(DueDateFilter::Week),
            "month" => Some(DueDateFilter::Month),
            _ => None,
        }
    }

    fn matches(self, item: &TodoItem, today: NaiveDate) -> bool {
        match self {
            DueDateFilter::All => true,
            DueDateFilter::Overdue => item.is_overdue_on(today),
            DueDateFilter::Today => matches!(item.is_due_in_exactly_on(today, 0), Ok(true)),
            DueDateFilter::Tomorrow => matches!(item.is_due_in_exactly_on(today, 1), Ok(true)),
            DueDateFilter::Week => matches!(item.is_due_within_on(today, 7), Ok(true)),
            DueDateFilter::Month => matches!(item.is_due_within_on(today, 30), Ok(true)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Exactly(Priority),
}

impl PriorityFilter {
    pub fn parse(input: &str) -> Option<Self> {
        if input.trim().eq_ignore_ascii_case("all") {
            return Some(PriorityFilter::All);
        }
        Priority::parse(input).ok().map(PriorityFilter::Exactly)
    }

    fn matches(self, item: &TodoItem) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Exactly(p) => {
                matches!(item.matches_priority(i64::from(p.value())), Ok(true))
            }
        }
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFilter::All => write!(f, "all"),
            PriorityFilter::Exactly(p) => write!(f, "{p}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionFilter {
    #[default]
    All,
    Complete,
    Incomplete,
}

impl CompletionFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionFilter::All => "all",
            CompletionFilter::Complete => "true",
            CompletionFilter::Incomplete => "false",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "all" => Some(CompletionFilter::All),
            "true" | "complete" | "done" => Some(CompletionFilter::Complete),
            "false" | "incomplete" | "todo" => Some(CompletionFilter::Incomplete),
            _ => None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(CompletionFilter::Complete),
            Value::Bool(false) => Some(CompletionFilter::Incomplete),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    fn matches(self, item: &TodoItem) -> bool {
        match self {
            CompletionFilter::All => true,
            CompletionFilter::Complete => item.is_complete(),
            CompletionFilter::Incomplete => !item.is_complete(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    DueDate,
    Priority,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::DueDate => "dueDate",
            SortBy::Priority => "priority",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "duedate" => Some(SortBy::DueDate),
            "priority" => Some(SortBy::Priority),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// The five recognized option keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    DuedateFilter,
    PriorityFilter,
    CompletionFilter,
    SortBy,
    SortOrder,
}

impl OptionKey {
    pub const ALL: [OptionKey; 5] = [
        OptionKey::DuedateFilter,
        OptionKey::PriorityFilter,
        OptionKey::CompletionFilter,
        OptionKey::SortBy,
        OptionKey::SortOrder,
    ];

    /// Name used in storage and by UI code
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::DuedateFilter => "duedateFilter",
            OptionKey::PriorityFilter => "priorityFilter",
            OptionKey::CompletionFilter => "completionFilter",
            OptionKey::SortBy => "sortBy",
            OptionKey::SortOrder => "sortOrder",
        }
    }

    /// Case-insensitive; `sort_by` and `sort-by` are read as `sortBy`
    pub fn parse(input: &str) -> Result<Self, ViewQueryError> {
        let normalized = input.trim().to_ascii_lowercase().replace(['_', '-'], "");
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| ViewQueryError::UnknownOption(input.to_string()))
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub duedate_filter: DueDateFilter,
    pub priority_filter: PriorityFilter,
    pub completion_filter: CompletionFilter,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl ViewOptions {
    /// Current selection of `key`, in its stored text form
    pub fn selection(&self, key: OptionKey) -> String {
        match key {
            OptionKey::DuedateFilter => self.duedate_filter.as_str().to_string(),
            OptionKey::PriorityFilter => self.priority_filter.to_string(),
            OptionKey::CompletionFilter => self.completion_filter.as_str().to_string(),
            OptionKey::SortBy => self.sort_by.as_str().to_string(),
            OptionKey::SortOrder => self.sort_order.as_str().to_string(),
        }
    }

    fn apply(&mut self, key: OptionKey, selection: &str) -> Result<(), ViewQueryError> {
        let invalid = || ViewQueryError::InvalidSelection {
            option: key,
            selection: selection.to_string(),
        };
        match key {
            OptionKey::DuedateFilter => {
                self.duedate_filter = DueDateFilter::parse(selection).unwrap_or_else(|| {
                    tracing::warn!(selection, "unrecognized due date filter, showing all dates");
                    DueDateFilter::All
                });
            }
            OptionKey::PriorityFilter => {
                self.priority_filter = PriorityFilter::parse(selection).ok_or_else(invalid)?;
            }
            OptionKey::CompletionFilter => {
                self.completion_filter = CompletionFilter::parse(selection).ok_or_else(invalid)?;
            }
            OptionKey::SortBy => {
                self.sort_by = SortBy::parse(selection).ok_or_else(invalid)?;
            }
            OptionKey::SortOrder => {
                self.sort_order = SortOrder::parse(selection).ok_or_else(invalid)?;
            }
        }
        Ok(())
    }

    fn to_value(self) -> Value {
        let map: Map<String, Value> = OptionKey::ALL
            .into_iter()
            .map(|key| (key.as_str().to_string(), Value::String(self.selection(key))))
            .collect();
        Value::Object(map)
    }

    /// Rebuild from stored options, keeping the default for any key that is
    /// missing or cannot be read
    fn from_value(stored: Option<&Value>) -> Self {
        let mut options = ViewOptions::default();
        let Some(Value::Object(map)) = stored else {
            return options;
        };
        for key in OptionKey::ALL {
            let Some(value) = map.get(key.as_str()) else {
                continue;
            };
            let applied = match (key, value) {
                (OptionKey::CompletionFilter, _) => match CompletionFilter::from_value(value) {
                    Some(filter) => {
                        options.completion_filter = filter;
                        Ok(())
                    }
                    None => Err(()),
                },
                (_, Value::String(s)) => options.apply(key, s).map_err(|_| ()),
                (_, Value::Number(n)) => options.apply(key, &n.to_string()).map_err(|_| ()),
                _ => Err(()),
            };
            if applied.is_err() {
                tracing::warn!(option = %key, %value, "ignoring unreadable stored view option");
            }
        }
        options
    }
}

pub struct ViewQuery {
    store: Rc<dyn KeyValueStore>,
    list: ListSelection,
    options: ViewOptions,
}

impl ViewQuery {
    /// Restore the view state from `store`. Read failures fall back to defaults.
    pub fn load(store: Rc<dyn KeyValueStore>) -> Self {
        let stored = match store.get(VIEW_OPTIONS_KEY) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "could not read view options, using defaults");
                None
            }
        };

        let list = stored
            .as_ref()
            .and_then(|v| v.get("list"))
            .and_then(ListSelection::from_value)
            .unwrap_or_default();
        let options = ViewOptions::from_value(stored.as_ref().and_then(|v| v.get("options")));

        Self {
            store,
            list,
            options,
        }
    }

    pub fn active_list(&self) -> ListSelection {
        self.list
    }

    /// Id to narrow item queries by; `None` when every list is selected
    pub fn list_id(&self) -> Option<Id> {
        self.list.list_id()
    }

    pub fn options(&self) -> ViewOptions {
        self.options
    }

    pub fn set_active_list(&mut self, list: impl Into<ListSelection>) {
        self.list = list.into();
        self.persist();
    }

    /// Change one option and save the view.
    ///
    /// An unrecognized due-date selection is stored as `all`, so reading the
    /// option back yields `all` rather than the text that was passed in. Bad
    /// selections for the other options are rejected.
    pub fn set_option(&mut self, option: &str, selection: &str) -> Result<(), ViewQueryError> {
        let key = OptionKey::parse(option)?;
        self.options.apply(key, selection)?;
        self.persist();
        Ok(())
    }

    pub fn filter(&self, item: &TodoItem) -> bool {
        self.filter_on(item, utils::today())
    }

    /// All three sub-filters must pass; `today` anchors the due-date filter
    pub fn filter_on(&self, item: &TodoItem, today: NaiveDate) -> bool {
        self.options.duedate_filter.matches(item, today)
            && self.options.priority_filter.matches(item)
            && self.options.completion_filter.matches(item)
    }

    /// Order by the selected key, ties by ascending id. Descending order
    /// reverses the whole comparison, tie-break included.
    pub fn sort(&self, a: &TodoItem, b: &TodoItem) -> Ordering {
        let primary = match self.options.sort_by {
            SortBy::DueDate => a.compare_due_date(b),
            SortBy::Priority => a.compare_priority(b),
        };
        let combined = primary.then_with(|| a.id().cmp(&b.id()));
        match self.options.sort_order {
            SortOrder::Asc => combined,
            SortOrder::Desc => combined.reverse(),
        }
    }

    fn persist(&self) {
        let value = json!({
            "list": self.list.to_value(),
            "options": self.options.to_value(),
        });
        if let Err(e) = self.store.set(VIEW_OPTIONS_KEY, &value) {
            tracing::error!(error = %e, "failed to save view options");
        }
    }
}
