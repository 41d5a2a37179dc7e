//! Domain controller owning every item and list.
//!
//! # Invariants
//! - The default list ([`DEFAULT_LIST_ID`]) always exists and is never removed.
//! - Every stored item references an existing list.
//! - Ids come from one [`IdAllocator`] per controller and are never reused.
//! - A mutation either applies completely or not at all; the in-memory state
//!   is then written to the store, and a failed write is logged, not undone.

use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use thiserror::Error;

use crate::ids::{Id, IdAllocator, IdError, IdKind};
use crate::models::{
    DEFAULT_LIST_ID, ItemDraft, ItemPatch, ItemRecord, ListPatch, ListRecord, TodoItem, TodoList,
    ValidationError,
};
use crate::storage::{KeyValueStore, StoreError, TODO_KEY};
use crate::view_query::{ListSelection, ViewQuery};

#[derive(Debug, Error)]
pub enum TodoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No {kind} with id {id}")]
    NotFound { kind: IdKind, id: Id },
    #[error(transparent)]
    Id(#[from] IdError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// An item joined with the title of the list it is on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub item: TodoItem,
    pub list_title: String,
}

/// What `remove_list` took away and which items it moved to the default list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedList {
    pub list: TodoList,
    pub reassigned: Vec<TodoItem>,
}

pub type ItemPredicate<'a> = &'a dyn Fn(&TodoItem) -> bool;
pub type ItemComparator<'a> = &'a dyn Fn(&TodoItem, &TodoItem) -> Ordering;

/// Narrowing, filtering and ordering for [`TodoController::get_items`],
/// applied in that order
#[derive(Default, Clone, Copy)]
pub struct ItemQuery<'a> {
    pub list: ListSelection,
    pub filter: Option<ItemPredicate<'a>>,
    pub sort: Option<ItemComparator<'a>>,
}

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    items: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    lists: BTreeMap<String, serde_json::Value>,
}

pub struct TodoController {
    store: Rc<dyn KeyValueStore>,
    ids: IdAllocator,
    items: HashMap<Id, TodoItem>,
    lists: HashMap<Id, TodoList>,
    // Stored records that failed to load, keyed as they were stored
    retained_items: BTreeMap<String, serde_json::Value>,
    retained_lists: BTreeMap<String, serde_json::Value>,
}

impl TodoController {
    /// Rebuild the in-memory state from `store`.
    ///
    /// Lists load before items. A value whose overall shape is wrong fails the
    /// load and the store is left untouched. Unreadable or duplicate records
    /// are set aside and written back verbatim on every save, and their ids
    /// are never handed out. Items pointing at a missing list move to the
    /// default list, and the default list is created when absent; those two
    /// repairs are written back.
    pub fn load(store: Rc<dyn KeyValueStore>) -> Result<Self, TodoError> {
        let snapshot: Snapshot = match store.get(TODO_KEY)? {
            Some(value) => {
                serde_json::from_value(value).map_err(|source| StoreError::CorruptValue {
                    key: TODO_KEY.to_string(),
                    source,
                })?
            }
            None => Snapshot::default(),
        };

        let mut controller = Self {
            store,
            ids: IdAllocator::new(),
            items: HashMap::new(),
            lists: HashMap::new(),
            retained_items: BTreeMap::new(),
            retained_lists: BTreeMap::new(),
        };
        let mut repaired = false;
        let mut unreadable = Vec::new();

        for (key, value) in snapshot.lists {
            let record: ListRecord = match serde_json::from_value(value.clone()) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "setting aside unreadable list record");
                    unreadable.push((IdKind::List, key, value));
                    continue;
                }
            };
            if let Err(e) = controller.ids.register_id(IdKind::List, record.id) {
                tracing::warn!(key = %key, error = %e, "setting aside list record");
                unreadable.push((IdKind::List, key, value));
                continue;
            }
            let list = TodoList::from_record(record);
            controller.lists.insert(list.id(), list);
        }

        if !controller.lists.contains_key(&DEFAULT_LIST_ID) {
            controller.ids.register_id(IdKind::List, DEFAULT_LIST_ID)?;
            controller
                .lists
                .insert(DEFAULT_LIST_ID, TodoList::default_list());
            repaired = true;
        }

        for (key, value) in snapshot.items {
            let item = match serde_json::from_value::<ItemRecord>(value.clone()) {
                Ok(record) => TodoItem::from_record(record).map_err(TodoError::from),
                Err(e) => Err(TodoError::Store(StoreError::CorruptValue {
                    key: key.clone(),
                    source: e,
                })),
            };
            let mut item = match item.and_then(|item| {
                controller.ids.register_id(IdKind::Item, item.id())?;
                Ok(item)
            }) {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "setting aside item record");
                    unreadable.push((IdKind::Item, key, value));
                    continue;
                }
            };
            if !controller.lists.contains_key(&item.list_id()) {
                tracing::warn!(
                    item = item.id(),
                    list = item.list_id(),
                    "item references a missing list, moving it to the default list"
                );
                item.set_list_id(DEFAULT_LIST_ID);
                repaired = true;
            }
            controller.items.insert(item.id(), item);
        }

        for (kind, key, value) in unreadable {
            controller.retain(kind, key, value);
        }

        tracing::debug!(
            items = controller.items.len(),
            lists = controller.lists.len(),
            set_aside = controller.retained_items.len() + controller.retained_lists.len(),
            "loaded todo data"
        );
        if repaired {
            controller.persist();
        }
        Ok(controller)
    }

    /// Keep a record that could not be loaded so saving does not erase it.
    /// An id-like key is reserved so no new entity is stored over it.
    fn retain(&mut self, kind: IdKind, key: String, value: serde_json::Value) {
        let reserve = key
            .parse::<Id>()
            .ok()
            .filter(|id| !self.ids.is_registered(kind, *id));
        if let Some(Err(e)) = reserve.map(|id| self.ids.register_id(kind, id)) {
            tracing::debug!(key = %key, error = %e, "not reserving id of set-aside record");
        }
        let retained = match kind {
            IdKind::Item => &mut self.retained_items,
            IdKind::List => &mut self.retained_lists,
        };
        retained.insert(key, value);
    }

    pub fn get_item(&self, id: Id) -> Result<&TodoItem, TodoError> {
        self.items.get(&id).ok_or(TodoError::NotFound {
            kind: IdKind::Item,
            id,
        })
    }

    pub fn get_list(&self, id: Id) -> Result<&TodoList, TodoError> {
        self.lists.get(&id).ok_or(TodoError::NotFound {
            kind: IdKind::List,
            id,
        })
    }

    /// Lists in ascending id order
    pub fn get_lists(&self) -> Vec<TodoList> {
        let mut lists: Vec<TodoList> = self.lists.values().cloned().collect();
        lists.sort_by_key(TodoList::id);
        lists
    }

    /// Items narrowed to a list, filtered, then sorted. Without a comparator
    /// the result is in ascending id order. Never fails: a selection that
    /// matches nothing yields an empty vector.
    pub fn get_items(&self, query: ItemQuery<'_>) -> Vec<ItemView> {
        let mut items: Vec<&TodoItem> = self
            .items
            .values()
            .filter(|item| match query.list {
                ListSelection::All => true,
                ListSelection::List(id) => item.list_id() == id,
            })
            .filter(|item| query.filter.is_none_or(|keep| keep(*item)))
            .collect();

        items.sort_by_key(|item| item.id());
        if let Some(compare) = query.sort {
            items.sort_by(|a, b| compare(*a, *b));
        }

        items
            .into_iter()
            .map(|item| ItemView {
                list_title: self
                    .lists
                    .get(&item.list_id())
                    .map(|list| list.title().to_string())
                    .unwrap_or_default(),
                item: item.clone(),
            })
            .collect()
    }

    /// Items as the view query currently wants them displayed
    pub fn get_items_for(&self, view: &ViewQuery) -> Vec<ItemView> {
        let filter = |item: &TodoItem| view.filter(item);
        let sort = |a: &TodoItem, b: &TodoItem| view.sort(a, b);
        self.get_items(ItemQuery {
            list: view.active_list(),
            filter: Some(&filter),
            sort: Some(&sort),
        })
    }

    /// Create an item. A draft id is registered as given and fails with
    /// [`IdError::DuplicateId`] when taken; otherwise a fresh id is minted.
    pub fn add_item(&mut self, draft: ItemDraft) -> Result<TodoItem, TodoError> {
        if let Some(list_id) = draft.list_id {
            self.get_list(list_id)?;
        }

        // A rejected draft must not use up an id
        let requested = draft.id;
        let mut item = TodoItem::from_draft(0, draft)?;
        let id = match requested {
            Some(id) => {
                self.ids.register_id(IdKind::Item, id)?;
                id
            }
            None => self.ids.next_id(IdKind::Item),
        };
        item.assign_id(id);

        self.items.insert(id, item.clone());
        tracing::info!(id, title = item.title(), "added item");
        self.persist();
        Ok(item)
    }

    /// Apply every field present in `patch`, or none of them
    pub fn edit_item(&mut self, id: Id, patch: ItemPatch) -> Result<TodoItem, TodoError> {
        let mut staged = self.get_item(id)?.clone();

        if let Some(title) = patch.title {
            staged.set_title(title);
        }
        if let Some(description) = patch.description {
            staged.set_description(description);
        }
        if let Some(due_date) = patch.due_date.as_deref() {
            staged.set_due_date(due_date)?;
        }
        if let Some(priority) = patch.priority {
            staged.set_priority(priority)?;
        }
        if let Some(list_id) = patch.list_id {
            self.get_list(list_id)?;
            staged.set_list_id(list_id);
        }

        self.items.insert(id, staged.clone());
        tracing::info!(id, "edited item");
        self.persist();
        Ok(staged)
    }

    /// Flip completion, or set it when `value` is given
    pub fn toggle_item(&mut self, id: Id, value: Option<bool>) -> Result<TodoItem, TodoError> {
        let item = self.items.get_mut(&id).ok_or(TodoError::NotFound {
            kind: IdKind::Item,
            id,
        })?;
        let complete = item.toggle_complete(value);
        let item = item.clone();
        tracing::info!(id, complete, "toggled item");
        self.persist();
        Ok(item)
    }

    /// Remove an item; removing an unknown id does nothing
    pub fn remove_item(&mut self, id: Id) -> Option<TodoItem> {
        let removed = self.items.remove(&id)?;
        tracing::info!(id, "removed item");
        self.persist();
        Some(removed)
    }

    pub fn move_item(&mut self, item_id: Id, list_id: Id) -> Result<TodoItem, TodoError> {
        self.get_list(list_id)?;
        let item = self.items.get_mut(&item_id).ok_or(TodoError::NotFound {
            kind: IdKind::Item,
            id: item_id,
        })?;
        item.set_list_id(list_id);
        let item = item.clone();
        tracing::info!(item = item_id, list = list_id, "moved item");
        self.persist();
        Ok(item)
    }

    pub fn add_list(&mut self, title: &str) -> TodoList {
        let id = self.ids.next_id(IdKind::List);
        let list = TodoList::new(Some(title), id);
        self.lists.insert(id, list.clone());
        tracing::info!(id, title = list.title(), "added list");
        self.persist();
        list
    }

    pub fn edit_list(&mut self, id: Id, patch: ListPatch) -> Result<TodoList, TodoError> {
        let list = self.lists.get_mut(&id).ok_or(TodoError::NotFound {
            kind: IdKind::List,
            id,
        })?;
        if let Some(title) = patch.title.as_deref() {
            list.set_title(title);
        }
        let list = list.clone();
        tracing::info!(id, title = list.title(), "edited list");
        self.persist();
        Ok(list)
    }

    /// Delete a list after moving its items to the default list.
    ///
    /// The default list cannot be deleted: asking for it returns `Ok(None)`
    /// and changes nothing.
    pub fn remove_list(&mut self, id: Id) -> Result<Option<RemovedList>, TodoError> {
        let list = self.get_list(id)?;
        if !list.can_delete() {
            tracing::debug!(id, "refusing to remove the default list");
            return Ok(None);
        }

        let mut reassigned: Vec<TodoItem> = self
            .items
            .values_mut()
            .filter(|item| item.list_id() == id)
            .map(|item| {
                item.set_list_id(DEFAULT_LIST_ID);
                item.clone()
            })
            .collect();
        reassigned.sort_by_key(TodoItem::id);

        let list = self.lists.remove(&id).ok_or(TodoError::NotFound {
            kind: IdKind::List,
            id,
        })?;
        tracing::info!(id, moved = reassigned.len(), "removed list");
        self.persist();
        Ok(Some(RemovedList { list, reassigned }))
    }

    fn snapshot(&self) -> serde_json::Value {
        let mut items = self.retained_items.clone();
        items.extend(self.items.values().map(|item| {
            (item.id().to_string(), serde_json::json!(item.to_record()))
        }));
        let mut lists = self.retained_lists.clone();
        lists.extend(self.lists.values().map(|list| {
            (list.id().to_string(), serde_json::json!(list.to_record()))
        }));
        serde_json::json!({ "items": items, "lists": lists })
    }

    fn persist(&self) {
        if let Err(e) = self.store.set(TODO_KEY, &self.snapshot()) {
            tracing::error!(error = %e, "failed to save todo data; changes are kept for this session only");
        }
    }
}
