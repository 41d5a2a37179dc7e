use std::rc::Rc;
use thiserror::Error;

use crate::bus::{Event, EventBus};
use crate::ids::Id;
use crate::models::{ItemDraft, ItemPatch, ListPatch, TodoItem, TodoList};
use crate::storage::KeyValueStore;
use crate::todo::{ItemView, RemovedList, TodoController, TodoError};
use crate::view_query::{ListSelection, ViewQuery, ViewQueryError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Todo(#[from] TodoError),
    #[error(transparent)]
    View(#[from] ViewQueryError),
}

/// One session: the domain controller, the view state and the bus UI code
/// listens on. Each handler performs its change, then publishes what a
/// display needs to refresh.
pub struct App {
    pub todo: TodoController,
    pub view: ViewQuery,
    pub bus: EventBus,
}

impl App {
    pub fn open(store: Rc<dyn KeyValueStore>) -> Result<Self, AppError> {
        let todo = TodoController::load(Rc::clone(&store))?;
        let mut view = ViewQuery::load(store);

        if let Some(id) = view.list_id() {
            if todo.get_list(id).is_err() {
                tracing::warn!(list = id, "selected list no longer exists, showing all items");
                view.set_active_list(ListSelection::All);
            }
        }

        Ok(Self {
            todo,
            view,
            bus: EventBus::new(),
        })
    }

    pub fn displayed_items(&self) -> Vec<ItemView> {
        self.todo.get_items_for(&self.view)
    }

    pub fn active_list_title(&self) -> String {
        self.selection_title(self.view.active_list())
    }

    /// Title of a list selection, "All Items" for the pseudo-list
    pub fn selection_title(&self, selection: ListSelection) -> String {
        match selection {
            ListSelection::All => "All Items".to_string(),
            ListSelection::List(id) => self
                .todo
                .get_list(id)
                .map(|list| list.title().to_string())
                .unwrap_or_default(),
        }
    }

    fn publish_items(&mut self) {
        let items = self.displayed_items();
        self.bus.publish(&Event::ItemsChanged(items));
    }

    fn publish_lists(&mut self) {
        let lists = self.todo.get_lists();
        self.bus.publish(&Event::ListsChanged(lists));
    }

    pub fn select_list(&mut self, selection: ListSelection) -> Result<(), AppError> {
        if let ListSelection::List(id) = selection {
            self.todo.get_list(id)?;
        }
        self.view.set_active_list(selection);
        self.bus.publish(&Event::ActiveListChanged(selection));
        self.publish_items();
        Ok(())
    }

    pub fn check_item(&mut self, id: Id, checked: Option<bool>) -> Result<TodoItem, AppError> {
        let item = self.todo.toggle_item(id, checked)?;
        self.bus.publish(&Event::ItemUpdated(item.clone()));
        self.publish_items();
        Ok(item)
    }

    /// Create an item from form details, or update item `id` with them.
    /// On update the draft's id and completion fields are ignored.
    pub fn save_item_details(&mut self, id: Option<Id>, details: ItemDraft) -> Result<TodoItem, AppError> {
        let item = match id {
            Some(id) => self.todo.edit_item(id, ItemPatch::from(details))?,
            None => self.todo.add_item(details)?,
        };
        self.bus.publish(&Event::ItemUpdated(item.clone()));
        self.publish_items();
        Ok(item)
    }

    pub fn move_item(&mut self, id: Id, list_id: Id) -> Result<TodoItem, AppError> {
        let item = self.todo.move_item(id, list_id)?;
        self.bus.publish(&Event::ItemUpdated(item.clone()));
        self.publish_items();
        Ok(item)
    }

    pub fn delete_item(&mut self, id: Id) -> Option<TodoItem> {
        let removed = self.todo.remove_item(id);
        if removed.is_some() {
            self.publish_items();
        }
        removed
    }

    pub fn change_view_option(&mut self, option: &str, selection: &str) -> Result<(), AppError> {
        self.view.set_option(option, selection)?;
        self.bus.publish(&Event::ViewOptionsChanged(self.view.options()));
        self.publish_items();
        Ok(())
    }

    pub fn add_list(&mut self, title: &str) -> TodoList {
        let list = self.todo.add_list(title);
        self.publish_lists();
        list
    }

    pub fn rename_list(&mut self, id: Id, title: &str) -> Result<TodoList, AppError> {
        let list = self.todo.edit_list(
            id,
            ListPatch {
                title: Some(title.to_string()),
            },
        )?;
        self.publish_lists();
        self.publish_items();
        Ok(list)
    }

    /// Remove a list, moving its items to the default list. Deleting the
    /// selected list switches the view back to all items.
    pub fn delete_list(&mut self, id: Id) -> Result<Option<RemovedList>, AppError> {
        let Some(removed) = self.todo.remove_list(id)? else {
            return Ok(None);
        };
        if self.view.list_id() == Some(id) {
            self.view.set_active_list(ListSelection::All);
            self.bus.publish(&Event::ActiveListChanged(ListSelection::All));
        }
        self.publish_lists();
        self.publish_items();
        Ok(Some(removed))
    }

    pub fn item(&self, id: Id) -> Result<&TodoItem, AppError> {
        Ok(self.todo.get_item(id)?)
    }
}
