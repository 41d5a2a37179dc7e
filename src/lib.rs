pub mod app;
pub mod bus;
pub mod cli;
pub mod config;
pub mod ids;
pub mod models;
pub mod storage;
pub mod todo;
pub mod utils;
pub mod view_query;

pub use app::App;
pub use config::Config;
pub use ids::{Id, IdAllocator, IdKind};
pub use models::{ItemDraft, ItemPatch, ListPatch, Priority, TodoItem, TodoList, ValidationError};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use todo::{ItemQuery, ItemView, TodoController, TodoError};
pub use utils::Profile;
pub use view_query::{ListSelection, ViewQuery, ViewQueryError};
