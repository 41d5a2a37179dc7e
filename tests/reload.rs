use serde_json::json;
use std::rc::Rc;

use todo_lists::models::DEFAULT_LIST_ID;
use todo_lists::storage::{StoreError, TODO_KEY, VIEW_OPTIONS_KEY};
use todo_lists::view_query::{SortBy, SortOrder};
use todo_lists::{
    App, ItemDraft, ItemQuery, KeyValueStore, ListSelection, MemoryStore, SqliteStore,
    TodoController, TodoError,
};

fn item_record(id: u64, list_id: u64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "listId": list_id,
        "title": title,
        "description": "",
        "dueDate": "2026-02-07",
        "priority": "1",
        "isComplete": false
    })
}

#[test]
fn reloaded_ids_push_new_ids_past_them() {
    let store = MemoryStore::new().with_entry(
        TODO_KEY,
        json!({
            "items": {
                "3": item_record(3, 1, "Consult Augur"),
                "7": item_record(7, 1, "Visit Baths")
            },
            "lists": { "1": { "id": 1, "title": "Main" } }
        }),
    );
    let mut todo = TodoController::load(Rc::new(store)).unwrap();
    assert_eq!(todo.get_item(3).unwrap().title(), "Consult Augur");

    let fresh = todo.add_item(ItemDraft::titled("Letter to Pliny")).unwrap();
    assert_eq!(fresh.id(), 8);
}

#[test]
fn default_list_is_created_when_storage_has_none() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new().with_entry(
        TODO_KEY,
        json!({ "lists": { "4": { "id": 4, "title": "work" } } }),
    ));
    let mut todo = TodoController::load(Rc::clone(&store)).unwrap();

    let ids: Vec<u64> = todo.get_lists().iter().map(|list| list.id()).collect();
    assert_eq!(ids, vec![DEFAULT_LIST_ID, 4]);
    assert_eq!(todo.get_list(4).unwrap().title(), "Work");
    assert_eq!(todo.add_list("home").id(), 5);

    let saved = store.get(TODO_KEY).unwrap().unwrap();
    assert_eq!(saved["lists"]["1"]["title"], "Main");
}

#[test]
fn bad_records_are_set_aside_and_orphans_rehomed() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new().with_entry(
        TODO_KEY,
        json!({
            "items": {
                "1": item_record(1, 1, "kept"),
                "2": { "id": 2, "listId": 1, "dueDate": "someday" },
                "3": item_record(3, 9, "orphan"),
                "4": "garbage"
            },
            "lists": {
                "1": { "id": 1, "title": "Main" },
                "6": { "title": 6 }
            }
        }),
    ));
    let mut todo = TodoController::load(Rc::clone(&store)).unwrap();

    let views = todo.get_items(ItemQuery::default());
    let titles: Vec<&str> = views.iter().map(|view| view.item.title()).collect();
    assert_eq!(titles, vec!["kept", "orphan"]);
    assert_eq!(todo.get_item(3).unwrap().list_id(), DEFAULT_LIST_ID);

    // The orphan repair was saved, and the unreadable records came along
    let saved = store.get(TODO_KEY).unwrap().unwrap();
    assert_eq!(saved["items"]["3"]["listId"], 1);
    assert_eq!(saved["items"]["2"]["dueDate"], "someday");
    assert_eq!(saved["items"]["4"], "garbage");
    assert_eq!(saved["lists"]["6"], json!({ "title": 6 }));

    // Set-aside keys are never reused for new entities
    assert_eq!(todo.add_item(ItemDraft::titled("fresh")).unwrap().id(), 5);
    assert_eq!(todo.add_list("docks").id(), 7);
    let saved = store.get(TODO_KEY).unwrap().unwrap();
    assert_eq!(saved["items"]["4"], "garbage");
    assert_eq!(saved["items"]["5"]["title"], "fresh");
}

#[test]
fn snapshot_of_the_wrong_shape_fails_and_is_left_alone() {
    let stored = json!({
        "items": [item_record(3, 1, "keep me")],
        "lists": { "1": { "id": 1, "title": "Main" } }
    });
    let store: Rc<dyn KeyValueStore> =
        Rc::new(MemoryStore::new().with_entry(TODO_KEY, stored.clone()));

    let result = TodoController::load(Rc::clone(&store));
    assert!(matches!(
        result,
        Err(TodoError::Store(StoreError::CorruptValue { ref key, .. })) if key == TODO_KEY
    ));
    assert_eq!(store.get(TODO_KEY).unwrap(), Some(stored));
}

#[test]
fn sqlite_session_round_trips_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.db");

    let (work_id, item_id) = {
        let mut app = App::open(Rc::new(SqliteStore::open(&path).unwrap())).unwrap();
        let work = app.add_list("work");
        let item = app
            .save_item_details(
                None,
                ItemDraft {
                    list_id: Some(work.id()),
                    priority: Some(4),
                    ..ItemDraft::titled("Scribe Duties")
                },
            )
            .unwrap();
        app.check_item(item.id(), None).unwrap();
        app.select_list(ListSelection::List(work.id())).unwrap();
        app.change_view_option("sortBy", "priority").unwrap();
        app.change_view_option("sortOrder", "asc").unwrap();
        (work.id(), item.id())
    };

    let app = App::open(Rc::new(SqliteStore::open(&path).unwrap())).unwrap();
    let item = app.item(item_id).unwrap();
    assert_eq!(item.title(), "Scribe Duties");
    assert_eq!(item.list_id(), work_id);
    assert_eq!(item.priority().value(), 4);
    assert!(item.is_complete());

    assert_eq!(app.view.active_list(), ListSelection::List(work_id));
    assert_eq!(app.view.options().sort_by, SortBy::Priority);
    assert_eq!(app.view.options().sort_order, SortOrder::Asc);
    assert_eq!(app.active_list_title(), "Work");
}

#[test]
fn persisted_records_use_the_exchange_shape() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let mut app = App::open(Rc::clone(&store)).unwrap();
    app.save_item_details(
        None,
        ItemDraft {
            due_date: Some("2026-02-15".into()),
            priority: Some(2),
            ..ItemDraft::titled("Finish Aeneid")
        },
    )
    .unwrap();
    app.change_view_option("completionFilter", "false").unwrap();

    let saved = store.get(TODO_KEY).unwrap().unwrap();
    assert_eq!(
        saved["items"]["1"],
        json!({
            "id": 1,
            "listId": 1,
            "title": "Finish Aeneid",
            "description": "",
            "dueDate": "2026-02-15",
            "priority": "2",
            "isComplete": false
        })
    );
    assert_eq!(saved["lists"]["1"], json!({ "id": 1, "title": "Main" }));

    let view = store.get(VIEW_OPTIONS_KEY).unwrap().unwrap();
    assert_eq!(view["list"], "all");
    assert_eq!(view["options"]["completionFilter"], "false");
    assert_eq!(view["options"]["sortBy"], "dueDate");
    assert_eq!(view["options"]["sortOrder"], "desc");
}
