use std::rc::Rc;

use todo_lists::models::DEFAULT_LIST_ID;
use todo_lists::{
    IdKind, ItemDraft, ItemPatch, ItemQuery, ListSelection, MemoryStore, TodoController, TodoError,
    ValidationError, utils,
};

fn controller() -> TodoController {
    TodoController::load(Rc::new(MemoryStore::new())).unwrap()
}

fn on_list(title: &str, list_id: u64) -> ItemDraft {
    ItemDraft {
        list_id: Some(list_id),
        ..ItemDraft::titled(title)
    }
}

#[test]
fn added_item_is_validated_and_normalized() {
    let mut todo = controller();
    let item = todo
        .add_item(ItemDraft {
            due_date: Some("2026-02-07T18:00:00Z".into()),
            priority: Some(5),
            ..ItemDraft::titled("Pay Tributum")
        })
        .unwrap();

    assert_eq!(item.priority().value(), 5);
    assert_eq!(item.due_date(), utils::parse_date("2026-02-07").unwrap());
    assert_eq!(todo.get_item(item.id()).unwrap(), &item);
}

#[test]
fn invalid_drafts_are_rejected() {
    let mut todo = controller();
    for priority in [7, -1] {
        let result = todo.add_item(ItemDraft {
            priority: Some(priority),
            ..ItemDraft::default()
        });
        assert!(matches!(
            result,
            Err(TodoError::Validation(ValidationError::InvalidPriority(_)))
        ));
    }
    let result = todo.add_item(ItemDraft {
        due_date: Some("not-a-date".into()),
        ..ItemDraft::default()
    });
    assert!(matches!(
        result,
        Err(TodoError::Validation(ValidationError::InvalidDate(_)))
    ));
    assert!(todo.get_items(ItemQuery::default()).is_empty());
}

#[test]
fn ids_are_not_reused_after_removal() {
    let mut todo = controller();
    let a = todo.add_item(ItemDraft::titled("a")).unwrap();
    assert_eq!(a.id(), 1);
    assert!(todo.remove_item(a.id()).is_some());

    let b = todo.add_item(ItemDraft::titled("b")).unwrap();
    assert_eq!(b.id(), 2);
}

#[test]
fn lookups_by_unknown_id_fail() {
    let todo = controller();
    assert!(matches!(
        todo.get_item(3),
        Err(TodoError::NotFound { kind: IdKind::Item, id: 3 })
    ));
    assert!(matches!(
        todo.get_list(3),
        Err(TodoError::NotFound { kind: IdKind::List, id: 3 })
    ));
}

#[test]
fn list_titles_are_title_cased() {
    let mut todo = controller();
    let list = todo.add_list("grocery list");
    assert_eq!(list.title(), "Grocery List");
    assert_eq!(list.id(), 2);
}

#[test]
fn removing_the_default_list_is_a_no_op() {
    let mut todo = controller();
    let item = todo.add_item(ItemDraft::titled("stay put")).unwrap();

    assert!(todo.remove_list(DEFAULT_LIST_ID).unwrap().is_none());
    assert!(todo.get_list(DEFAULT_LIST_ID).is_ok());
    assert_eq!(todo.get_item(item.id()).unwrap().list_id(), DEFAULT_LIST_ID);
}

#[test]
fn removing_a_list_moves_its_items_to_the_default_list() {
    let mut todo = controller();
    let work = todo.add_list("work");
    let first = todo.add_item(on_list("scribe duties", work.id())).unwrap();
    let second = todo.add_item(on_list("senate session", work.id())).unwrap();
    let elsewhere = todo.add_item(ItemDraft::titled("mend toga")).unwrap();

    let removed = todo.remove_list(work.id()).unwrap().unwrap();
    assert_eq!(removed.list.id(), work.id());
    let moved: Vec<u64> = removed.reassigned.iter().map(|item| item.id()).collect();
    assert_eq!(moved, vec![first.id(), second.id()]);

    for id in [first.id(), second.id(), elsewhere.id()] {
        assert_eq!(todo.get_item(id).unwrap().list_id(), DEFAULT_LIST_ID);
    }
    assert!(todo.get_lists().iter().all(|list| list.id() != work.id()));
}

#[test]
fn narrowing_returns_exactly_the_lists_items() {
    let mut todo = controller();
    let work = todo.add_list("work");
    let home = todo.add_list("home");
    todo.add_item(on_list("one", work.id())).unwrap();
    todo.add_item(on_list("two", home.id())).unwrap();
    todo.add_item(on_list("three", work.id())).unwrap();

    let views = todo.get_items(ItemQuery {
        list: ListSelection::List(work.id()),
        ..ItemQuery::default()
    });
    let titles: Vec<&str> = views.iter().map(|view| view.item.title()).collect();
    assert_eq!(titles, vec!["one", "three"]);
    assert!(views.iter().all(|view| view.list_title == "Work"));

    assert_eq!(todo.get_items(ItemQuery::default()).len(), 3);
    assert!(todo
        .get_items(ItemQuery {
            list: ListSelection::List(99),
            ..ItemQuery::default()
        })
        .is_empty());
}

#[test]
fn filter_then_sort_are_applied_after_narrowing() {
    let mut todo = controller();
    for (title, priority) in [("low", 1), ("high", 5), ("mid", 3), ("none", 0)] {
        todo.add_item(ItemDraft {
            priority: Some(priority),
            ..ItemDraft::titled(title)
        })
        .unwrap();
    }

    let keep = |item: &todo_lists::TodoItem| item.priority().value() > 0;
    let by_priority_desc =
        |a: &todo_lists::TodoItem, b: &todo_lists::TodoItem| b.compare_priority(a);
    let views = todo.get_items(ItemQuery {
        list: ListSelection::All,
        filter: Some(&keep),
        sort: Some(&by_priority_desc),
    });
    let titles: Vec<&str> = views.iter().map(|view| view.item.title()).collect();
    assert_eq!(titles, vec!["high", "mid", "low"]);
}

#[test]
fn failed_edit_leaves_the_item_unchanged() {
    let mut todo = controller();
    let item = todo
        .add_item(ItemDraft {
            priority: Some(2),
            ..ItemDraft::titled("wine cellar")
        })
        .unwrap();

    let result = todo.edit_item(
        item.id(),
        ItemPatch {
            title: Some("renamed".into()),
            priority: Some(99),
            ..ItemPatch::default()
        },
    );
    assert!(matches!(
        result,
        Err(TodoError::Validation(ValidationError::InvalidPriority(_)))
    ));
    let stored = todo.get_item(item.id()).unwrap();
    assert_eq!(stored.priority().value(), 2);
    assert_eq!(stored.title(), "wine cellar");
}

#[test]
fn edit_applies_only_present_fields() {
    let mut todo = controller();
    let item = todo
        .add_item(ItemDraft {
            description: Some("check the seals".into()),
            due_date: Some("2026-02-10".into()),
            ..ItemDraft::titled("wine cellar")
        })
        .unwrap();

    let edited = todo
        .edit_item(
            item.id(),
            ItemPatch {
                due_date: Some("2026-02-12".into()),
                ..ItemPatch::default()
            },
        )
        .unwrap();
    assert_eq!(edited.title(), "wine cellar");
    assert_eq!(edited.description(), "check the seals");
    assert_eq!(edited.due_date(), utils::parse_date("2026-02-12").unwrap());
    assert!(matches!(
        todo.edit_item(404, ItemPatch::default()),
        Err(TodoError::NotFound { kind: IdKind::Item, id: 404 })
    ));
}

#[test]
fn moving_to_a_missing_list_fails_without_change() {
    let mut todo = controller();
    let work = todo.add_list("work");
    let item = todo.add_item(on_list("olive harvest", work.id())).unwrap();

    assert!(matches!(
        todo.move_item(item.id(), 42),
        Err(TodoError::NotFound { kind: IdKind::List, id: 42 })
    ));
    assert_eq!(todo.get_item(item.id()).unwrap().list_id(), work.id());

    assert!(matches!(
        todo.move_item(42, work.id()),
        Err(TodoError::NotFound { kind: IdKind::Item, id: 42 })
    ));

    let moved = todo.move_item(item.id(), DEFAULT_LIST_ID).unwrap();
    assert_eq!(moved.list_id(), DEFAULT_LIST_ID);
}

#[test]
fn write_failures_do_not_roll_back() {
    let mut todo = TodoController::load(Rc::new(MemoryStore::failing_writes())).unwrap();
    let item = todo.add_item(ItemDraft::titled("garum supply")).unwrap();
    assert_eq!(todo.get_item(item.id()).unwrap().title(), "garum supply");
    let list = todo.add_list("docks");
    assert!(todo.get_list(list.id()).is_ok());
}
