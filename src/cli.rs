use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

use crate::app::{App, AppError};
use crate::bus::{Event, Topic};
use crate::config::Config;
use crate::ids::Id;
use crate::models::{ItemDraft, ItemPatch, TodoItem, TodoList, ValidationError, parse_flag};
use crate::todo::{ItemQuery, ItemView};
use crate::utils;
use crate::view_query::{ListSelection, OptionKey};

#[derive(Parser)]
#[command(name = "todo")]
#[command(about = "To-do items organized into lists")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/storage)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show items for the selected list and view options (default if no subcommand)
    Show {
        /// Show this list instead of the selected one ("all" or a list id)
        #[arg(long)]
        list: Option<String>,
    },
    /// Show all lists
    Lists,
    /// Add a new item
    AddItem {
        /// Item title
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        due: Option<String>,
        /// Priority from 0 to 5
        #[arg(long, allow_negative_numbers = true)]
        priority: Option<i64>,
        /// Id of the list to put the item on
        #[arg(long)]
        list: Option<Id>,
    },
    /// Change fields of an existing item
    EditItem {
        id: Id,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        priority: Option<i64>,
        #[arg(long)]
        list: Option<Id>,
    },
    /// Flip an item's completion, or set it with --set true|false
    Toggle {
        id: Id,
        #[arg(long)]
        set: Option<String>,
    },
    /// Move an item to another list
    MoveItem { id: Id, list: Id },
    /// Delete an item
    RemoveItem { id: Id },
    /// Add a new list
    AddList { title: String },
    /// Rename a list
    RenameList { id: Id, title: String },
    /// Delete a list; its items move to the default list
    RemoveList { id: Id },
    /// Select the list to show ("all" or a list id)
    UseList { list: String },
    /// Set a view option (duedateFilter, priorityFilter, completionFilter, sortBy, sortOrder)
    SetOption { option: String, selection: String },
    /// Show the current view options
    Options,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("Invalid list selection '{0}' (expected \"all\" or a list id)")]
    ListSelection(String),
    #[error(transparent)]
    Flag(#[from] ValidationError),
    #[error("Nothing to change for item {0}: pass --title, --description, --due, --priority or --list")]
    EmptyEdit(Id),
}

fn parse_selection(raw: &str) -> Result<ListSelection, CliError> {
    ListSelection::parse(raw).ok_or_else(|| CliError::ListSelection(raw.to_string()))
}

/// Render one item line the way listings show it
pub fn format_item(view: &ItemView, date_format: &str) -> String {
    let item = &view.item;
    let check = if item.is_complete() { "x" } else { " " };
    let mut line = format!(
        "[{}] #{:<4} {}  (due {}, p{}, {})",
        check,
        item.id(),
        item.title(),
        utils::format_date_with(item.due_date(), date_format),
        item.priority(),
        view.list_title
    );
    if !item.description().is_empty() {
        line.push_str("\n         ");
        line.push_str(item.description());
    }
    line
}

fn format_list(list: &TodoList) -> String {
    if list.can_delete() {
        format!("#{:<4} {}", list.id(), list.title())
    } else {
        format!("#{:<4} {} (default)", list.id(), list.title())
    }
}

fn print_items(title: &str, items: &[ItemView], date_format: &str) {
    println!("{} ({} items)", title, items.len());
    for view in items {
        println!("{}", format_item(view, date_format));
    }
}

/// Run one command against an opened session.
///
/// Item and list changes are printed by bus subscribers, the same way an
/// interactive front end would re-render on each published event.
pub fn run(command: Commands, app: &mut App, config: &Config) -> Result<(), CliError> {
    let date_format = config.date_format.clone();
    let latest_items: Rc<RefCell<Option<Vec<ItemView>>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&latest_items);
    app.bus.subscribe(Topic::ItemsChanged, move |event| {
        if let Event::ItemsChanged(items) = event {
            *sink.borrow_mut() = Some(items.clone());
        }
    });
    app.bus.subscribe(Topic::ListsChanged, |event| {
        if let Event::ListsChanged(lists) = event {
            for list in lists {
                println!("{}", format_list(list));
            }
        }
    });

    match command {
        Commands::Show { list } => {
            let (title, items) = match list {
                Some(raw) => {
                    let selection = parse_selection(&raw)?;
                    if let ListSelection::List(id) = selection {
                        app.todo.get_list(id).map_err(AppError::from)?;
                    }
                    let filter = |item: &TodoItem| app.view.filter(item);
                    let sort = |a: &TodoItem, b: &TodoItem| app.view.sort(a, b);
                    let items = app.todo.get_items(ItemQuery {
                        list: selection,
                        filter: Some(&filter),
                        sort: Some(&sort),
                    });
                    (app.selection_title(selection), items)
                }
                None => (app.active_list_title(), app.displayed_items()),
            };
            print_items(&title, &items, &date_format);
            return Ok(());
        }
        Commands::Lists => {
            for list in app.todo.get_lists() {
                println!("{}", format_list(&list));
            }
            return Ok(());
        }
        Commands::Options => {
            println!("list: {}", app.view.active_list());
            let options = app.view.options();
            for key in OptionKey::ALL {
                println!("{}: {}", key, options.selection(key));
            }
            return Ok(());
        }
        Commands::AddItem {
            title,
            description,
            due,
            priority,
            list,
        } => {
            let item = app.save_item_details(
                None,
                ItemDraft {
                    title: Some(title),
                    description,
                    due_date: due,
                    priority,
                    list_id: list,
                    ..ItemDraft::default()
                },
            )?;
            println!("Item created successfully (ID: {})", item.id());
        }
        Commands::EditItem {
            id,
            title,
            description,
            due,
            priority,
            list,
        } => {
            let details = ItemDraft {
                title,
                description,
                due_date: due,
                priority,
                list_id: list,
                ..ItemDraft::default()
            };
            if ItemPatch::from(details.clone()).is_empty() {
                return Err(CliError::EmptyEdit(id));
            }
            app.save_item_details(Some(id), details)?;
            println!("Item {} updated", id);
        }
        Commands::Toggle { id, set } => {
            let value = set.as_deref().map(parse_flag).transpose()?;
            let item = app.check_item(id, value)?;
            let state = if item.is_complete() { "complete" } else { "not complete" };
            println!("Item {} is {}", id, state);
        }
        Commands::MoveItem { id, list } => {
            app.move_item(id, list)?;
            println!("Item {} moved to list {}", id, list);
        }
        Commands::RemoveItem { id } => match app.delete_item(id) {
            Some(item) => println!("Item {} removed ({})", id, item.title()),
            None => println!("No item with id {}", id),
        },
        Commands::AddList { title } => {
            let list = app.add_list(&title);
            println!("List created successfully (ID: {})", list.id());
        }
        Commands::RenameList { id, title } => {
            let list = app.rename_list(id, &title)?;
            println!("List {} renamed to {}", id, list.title());
        }
        Commands::RemoveList { id } => match app.delete_list(id)? {
            Some(removed) => println!(
                "List {} removed, {} item(s) moved to the default list",
                removed.list.title(),
                removed.reassigned.len()
            ),
            None => println!("The default list cannot be removed"),
        },
        Commands::UseList { list } => {
            app.select_list(parse_selection(&list)?)?;
        }
        Commands::SetOption { option, selection } => {
            app.change_view_option(&option, &selection)?;
        }
    }

    if let Some(items) = latest_items.borrow().as_ref() {
        println!();
        print_items(&app.active_list_title(), items, &date_format);
    }
    Ok(())
}
