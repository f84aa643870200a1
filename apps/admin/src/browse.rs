//! Interactive paging over stdin. Lines starting with `/` are treated as
//! search keystrokes and go through the debouncer; everything else is a
//! command applied immediately.

use std::time::Duration;

use anyhow::Result;
use client_core::{debounced, view, ListController};
use shared::domain::{FilterUpdate, PageSize, Role, Sort, SortDirection, SortField, UserId, UserStatus};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::debug;

use crate::table::format_table;

pub const HELP: &str = "commands: n | p | <page> | /<search> | role <name|all> | status <active|inactive|all> | sort <field> [asc|desc] | size <n|all> | x <id> | all | none | q";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
    Next,
    Prev,
    Page(u32),
    Search(String),
    Role(Option<Role>),
    Status(Option<UserStatus>),
    Sort(Sort),
    Size(PageSize),
    Toggle(UserId),
    SelectPage(bool),
    Quit,
}

/// Parses a non-search line. `None` for blank or unknown input.
pub fn parse_command(line: &str) -> Option<BrowseCommand> {
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let arg = words.next();
    let command = match (head, arg) {
        ("n", None) => BrowseCommand::Next,
        ("p", None) => BrowseCommand::Prev,
        ("q", None) => BrowseCommand::Quit,
        ("all", None) => BrowseCommand::SelectPage(true),
        ("none", None) => BrowseCommand::SelectPage(false),
        ("role", Some("all")) => BrowseCommand::Role(None),
        ("role", Some(role)) => BrowseCommand::Role(Some(role.parse().ok()?)),
        ("status", Some("all")) => BrowseCommand::Status(None),
        ("status", Some(status)) => BrowseCommand::Status(Some(status.parse().ok()?)),
        ("sort", Some(field)) => {
            let field: SortField = field.parse().ok()?;
            let direction: SortDirection = match words.next() {
                Some(direction) => direction.parse().ok()?,
                None => SortDirection::default(),
            };
            BrowseCommand::Sort(Sort::new(field, direction))
        }
        ("size", Some(size)) => BrowseCommand::Size(size.parse().ok()?),
        ("x", Some(id)) => BrowseCommand::Toggle(UserId::new(id)),
        (page, None) => BrowseCommand::Page(page.parse().ok()?),
        _ => return None,
    };
    Some(command)
}

pub async fn run(list: ListController, debounce: Duration) -> Result<()> {
    run_with_input(list, debounce, BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}

/// Drives `list` from `input` until `q` or end of input. Searches still
/// settling when input ends are applied before returning.
pub async fn run_with_input<R>(
    mut list: ListController,
    debounce: Duration,
    input: R,
) -> Result<ListController>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (commands_tx, mut commands) = mpsc::unbounded_channel();
    let (keystrokes, mut searches) = debounced::<String>(debounce);

    let settled = commands_tx.clone();
    tokio::spawn(async move {
        while let Some(term) = searches.next().await {
            if settled.send(BrowseCommand::Search(term)).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut lines = input.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(term) = line.strip_prefix('/') {
                keystrokes.push(term.to_string());
                continue;
            }
            match parse_command(&line) {
                Some(command) => {
                    if commands_tx.send(command).is_err() {
                        break;
                    }
                }
                None => eprintln!("{HELP}"),
            }
        }
        // flushes a search still inside the debounce window
        drop(keystrokes);
    });

    list.refresh().await;
    println!("{}", format_table(&view::render(&list.snapshot())));
    eprintln!("{HELP}");

    while let Some(command) = commands.recv().await {
        debug!(?command, "browse command");
        match command {
            BrowseCommand::Quit => break,
            BrowseCommand::Next => {
                list.next_page().await;
            }
            BrowseCommand::Prev => {
                list.prev_page().await;
            }
            BrowseCommand::Page(n) => {
                if !list.go_to_page(n).await {
                    eprintln!("page {n} is out of range");
                    continue;
                }
            }
            BrowseCommand::Search(term) => list.set_filter(FilterUpdate::Search(term)).await,
            BrowseCommand::Role(role) => list.set_filter(FilterUpdate::Role(role)).await,
            BrowseCommand::Status(status) => list.set_filter(FilterUpdate::Status(status)).await,
            BrowseCommand::Sort(sort) => list.set_sort(sort).await,
            BrowseCommand::Size(size) => list.set_page_size(size).await,
            BrowseCommand::Toggle(id) => {
                if list.toggle_select(&id).is_none() {
                    eprintln!("user {id} is not on the current page");
                }
            }
            BrowseCommand::SelectPage(checked) => list.toggle_select_all_on_page(checked),
        }
        println!("{}", format_table(&view::render(&list.snapshot())));
    }
    Ok(list)
}
