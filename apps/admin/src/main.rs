use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Args, Parser, Subcommand};
use client_core::{
    export_selection, view, CsvSpreadsheet, DataSource, FormController, ListController, ListState,
    LocalDataSource, Notice, RemoteDataSource,
};
use shared::domain::{
    Filter, NewUser, PageSize, Role, Sort, SortDirection, SortField, UserId, UserStatus,
};
use storage::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod browse;
mod config;
mod table;

use config::{load_settings, Backend, Overrides, Settings};
use table::format_table;

#[derive(Parser, Debug)]
#[command(about = "Manage the user directory from the terminal")]
struct Cli {
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Rows per page, or `all`.
    #[arg(long, global = true)]
    page_size: Option<PageSize>,
    #[arg(long, global = true)]
    default_role: Option<Role>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    status: Option<UserStatus>,
    #[arg(long)]
    sort: Option<SortField>,
    #[arg(long)]
    order: Option<SortDirection>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of the table.
    List(ListArgs),
    /// Page through the table interactively.
    Browse(ListArgs),
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long, default_value = "active")]
        status: UserStatus,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        status: Option<UserStatus>,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    ToggleStatus {
        id: String,
    },
    /// Write selected rows of one page to a CSV file.
    Export {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
        /// Select every row on the page.
        #[arg(long)]
        all: bool,
        #[arg(long, default_value = "users.csv")]
        output: PathBuf,
    },
    /// Insert sample users.
    Seed {
        #[arg(long, default_value_t = 12)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&Overrides {
        backend: cli.backend,
        api_url: cli.api_url.clone(),
        database_url: cli.database_url.clone(),
        page_size: cli.page_size,
        default_role: cli.default_role,
    });
    let source = open_source(&settings).await?;

    match cli.command {
        Command::List(args) => {
            let list = load_list(source, &settings, &args).await;
            println!("{}", format_table(&view::render(&list.snapshot())));
        }
        Command::Browse(args) => {
            let list = ListController::with_state(source, list_state(&settings, &args));
            browse::run(list, settings.search_debounce()).await?;
        }
        Command::Add {
            name,
            email,
            phone,
            role,
            status,
        } => {
            let mut list = ListController::new(source.clone(), settings.page_size);
            let mut form = FormController::new(source, settings.default_role);
            form.open_create();
            let fields = form.fields_mut();
            fields.name = name;
            fields.email = email;
            fields.phone = phone;
            fields.role = role;
            fields.status = status;
            submit(&mut form, &mut list).await?;
        }
        Command::Edit {
            id,
            name,
            email,
            phone,
            role,
            status,
        } => {
            let mut list = ListController::new(source.clone(), settings.page_size);
            let mut form = FormController::new(source, settings.default_role);
            form.open_edit(&UserId::new(id))
                .await
                .map_err(notice_error)?;
            let fields = form.fields_mut();
            if let Some(name) = name {
                fields.name = name;
            }
            if let Some(email) = email {
                fields.email = email;
            }
            if let Some(phone) = phone {
                fields.phone = phone;
            }
            if role.is_some() {
                fields.role = role;
            }
            if let Some(status) = status {
                fields.status = status;
            }
            submit(&mut form, &mut list).await?;
        }
        Command::Delete { id, yes } => {
            if !yes && !confirm("Are you sure you want to delete this user?").await? {
                println!("Cancelled.");
                return Ok(());
            }
            let mut list = ListController::new(source, settings.page_size);
            let id = UserId::new(id);
            match list.delete_user(&id).await {
                Ok(true) => println!("Deleted user {id}."),
                Ok(false) => bail!("user {id} does not exist"),
                Err(notice) => return Err(notice_error(notice)),
            }
        }
        Command::ToggleStatus { id } => {
            let mut list = ListController::new(source, settings.page_size);
            let id = UserId::new(id);
            let status = list.toggle_status(&id).await.map_err(notice_error)?;
            println!("User {id} is now {}.", status.label());
        }
        Command::Export {
            list: args,
            ids,
            all,
            output,
        } => {
            let mut list = load_list(source, &settings, &args).await;
            if all {
                list.toggle_select_all_on_page(true);
            }
            for id in ids {
                let id = UserId::new(id.trim());
                if list.toggle_select(&id).is_none() {
                    eprintln!("user {id} is not on page {}; skipped", args.page);
                }
            }
            let mut writer = CsvSpreadsheet::new(Vec::new());
            let rows = export_selection(&list, &mut writer)?;
            std::fs::write(&output, writer.into_inner()?)
                .with_context(|| format!("cannot write {}", output.display()))?;
            println!("Exported {rows} users to {}.", output.display());
        }
        Command::Seed { count } => {
            let created = seed(source.as_ref(), count, settings.default_role).await?;
            println!("Seeded {created} users.");
        }
    }

    Ok(())
}

async fn open_source(settings: &Settings) -> Result<Arc<dyn DataSource>> {
    let source: Arc<dyn DataSource> = match settings.backend {
        Backend::Local => {
            let storage = Storage::new(&settings.database_url)
                .await
                .with_context(|| format!("cannot open {}", settings.database_url))?;
            Arc::new(LocalDataSource::new(storage))
        }
        Backend::Remote => Arc::new(RemoteDataSource::new(&settings.api_url)?),
    };
    info!(backend = ?settings.backend, "data source ready");
    Ok(source)
}

fn list_state(settings: &Settings, args: &ListArgs) -> ListState {
    let defaults = Sort::default();
    ListState {
        page: args.page.max(1),
        page_size: settings.page_size,
        filter: Filter {
            search: args.search.clone().unwrap_or_default(),
            role: args.role,
            status: args.status,
        },
        sort: Sort::new(
            args.sort.unwrap_or(defaults.field),
            args.order.unwrap_or(defaults.direction),
        ),
        ..ListState::default()
    }
}

async fn load_list(source: Arc<dyn DataSource>, settings: &Settings, args: &ListArgs) -> ListController {
    let mut list = ListController::with_state(source, list_state(settings, args));
    list.refresh().await;
    list
}

async fn submit(form: &mut FormController, list: &mut ListController) -> Result<()> {
    let title = form.title();
    match form.submit(list).await {
        Ok(user) => {
            println!("{title}: saved {} ({}).", user.name, user.id);
            Ok(())
        }
        Err(err) => Err(notice_error(err.notice())),
    }
}

fn notice_error(notice: Notice) -> anyhow::Error {
    anyhow::anyhow!(notice.message)
}

async fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

const SAMPLE_NAMES: [&str; 12] = [
    "Ada Lovelace",
    "Grace Hopper",
    "Alan Turing",
    "Edsger Dijkstra",
    "Barbara Liskov",
    "Donald Knuth",
    "Frances Allen",
    "Ken Thompson",
    "Margaret Hamilton",
    "Dennis Ritchie",
    "Radia Perlman",
    "John McCarthy",
];

async fn seed(source: &dyn DataSource, count: u32, default_role: Role) -> Result<u32> {
    let start = Utc::now() - ChronoDuration::days(i64::from(count));
    for n in 0..count {
        let name = SAMPLE_NAMES[n as usize % SAMPLE_NAMES.len()];
        let handle = name.to_lowercase().replace(' ', ".");
        let role = match n % 4 {
            0 => Role::Admin,
            1 => Role::Editor,
            _ => default_role,
        };
        let user = NewUser {
            id: None,
            name: name.to_string(),
            email: format!("{handle}{n}@example.com"),
            phone: format!("555-{:04}", 100 + n),
            role,
            status: if n % 5 == 4 {
                UserStatus::Inactive
            } else {
                UserStatus::Active
            },
            created_at: Some(start + ChronoDuration::days(i64::from(n))),
        };
        source.create(user).await?;
    }
    Ok(count)
}
