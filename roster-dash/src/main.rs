//! roster-dash - command-line roster dashboard
//!
//! Loads the roster from the backend, applies search, filter, sort and
//! pagination settings, and prints the projected table. Refresh commands
//! wait for the backend jobs to land before returning.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use roster_common::config::load_config;
use roster_common::events::{DashEvent, NoticeLevel, RefreshOutcome};
use roster_dash::columns::RefreshSource;
use roster_dash::filter::{FilterOperator, FilterSpec};
use roster_dash::refresh::RefreshHandle;
use roster_dash::state::ViewRequest;
use roster_dash::view::{SortDirection, PAGE_SIZE_ALL};
use roster_dash::{AssumeYes, Confirm, Dashboard, HttpBackend};
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter};

/// Command-line arguments for roster-dash
#[derive(Parser, Debug)]
#[command(name = "roster-dash")]
#[command(about = "Inspect and curate the artist roster")]
#[command(version)]
struct Cli {
    /// Backend base URL
    #[arg(short, long, env = "ROSTER_BACKEND_URL")]
    backend: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the projected table
    List {
        #[command(flatten)]
        view: ViewArgs,

        /// Sort column (ascending unless --desc)
        #[arg(long)]
        sort: Option<String>,

        #[arg(long, requires = "sort")]
        desc: bool,

        /// 1-indexed page
        #[arg(long)]
        page: Option<usize>,

        /// Rows per page, or "all"
        #[arg(long, value_parser = parse_page_size)]
        page_size: Option<usize>,

        /// Comma-separated visible columns
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
    },

    /// Refresh named artists
    Refresh {
        #[arg(required = true)]
        names: Vec<String>,

        /// Only this source (instagram, spotify, twitter, stubhub)
        #[arg(long)]
        source: Option<RefreshSource>,
    },

    /// Refresh one column's source for every filtered artist
    RefreshColumn {
        column: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Refresh the most recent artists
    RefreshAll,

    /// Delete artists
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Edit fields of one artist
    Update {
        name: String,

        /// field=value pairs
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Reload on the configured interval and print the table until interrupted
    Watch {
        #[command(flatten)]
        view: ViewArgs,
    },
}

/// Search and filter settings shared by several commands
#[derive(Args, Debug)]
struct ViewArgs {
    /// Case-insensitive name search
    #[arg(short, long)]
    query: Option<String>,

    /// Column filter as column:operator[:value], e.g. spotify_followers:>=:1000
    #[arg(short, long)]
    filter: Vec<String>,
}

/// Interactive stdin prompt
struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        let _ = io::stdout().flush();
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn parse_page_size(s: &str) -> std::result::Result<usize, String> {
    if s.eq_ignore_ascii_case("all") {
        return Ok(PAGE_SIZE_ALL);
    }
    s.parse::<usize>().map_err(|_| format!("expected a number or \"all\", got {:?}", s))
}

/// Split `column:operator[:value]`
fn parse_filter(arg: &str) -> Result<(String, FilterOperator, String)> {
    let mut parts = arg.splitn(3, ':');
    let column = parts
        .next()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| anyhow!("Filter {:?} has no column", arg))?;
    let operator = FilterOperator::from_token(parts.next().unwrap_or(""))?;
    let value = parts.next().unwrap_or("");
    Ok((column.to_string(), operator, value.to_string()))
}

/// Split `field=value`
fn parse_field(arg: &str) -> Result<(&str, &str)> {
    arg.split_once('=')
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| anyhow!("Expected field=value, got {:?}", arg))
}

fn print_notice(level: NoticeLevel, message: &str) {
    let tag = match level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Info => "..",
        NoticeLevel::Error => "!!",
    };
    println!("[{}] {}", tag, message);
}

/// Print every notice received so far
fn drain_notices(rx: &mut broadcast::Receiver<DashEvent>) {
    loop {
        match rx.try_recv() {
            Ok(DashEvent::Notice { level, message, .. }) => print_notice(level, &message),
            Ok(_) => {}
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "Notice printer lagged"),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

impl ViewArgs {
    /// Search and filters as a view request
    fn to_request(&self) -> Result<ViewRequest> {
        let filters = self
            .filter
            .iter()
            .map(|arg| {
                let (column, operator, value) = parse_filter(arg)?;
                Ok((column, FilterSpec::new(operator, value)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ViewRequest {
            query: self.query.clone(),
            filters,
            ..ViewRequest::default()
        })
    }
}

/// Wait for a refresh job, printing notices as they arrive
async fn wait_refresh(
    handle: RefreshHandle,
    rx: &mut broadcast::Receiver<DashEvent>,
) -> Result<RefreshOutcome> {
    let mut progress = handle.watch();
    let wait = handle.wait();
    tokio::pin!(wait);

    loop {
        tokio::select! {
            outcome = &mut wait => {
                drain_notices(rx);
                return Ok(outcome?);
            }
            changed = progress.changed() => {
                if changed.is_err() {
                    let outcome = (&mut wait).await;
                    drain_notices(rx);
                    return Ok(outcome?);
                }
                let p = progress.borrow().clone();
                info!(
                    completed = p.completed,
                    targets = p.targets,
                    ticks = p.ticks,
                    "Waiting for refresh"
                );
                drain_notices(rx);
            }
        }
    }
}

async fn watch(dash: &Dashboard, rx: &mut broadcast::Receiver<DashEvent>) -> Result<()> {
    let reload = dash.spawn_auto_reload();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = rx.recv() => match event {
                Ok(DashEvent::RosterAdopted { .. }) => {
                    print!("{}", dash.table().await.render_text());
                }
                Ok(DashEvent::Notice { level, message, .. }) => print_notice(level, &message),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    }
    reload.abort();
    Ok(())
}

async fn run(dash: &Dashboard, command: Command, confirm: &dyn Confirm) -> Result<()> {
    let mut rx = dash.subscribe();

    if !matches!(command, Command::Watch { .. }) {
        dash.reload().await.context("Failed to load roster")?;
    }

    match command {
        Command::List {
            view,
            sort,
            desc,
            page,
            page_size,
            columns,
        } => {
            let sort = sort.map(|column| {
                let direction = if desc {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                };
                (column, direction)
            });
            let request = ViewRequest {
                columns,
                sort,
                page_size,
                page,
                ..view.to_request()?
            };
            dash.apply_view(&request).await?;

            let table = dash.table().await;
            print!("{}", table.render_text());
            let recent = dash.recent().await;
            if !recent.is_empty() {
                println!("Recent: {}", recent.join(", "));
            }
        }

        Command::Refresh { names, source } => {
            let handle = dash.refresh_names(names, source).await?;
            let outcome = wait_refresh(handle, &mut rx).await?;
            info!(?outcome, "Refresh finished");
        }

        Command::RefreshColumn { column, view } => {
            dash.apply_view(&view.to_request()?).await?;
            let result = dash.refresh_column(&column, confirm).await;
            drain_notices(&mut rx);
            match result? {
                Some(handle) => {
                    wait_refresh(handle, &mut rx).await?;
                }
                None => println!("Cancelled"),
            }
        }

        Command::RefreshAll => {
            let handle = dash.refresh_all().await?;
            wait_refresh(handle, &mut rx).await?;
        }

        Command::Delete { names } => {
            if let [name] = names.as_slice() {
                let result = dash.delete_artist(name, confirm).await;
                drain_notices(&mut rx);
                if !result? {
                    println!("Cancelled");
                }
            } else {
                for name in &names {
                    if !dash.selected().await.contains(name) {
                        dash.toggle_row(name).await;
                    }
                }
                let result = dash.bulk_delete(confirm).await;
                drain_notices(&mut rx);
                if result?.is_none() {
                    println!("Cancelled");
                }
            }
        }

        Command::Update { name, fields } => {
            for arg in &fields {
                let (field, value) = parse_field(arg)?;
                dash.edit_cell(&name, field, value).await?;
            }
            let result = dash.save_changes(&name).await;
            drain_notices(&mut rx);
            result?;
        }

        Command::Watch { view } => {
            dash.apply_view(&view.to_request()?).await?;
            watch(dash, &mut rx).await?;
        }
    }

    drain_notices(&mut rx);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; the configured level replaces the default once loaded
    let env_filter = EnvFilter::try_from_default_env().ok();
    let level_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let (config, origin) = load_config(cli.config.as_deref(), cli.backend.as_deref())
        .context("Failed to load configuration")?;
    if !level_from_env {
        filter_handle
            .reload(EnvFilter::new(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }
    origin.log();

    // Log build identification
    info!(
        "Starting roster-dash v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Backend: {}", config.base_url());

    let backend = HttpBackend::new(config.base_url(), config.request_timeout())
        .context("Failed to build HTTP client")?;
    let dash = Dashboard::new(config, Arc::new(backend));

    let confirm: &dyn Confirm = if cli.yes { &AssumeYes } else { &PromptConfirm };
    run(&dash, cli.command, confirm).await
}
