//! PageSearch CLI
//!
//! Command-line interface for remote incremental search lists.
//! Provides one-shot query/fetch commands and an interactive picker.

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use pagesearch::client::TOKEN_ENV;
use pagesearch::logging::{self, LogLevel};
use pagesearch::query::insert_filter_arg;
use pagesearch::tui::Outcome;
use pagesearch::{
    page_query, Filter, IncrementalSearchList, ListConfig, Page, PageSource, RestClient, Session,
};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;

/// PageSearch - searchable, scrollable lists over REST endpoints
#[derive(Parser)]
#[command(name = "pagesearch")]
#[command(author = "PageSearch Contributors")]
#[command(version)]
#[command(about = "Debounced search and infinite scroll over any {results} endpoint", long_about = None)]
struct Cli {
    /// Write a log file (default: next to the executable)
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Log debug messages too
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ListArgs {
    /// JSON config file (ListConfig fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint URL, overrides the config file
    #[arg(short, long)]
    url: Option<String>,

    /// Bearer token (falls back to the SEARCH_TOKEN environment variable)
    #[arg(long)]
    token: Option<String>,

    /// Records per page
    #[arg(long)]
    page_size: Option<u32>,

    /// Filter key the search text is sent under
    #[arg(long)]
    search_field: Option<String>,

    /// Default filter entries, key=value or key[]=value (repeatable)
    #[arg(short, long = "filter", allow_hyphen_values = true)]
    filters: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the query string for a page request
    Query {
        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Records per page
        #[arg(short, long, default_value = "20")]
        size: u32,

        /// Filter entries, key=value or key[]=value (repeatable)
        #[arg(short, long = "filter", allow_hyphen_values = true)]
        filters: Vec<String>,
    },

    /// Fetch a single page and print its records
    Fetch {
        #[command(flatten)]
        list: ListArgs,

        /// Search text
        #[arg(short, long)]
        search: Option<String>,

        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Interactive picker: type to search, scroll to load more
    Browse {
        #[command(flatten)]
        list: ListArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.log.is_some() || cli.verbose {
        let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
        logging::init(cli.log.as_deref(), level);
    }
    logging::info("MAIN", "PageSearch starting up");

    let result = match cli.command {
        Commands::Query {
            page,
            size,
            filters,
        } => cmd_query(page, size, &filters),

        Commands::Fetch {
            list,
            search,
            page,
            output,
        } => cmd_fetch(&list, search.as_deref(), page, &output),

        Commands::Browse { list } => cmd_browse(&list),
    };

    if let Err(e) = result {
        logging::error("MAIN", &e.to_string());
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

/// Merge config file, flags and filters into one validated config
fn resolve_config(args: &ListArgs) -> pagesearch::Result<ListConfig> {
    let mut config = match &args.config {
        Some(path) => ListConfig::load(path)?,
        None => ListConfig::default(),
    };

    if let Some(url) = &args.url {
        config.url = url.clone();
    }
    if let Some(size) = args.page_size {
        config.page_size = size;
    }
    if let Some(field) = &args.search_field {
        config.search_field = field.clone();
    }

    if !args.filters.is_empty() {
        let mut filter = config.default_filter_map();
        for arg in &args.filters {
            insert_filter_arg(&mut filter, arg)?;
        }
        config.default_filter = Value::Object(filter);
    }

    config.validate()?;
    Ok(config)
}

fn build_client(args: &ListArgs, config: &ListConfig) -> pagesearch::Result<RestClient> {
    let token = args
        .token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV).ok());

    let session = Session::new();
    session.set_token(token);
    RestClient::new(session, config.request_timeout())
}

/// Query command implementation
fn cmd_query(page: u32, size: u32, filters: &[String]) -> pagesearch::Result<()> {
    let mut filter = Filter::new();
    for arg in filters {
        insert_filter_arg(&mut filter, arg)?;
    }
    println!("{}", page_query(page.max(1), size.max(1), &filter));
    Ok(())
}

/// Fetch command implementation
fn cmd_fetch(
    args: &ListArgs,
    search: Option<&str>,
    page: u32,
    output_format: &str,
) -> pagesearch::Result<()> {
    let config = resolve_config(args)?;
    let client = build_client(args, &config)?;

    let mut filter = config.default_filter_map();
    if let Some(text) = search {
        filter.insert(config.search_field.clone(), Value::String(text.to_string()));
    }
    let query = page_query(page.max(1), config.page_size, &filter);

    let spinner = if output_format == "json" {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(spinner_style);
        }
        spinner.set_message(format!("Fetching page {}...", page.max(1)));
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    };

    let start = Instant::now();
    let fetched: pagesearch::Result<Page<Value>> = client.fetch(&config.url, &query);
    spinner.finish_and_clear();
    let page_data = fetched?;
    let elapsed = start.elapsed();
    let has_more = page_data.len() >= config.page_size as usize;

    if output_format == "json" {
        println!(
            "{}",
            serde_json::json!({
                "url": config.url,
                "query": query,
                "page": page.max(1),
                "count": page_data.len(),
                "has_more": has_more,
                "malformed": page_data.malformed,
                "results": page_data.results,
                "elapsed_seconds": elapsed.as_secs_f64(),
            })
        );
        return Ok(());
    }

    println!(
        "{} GET {}?{}",
        style("→").cyan().bold(),
        style(&config.url).yellow(),
        query
    );
    println!();

    if page_data.malformed {
        println!(
            "  {} response had no results array",
            style("!").yellow().bold()
        );
    }

    for (i, record) in page_data.results.iter().enumerate() {
        let label = record
            .get(&config.label_field)
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .unwrap_or_else(|| record.to_string());
        let value = record
            .get(&config.value_field)
            .map(Value::to_string)
            .unwrap_or_default();
        println!(
            "  {} {} {}",
            style(format!("{:3}.", i + 1)).dim(),
            style(label).cyan(),
            style(value).dim()
        );
    }

    println!();
    println!(
        "{} {} records in {}{}",
        style("✓").green().bold(),
        page_data.len(),
        style(HumanDuration(elapsed)).cyan(),
        if has_more { ", more available" } else { "" }
    );

    Ok(())
}

/// Browse command implementation
fn cmd_browse(args: &ListArgs) -> pagesearch::Result<()> {
    let config = resolve_config(args)?;
    let client = build_client(args, &config)?;
    let list = IncrementalSearchList::new(config, client)?;

    match pagesearch::tui::run(list)? {
        Outcome::Picked(value) => println!("{}", value),
        Outcome::Selection(values) if values.is_empty() => {}
        Outcome::Selection(values) => println!("{}", Value::Array(values)),
    }

    if let Some(path) = logging::log_path() {
        eprintln!("{} log written to {}", style("i").dim(), path.display());
    }

    Ok(())
}
