//! webkeep main entry point
//!
//! This is the command-line interface for capturing pages and browsing the
//! captured catalog.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use webkeep::config::{load_config_with_hash, Config};
use webkeep::crawler::Coordinator;
use webkeep::storage::{open_storage, DocumentRecord, DocumentStore, SqliteStorage};

/// webkeep: capture web pages as self-contained Markdown
///
/// Each capture stores the page's Markdown, its raw source and local copies of
/// its images under `root/category/host/hash`.
#[derive(Parser, Debug)]
#[command(name = "webkeep")]
#[command(version)]
#[command(about = "Capture web pages as self-contained Markdown", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "webkeep.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a page
    Crawl {
        url: String,
        /// Category to file the page under; created if missing
        #[arg(long)]
        category: Option<String>,
    },

    /// Show which crawler a URL would use
    Which { url: String },

    /// List categories
    Categories,

    /// Create a category
    AddCategory { name: String },

    /// List captured documents
    List {
        #[arg(long)]
        category: Option<String>,
        /// Only documents whose title or URL contains this text
        #[arg(long)]
        query: Option<String>,
    },

    /// Print a document's Markdown with servable image URLs
    Show { url: String },

    /// Move a document to another category
    Move { url: String, category: String },

    /// Delete a document and its files
    Delete { url: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Crawl { url, category } => handle_crawl(&config, &url, category.as_deref()).await?,
        Command::Which { url } => handle_which(&config, &url)?,
        Command::Categories => handle_categories(&config)?,
        Command::AddCategory { name } => handle_add_category(&config, &name)?,
        Command::List { category, query } => {
            handle_list(&config, category.as_deref(), query.as_deref())?
        }
        Command::Show { url } => handle_show(&config, &url)?,
        Command::Move { url, category } => handle_move(&config, &url, &category)?,
        Command::Delete { url } => handle_delete(&config, &url)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webkeep=info,warn"),
            1 => EnvFilter::new("webkeep=debug,info"),
            2 => EnvFilter::new("webkeep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open(config: &Config) -> anyhow::Result<SqliteStorage> {
    open_storage(
        Path::new(&config.storage.database_path),
        Path::new(&config.storage.root),
    )
    .with_context(|| format!("Failed to open catalog {}", config.storage.database_path))
}

/// Looks a category up by name, creating it if needed
fn ensure_category(storage: &mut impl DocumentStore, name: &str) -> anyhow::Result<i64> {
    if let Some(category) = storage.find_category_by_name(name)? {
        return Ok(category.id);
    }
    let id = storage.add_category(name)?;
    tracing::info!("Created category {}", name);
    Ok(id)
}

fn lookup_category(storage: &impl DocumentStore, name: Option<&str>) -> anyhow::Result<Option<i64>> {
    match name {
        Some(name) => storage
            .find_category_by_name(name)?
            .map(|c| Some(c.id))
            .ok_or_else(|| anyhow!("No such category: {}", name)),
        None => Ok(None),
    }
}

/// Handles `crawl`: runs the capture pipeline for one URL
async fn handle_crawl(config: &Config, url: &str, category: Option<&str>) -> anyhow::Result<()> {
    let mut storage = open(config)?;
    let category_id = match category {
        Some(name) => Some(ensure_category(&mut storage, name)?),
        None => None,
    };

    let mut coordinator = Coordinator::from_config(config, storage)
        .context("Failed to initialize capture pipeline")?;
    let result = coordinator.capture(url, category_id).await;

    match (result.success, result.doc_id) {
        (true, Some(id)) => {
            println!("✓ Captured {} as document {}", result.title, id);
            println!("  {} images referenced", result.image_urls.len());
            Ok(())
        }
        (false, Some(id)) => {
            println!("{} (document {}); files refreshed", result.message, id);
            Ok(())
        }
        _ => Err(anyhow!("Capture failed: {}", result.message)),
    }
}

/// Handles `which`: shows the dispatcher's choice for a URL
fn handle_which(config: &Config, url: &str) -> anyhow::Result<()> {
    let dispatcher = webkeep::CrawlerDispatcher::from_config(config)?;
    println!("{} -> {}", url, dispatcher.kind_for(url));

    let rules: Vec<_> = dispatcher.rules().collect();
    if !rules.is_empty() {
        println!("\nRules:");
        for (glob, kind) in rules {
            println!("  {} -> {}", glob, kind);
        }
    }
    Ok(())
}

fn handle_categories(config: &Config) -> anyhow::Result<()> {
    let storage = open(config)?;
    let categories = storage.list_categories()?;
    if categories.is_empty() {
        println!("No categories");
    }
    for category in categories {
        println!("{:>4}  {}", category.id, category.name);
    }
    Ok(())
}

fn handle_add_category(config: &Config, name: &str) -> anyhow::Result<()> {
    let mut storage = open(config)?;
    let id = storage.add_category(name)?;
    println!("✓ Created category {} ({})", name, id);
    Ok(())
}

fn handle_list(config: &Config, category: Option<&str>, query: Option<&str>) -> anyhow::Result<()> {
    let storage = open(config)?;
    let category_id = lookup_category(&storage, category)?;

    let documents = match query {
        Some(query) => storage.search_documents(query, category_id)?,
        None => storage.list_documents(category_id)?,
    };

    if documents.is_empty() {
        println!("No documents");
    }
    for document in &documents {
        print_document(document);
    }
    Ok(())
}

fn print_document(document: &DocumentRecord) {
    println!(
        "{:>4}  [{}] {}\n      {}",
        document.id,
        document.category_name.as_deref().unwrap_or("uncategorized"),
        document.title.as_deref().unwrap_or("Untitled"),
        document.url
    );
}

/// Handles `show`: prints stored Markdown with servable image URLs
fn handle_show(config: &Config, url: &str) -> anyhow::Result<()> {
    let storage = open(config)?;
    let coordinator = Coordinator::from_config(config, storage)?;
    let markdown = coordinator
        .render(url)?
        .ok_or_else(|| anyhow!("Document not found: {}", url))?;
    println!("{}", markdown);
    Ok(())
}

fn handle_move(config: &Config, url: &str, category: &str) -> anyhow::Result<()> {
    let mut storage = open(config)?;
    let category_id = ensure_category(&mut storage, category)?;
    storage.update_document_category(url, Some(category_id))?;
    println!("✓ Moved {} to {}", url, category);
    Ok(())
}

fn handle_delete(config: &Config, url: &str) -> anyhow::Result<()> {
    let mut storage = open(config)?;
    if storage.delete_document(url)? {
        println!("✓ Deleted {}", url);
        Ok(())
    } else {
        Err(anyhow!("Document not found: {}", url))
    }
}
