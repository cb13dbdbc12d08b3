//! BioSemantica CLI - Command-line interface
//!
//! Usage:
//!   biosem search <query> [--top-k N] [--type T] [--year Y] [--json]
//!   biosem stats [--json]
//!   biosem content-types

use anyhow::Context;
use biosem_core::{content_type_catalog, AppConfig, CollectionStats, SearchQuery, SearchResult};
use biosem_retriever::SearchService;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 160;

#[derive(Parser)]
#[command(name = "biosem")]
#[command(about = "Multimodal semantic search over biology research content")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the collection
    Search {
        /// Natural-language query
        query: String,
        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Restrict to one content type (text, image, sequence, experiment)
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,
        /// Restrict to one publication year
        #[arg(short, long)]
        year: Option<i64>,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show collection statistics
    Stats {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// List the searchable content types
    ContentTypes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Search {
            query,
            top_k,
            content_type,
            year,
            json,
        } => {
            let top_k = top_k.unwrap_or(config.retriever.default_top_k);
            let mut search = SearchQuery::new(query).with_top_k(top_k);
            if let Some(content_type) = content_type {
                search = search.with_content_type(content_type);
            }
            if let Some(year) = year {
                search = search.with_year(year);
            }

            let service = SearchService::initialize(&config).await;
            let results = service.search(&search).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", render_results(&results));
            }
        }
        Commands::Stats { json } => {
            let service = SearchService::initialize(&config).await;
            let stats = service.collection_info().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", render_stats(&stats));
            }
        }
        Commands::ContentTypes => {
            for info in content_type_catalog() {
                println!("{:<12} {:<28} {}", info.value, info.label, info.description);
            }
        }
    }

    Ok(())
}

fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "{:>2}. [{}] {:.4}  {}\n",
            rank + 1,
            result.content_type,
            result.score,
            result.id
        ));
        let text = if result.description.is_empty() {
            &result.content
        } else {
            &result.description
        };
        out.push_str(&format!("    {}\n", preview(text, PREVIEW_CHARS)));
    }
    out
}

fn render_stats(stats: &CollectionStats) -> String {
    let mut out = format!(
        "Collection: {}\nStatus:     {}\nPoints:     {}\nDimension:  {}\n",
        stats.collection_name, stats.status, stats.total_points, stats.vector_dimension
    );

    let qualifier = if stats.approximate {
        format!(" (sampled {} points)", stats.sampled_points)
    } else {
        String::new()
    };
    out.push_str(&format!("Content types{qualifier}:\n"));
    for (content_type, count) in &stats.content_types {
        out.push_str(&format!("  {content_type:<12} {count}\n"));
    }
    out
}

/// First `max_chars` characters on one line
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
