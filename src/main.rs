//! Socialkg CLI - operator surface for the social knowledge graph

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use socialkg::config;
use socialkg::ingest::{IngestBatch, IngestService};
use socialkg::retention::RetentionEngine;
use socialkg::stats::StatsAggregator;
use socialkg::storage::GraphStore;

#[derive(Parser)]
#[command(name = "socialkg")]
#[command(version)]
#[command(about = "Social intelligence knowledge graph - storage, stats and retention")]
#[command(long_about = r#"
Socialkg stores curated social-media posts and their derived analyses as a
typed graph, answers aggregate queries, and enforces rule-driven retention.

Example usage:
  socialkg serve --port 8769
  socialkg ingest --file batch.json
  socialkg cleanup --dry-run
  socialkg stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API for the scraping client
    Serve {
        /// Address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Ingest a batch file of posts and derived records
    Ingest {
        /// JSON file with {posts, filtered, discovery}
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List recently scraped posts
    Recent {
        /// Look-back window in hours
        #[arg(long, default_value = "24")]
        hours: i64,

        /// Maximum number of posts
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Only posts from this platform
        #[arg(long)]
        platform: Option<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List filtered posts, best relevance first within a category
    Filtered {
        /// Category to filter by
        #[arg(short, long)]
        category: Option<String>,

        /// Maximum number of records
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show overall statistics
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Run the retention rules
    Cleanup {
        /// Compute would-be-affected counts without mutating anything
        #[arg(long)]
        dry_run: bool,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List retention rules
    Rules {
        /// Include disabled rules
        #[arg(short, long)]
        all: bool,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Write a default socialkg.toml
    Init {
        /// Config file location
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Tabled)]
struct RuleRow {
    id: String,
    target: String,
    condition: String,
    threshold: i64,
    action: String,
    enabled: bool,
    last_run: String,
}

/// CLI args win over socialkg.toml, which wins over built-in defaults
fn resolve_database(arg: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(path);
    }
    if let Some(cfg) = config::load_config(None)? {
        if let Some(database) = cfg.database {
            return Ok(PathBuf::from(database));
        }
    }
    Ok(config::default_database_path())
}

/// Open the store, seeding the baseline rules on first contact
fn open_store(path: &Path) -> anyhow::Result<GraphStore> {
    config::ensure_db_dir(path)?;
    let store = GraphStore::open(path)?;
    store.seed_default_rules()?;
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve { host, port, database } => {
            let cfg = config::load_config(None)?.unwrap_or_default();
            let host = host
                .or(cfg.host)
                .unwrap_or_else(|| config::DEFAULT_HOST.to_string());
            let port = port.or(cfg.port).unwrap_or(config::DEFAULT_PORT);
            let database = resolve_database(database)?;

            config::ensure_db_dir(&database)?;
            socialkg::server::start_server(&host, port, &database).await?;
        }

        Commands::Ingest { file, database } => {
            let database = resolve_database(database)?;
            let store = open_store(&database)?;

            let raw = std::fs::read_to_string(&file)?;
            let batch: IngestBatch = serde_json::from_str(&raw)?;

            println!("📥 Ingesting {} records from {:?}", batch.len(), file);
            let report = IngestService::new(&store).ingest(&batch);

            println!(
                "   {} posts, {} filtered, {} discovery stored",
                report.posts_stored.green(),
                report.filtered_stored.green(),
                report.discovery_stored.green()
            );
            if !report.failures.is_empty() {
                println!("   {} records failed:", report.failures.len().red());
                for failure in &report.failures {
                    println!(
                        "   - [{}] {} {}: {}",
                        failure.kind, failure.record, failure.id, failure.error
                    );
                }
            }
        }

        Commands::Recent { hours, limit, platform, database } => {
            let database = resolve_database(database)?;
            let store = open_store(&database)?;

            let mut posts = store.recent_posts(hours, limit)?;
            if let Some(platform) = &platform {
                posts.retain(|p| &p.platform == platform);
            }

            if posts.is_empty() {
                println!("∅ No posts in the last {} hours.", hours);
            } else {
                for post in posts {
                    println!(
                        "- [{}] {} @{}: {}",
                        post.platform,
                        post.scraped_at.format("%Y-%m-%d %H:%M"),
                        post.author,
                        truncate(&post.content, 80)
                    );
                }
            }
        }

        Commands::Filtered { category, limit, database } => {
            let database = resolve_database(database)?;
            let store = open_store(&database)?;

            let posts = store.filtered_posts(category.as_deref(), limit)?;
            if posts.is_empty() {
                println!("∅ No filtered posts found.");
            } else {
                for fp in posts {
                    println!(
                        "- [{:.1}] {}/{} ({}): {}",
                        fp.relevance_score,
                        fp.category,
                        if fp.sub_category.is_empty() { "-" } else { fp.sub_category.as_str() },
                        fp.post_id,
                        truncate(&fp.summary, 70)
                    );
                }
            }
        }

        Commands::Stats { database } => {
            let database = resolve_database(database)?;
            let store = open_store(&database)?;

            let stats = StatsAggregator::new(&store).overall_stats()?;
            println!("📊 Socialkg Statistics ({:?})", database);
            println!("------------------------------------");
            println!("{}", stats.counts);
            println!(
                "  Sentiments: {} positive / {} negative / {} neutral",
                stats.discovery.sentiments.positive.green(),
                stats.discovery.sentiments.negative.red(),
                stats.discovery.sentiments.neutral
            );
            println!("  KOL profiles: {}", stats.discovery.kols);
            println!("  Trends detected: {}", stats.discovery.trends);
        }

        Commands::Cleanup { dry_run, database } => {
            let database = resolve_database(database)?;
            let store = open_store(&database)?;

            if dry_run {
                println!("🔍 Dry run - computing would-be-affected counts...");
            } else {
                println!("🧹 Running retention rules...");
            }

            let outcomes = RetentionEngine::new(&store).run(dry_run)?;
            for outcome in &outcomes {
                let marker = if outcome.executed {
                    "✔".green().to_string()
                } else {
                    "∅".to_string()
                };
                println!(
                    "{} {} {}/{} -> {}: {} affected",
                    marker,
                    outcome.rule_id.bold(),
                    outcome.target,
                    outcome.condition,
                    outcome.action,
                    outcome.affected
                );
            }
        }

        Commands::Rules { all, database } => {
            let database = resolve_database(database)?;
            let store = open_store(&database)?;

            let rules = store.cleanup_rules(!all)?;
            let rows: Vec<RuleRow> = rules
                .into_iter()
                .map(|r| RuleRow {
                    id: r.id,
                    target: r.target.to_string(),
                    condition: r.condition.to_string(),
                    threshold: r.threshold,
                    action: r.action.to_string(),
                    enabled: r.enabled,
                    last_run: r
                        .last_run
                        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "never".to_string()),
                })
                .collect();

            println!("{}", Table::new(rows));
        }

        Commands::Init { path, force } => {
            let path = path.unwrap_or_else(config::default_config_path);
            let cfg = config::ServiceConfig {
                database: Some(config::default_database_path().display().to_string()),
                host: Some(config::DEFAULT_HOST.to_string()),
                port: Some(config::DEFAULT_PORT),
            };
            config::write_config(&path, &cfg, force)?;
            println!("✅ Wrote {}", path.display());
        }
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
