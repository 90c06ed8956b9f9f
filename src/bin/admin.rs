//! CLI administration tool for ad-click-tracker.
//!
//! Provides commands for managing ads, seeding demo data, viewing statistics,
//! and performing database operations without requiring HTTP API access.
//!
//! # Usage
//!
//! ```bash
//! # Create an ad (prompts for missing values)
//! cargo run --bin admin -- ad create --id tech-001
//!
//! # List all ads
//! cargo run --bin admin -- ad list
//!
//! # Seed demo ads with sample clicks
//! cargo run --bin admin -- seed --ads 5 --clicks 200
//!
//! # View statistics
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string

use ad_click_tracker::application::services::AdService;
use ad_click_tracker::domain::click_event::ClickEvent;
use ad_click_tracker::domain::entities::NewAd;
use ad_click_tracker::domain::repositories::AdRepository;
use ad_click_tracker::infrastructure::persistence::PgAdRepository;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input};
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;

const DEMO_CATEGORIES: &[&str] = &["tech", "travel", "food", "sports", "finance", "games"];

/// CLI tool for managing ad-click-tracker.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage ads
    Ad {
        #[command(subcommand)]
        action: AdAction,
    },

    /// Insert demo ads and sample clicks from the last 24 hours
    Seed {
        /// Number of ads to create
        #[arg(long, default_value_t = 5)]
        ads: usize,

        /// Clicks to generate per ad
        #[arg(long, default_value_t = 200)]
        clicks: usize,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Ad management subcommands.
#[derive(Subcommand)]
enum AdAction {
    /// Create a new ad
    Create {
        /// Ad id (e.g., "tech-001")
        #[arg(short, long)]
        id: Option<String>,

        /// Banner image URL
        #[arg(long)]
        image_url: Option<String>,

        /// Landing page URL
        #[arg(long)]
        target_url: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List all ads
    List,
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,

    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let repo: Arc<dyn AdRepository> = Arc::new(PgAdRepository::new(Arc::new(pool.clone())));

    match cli.command {
        Commands::Ad { action } => handle_ad_action(action, repo).await?,
        Commands::Seed { ads, clicks, yes } => seed(repo, ads, clicks, yes).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Dispatches ad management commands.
async fn handle_ad_action(action: AdAction, repo: Arc<dyn AdRepository>) -> Result<()> {
    let service = AdService::new(repo);

    match action {
        AdAction::Create {
            id,
            image_url,
            target_url,
            yes,
        } => create_ad(&service, id, image_url, target_url, yes).await,
        AdAction::List => list_ads(&service).await,
    }
}

fn prompt_or(value: Option<String>, prompt: &str, initial: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new()
            .with_prompt(prompt)
            .with_initial_text(initial)
            .interact_text()?),
    }
}

/// Creates an ad with interactive prompts for missing fields.
async fn create_ad(
    service: &AdService,
    id: Option<String>,
    image_url: Option<String>,
    target_url: Option<String>,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "Create Ad".bright_blue().bold());
    println!();

    let id = prompt_or(id, "Ad id", "tech-001")?;
    let image_url = prompt_or(
        image_url,
        "Image URL",
        &format!("https://cdn.example.com/{}.png", id),
    )?;
    let target_url = prompt_or(target_url, "Target URL", "https://example.com/")?;

    println!();
    println!("{}", "Ad details:".bright_white().bold());
    println!("  Id:         {}", id.cyan());
    println!("  Image URL:  {}", image_url.cyan());
    println!("  Target URL: {}", target_url.cyan());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this ad?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    let ad = service
        .create_ad(NewAd {
            id,
            image_url,
            target_url,
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create ad: {}", e))?;

    println!("{} {}", "Ad created:".green().bold(), ad.id.bright_yellow());
    println!();
    println!("{}", "Record a click with:".bright_white());
    println!(
        "  curl -X POST http://localhost:8080/ads/click -H 'Content-Type: application/json' -d '{{\"ad_id\":\"{}\"}}'",
        ad.id
    );
    println!();

    Ok(())
}

/// Lists all ads.
///
/// # Output Format
///
/// ```text
/// Ads
///
///   Id                   Clicks     Created            Target
///   ---------------------------------------------------------------------------
///   tech-001             42         2024-05-01 10:30   https://example.com/landing
/// ```
async fn list_ads(service: &AdService) -> Result<()> {
    println!("{}", "Ads".bright_blue().bold());
    println!();

    let ads = service
        .list_ads()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list ads: {}", e))?;

    if ads.is_empty() {
        println!("{}", "  No ads found".yellow());
        println!();
        println!(
            "  Create one with: {} admin ad create",
            "cargo run --bin".bright_cyan()
        );
        return Ok(());
    }

    println!(
        "  {:<20} {:<10} {:<18} {}",
        "Id".bright_white().bold(),
        "Clicks".bright_white().bold(),
        "Created".bright_white().bold(),
        "Target".bright_white().bold()
    );
    println!("  {}", "-".repeat(75).bright_black());

    for ad in &ads {
        println!(
            "  {:<20} {:<10} {:<18} {}",
            ad.id.cyan(),
            ad.total_clicks.to_string().bright_green(),
            ad.created_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            ad.target_url
        );
    }

    println!();
    println!("  Total: {}", ads.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

/// Seeds demo ads and random clicks spread over the last 24 hours.
///
/// Ads that already exist are reused; their totals grow by the new clicks.
async fn seed(
    repo: Arc<dyn AdRepository>,
    ads: usize,
    clicks_per_ad: usize,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "Seed Demo Data".bright_blue().bold());
    println!();
    println!(
        "  {} ads, {} clicks each",
        ads.to_string().cyan(),
        clicks_per_ad.to_string().cyan()
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Insert demo data?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    let now = Utc::now();

    for n in 0..ads {
        let category = DEMO_CATEGORIES[n % DEMO_CATEGORIES.len()];
        let id = format!("{}-{:03}", category, n + 1);

        if !repo.exists_ad(&id).await? {
            repo.create_ad(NewAd {
                id: id.clone(),
                image_url: format!("https://cdn.example.com/ads/{}.png", id),
                target_url: format!("https://example.com/{}", category),
            })
            .await?;
        }

        let clicks: Vec<ClickEvent> = {
            let mut rng = rand::rng();
            (0..clicks_per_ad)
                .map(|_| {
                    let ip = format!(
                        "198.51.100.{}",
                        rng.random_range(1..=254u8)
                    );
                    let age = Duration::seconds(rng.random_range(0..86_400));
                    ClickEvent::new(id.as_str(), ip, rng.random_range(0..120), now - age)
                })
                .collect()
        };

        repo.bulk_insert_clicks(&clicks).await?;
        repo.increment_ad_total(&id, clicks.len() as i64).await?;

        println!(
            "  {} {} ({} clicks)",
            "+".green(),
            id.cyan(),
            clicks.len()
        );
    }

    println!();
    println!("{}", "Demo data inserted".green().bold());
    println!();

    Ok(())
}

/// Displays system statistics.
///
/// Shows:
/// - Number of live ads
/// - Total stored clicks
/// - Clicks in the last hour
/// - Top ads by total clicks
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "Statistics".bright_blue().bold());
    println!();

    let ads_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ads WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;

    let clicks_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks")
        .fetch_one(pool)
        .await?;

    let recent_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM clicks WHERE clicked_at >= NOW() - INTERVAL '1 hour'",
    )
    .fetch_one(pool)
    .await?;

    println!(
        "  Ads:               {}",
        ads_count.to_string().bright_green().bold()
    );
    println!(
        "  Clicks:            {}",
        clicks_count.to_string().bright_green().bold()
    );
    println!(
        "  Clicks (last 1h):  {}",
        recent_count.to_string().bright_green().bold()
    );

    let top: Vec<(String, i64)> = sqlx::query_as(
        "SELECT id, total_clicks FROM ads WHERE deleted_at IS NULL ORDER BY total_clicks DESC LIMIT 5",
    )
    .fetch_all(pool)
    .await?;

    if !top.is_empty() {
        println!();
        println!("  {}", "Top ads:".bright_white().bold());
        for (id, total) in top {
            println!("    {:<20} {}", id.cyan(), total.to_string().bright_green());
        }
    }
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
        DbAction::Migrate => {
            println!("{}", "Applying migrations...".bright_blue());

            sqlx::migrate!("./migrations")
                .run(pool)
                .await
                .context("Failed to migrate")?;

            println!("{}", "Migrations applied".green().bold());
        }
    }

    Ok(())
}
