use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{ItemId, RATING_RANGE, RatingStore, RatingValue};
use engine::{BackendKind, EngineConfig, ItemBasedRecommender, MatrixInit, build_recommender};
use similarity::JsonFileArtifact;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// ClosetRecs - Clothing Item Recommender
#[derive(Parser)]
#[command(name = "closet-recs")]
#[command(about = "Item recommender using item-based collaborative filtering", long_about = None)]
struct Cli {
    /// Seed ratings file (userId,itemId,rating)
    #[arg(short, long, default_value = "data/ratings.csv")]
    ratings: PathBuf,

    /// JSON engine config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recommender backend: item-based or factorization
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Where the similarity matrix is saved and loaded
    #[arg(long)]
    matrix: Option<PathBuf>,

    /// Rebuild the similarity matrix instead of loading the saved one
    #[arg(long)]
    rebuild: bool,

    /// Catalog size
    #[arg(long)]
    items: Option<u32>,

    /// Seed for sampling and factor initialization
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get item recommendations for a user
    Recommend {
        /// User name to get recommendations for
        #[arg(long)]
        user: String,

        /// Number of recommendations to return
        #[arg(long, default_value = "4")]
        limit: usize,
    },

    /// Rate a few items interactively, then get recommendations
    Survey {
        #[arg(long)]
        user: String,

        /// How many items to ask about
        #[arg(long, default_value = "5")]
        count: usize,

        #[arg(long, default_value = "4")]
        limit: usize,
    },

    /// Rebuild and save the similarity matrix
    BuildMatrix,

    /// Show rating counts and item means
    Stats,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    println!("Loading ratings from {}...", cli.ratings.display());
    let start = Instant::now();
    let store = RatingStore::load_from_file(&cli.ratings, config.catalog())
        .context("Failed to load seed ratings")?;
    println!("{} Loaded ratings in {:?}", "✓".green(), start.elapsed());

    match cli.command {
        Commands::Recommend { user, limit } => handle_recommend(&config, store, &user, limit)?,
        Commands::Survey { user, count, limit } => {
            handle_survey(&config, store, &user, count, limit)?
        }
        Commands::BuildMatrix => handle_build_matrix(&config, store)?,
        Commands::Stats => handle_stats(&store),
    }

    Ok(())
}

/// Config file first, then command-line overrides
fn resolve_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(matrix) = &cli.matrix {
        config.matrix_path = matrix.clone();
    }
    if cli.rebuild {
        config.load_existing_matrix = false;
    }
    if let Some(items) = cli.items {
        config.catalog_size = items;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    debug!("Resolved config: {:?}", config);
    Ok(config)
}

/// Handle the 'recommend' command
fn handle_recommend(
    config: &EngineConfig,
    store: RatingStore,
    user: &str,
    limit: usize,
) -> Result<()> {
    let known = store.has_user(user);
    let mut recommender = build_recommender(config, store)?;
    let session = recommender.login(user);

    if !known {
        println!(
            "{} {} has no ratings yet; ranking by item averages",
            "!".yellow(),
            user
        );
    }
    let items = recommender.recommend(&session, limit)?;
    print_recommendations(recommender.name(), user, &items);
    Ok(())
}

/// Handle the 'survey' command
fn handle_survey(
    config: &EngineConfig,
    store: RatingStore,
    user: &str,
    count: usize,
    limit: usize,
) -> Result<()> {
    let mut recommender = build_recommender(config, store)?;
    let session = recommender.login(user);

    let prompt = format!(
        "Rate up to {} items from {} to {} (empty line to stop)",
        count,
        RATING_RANGE.start(),
        RATING_RANGE.end()
    );
    println!("{}", prompt.bold().blue());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut items: Vec<ItemId> = Vec::new();
    let mut ratings: Vec<RatingValue> = Vec::new();

    'survey: while items.len() < count {
        let Some(item_id) = recommender.next_item_to_rate(Some(&session)) else {
            bail!("The catalog is empty");
        };

        loop {
            print!("  {} > ", format_item(item_id).cyan());
            io::stdout().flush()?;

            let Some(line) = lines.next() else {
                break 'survey;
            };
            let line = line.context("Failed to read from stdin")?;
            let answer = line.trim();
            if answer.is_empty() {
                break 'survey;
            }

            match answer.parse::<RatingValue>() {
                Ok(rating) if RATING_RANGE.contains(&rating) => {
                    items.push(item_id);
                    ratings.push(rating);
                    break;
                }
                _ => println!("    {} expected a whole number from 1 to 5", "✗".red()),
            }
        }
    }

    if items.is_empty() {
        println!("No ratings given.");
    } else {
        recommender.submit_ratings(&session, &items, &ratings)?;
        println!("{} Recorded {} ratings", "✓".green(), items.len());
    }

    let recommended = recommender.recommend(&session, limit)?;
    print_recommendations(recommender.name(), user, &recommended);
    Ok(())
}

/// Handle the 'build-matrix' command
fn handle_build_matrix(config: &EngineConfig, store: RatingStore) -> Result<()> {
    if config.backend != BackendKind::ItemBased {
        println!(
            "{} the factorization backend does not use the matrix",
            "!".yellow()
        );
    }

    let start = Instant::now();
    let artifact = Box::new(JsonFileArtifact::new(&config.matrix_path));
    let recommender = ItemBasedRecommender::new(store, artifact, MatrixInit::Rebuild)?;
    println!(
        "{} Built {} similarity entries in {:?} -> {}",
        "✓".green(),
        recommender.matrix().len(),
        start.elapsed(),
        config.matrix_path.display()
    );
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(store: &RatingStore) {
    let (users, items, ratings) = store.counts();

    println!("{}", "Rating store:".bold().blue());
    println!("{}Catalog size: {}", "• ".green(), store.catalog().len());
    println!("{}Users: {}", "• ".green(), users);
    println!("{}Rated items: {}", "• ".green(), items);
    println!("{}Ratings: {}", "• ".green(), ratings);

    println!("{}", "Item means:".bold().blue());
    for item_id in store.catalog().items() {
        match store.centering().item_stats(item_id) {
            Some(stats) => println!(
                "  {:>4}  {:.2} ({} ratings)",
                format_item(item_id),
                stats.mean_rating,
                stats.rating_count
            ),
            None => println!("  {:>4}  {}", format_item(item_id), "no ratings".dimmed()),
        }
    }
}

fn format_item(item_id: ItemId) -> String {
    format!("i{}", item_id)
}

/// Helper function to format and print recommendations
fn print_recommendations(backend: &str, user: &str, items: &[ItemId]) {
    println!("{}", format!("Recommendations for {} ({}):", user, backend).bold().blue());
    if items.is_empty() {
        println!("  nothing to recommend");
    }
    for (rank, item_id) in items.iter().enumerate() {
        println!("{}. {}", (rank + 1).to_string().green(), format_item(*item_id));
    }
}
