//! Hoops prediction CLI
//!
//! Ingest per-team game logs, build the master dataset, and predict matchups.

use clap::{Parser, Subcommand};
use hoops::{Config, Result};

#[derive(Parser)]
#[command(name = "hoops")]
#[command(about = "Team win probability and margin prediction from game logs", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Build the master dataset and fit both models
    Train {
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Predict a matchup
    Predict {
        /// Team to predict for
        team_a: String,
        /// Opponent
        team_b: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show the calibration curve and residual histogram
    Calibration,
    /// List teams in the master dataset
    Teams,
    /// Season summary for one team
    Summary {
        team: String,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Normalize one raw export and store it as the team's table
    Ingest {
        /// Team name (becomes the table name)
        team: String,
        /// Path to the raw export
        file: String,
    },
    /// Ingest every export listed in a team,path CSV
    IngestManifest {
        manifest: String,
    },
    /// Rebuild the master dataset from all team tables
    Combine,
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Ingest { team, file } => commands::ingest(&config, &team, &file),
            DataCommands::IngestManifest { manifest } => {
                commands::ingest_manifest(&config, &manifest)
            }
            DataCommands::Combine => commands::combine(&config),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train { epochs } => commands::train(&config, epochs),
        Commands::Predict {
            team_a,
            team_b,
            format,
        } => commands::predict(&config, &team_a, &team_b, format),
        Commands::Calibration => commands::calibration(&config),
        Commands::Teams => commands::teams(&config),
        Commands::Summary { team } => commands::summary(&config, &team),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use hoops::data::{ingest_all, read_manifest, store_export, Database, ExportNormalizer, Unifier};
    use hoops::features::{LabeledDataset, TeamAggregator};
    use hoops::predict::{
        format_margin_placement, format_prediction, format_residual_histogram, Predictor,
        ServiceContext,
    };
    use hoops::HoopsError;

    fn build_context(config: &Config) -> Result<ServiceContext> {
        let mut db = Database::open(&config.data.database_path)?;
        ServiceContext::build(&mut db, config)
    }

    /// Combined dataset without training or writing the master table
    fn load_dataset(config: &Config) -> Result<LabeledDataset> {
        let db = Database::open(&config.data.database_path)?;
        let (master, _) = Unifier::from_config(&config.data).combine(&db)?;
        LabeledDataset::from_master(&master, &config.data.entity_column, &config.columns)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        println!("Created data/ directory");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'hoops data ingest \"Team\" export.csv' for each team");
        println!("  3. Run 'hoops train' to fit the models");
        println!("  4. Run 'hoops predict \"Team A\" \"Team B\"' to make predictions");

        Ok(())
    }

    pub fn ingest(config: &Config, team: &str, file: &str) -> Result<()> {
        let raw = std::fs::read_to_string(file)?;
        let normalizer = ExportNormalizer::from_config(&config.ingest)?;
        let mut db = Database::open(&config.data.database_path)?;

        let (table, rows) = store_export(&mut db, &normalizer, team, &raw)?;
        println!("Stored {} rows in table '{}'", rows, table);
        Ok(())
    }

    pub fn ingest_manifest(config: &Config, manifest: &str) -> Result<()> {
        let entries = read_manifest(manifest)?;
        let normalizer = ExportNormalizer::from_config(&config.ingest)?;
        let mut db = Database::open(&config.data.database_path)?;

        println!("Ingesting {} exports from {}...", entries.len(), manifest);
        let report = ingest_all(&mut db, &normalizer, &entries);

        for (table, rows) in &report.stored {
            println!("  ✓ {:<30} {:>5} rows", table, rows);
        }
        for (team, error) in &report.failed {
            println!("  ✗ {:<30} {}", team, error);
        }
        println!(
            "\n{} stored, {} failed, {} rows total",
            report.stored.len(),
            report.failed.len(),
            report.total_rows()
        );
        Ok(())
    }

    pub fn combine(config: &Config) -> Result<()> {
        let mut db = Database::open(&config.data.database_path)?;
        let unifier = Unifier::from_config(&config.data);
        let (master, summary) = unifier.unify(&mut db)?;

        println!("Master Dataset");
        println!("───────────────────────────────");
        println!("  Table:     {}", unifier.master_table());
        println!("  Rows:      {}", master.len());
        println!("  Columns:   {}", master.width());
        println!("  Combined:  {}", summary.combined.len());
        if !summary.skipped_empty.is_empty() {
            println!("  Empty:     {}", summary.skipped_empty.join(", "));
        }
        if !summary.skipped_unreadable.is_empty() {
            println!("  Unreadable:{}", summary.skipped_unreadable.join(", "));
        }
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Tables:   {}", stats.table_count());
        println!("  Rows:     {}", stats.total_rows());
        for (name, rows) in &stats.tables {
            let marker = if name == &config.data.master_table {
                " (master)"
            } else {
                ""
            };
            println!("    {:<30} {:>6}{}", name, rows, marker);
        }
        Ok(())
    }

    pub fn train(config: &Config, epochs: Option<usize>) -> Result<()> {
        let mut config = config.clone();
        if let Some(e) = epochs {
            config.training.epochs = e;
        }
        config.validate()?;

        println!("Building master dataset and training...");
        let context = build_context(&config)?;
        let diag = context.diagnostics();
        let residuals = context.residuals();

        println!("\nTraining Summary");
        println!("───────────────────────────────");
        println!("  Built at:       {}", context.built_at().format("%Y-%m-%d %H:%M:%S UTC"));
        println!("  Rows:           {}", diag.rows);
        println!("  Features:       {}", context.dataset().feature_dim());
        println!("  Teams:          {}", context.teams().len());
        println!("  Accuracy:       {:.1}%", diag.accuracy * 100.0);
        println!("  Brier score:    {:.4}", diag.brier_score);
        println!("  Calibration err:{:.4}", diag.calibration_error);
        println!("  Margin MAE:     {:.2}", diag.margin_mae);
        println!("  Margin RMSE:    {:.2}", diag.margin_rmse);
        println!(
            "  Residuals:      mean {:+.2}, std {:.2}",
            residuals.mean(),
            residuals.std()
        );
        Ok(())
    }

    pub fn predict(config: &Config, team_a: &str, team_b: &str, format: OutputFormat) -> Result<()> {
        let context = build_context(config)?;
        let predictor = Predictor::new(&context);

        match format {
            OutputFormat::Table => {
                let pred = predictor.predict(team_a, team_b);
                println!("{}", format_prediction(&pred, context.residuals()));
                print!(
                    "{}",
                    format_margin_placement(
                        pred.predicted_margin_a,
                        context.residuals(),
                        context.residual_histogram()
                    )
                );
            }
            OutputFormat::Json => {
                let report = predictor.report(team_a, team_b);
                let json = serde_json::to_string_pretty(&report)
                    .map_err(|e| HoopsError::Parse(e.to_string()))?;
                println!("{}", json);
            }
            OutputFormat::Csv => {
                let pred = predictor.predict(team_a, team_b);
                println!("team_a,team_b,win_prob_a,win_prob_b,predicted_margin_a");
                println!(
                    "{},{},{:.4},{:.4},{:.2}",
                    pred.team_a,
                    pred.team_b,
                    pred.win_prob_a,
                    pred.win_prob_b,
                    pred.predicted_margin_a
                );
            }
        }
        Ok(())
    }

    pub fn calibration(config: &Config) -> Result<()> {
        let context = build_context(config)?;
        let curve = context.calibration();

        println!("Calibration (in-sample)");
        println!("───────────────────────────────");
        println!("  {:>10} {:>10} {:>6}", "predicted", "observed", "n");
        for ((predicted, observed), bin) in curve.points().into_iter().zip(&curve.bins) {
            println!("  {:>10.3} {:>10.3} {:>6}", predicted, observed, bin.count);
        }
        println!("  ECE: {:.4}", curve.expected_calibration_error());

        println!("\nMargin residuals (actual - predicted)");
        println!("───────────────────────────────");
        print!("{}", format_residual_histogram(context.residual_histogram(), None));
        Ok(())
    }

    pub fn teams(config: &Config) -> Result<()> {
        let dataset = load_dataset(config)?;
        let aggregator = TeamAggregator::new(&dataset);

        for team in dataset.entity_names() {
            println!("  {:<30} {:>4} games", team, aggregator.games(&team));
        }
        Ok(())
    }

    pub fn summary(config: &Config, team: &str) -> Result<()> {
        let dataset = load_dataset(config)?;
        let aggregator = TeamAggregator::new(&dataset);

        if !aggregator.contains(team) {
            println!("No games found for {}", team);
        }
        let s = aggregator.summary(&dataset, team);

        println!("{}", team);
        println!("───────────────────────────────");
        println!("  Games played:   {}", s.games_played);
        println!("  Win %:          {:.1}%", s.win_pct * 100.0);
        println!("  Points for:     {:.1}", s.avg_points_for);
        println!("  Points against: {:.1}", s.avg_points_against);
        println!("  Avg margin:     {:+.1}", s.avg_margin);
        Ok(())
    }
}
