use clap::{Parser, Subcommand};
use hedera_analyzer::{
    analize::Classification,
    config::{AnalysisConfig, GroupingPolicy, DEFAULT_TIME_WINDOW},
    csv::{export_counters_csv, export_size_stats_csv},
    models::{Percentages, SizeStats, Summary},
    scanner::{analyze_contract_results, analyze_transactions, PageFileSource},
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hedera_analyzer")]
#[command(about = "Classify an account's Ethereum transactions as chunked (>5kb) or standalone")]
#[command(version)]
struct Cli {
    /// Account whose transactions are analysed, e.g. 0.0.1234
    #[arg(long, env = "ACCOUNT_ID")]
    account: String,

    /// Mirror node environment the pages were downloaded from
    #[arg(long, env = "ENVIRONMENT", default_value = "testnet")]
    environment: String,

    /// Seconds after a file create within which its sequence must complete
    #[arg(long, env = "TIME_WINDOW", default_value_t = DEFAULT_TIME_WINDOW)]
    window: f64,

    /// Group by file entity only, with no time window
    #[arg(long, default_value_t = false)]
    entity_only: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconstruct chunked transactions from saved /transactions pages
    Sequences {
        #[arg(required = true)]
        pages: Vec<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Size function parameters from saved /contracts/results responses
    Payloads {
        #[arg(required = true)]
        results: Vec<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Run both checks and print the combined over/under split
    Stats {
        #[arg(long, num_args = 1.., required = true)]
        pages: Vec<PathBuf>,
        #[arg(long, num_args = 1.., required = true)]
        results: Vec<PathBuf>,
    },
}

impl Cli {
    fn config(&self) -> AnalysisConfig {
        let grouping = if self.entity_only {
            GroupingPolicy::EntityOnly
        } else {
            GroupingPolicy::TimeWindowed(self.window)
        };
        AnalysisConfig::new(&self.account, &self.environment).with_grouping(grouping)
    }
}

fn print_percentages(label: &str, percentages: Option<Percentages>) {
    match percentages {
        Some(p) => {
            println!("{}", label);
            println!("Transactions over 5kb: {:.2}%", p.over);
            println!("Transactions under 5kb: {:.2}%", p.under);
        }
        None => {
            println!("{}", label);
            println!("No transactions to analyze.");
        }
    }
}

fn print_classification(config: &AnalysisConfig, result: &Classification) {
    let counters = &result.counters;

    println!("\nAnalysis for account {}:", config.account_id);
    println!("Total Ethereum transactions: {}", counters.total_logical_transactions);
    println!(
        "Ethereum transactions with file operations (big transactions): {}",
        counters.big_count()
    );
    println!(
        "Ethereum transactions without file operations (small transactions): {}",
        counters.standalone_count
    );

    info!("Big Transaction Sequences Breakdown:");
    for (bucket, count) in &counters.chunked_by_size {
        info!("{}: {}", bucket, count);
    }
    if let Some((first, last)) = result.time_span() {
        info!("Records span {} to {}", first.to_rfc3339(), last.to_rfc3339());
    }
    if counters.rejected_sequences > 0 || counters.keyless_openers > 0 {
        info!(
            "{} candidate sequences rejected, {} file creates without an entity",
            counters.rejected_sequences, counters.keyless_openers
        );
    }

    print_percentages("\nStatistics:", counters.percentages());
}

fn print_size_stats(config: &AnalysisConfig, stats: &SizeStats) {
    match stats.max_size {
        Some(max) => println!("Maximum function_parameters size: {} bytes", max),
        None => println!("No function_parameters data found."),
    }
    println!("\nAnalysis for account {}:", config.account_id);
    println!(
        "Transactions over 5kb (function_parameters > 5kb): {}",
        stats.over_count
    );
    println!(
        "Transactions under 5kb (function_parameters <= 5kb): {}",
        stats.under_count
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config();
    info!(
        "Analysing {} records from {} with {:?}",
        config.account_id,
        config.base_url(),
        config.grouping
    );

    match cli.command {
        Command::Sequences { pages, csv } => {
            let source = PageFileSource::new(pages, vec![]);
            let result = analyze_transactions(&source, &config).await?;
            print_classification(&config, &result);
            if let Some(path) = csv {
                export_counters_csv(&result.counters, &path)?;
                info!("Wrote bucket breakdown to {}", path.display());
            }
        }
        Command::Payloads { results, csv } => {
            let source = PageFileSource::new(vec![], results);
            let stats = analyze_contract_results(&source, &config).await?;
            print_size_stats(&config, &stats);
            if let Some(path) = csv {
                export_size_stats_csv(&stats, &path)?;
                info!("Wrote size stats to {}", path.display());
            }
        }
        Command::Stats { pages, results } => {
            let source = PageFileSource::new(pages, results);
            let (classification, sizes) = futures::try_join!(
                analyze_transactions(&source, &config),
                analyze_contract_results(&source, &config)
            )?;
            let summary = Summary::new(&classification.counters, &sizes);

            println!("---------------------------------------");
            println!("             Statistics");
            println!("---------------------------------------");
            print_percentages(
                "\nEthereum Transactions -> /transactions endpoint:",
                summary.transactions,
            );
            print_percentages(
                "\nContract Transactions -> /contract endpoint:",
                summary.contracts,
            );
        }
    }

    Ok(())
}
