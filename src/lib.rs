/// # Modules Overview
///
/// This crate reconstructs "big" Ethereum transactions submitted to Hedera in
/// chunks (file create, appends, the Ethereum transaction itself, file delete)
/// from a flat list of mirror-node records, and classifies everything else as
/// standalone. A companion check sizes contract-call payloads directly.

/// `analize`
///
/// The classification pass: temporal sort, sequence collection under a
/// `GroupingPolicy`, protocol validation, and the two-phase aggregation that
/// counts each logical transaction exactly once.
///
/// Example usage:
/// ```rust,ignore
/// let result = analize::classify(records, GroupingPolicy::TimeWindowed(30.0));
/// println!("{} big", result.counters.big_count());
/// ```
pub mod analize;

pub mod config;

/// `csv`
///
/// Exports bucket breakdowns (`Counters`) and payload `SizeStats` to CSV files.
///
/// Example usage:
/// ```rust,ignore
/// csv::export_counters_csv(&result.counters, "buckets.csv")?;
/// ```
pub mod csv;

pub mod error;

/// `models`
///
/// Defines core data structures used by the loader and the analysis pass:
/// * `RawTransaction`, `TransactionsPage`, `RawContractResult` – mirror-node JSON shapes.
/// * `TransactionRecord` and `TxKind` – the canonical record the pass sorts and scans.
/// * `Sequence` and `ConsumedSet` – per-pass scratch state.
/// * `Counters`, `ChunkBucket`, `SizeStats`, `Percentages`, `Summary` – results.
pub mod models;

/// `normalize`
///
/// Maps raw records to `TransactionRecord`s and keeps only those paid for by
/// the analysed account.
pub mod normalize;

/// `payload`
///
/// Hex payload size classification against the 5 KiB threshold.
///
/// Example usage:
/// ```rust,ignore
/// let stats = payload::classify_payloads(&results, config::SIZE_THRESHOLD_BYTES);
/// ```
pub mod payload;

/// `scanner`
///
/// The `RecordSource` trait that feeds raw records into the crate, a source
/// backed by saved mirror-node pages, and async drivers that load then classify.
///
/// Example usage:
/// ```rust,ignore
/// let source = scanner::PageFileSource::new(pages, vec![]);
/// let result = scanner::analyze_transactions(&source, &config).await?;
/// ```
pub mod scanner;
