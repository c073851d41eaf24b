use crate::analize::{classify, Classification};
use crate::config::AnalysisConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::{RawContractResult, RawTransaction, SizeStats, TransactionsPage};
use crate::normalize::normalize_all;
use crate::payload::classify_payloads;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::try_join_all;
use log::{debug, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplies the raw records a classification pass runs over.
#[async_trait]
pub trait RecordSource {
    /// All transaction records, de-duplicated, in no particular order.
    async fn transactions(&self) -> Result<Vec<RawTransaction>>;

    async fn contract_results(&self) -> Result<Vec<RawContractResult>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Reads mirror-node responses saved to disk.
///
/// Transaction files are `/api/v1/transactions` pages. Contract result files
/// hold one `/api/v1/contracts/results/{id}` response or a JSON array of them.
#[derive(Debug, Clone, Default)]
pub struct PageFileSource {
    pub transaction_pages: Vec<PathBuf>,
    pub contract_result_files: Vec<PathBuf>,
}

impl PageFileSource {
    pub fn new(transaction_pages: Vec<PathBuf>, contract_result_files: Vec<PathBuf>) -> Self {
        PageFileSource {
            transaction_pages,
            contract_result_files,
        }
    }
}

async fn read_json<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let display = path.display().to_string();
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AnalyzerError::Io {
            path: display.clone(),
            source,
        })?;
    serde_json::from_str(&data).map_err(|source| AnalyzerError::Json {
        path: display,
        source,
    })
}

#[async_trait]
impl RecordSource for PageFileSource {
    async fn transactions(&self) -> Result<Vec<RawTransaction>> {
        // Keyed by consensus timestamp, which is unique per transaction, so
        // overlapping page downloads collapse.
        let seen: Arc<DashMap<String, RawTransaction>> = Arc::new(DashMap::new());

        let handles = self.transaction_pages.iter().cloned().map(|path| {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let page: TransactionsPage = read_json(&path).await?;
                debug!(
                    "Loaded {} transactions from {}",
                    page.transactions.len(),
                    path.display()
                );
                for tx in page.transactions {
                    seen.entry(tx.consensus_timestamp.clone()).or_insert(tx);
                }
                Ok::<_, AnalyzerError>(())
            })
        });

        for loaded in try_join_all(handles).await? {
            loaded?;
        }

        let all: Vec<RawTransaction> = seen.iter().map(|entry| entry.value().clone()).collect();
        info!(
            "Total transactions loaded: {} from {} pages",
            all.len(),
            self.transaction_pages.len()
        );
        Ok(all)
    }

    async fn contract_results(&self) -> Result<Vec<RawContractResult>> {
        let files = try_join_all(
            self.contract_result_files
                .iter()
                .map(|path| read_json::<OneOrMany<RawContractResult>>(path)),
        )
        .await?;

        let results: Vec<RawContractResult> =
            files.into_iter().flat_map(OneOrMany::into_vec).collect();
        info!("Total contract results loaded: {}", results.len());
        Ok(results)
    }
}

/// Loads every transaction from `source` and runs one classification pass
/// for the configured account.
pub async fn analyze_transactions<S>(source: &S, config: &AnalysisConfig) -> Result<Classification>
where
    S: RecordSource + Sync + ?Sized,
{
    info!("Loading transactions for account: {}", config.account_id);
    let raw = source.transactions().await?;
    let records = normalize_all(&raw, &config.account_id);
    debug!(
        "{} of {} transactions initiated by {}",
        records.len(),
        raw.len(),
        config.account_id
    );
    Ok(classify(records, config.grouping))
}

pub async fn analyze_contract_results<S>(source: &S, config: &AnalysisConfig) -> Result<SizeStats>
where
    S: RecordSource + Sync + ?Sized,
{
    let results = source.contract_results().await?;
    Ok(classify_payloads(&results, config.size_threshold))
}
