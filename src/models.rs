use crate::config::MAX_EXACT_CHUNKS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One entry of a mirror-node `/api/v1/transactions` page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub transaction_id: String,
    pub consensus_timestamp: String,
    pub name: String,
    #[serde(default)]
    pub entity_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsPage {
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
    #[serde(default)]
    pub links: Links,
}

/// The part of a `/api/v1/contracts/results/{id}` response the size check reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContractResult {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub function_parameters: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TxKind {
    StageOpen,
    StageAppend,
    StageClose,
    Final,
    Other,
}

impl TxKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "FILECREATE" => TxKind::StageOpen,
            "FILEAPPEND" => TxKind::StageAppend,
            "FILEDELETE" => TxKind::StageClose,
            "ETHEREUMTRANSACTION" => TxKind::Final,
            _ => TxKind::Other,
        }
    }

    /// Append and close must name the opener's staging object to join a sequence.
    pub fn is_entity_bound(&self) -> bool {
        matches!(self, TxKind::StageAppend | TxKind::StageClose)
    }

    pub fn is_staging(&self) -> bool {
        matches!(
            self,
            TxKind::StageOpen | TxKind::StageAppend | TxKind::StageClose
        )
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxKind::StageOpen => "STAGE_OPEN",
            TxKind::StageAppend => "STAGE_APPEND",
            TxKind::StageClose => "STAGE_CLOSE",
            TxKind::Final => "FINAL",
            TxKind::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Canonical record the classification pass works on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub timestamp: f64,
    pub kind: TxKind,
    pub entity_ref: Option<String>,
}

impl TransactionRecord {
    pub fn new(timestamp: f64, kind: TxKind, entity_ref: Option<&str>) -> Self {
        TransactionRecord {
            timestamp,
            kind,
            entity_ref: entity_ref.map(str::to_string),
        }
    }

    pub fn consensus_time(&self) -> Option<DateTime<Utc>> {
        if !self.timestamp.is_finite() {
            return None;
        }
        let secs = self.timestamp.floor();
        let nanos = ((self.timestamp - secs) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::<Utc>::from_timestamp(secs as i64, nanos)
    }
}

/// A candidate reconstruction: borrowed records plus their positions in the
/// sorted collection.
#[derive(Debug, Clone, Default)]
pub struct Sequence<'a> {
    pub records: Vec<&'a TransactionRecord>,
    pub positions: Vec<usize>,
    pub chunk_count: usize,
}

impl<'a> Sequence<'a> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn push(&mut self, position: usize, record: &'a TransactionRecord) {
        if record.kind == TxKind::StageAppend {
            self.chunk_count += 1;
        }
        self.records.push(record);
        self.positions.push(position);
    }
}

/// Positions already attributed during one pass. Only grows.
#[derive(Debug, Clone, Default)]
pub struct ConsumedSet {
    marks: Vec<bool>,
    len: usize,
}

impl ConsumedSet {
    pub fn with_capacity(n: usize) -> Self {
        ConsumedSet {
            marks: vec![false; n],
            len: 0,
        }
    }

    pub fn contains(&self, position: usize) -> bool {
        self.marks.get(position).copied().unwrap_or(false)
    }

    /// Returns `false` if the position was already consumed.
    pub fn insert(&mut self, position: usize) -> bool {
        if position >= self.marks.len() {
            self.marks.resize(position + 1, false);
        }
        if self.marks[position] {
            return false;
        }
        self.marks[position] = true;
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.marks
            .iter()
            .enumerate()
            .filter_map(|(i, marked)| marked.then_some(i))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChunkBucket {
    Exact(usize),
    Overflow,
}

impl ChunkBucket {
    pub fn for_chunks(chunk_count: usize) -> Self {
        if chunk_count <= MAX_EXACT_CHUNKS {
            ChunkBucket::Exact(chunk_count)
        } else {
            ChunkBucket::Overflow
        }
    }
}

impl fmt::Display for ChunkBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkBucket::Exact(n) => write!(f, "{} Chunks", n),
            ChunkBucket::Overflow => write!(f, ">{} Chunks", MAX_EXACT_CHUNKS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentages {
    pub over: f64,
    pub under: f64,
}

impl Percentages {
    /// `None` when there is nothing to divide by.
    pub fn of(over: usize, under: usize, total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }
        Some(Percentages {
            over: over as f64 / total as f64 * 100.0,
            under: under as f64 / total as f64 * 100.0,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counters {
    pub total_logical_transactions: usize,
    pub chunked_by_size: BTreeMap<ChunkBucket, usize>,
    pub standalone_count: usize,
    pub rejected_sequences: usize,
    pub keyless_openers: usize,
}

impl Counters {
    /// Number of reconstructed (chunked) transactions.
    pub fn big_count(&self) -> usize {
        self.chunked_by_size.values().sum()
    }

    pub fn bucket(&self, bucket: ChunkBucket) -> usize {
        self.chunked_by_size.get(&bucket).copied().unwrap_or(0)
    }

    pub fn percentages(&self) -> Option<Percentages> {
        Percentages::of(
            self.big_count(),
            self.standalone_count,
            self.total_logical_transactions,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SizeStats {
    pub over_count: usize,
    pub under_count: usize,
    pub max_size: Option<usize>,
}

impl SizeStats {
    pub fn total(&self) -> usize {
        self.over_count + self.under_count
    }

    pub fn percentages(&self) -> Option<Percentages> {
        Percentages::of(self.over_count, self.under_count, self.total())
    }
}

/// Over/under split across both data paths, as printed by the `stats` command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub transactions: Option<Percentages>,
    pub contracts: Option<Percentages>,
}

impl Summary {
    pub fn new(counters: &Counters, sizes: &SizeStats) -> Self {
        // Over/under here is big vs. the rest, not big vs. standalone.
        let big = counters.big_count();
        let total = counters.total_logical_transactions;
        Summary {
            transactions: Percentages::of(big, total.saturating_sub(big), total),
            contracts: sizes.percentages(),
        }
    }
}
