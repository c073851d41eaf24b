use crate::models::{Counters, SizeStats};
use csv::Writer;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct BucketRow {
    pub category: String,
    pub count: usize,
}

impl BucketRow {
    fn new(category: impl Into<String>, count: usize) -> Self {
        BucketRow {
            category: category.into(),
            count,
        }
    }
}

/// One row per chunk bucket, in bucket order, followed by the standalone and
/// total rows.
pub fn counter_rows(counters: &Counters) -> Vec<BucketRow> {
    let mut rows: Vec<BucketRow> = counters
        .chunked_by_size
        .iter()
        .map(|(bucket, count)| BucketRow::new(bucket.to_string(), *count))
        .collect();
    rows.push(BucketRow::new("standalone", counters.standalone_count));
    rows.push(BucketRow::new("total", counters.total_logical_transactions));
    rows
}

pub fn export_counters_csv<P: AsRef<Path>>(counters: &Counters, path: P) -> csv::Result<()> {
    let mut wtr = Writer::from_path(path)?;
    for row in counter_rows(counters) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_size_stats_csv<P: AsRef<Path>>(stats: &SizeStats, path: P) -> csv::Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.serialize(stats)?;
    wtr.flush()?;
    Ok(())
}
