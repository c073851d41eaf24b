//! Raw mirror-node records to canonical [`TransactionRecord`]s.

use crate::error::{AnalyzerError, Result};
use crate::models::{RawTransaction, TransactionRecord, TxKind};
use log::warn;

/// Payer account encoded in a transaction id such as `0.0.1234-1700000000-000000001`.
pub fn payer_account(transaction_id: &str) -> &str {
    transaction_id.split('-').next().unwrap_or(transaction_id)
}

pub fn initiated_by(tx: &RawTransaction, account_id: &str) -> bool {
    payer_account(&tx.transaction_id) == account_id
}

pub fn parse_consensus_timestamp(tx: &RawTransaction) -> Result<f64> {
    tx.consensus_timestamp
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|ts| ts.is_finite())
        .ok_or_else(|| AnalyzerError::InvalidTimestamp {
            transaction_id: tx.transaction_id.clone(),
            value: tx.consensus_timestamp.clone(),
        })
}

pub fn normalize(tx: &RawTransaction) -> Result<TransactionRecord> {
    let timestamp = parse_consensus_timestamp(tx)?;
    let entity_ref = tx.entity_id.clone().filter(|id| !id.is_empty());

    Ok(TransactionRecord {
        timestamp,
        kind: TxKind::from_name(&tx.name),
        entity_ref,
    })
}

/// Keeps the records paid for by `account_id`, skipping any whose timestamp
/// cannot be read.
pub fn normalize_all(raw: &[RawTransaction], account_id: &str) -> Vec<TransactionRecord> {
    raw.iter()
        .filter(|tx| initiated_by(tx, account_id))
        .filter_map(|tx| match normalize(tx) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping transaction: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, ts: &str, name: &str, entity: Option<&str>) -> RawTransaction {
        RawTransaction {
            transaction_id: id.to_string(),
            consensus_timestamp: ts.to_string(),
            name: name.to_string(),
            entity_id: entity.map(str::to_string),
        }
    }

    #[test]
    fn test_payer_account() {
        assert_eq!(payer_account("0.0.1234-1700000000-000000001"), "0.0.1234");
        assert_eq!(payer_account("0.0.1234"), "0.0.1234");
    }

    #[test]
    fn test_normalize_maps_kind_and_entity() {
        let tx = raw("0.0.1-1-1", "1700000000.000000100", "FILEAPPEND", Some("0.0.900"));
        let record = normalize(&tx).unwrap();
        assert_eq!(record.kind, TxKind::StageAppend);
        assert_eq!(record.entity_ref.as_deref(), Some("0.0.900"));
        assert!((record.timestamp - 1_700_000_000.0000001).abs() < 1e-6);
    }

    #[test]
    fn test_empty_entity_is_none() {
        let tx = raw("0.0.1-1-1", "5", "FILEDELETE", Some(""));
        assert_eq!(normalize(&tx).unwrap().entity_ref, None);
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let tx = raw("0.0.1-1-1", "yesterday", "ETHEREUMTRANSACTION", None);
        assert!(matches!(
            normalize(&tx),
            Err(AnalyzerError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_normalize_all_filters_account_and_skips_bad_rows() {
        let txs = vec![
            raw("0.0.1-1-1", "1.0", "FILECREATE", Some("0.0.9")),
            raw("0.0.2-1-1", "2.0", "ETHEREUMTRANSACTION", None),
            raw("0.0.1-1-2", "nan?", "ETHEREUMTRANSACTION", None),
            raw("0.0.1-1-3", "3.0", "ETHEREUMTRANSACTION", None),
        ];
        let records = normalize_all(&txs, "0.0.1");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, TxKind::StageOpen);
        assert_eq!(records[1].timestamp, 3.0);
    }
}
