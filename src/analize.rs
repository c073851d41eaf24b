use crate::{
    config::GroupingPolicy,
    models::{ChunkBucket, ConsumedSet, Counters, Sequence, TransactionRecord, TxKind},
};
use chrono::{DateTime, Utc};
use log::{debug, trace};

/// Orders records by consensus timestamp. Stable, so equal timestamps keep
/// their input order.
pub fn sort_records(records: &mut [TransactionRecord]) {
    records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}

/// Greedily gathers the candidate sequence opened at `start`.
///
/// Append and close records join only when they name the opener's staging
/// object; every other kind joins unconditionally. The scan ends after the
/// matching close, at the end of `records`, or (time-windowed policy) before
/// the first record more than the window away from the opener.
///
/// Returns an empty sequence when `start` is not an opener or the opener has
/// no entity to group on.
pub fn collect_sequence(
    start: usize,
    records: &[TransactionRecord],
    policy: GroupingPolicy,
) -> Sequence<'_> {
    let mut sequence = Sequence::default();

    let opener = match records.get(start) {
        Some(opener) if opener.kind == TxKind::StageOpen => opener,
        _ => return sequence,
    };
    let entity = match opener.entity_ref.as_deref() {
        Some(entity) => entity,
        None => return sequence,
    };
    let window = policy.window();

    for (position, record) in records.iter().enumerate().skip(start) {
        if let Some(window) = window {
            if record.timestamp - opener.timestamp > window {
                trace!(
                    "Window of {}s exceeded at position {} (opener at {})",
                    window,
                    position,
                    start
                );
                break;
            }
        }

        if record.kind.is_entity_bound() && record.entity_ref.as_deref() != Some(entity) {
            continue;
        }

        sequence.push(position, record);

        if record.kind == TxKind::StageClose {
            break;
        }
    }

    sequence
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A required kind is absent. Reports the first missing one in protocol order.
    MissingOperation(TxKind),
    /// More than one close in the sequence.
    DuplicateClose,
    /// open < last append < first final < close does not hold.
    OutOfOrder,
    /// Staging records do not share exactly one non-null entity.
    AmbiguousGrouping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub chunk_count: usize,
    pub rejection: Option<RejectReason>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }
}

fn first_index(sequence: &Sequence<'_>, kind: TxKind) -> Option<usize> {
    sequence.records.iter().position(|r| r.kind == kind)
}

fn last_index(sequence: &Sequence<'_>, kind: TxKind) -> Option<usize> {
    sequence.records.iter().rposition(|r| r.kind == kind)
}

/// Checks a candidate against the staging protocol. The chunk count is
/// reported whether or not the candidate is accepted.
pub fn validate_sequence(sequence: &Sequence<'_>) -> Validation {
    let chunk_count = sequence
        .records
        .iter()
        .filter(|r| r.kind == TxKind::StageAppend)
        .count();
    let reject = |reason| Validation {
        chunk_count,
        rejection: Some(reason),
    };

    let open = first_index(sequence, TxKind::StageOpen);
    let last_append = last_index(sequence, TxKind::StageAppend);
    let first_final = first_index(sequence, TxKind::Final);
    let close = first_index(sequence, TxKind::StageClose);

    let (open, last_append, first_final, close) = match (open, last_append, first_final, close) {
        (Some(o), Some(a), Some(f), Some(c)) => (o, a, f, c),
        (None, ..) => return reject(RejectReason::MissingOperation(TxKind::StageOpen)),
        (_, None, ..) => return reject(RejectReason::MissingOperation(TxKind::StageAppend)),
        (_, _, None, _) => return reject(RejectReason::MissingOperation(TxKind::Final)),
        (.., None) => return reject(RejectReason::MissingOperation(TxKind::StageClose)),
    };

    if last_index(sequence, TxKind::StageClose) != Some(close) {
        return reject(RejectReason::DuplicateClose);
    }

    if !(open < last_append && last_append < first_final && first_final < close) {
        return reject(RejectReason::OutOfOrder);
    }

    let mut entities = sequence
        .records
        .iter()
        .filter(|r| r.kind.is_staging())
        .map(|r| r.entity_ref.as_deref());
    let shared = entities.next().flatten();
    if shared.is_none() || entities.any(|e| e != shared) {
        return reject(RejectReason::AmbiguousGrouping);
    }

    Validation {
        chunk_count,
        rejection: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSequence {
    pub positions: Vec<usize>,
    pub chunk_count: usize,
}

/// Result of one classification pass over a record collection.
#[derive(Debug, Clone)]
pub struct Classification {
    /// The input, sorted. Positions elsewhere in this struct index into it.
    pub records: Vec<TransactionRecord>,
    pub counters: Counters,
    pub accepted: Vec<AcceptedSequence>,
    pub consumed: ConsumedSet,
}

impl Classification {
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.records.first()?.consensus_time()?;
        let last = self.records.last()?.consensus_time()?;
        Some((first, last))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ScanningOpeners,
    ScanningStandalones,
    Done,
}

struct Pass<'a> {
    records: &'a [TransactionRecord],
    policy: GroupingPolicy,
    phase: Phase,
    consumed: ConsumedSet,
    counters: Counters,
    accepted: Vec<AcceptedSequence>,
}

impl<'a> Pass<'a> {
    fn new(records: &'a [TransactionRecord], policy: GroupingPolicy) -> Self {
        Pass {
            records,
            policy,
            phase: Phase::ScanningOpeners,
            consumed: ConsumedSet::with_capacity(records.len()),
            counters: Counters::default(),
            accepted: Vec::new(),
        }
    }

    fn step(&mut self) {
        self.phase = match self.phase {
            Phase::ScanningOpeners => {
                self.scan_openers();
                Phase::ScanningStandalones
            }
            Phase::ScanningStandalones => {
                self.scan_standalones();
                Phase::Done
            }
            Phase::Done => Phase::Done,
        };
    }

    fn scan_openers(&mut self) {
        let records = self.records;
        for (position, record) in records.iter().enumerate() {
            if self.consumed.contains(position) || record.kind != TxKind::StageOpen {
                continue;
            }

            if record.entity_ref.is_none() {
                // Not a final type either, so it drops out of both counts.
                debug!(
                    "Dropping staging opener at {} (t={}): no entity to group on",
                    position, record.timestamp
                );
                self.counters.keyless_openers += 1;
                continue;
            }

            let sequence = collect_sequence(position, records, self.policy);
            let validation = validate_sequence(&sequence);
            match validation.rejection {
                Some(reason) => {
                    trace!(
                        "Rejected candidate at {} ({} chunks): {:?}",
                        position,
                        validation.chunk_count,
                        reason
                    );
                    self.counters.rejected_sequences += 1;
                }
                None => self.commit(&sequence, validation.chunk_count),
            }
        }
    }

    fn commit(&mut self, sequence: &Sequence<'_>, chunk_count: usize) {
        if self.accepted.is_empty() {
            debug!("First big transaction sequence found (for sanity check):");
            for record in &sequence.records {
                debug!(
                    "Timestamp: {}, Type: {}, Entity ID: {:?}",
                    record.timestamp, record.kind, record.entity_ref
                );
            }
        }

        for &position in &sequence.positions {
            self.consumed.insert(position);
        }
        self.counters.total_logical_transactions += 1;
        *self
            .counters
            .chunked_by_size
            .entry(ChunkBucket::for_chunks(chunk_count))
            .or_insert(0) += 1;
        self.accepted.push(AcceptedSequence {
            positions: sequence.positions.clone(),
            chunk_count,
        });
    }

    fn scan_standalones(&mut self) {
        for (position, record) in self.records.iter().enumerate() {
            if record.kind == TxKind::Final && self.consumed.insert(position) {
                self.counters.total_logical_transactions += 1;
                self.counters.standalone_count += 1;
            }
        }
    }
}

/// Sorts `records` and runs both phases: reconstructed sequences first, then
/// every final transaction they did not absorb.
pub fn classify(mut records: Vec<TransactionRecord>, policy: GroupingPolicy) -> Classification {
    sort_records(&mut records);

    let mut pass = Pass::new(&records, policy);
    while pass.phase != Phase::Done {
        pass.step();
    }
    let Pass {
        counters,
        accepted,
        consumed,
        ..
    } = pass;

    debug!(
        "Classified {} records: {} big, {} standalone, {} rejected candidates",
        records.len(),
        counters.big_count(),
        counters.standalone_count,
        counters.rejected_sequences
    );

    Classification {
        records,
        counters,
        accepted,
        consumed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(t: f64, kind: TxKind, entity: Option<&str>) -> TransactionRecord {
        TransactionRecord::new(t, kind, entity)
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut records = vec![
            rec(2.0, TxKind::Final, None),
            rec(1.0, TxKind::StageOpen, Some("a")),
            rec(1.0, TxKind::StageOpen, Some("b")),
            rec(0.5, TxKind::Other, None),
        ];
        sort_records(&mut records);
        let order: Vec<_> = records.iter().map(|r| (r.timestamp, r.entity_ref.clone())).collect();
        assert_eq!(
            order,
            vec![
                (0.5, None),
                (1.0, Some("a".to_string())),
                (1.0, Some("b".to_string())),
                (2.0, None)
            ]
        );

        let again = records.clone();
        sort_records(&mut records);
        assert_eq!(records, again);
    }

    #[test]
    fn test_collect_skips_foreign_and_keyless_staging_records() {
        let records = vec![
            rec(0.0, TxKind::StageOpen, Some("e1")),
            rec(1.0, TxKind::StageAppend, Some("e2")),
            rec(2.0, TxKind::StageAppend, None),
            rec(3.0, TxKind::StageAppend, Some("e1")),
            rec(4.0, TxKind::Other, None),
            rec(5.0, TxKind::StageClose, Some("e2")),
            rec(6.0, TxKind::StageClose, Some("e1")),
            rec(7.0, TxKind::Final, None),
        ];
        let seq = collect_sequence(0, &records, GroupingPolicy::EntityOnly);
        assert_eq!(seq.positions, vec![0, 3, 4, 6]);
        assert_eq!(seq.chunk_count, 1);
    }

    #[test]
    fn test_collect_keyless_opener_is_empty() {
        let records = vec![
            rec(0.0, TxKind::StageOpen, None),
            rec(1.0, TxKind::StageAppend, None),
        ];
        assert!(collect_sequence(0, &records, GroupingPolicy::EntityOnly).is_empty());
        assert!(collect_sequence(0, &records, GroupingPolicy::default()).is_empty());
    }

    #[test]
    fn test_collect_from_non_opener_is_empty() {
        let records = vec![rec(0.0, TxKind::Final, None)];
        assert!(collect_sequence(0, &records, GroupingPolicy::EntityOnly).is_empty());
        assert!(collect_sequence(4, &records, GroupingPolicy::EntityOnly).is_empty());
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let records = vec![
            rec(0.0, TxKind::StageOpen, Some("e1")),
            rec(30.0, TxKind::StageAppend, Some("e1")),
            rec(30.5, TxKind::Final, None),
        ];
        let seq = collect_sequence(0, &records, GroupingPolicy::TimeWindowed(30.0));
        assert_eq!(seq.positions, vec![0, 1]);
    }

    #[test]
    fn test_entity_only_ignores_time() {
        let records = vec![
            rec(0.0, TxKind::StageOpen, Some("e1")),
            rec(1.0, TxKind::StageAppend, Some("e1")),
            rec(1000.0, TxKind::Final, None),
            rec(2000.0, TxKind::StageClose, Some("e1")),
        ];
        let seq = collect_sequence(0, &records, GroupingPolicy::EntityOnly);
        assert_eq!(seq.len(), 4);
        assert!(validate_sequence(&seq).is_valid());
    }

    #[test]
    fn test_validator_reports_missing_operation() {
        let records = vec![
            rec(0.0, TxKind::StageOpen, Some("e1")),
            rec(1.0, TxKind::Final, None),
            rec(2.0, TxKind::StageClose, Some("e1")),
        ];
        let seq = collect_sequence(0, &records, GroupingPolicy::EntityOnly);
        let v = validate_sequence(&seq);
        assert_eq!(
            v.rejection,
            Some(RejectReason::MissingOperation(TxKind::StageAppend))
        );
        assert_eq!(v.chunk_count, 0);
    }

    #[test]
    fn test_validator_rejects_close_before_final() {
        let records = vec![
            rec(0.0, TxKind::StageOpen, Some("e1")),
            rec(1.0, TxKind::StageAppend, Some("e1")),
            rec(2.0, TxKind::StageClose, Some("e1")),
        ];
        let mut seq = collect_sequence(0, &records, GroupingPolicy::EntityOnly);
        let trailing = rec(3.0, TxKind::Final, None);
        seq.push(3, &trailing);
        assert_eq!(
            validate_sequence(&seq).rejection,
            Some(RejectReason::OutOfOrder)
        );
    }

    #[test]
    fn test_validator_rejects_second_close() {
        let records = vec![
            rec(0.0, TxKind::StageOpen, Some("e1")),
            rec(1.0, TxKind::StageAppend, Some("e1")),
            rec(2.0, TxKind::Final, None),
            rec(3.0, TxKind::StageClose, Some("e1")),
            rec(4.0, TxKind::StageClose, Some("e1")),
        ];
        let mut seq = Sequence::default();
        for (i, r) in records.iter().enumerate() {
            seq.push(i, r);
        }
        assert_eq!(
            validate_sequence(&seq).rejection,
            Some(RejectReason::DuplicateClose)
        );
    }

    #[test]
    fn test_nested_opener_with_other_entity_is_ambiguous() {
        let records = vec![
            rec(0.0, TxKind::StageOpen, Some("e1")),
            rec(1.0, TxKind::StageOpen, Some("e2")),
            rec(2.0, TxKind::StageAppend, Some("e1")),
            rec(3.0, TxKind::Final, None),
            rec(4.0, TxKind::StageClose, Some("e1")),
        ];
        let seq = collect_sequence(0, &records, GroupingPolicy::EntityOnly);
        assert_eq!(
            validate_sequence(&seq).rejection,
            Some(RejectReason::AmbiguousGrouping)
        );
    }

    #[test]
    fn test_phases_run_in_order() {
        let records = vec![rec(0.0, TxKind::Final, None)];
        let mut pass = Pass::new(&records, GroupingPolicy::EntityOnly);
        assert_eq!(pass.phase, Phase::ScanningOpeners);
        pass.step();
        assert_eq!(pass.phase, Phase::ScanningStandalones);
        assert_eq!(pass.counters.standalone_count, 0);
        pass.step();
        assert_eq!(pass.phase, Phase::Done);
        assert_eq!(pass.counters.standalone_count, 1);
        pass.step();
        assert_eq!(pass.counters.standalone_count, 1);
    }
}
