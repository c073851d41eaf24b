//! Size check for contract-call payloads that reached the node in one piece.
//!
//! Each payload is hex (`0x` prefix optional, either case). Missing or
//! undecodable payloads are counted as under the threshold and never fail the
//! run.

use crate::models::{RawContractResult, SizeStats};
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSize {
    Missing,
    Malformed,
    Measured(usize),
}

impl PayloadSize {
    pub fn bytes(&self) -> Option<usize> {
        match self {
            PayloadSize::Measured(n) => Some(*n),
            PayloadSize::Missing | PayloadSize::Malformed => None,
        }
    }

    pub fn is_over(&self, threshold: usize) -> bool {
        self.bytes().map_or(false, |n| n > threshold)
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

pub fn measure_payload(payload: Option<&str>) -> PayloadSize {
    let payload = match payload {
        Some(p) if !p.is_empty() => p,
        _ => return PayloadSize::Missing,
    };

    match hex::decode(strip_hex_prefix(payload)) {
        Ok(bytes) => PayloadSize::Measured(bytes.len()),
        Err(e) => {
            trace!("Unreadable payload treated as small: {}", e);
            PayloadSize::Malformed
        }
    }
}

/// Running over/under tally against a fixed byte threshold.
#[derive(Debug, Clone)]
pub struct SizeClassifier {
    threshold: usize,
    stats: SizeStats,
}

impl SizeClassifier {
    pub fn new(threshold: usize) -> Self {
        SizeClassifier {
            threshold,
            stats: SizeStats::default(),
        }
    }

    pub fn observe(&mut self, payload: Option<&str>) -> PayloadSize {
        let size = measure_payload(payload);
        if size.is_over(self.threshold) {
            self.stats.over_count += 1;
        } else {
            self.stats.under_count += 1;
        }
        if let Some(n) = size.bytes() {
            self.stats.max_size = Some(self.stats.max_size.map_or(n, |max| max.max(n)));
        }
        size
    }

    pub fn stats(&self) -> SizeStats {
        self.stats
    }
}

pub fn classify_payloads(results: &[RawContractResult], threshold: usize) -> SizeStats {
    let mut classifier = SizeClassifier::new(threshold);
    for result in results {
        classifier.observe(result.function_parameters.as_deref());
    }
    classifier.stats()
}
