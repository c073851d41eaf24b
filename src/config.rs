/// Default look-ahead, in consensus seconds, for the time-windowed collector.
pub const DEFAULT_TIME_WINDOW: f64 = 30.0;

/// Payloads strictly larger than this many bytes count as "over".
pub const SIZE_THRESHOLD_BYTES: usize = 5 * 1024;

/// Chunk counts above this collapse into the overflow bucket.
pub const MAX_EXACT_CHUNKS: usize = 10;

/// How the sequence collector decides which forward records belong to an opener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupingPolicy {
    /// Staging records must share the opener's entity; the scan only ends at
    /// the matching close or the end of the collection.
    EntityOnly,
    /// Same entity rule, but the scan aborts once a record lies more than the
    /// given number of seconds after the opener.
    TimeWindowed(f64),
}

impl Default for GroupingPolicy {
    fn default() -> Self {
        GroupingPolicy::TimeWindowed(DEFAULT_TIME_WINDOW)
    }
}

impl GroupingPolicy {
    pub fn window(&self) -> Option<f64> {
        match self {
            GroupingPolicy::EntityOnly => None,
            GroupingPolicy::TimeWindowed(secs) => Some(*secs),
        }
    }
}

/// Everything one analysis pass needs. Built once by the caller and passed in;
/// nothing below reads the process environment.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub account_id: String,
    pub environment: String,
    pub grouping: GroupingPolicy,
    pub size_threshold: usize,
}

impl AnalysisConfig {
    pub fn new(account_id: impl Into<String>, environment: impl Into<String>) -> Self {
        AnalysisConfig {
            account_id: account_id.into(),
            environment: environment.into(),
            grouping: GroupingPolicy::default(),
            size_threshold: SIZE_THRESHOLD_BYTES,
        }
    }

    pub fn with_grouping(mut self, grouping: GroupingPolicy) -> Self {
        self.grouping = grouping;
        self
    }

    /// Mirror node the records were downloaded from, e.g.
    /// `https://testnet.mirrornode.hedera.com`.
    pub fn base_url(&self) -> String {
        format!("https://{}.mirrornode.hedera.com", self.environment)
    }
}
