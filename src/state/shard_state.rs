/// Shard state definitions for tracking one crawl pass over a shard
///
/// These states live only in memory for the duration of a crawl batch. The
/// persisted outcome is the `processed` flag, which flips only on `Committed`.
use std::fmt;

/// Represents the current state of a shard within a crawl batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardState {
    // ===== Active States =====
    /// Shard was selected for this batch but not yet fetched
    Pending,

    /// Listing page request is in flight
    Fetching,

    /// Last fetch failed and the shard is waiting out the backoff delay
    Retry,

    /// Listing page was loaded and rows are being parsed and committed
    Parsing,

    // ===== Terminal States =====
    /// Rows were written and the shard was flagged processed
    Committed,

    /// Listing yielded no parseable rows; shard left unprocessed
    Empty,

    /// Fetch attempts or commit retries were exhausted; shard left unprocessed
    Failed,

    /// Another writer committed the shard first; nothing was written
    Skipped,
}

impl ShardState {
    /// Returns true if this is a terminal state (no further processing this batch)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed | Self::Empty | Self::Failed | Self::Skipped
        )
    }

    /// Returns true if this represents a successful commit
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Checks whether the state machine permits moving to `next`
    ///
    /// ```text
    /// Pending -> Fetching -> Parsing -> Committed
    ///               |  ^         |---> Empty
    ///               |  |         |---> Skipped
    ///               v  |         `---> Failed
    ///              Retry
    ///               |
    /// Fetching -----+-----------------> Failed
    /// ```
    pub fn can_transition_to(&self, next: ShardState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Parsing)
                | (Self::Fetching, Self::Retry)
                | (Self::Fetching, Self::Failed)
                | (Self::Retry, Self::Fetching)
                | (Self::Parsing, Self::Committed)
                | (Self::Parsing, Self::Empty)
                | (Self::Parsing, Self::Skipped)
                | (Self::Parsing, Self::Failed)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Retry => "retry",
            Self::Parsing => "parsing",
            Self::Committed => "committed",
            Self::Empty => "empty",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible shard states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Retry,
            Self::Parsing,
            Self::Committed,
            Self::Empty,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for ShardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
