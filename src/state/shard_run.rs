//! Per-shard progress within a crawl batch

use crate::state::ShardState;
use crate::HarvestError;
use std::time::Instant;

/// Tracks one shard's walk through the crawl state machine
///
/// Every transition is validated against [`ShardState::can_transition_to`];
/// fetch attempts are counted each time the shard enters `Fetching`.
#[derive(Debug, Clone)]
pub struct ShardRun {
    shard_id: i64,
    key: String,
    state: ShardState,
    attempts: u32,
    started_at: Instant,
}

impl ShardRun {
    /// Creates a run in the `Pending` state
    pub fn new(shard_id: i64, key: impl Into<String>) -> Self {
        Self {
            shard_id,
            key: key.into(),
            state: ShardState::Pending,
            attempts: 0,
            started_at: Instant::now(),
        }
    }

    pub fn shard_id(&self) -> i64 {
        self.shard_id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> ShardState {
        self.state
    }

    /// Number of times the shard has entered `Fetching`
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time since the run was created, in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Moves the run to `next`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The transition was applied
    /// * `Err(HarvestError::InvalidTransition)` - The state machine forbids it
    pub fn advance(&mut self, next: ShardState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                shard_id: self.shard_id,
                from: self.state,
                to: next,
            });
        }

        tracing::trace!(
            "Shard {} (ID: {}): {} -> {}",
            self.key,
            self.shard_id,
            self.state,
            next
        );

        if next == ShardState::Fetching {
            self.attempts += 1;
        }
        self.state = next;
        Ok(())
    }
}
