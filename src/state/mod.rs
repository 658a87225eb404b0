//! State tracking for shard crawls
//!
//! This module provides the per-shard state machine used by the entity
//! crawler while it works through a batch.

mod shard_run;
mod shard_state;

pub use shard_run::ShardRun;
pub use shard_state::ShardState;
