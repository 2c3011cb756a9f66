//! Queueing, match formation and result consensus
//!
//! This module holds the per-mode queues, the factory that turns a full
//! queue into a match, the resolver that reconciles participants' result
//! reports, and the expiry sweep for stale entries.

pub mod consensus;
pub mod expiry;
pub mod factory;
pub mod queue;

// Re-export commonly used types
pub use consensus::ConsensusResolver;
pub use expiry::ExpiryPolicy;
pub use factory::{MatchFactory, RandomTeamAssigner, TeamAssigner};
pub use queue::{ModeQueue, QueueEntry, QueueManager};
