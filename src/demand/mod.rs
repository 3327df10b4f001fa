//! Demand-driven generation pipeline.
//!
//! Queue items describe entities to draft. The [`BatchDispatcher`] claims a
//! bounded, priority-ordered batch of pending items, runs each through the
//! generator registry and the quality gate, and writes the outcome back. The
//! [`ReviewService`] moves items out of review on human decisions, and the
//! history log plus rejection patterns feed those decisions back to operators.

pub mod dispatch;
pub mod history;
pub mod item;
pub mod patterns;
pub mod recovery;
pub mod review;

pub use dispatch::{
    BatchDispatcher, BatchResponse, DispatchRequest, DispatchStats, ItemOutcome, ItemResult,
};
pub use history::{GenerationHistoryRecord, HistoryOutcome};
pub use item::{Completion, NewQueueItem, QualityFeedback, QueueItem};
pub use patterns::{rejection_patterns, RejectionPattern};
pub use recovery::reclaim_stale;
pub use review::{QueueStats, ReviewService};
