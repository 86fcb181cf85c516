//! # stagepass-referral
//!
//! Referral graph store and multi-level commission engine.
//!
//! ## Architecture
//!
//! - [`ReferralGraph`] owns the forest of referrer relationships plus the
//!   per-account rank, sales-volume, and direct-referral counters. No other
//!   component mutates it.
//! - [`RankPolicy`] is the threshold table gating rank promotion.
//! - [`CommissionEngine`] consumes both to compute and disburse the
//!   rank-gated, depth-decaying rewards at sale time.
//!
//! The engine is a plain owned state machine: every mutating operation
//! takes `&mut self`, which is the single serialization point. External
//! value transfers are attempted only after the authoritative payout set
//! has been computed from a consistent read, and a failed transfer never
//! aborts the sale; it becomes a deferred credit.

pub mod engine;
pub mod graph;
pub mod rank;

pub use engine::{CommissionBreakdown, CommissionEngine, CommissionShare};
pub use graph::{AccountNode, ReferralGraph};
pub use rank::RankPolicy;
