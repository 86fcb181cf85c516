//! # stagepass-types
//!
//! Shared types, errors, and configuration for the **Stagepass** marketplace
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`AuctionId`], [`ItemRef`]
//! - **Currency**: [`Amount`] (integer minor units) and basis-point helpers
//! - **Configuration**: [`CommissionConfig`], [`RewardTable`], [`RankRequirement`], [`AuctionConfig`]
//! - **Deferred credits**: [`PendingCredits`], [`CreditReason`]
//! - **Events**: [`MarketEvent`] for every observable state change
//! - **Collaborator traits**: [`ValueTransfer`], [`OwnershipToken`], [`CapabilityGate`]
//! - **Errors**: [`StagepassError`] with `SP_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults
//!
//! In-memory collaborator implementations for tests live in [`sim`] behind
//! the `test-helpers` feature.

pub mod config;
pub mod constants;
pub mod credit;
pub mod error;
pub mod event;
pub mod ids;
pub mod traits;

#[cfg(any(test, feature = "test-helpers"))]
pub mod sim;

// Re-export all primary types at crate root for ergonomic imports:
//   use stagepass_types::{AccountId, AuctionId, MarketEvent, ...};

pub use config::*;
pub use credit::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use traits::*;

// Constants are accessed via `stagepass_types::constants::FOO`
// (not re-exported to avoid name collisions).

/// Currency amount in integer minor units.
///
/// All fee and reward arithmetic is basis-point math over this type, widened
/// to `u128` internally so `price * bps` cannot overflow.
pub type Amount = u64;

/// Compute `amount * bps / 10_000` with truncation toward zero.
///
/// This is the single place basis-point math happens; truncation remainders
/// are accounted for by the callers (platform residual), never re-rounded.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn apply_bps(amount: Amount, bps: u16) -> Amount {
    let wide = u128::from(amount) * u128::from(bps) / u128::from(constants::BPS_DENOMINATOR);
    // Cannot exceed `amount` since bps <= 10_000.
    wide as Amount
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_bps_truncates_toward_zero() {
        // 333 * 250 / 10_000 = 8.325 -> 8
        assert_eq!(apply_bps(333, 250), 8);
    }

    #[test]
    fn apply_bps_full_rate_is_identity() {
        assert_eq!(apply_bps(12_345, 10_000), 12_345);
    }

    #[test]
    fn apply_bps_zero_rate_is_zero() {
        assert_eq!(apply_bps(u64::MAX, 0), 0);
    }

    #[test]
    fn apply_bps_no_overflow_at_max() {
        // u64::MAX * 10_000 overflows u64; the u128 widening must absorb it.
        assert_eq!(apply_bps(u64::MAX, 10_000), u64::MAX);
    }
}
