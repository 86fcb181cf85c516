//! Collaborator interfaces consumed by the engines.
//!
//! Token issuance, currency custody, and role bookkeeping are external
//! systems; the engines only see these three traits. Every fallible
//! collaborator call returns an explicit result. There is no silent
//! failure path, and transfer failures are routed into the deferred-credit
//! ledger by the callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AccountId, Amount, ItemRef};

// ---------------------------------------------------------------------------
// Value transfer
// ---------------------------------------------------------------------------

/// A native-currency transfer was rejected or timed out.
///
/// The transport is treated as synchronous-and-fallible: if it can hang,
/// the adapter implementing [`ValueTransfer`] must impose a bounded timeout
/// and report it as this error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("transfer of {amount} to {to} failed")]
pub struct TransferFailed {
    pub to: AccountId,
    pub amount: Amount,
}

/// Atomic, fallible native-currency transfer primitive.
pub trait ValueTransfer {
    /// Push `amount` minor units to `to`. Either the full amount arrives
    /// or nothing does.
    fn send(&mut self, to: AccountId, amount: Amount) -> Result<(), TransferFailed>;
}

// ---------------------------------------------------------------------------
// Ownership token
// ---------------------------------------------------------------------------

/// An ownership-token operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TokenError {
    /// `from` does not hold enough units of the item.
    #[error("insufficient token balance")]
    InsufficientBalance,
    /// The engine was not approved as a transfer operator for `from`.
    #[error("transfer not approved")]
    NotApproved,
}

/// Mints/holds/transfers non-fungible units identified by [`ItemRef`].
///
/// Sellers pre-approve the engine as a transfer operator; custody stays
/// with the seller until settlement actually moves the item.
pub trait OwnershipToken {
    /// Units of `item` held by `account`.
    fn balance_of(&self, account: AccountId, item: ItemRef) -> u64;

    /// Move `qty` units of `item` from `from` to `to`.
    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        item: ItemRef,
        qty: u64,
    ) -> Result<(), TokenError>;
}

// ---------------------------------------------------------------------------
// Capability gate
// ---------------------------------------------------------------------------

/// Privileged operations, checked through an injected gate rather than
/// ambient caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// May promote accounts through rank thresholds.
    RankAdmin,
    /// May end auctions after their end time (not the seller, to avoid
    /// self-dealing timing games).
    AuctionOperator,
    /// May re-parent an account in the referral graph.
    ReferralOverride,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RankAdmin => write!(f, "RANK_ADMIN"),
            Self::AuctionOperator => write!(f, "AUCTION_OPERATOR"),
            Self::ReferralOverride => write!(f, "REFERRAL_OVERRIDE"),
        }
    }
}

/// Authorization check consulted by `rank_up`, `end_auction`, and
/// administrative overrides.
pub trait CapabilityGate {
    fn has_capability(&self, account: AccountId, capability: Capability) -> bool;
}
