//! Deferred-credit ledger.
//!
//! When a value transfer to an untrusted recipient fails, the triggering
//! operation (a sale, a bid refund, a settlement leg) does not abort.
//! The owed amount is recorded here, keyed by `(recipient, reason)`, and
//! delivered later by an explicit redemption call, without re-running the
//! originating operation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AuctionId};

/// Why a payment was deferred. Part of the ledger key: the same recipient
/// can hold credits of different origins simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditReason {
    /// Referral commission from a sale.
    Commission,
    /// Refund of an outbid bidder's escrow.
    BidRefund(AuctionId),
    /// Seller proceeds from an ended auction.
    SellerProceeds(AuctionId),
    /// Platform fee leg of an ended auction.
    PlatformFee(AuctionId),
}

/// Accumulating map of not-yet-delivered payment obligations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingCredits {
    entries: HashMap<(AccountId, CreditReason), Amount>,
}

impl PendingCredits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deferred amount. Repeated failures for the same key
    /// accumulate.
    pub fn record(&mut self, recipient: AccountId, reason: CreditReason, amount: Amount) {
        if amount == 0 {
            return;
        }
        *self.entries.entry((recipient, reason)).or_insert(0) += amount;
    }

    /// Amount owed to `recipient` for `reason`.
    #[must_use]
    pub fn amount_for(&self, recipient: AccountId, reason: CreditReason) -> Amount {
        self.entries
            .get(&(recipient, reason))
            .copied()
            .unwrap_or(0)
    }

    /// Remove and return the credit for `(recipient, reason)`, if any.
    /// The caller attempts delivery; on failure it records the amount back.
    pub fn take(&mut self, recipient: AccountId, reason: CreditReason) -> Option<Amount> {
        self.entries.remove(&(recipient, reason))
    }

    /// Total owed to `recipient` across all reasons.
    #[must_use]
    pub fn total_for(&self, recipient: AccountId) -> Amount {
        self.entries
            .iter()
            .filter(|((acct, _), _)| *acct == recipient)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// All reasons with an outstanding credit for `recipient`.
    #[must_use]
    pub fn reasons_for(&self, recipient: AccountId) -> Vec<CreditReason> {
        self.entries
            .keys()
            .filter(|(acct, _)| *acct == recipient)
            .map(|(_, reason)| *reason)
            .collect()
    }

    /// Sum of every outstanding credit in the ledger.
    #[must_use]
    pub fn total_outstanding(&self) -> Amount {
        self.entries.values().sum()
    }

    /// Number of outstanding `(recipient, reason)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
