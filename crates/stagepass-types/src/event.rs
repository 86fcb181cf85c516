//! Market events: the notification surface of both engines.
//!
//! Every state change listed in the engine contracts emits exactly one
//! event. The out-of-scope registry mirror consumes these to keep a
//! read-optimized ownership index in sync; tests consume them to assert
//! on observable behavior rather than internal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AuctionId, ItemRef};

/// How an auction terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionOutcome {
    /// At least one bid existed; the item was sold to the highest bidder.
    Sale,
    /// No bids were ever placed; the item stays with the seller.
    NoSale,
}

impl std::fmt::Display for AuctionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sale => write!(f, "SALE"),
            Self::NoSale => write!(f, "NO_SALE"),
        }
    }
}

/// One observable state change in the referral graph or an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    // --- Referral graph / commission engine ---
    /// `child` was attributed to `parent` (first attribution, or override).
    ReferralRegistered {
        child: AccountId,
        parent: AccountId,
    },
    /// An account advanced exactly one rank.
    RankChanged {
        account: AccountId,
        old_rank: u8,
        new_rank: u8,
    },
    /// A commission transfer succeeded.
    CommissionPaid {
        buyer: AccountId,
        recipient: AccountId,
        depth: usize,
        amount: Amount,
    },
    /// A commission transfer failed and was recorded as a deferred credit.
    CommissionDeferred {
        buyer: AccountId,
        recipient: AccountId,
        depth: usize,
        amount: Amount,
    },
    /// A deferred credit was later delivered.
    CreditRedeemed {
        recipient: AccountId,
        amount: Amount,
    },

    // --- Auction engine ---
    AuctionCreated {
        auction: AuctionId,
        seller: AccountId,
        item: ItemRef,
        starting_price: Amount,
        ends_at: DateTime<Utc>,
    },
    BidPlaced {
        auction: AuctionId,
        bidder: AccountId,
        amount: Amount,
        placed_at: DateTime<Utc>,
    },
    /// The displaced leader's escrow was returned.
    BidRefunded {
        auction: AuctionId,
        bidder: AccountId,
        amount: Amount,
    },
    /// The displaced leader's refund failed; escrow became a deferred credit.
    RefundDeferred {
        auction: AuctionId,
        bidder: AccountId,
        amount: Amount,
    },
    /// A different bidder took the lead. Distinct from [`Self::BidRefunded`]:
    /// one observer cares that money moved, another that the leader changed.
    Outbid {
        auction: AuctionId,
        previous_bidder: AccountId,
        new_bidder: AccountId,
        amount: Amount,
    },
    /// A late bid reset the countdown (anti-snipe).
    AuctionExtended {
        auction: AuctionId,
        new_end: DateTime<Utc>,
    },
    /// A non-leading bidder reclaimed their escrowed amount.
    BidWithdrawn {
        auction: AuctionId,
        bidder: AccountId,
        amount: Amount,
    },
    AuctionCancelled {
        auction: AuctionId,
    },
    AuctionEnded {
        auction: AuctionId,
        outcome: AuctionOutcome,
        winning_bid: Amount,
    },
    /// Seller proceeds leg of a settlement succeeded.
    SellerPaid {
        auction: AuctionId,
        seller: AccountId,
        amount: Amount,
    },
    /// Seller proceeds leg failed; recorded as a deferred credit.
    SellerPayoutDeferred {
        auction: AuctionId,
        seller: AccountId,
        amount: Amount,
    },
    /// Platform fee leg of a settlement succeeded.
    PlatformFeeCollected {
        auction: AuctionId,
        amount: Amount,
    },
    /// Platform fee leg failed; recorded as a deferred credit.
    PlatformFeeDeferred {
        auction: AuctionId,
        amount: Amount,
    },
    /// The item moved from seller to winner.
    ItemDelivered {
        auction: AuctionId,
        item: ItemRef,
        from: AccountId,
        to: AccountId,
    },
    /// The item transfer leg failed; delivery is pending a retry.
    DeliveryDeferred {
        auction: AuctionId,
        item: ItemRef,
        to: AccountId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_display() {
        assert_eq!(format!("{}", AuctionOutcome::Sale), "SALE");
        assert_eq!(format!("{}", AuctionOutcome::NoSale), "NO_SALE");
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = MarketEvent::BidPlaced {
            auction: AuctionId(9),
            bidder: AccountId::new(),
            amount: 125,
            placed_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: MarketEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
