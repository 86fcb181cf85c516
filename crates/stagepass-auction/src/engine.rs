//! The auction state machine.
//!
//! Admission checks reject before any state is written; once a mutation
//! commits, the currency legs it triggers are attempted afterwards and
//! individually recovered through the deferred-credit ledger on failure.
//! The bid that displaced a leader is never blocked by that leader's
//! refund failing: the escrow simply becomes a deferred credit the
//! displaced bidder reclaims through [`AuctionEngine::withdraw_bid`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stagepass_types::{
    AccountId, Amount, AuctionConfig, AuctionId, AuctionOutcome, Capability, CapabilityGate,
    CreditReason, ItemRef, MarketEvent, OwnershipToken, PendingCredits, Result, StagepassError,
    ValueTransfer, apply_bps,
};

use crate::ledger::{Auction, AuctionLedger, Bid, Page};

/// An item transfer leg that failed at settlement and awaits a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDelivery {
    pub item: ItemRef,
    pub to: AccountId,
}

/// State machine over the [`AuctionLedger`]: bid admission, refund,
/// time extension, cancellation, settlement.
pub struct AuctionEngine {
    ledger: AuctionLedger,
    defaults: AuctionConfig,
    /// Treasury account receiving the platform fee leg.
    platform: AccountId,
    pending: PendingCredits,
    pending_deliveries: BTreeMap<AuctionId, PendingDelivery>,
    events: Vec<MarketEvent>,
}

impl AuctionEngine {
    /// Build an engine with validated defaults.
    pub fn new(defaults: AuctionConfig, platform: AccountId) -> Result<Self> {
        defaults.validate()?;
        Ok(Self {
            ledger: AuctionLedger::new(),
            defaults,
            platform,
            pending: PendingCredits::new(),
            pending_deliveries: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    // =====================================================================
    // Lifecycle
    // =====================================================================

    /// List `item` for auction. The seller keeps custody (they only need
    /// to have pre-approved the engine as a transfer operator); the item
    /// moves at settlement.
    ///
    /// # Errors
    /// `NotOwner` unless the seller currently holds the item.
    pub fn create_auction(
        &mut self,
        seller: AccountId,
        item: ItemRef,
        starting_price: Amount,
        duration_secs: i64,
        now: DateTime<Utc>,
        token: &dyn OwnershipToken,
    ) -> Result<AuctionId> {
        if token.balance_of(seller, item) == 0 {
            return Err(StagepassError::NotOwner {
                account: seller,
                item,
            });
        }

        let id = self.ledger.allocate_id();
        let end_time = now + Duration::seconds(duration_secs);
        self.ledger.insert(Auction {
            id,
            item,
            seller,
            starting_price,
            min_bid_increment: self.defaults.min_bid_increment,
            deposit_bps: self.defaults.deposit_bps,
            bid_lock_secs: self.defaults.bid_lock_secs,
            extension_threshold_secs: self.defaults.extension_threshold_secs,
            platform_commission_bps: self.defaults.platform_commission_bps,
            highest_bid: 0,
            highest_bidder: None,
            start_time: now,
            end_time,
            ended: false,
            cancelled: false,
            outcome: None,
        });
        self.events.push(MarketEvent::AuctionCreated {
            auction: id,
            seller,
            item,
            starting_price,
            ends_at: end_time,
        });
        tracing::debug!(%id, %seller, %item, starting_price, "auction created");
        Ok(id)
    }

    /// Admit a bid.
    ///
    /// On success the displaced leader (if any) is refunded their escrow
    /// (a failed refund becomes a deferred credit, never a failed bid),
    /// and a bid landing inside the anti-snipe window resets the countdown
    /// to exactly `extension_threshold_secs` from now.
    ///
    /// # Errors
    /// - `AuctionNotActive` if terminal or past the end time
    /// - `BidTooLow` below `max(starting_price, highest + increment)`
    pub fn place_bid(
        &mut self,
        id: AuctionId,
        bidder: AccountId,
        amount: Amount,
        now: DateTime<Utc>,
        bank: &mut dyn ValueTransfer,
    ) -> Result<()> {
        // All admission checks against a consistent read; nothing below
        // them can fail.
        let auction = self.ledger.get(id)?;
        if !auction.is_active(now) {
            return Err(StagepassError::AuctionNotActive(id));
        }
        let minimum = auction.minimum_bid();
        if amount < minimum {
            return Err(StagepassError::BidTooLow { amount, minimum });
        }
        let previous = auction
            .highest_bidder
            .map(|b| (b, auction.escrow_for(auction.highest_bid)));
        let threshold = Duration::seconds(auction.extension_threshold_secs);
        let extend = auction.end_time - now <= threshold;
        let new_end = now + threshold;

        // Commit the new leader.
        {
            let auction = self.ledger.get_mut(id)?;
            auction.highest_bid = amount;
            auction.highest_bidder = Some(bidder);
            if extend {
                // Reset, not add: rapid-fire bids cannot stack extensions.
                auction.end_time = new_end;
            }
        }
        self.ledger.record_bid(Bid {
            auction_id: id,
            bidder,
            amount,
            placed_at: now,
        });
        self.events.push(MarketEvent::BidPlaced {
            auction: id,
            bidder,
            amount,
            placed_at: now,
        });
        if extend {
            self.events.push(MarketEvent::AuctionExtended {
                auction: id,
                new_end,
            });
        }

        // Refund the displaced leader's escrow.
        if let Some((prev_bidder, prev_escrow)) = previous {
            if bank.send(prev_bidder, prev_escrow).is_ok() {
                self.events.push(MarketEvent::BidRefunded {
                    auction: id,
                    bidder: prev_bidder,
                    amount: prev_escrow,
                });
            } else {
                self.pending
                    .record(prev_bidder, CreditReason::BidRefund(id), prev_escrow);
                self.events.push(MarketEvent::RefundDeferred {
                    auction: id,
                    bidder: prev_bidder,
                    amount: prev_escrow,
                });
                tracing::warn!(%id, bidder = %prev_bidder, amount = prev_escrow, "bid refund deferred");
            }
            if prev_bidder != bidder {
                self.events.push(MarketEvent::Outbid {
                    auction: id,
                    previous_bidder: prev_bidder,
                    new_bidder: bidder,
                    amount,
                });
            }
        }
        Ok(())
    }

    /// Reclaim the caller's escrowed amount on an auction they no longer
    /// lead (their refund was deferred when they were outbid).
    ///
    /// Caller-initiated payout: a failed retry is surfaced and the credit
    /// stays on the books.
    ///
    /// # Errors
    /// - `CannotWithdrawLeadingBid` while the caller leads
    /// - `NoEscrowedBid` if the caller never bid or holds no credit
    /// - `BidLocked` inside the lock window of their most recent bid
    pub fn withdraw_bid(
        &mut self,
        id: AuctionId,
        caller: AccountId,
        now: DateTime<Utc>,
        bank: &mut dyn ValueTransfer,
    ) -> Result<Amount> {
        let auction = self.ledger.get(id)?;
        if auction.highest_bidder == Some(caller) {
            // Leading capital stays committed until outbid or settled.
            return Err(StagepassError::CannotWithdrawLeadingBid(id));
        }
        let lock_secs = auction.bid_lock_secs;

        let Some(last_bid) = self
            .ledger
            .bids_for(id)
            .iter()
            .rev()
            .find(|b| b.bidder == caller)
        else {
            return Err(StagepassError::NoEscrowedBid {
                account: caller,
                auction: id,
            });
        };
        let unlocks_at = last_bid.placed_at + Duration::seconds(lock_secs);
        if now < unlocks_at {
            return Err(StagepassError::BidLocked { unlocks_at });
        }

        let Some(amount) = self.pending.take(caller, CreditReason::BidRefund(id)) else {
            return Err(StagepassError::NoEscrowedBid {
                account: caller,
                auction: id,
            });
        };
        if let Err(err) = bank.send(caller, amount) {
            self.pending
                .record(caller, CreditReason::BidRefund(id), amount);
            return Err(err.into());
        }
        self.events.push(MarketEvent::BidWithdrawn {
            auction: id,
            bidder: caller,
            amount,
        });
        Ok(amount)
    }

    /// Seller cancellation, only while no capital is committed.
    ///
    /// # Errors
    /// - `NotSeller` unless the caller listed the auction
    /// - `AuctionNotActive` if already terminal
    /// - `HasBids` once a leader exists
    pub fn cancel_auction(&mut self, id: AuctionId, caller: AccountId) -> Result<()> {
        let auction = self.ledger.get(id)?;
        if auction.seller != caller {
            return Err(StagepassError::NotSeller {
                account: caller,
                auction: id,
            });
        }
        if auction.is_terminal() {
            return Err(StagepassError::AuctionNotActive(id));
        }
        if auction.highest_bidder.is_some() {
            return Err(StagepassError::HasBids(id));
        }

        self.ledger.get_mut(id)?.cancelled = true;
        // Custody was never taken, so nothing to hand back.
        self.events.push(MarketEvent::AuctionCancelled { auction: id });
        Ok(())
    }

    /// Settle an auction past its end time. Operator-only, to keep the
    /// seller out of timing games.
    ///
    /// With no bids the record is closed as a no-sale. With bids, three
    /// legs run as one logical unit: platform fee, seller proceeds, item
    /// transfer. A failed leg is recorded (deferred credit or pending
    /// delivery) while the others proceed; cross-leg atomicity against
    /// untrusted recipients is explicitly not promised.
    ///
    /// # Errors
    /// - `PermissionDenied` without [`Capability::AuctionOperator`]
    /// - `AuctionNotActive` on a second call (no state changes)
    /// - `StillOngoing` before the end time
    pub fn end_auction(
        &mut self,
        id: AuctionId,
        operator: AccountId,
        now: DateTime<Utc>,
        gate: &dyn CapabilityGate,
        bank: &mut dyn ValueTransfer,
        token: &mut dyn OwnershipToken,
    ) -> Result<AuctionOutcome> {
        if !gate.has_capability(operator, Capability::AuctionOperator) {
            return Err(StagepassError::PermissionDenied {
                account: operator,
                capability: Capability::AuctionOperator,
            });
        }
        let auction = self.ledger.get(id)?;
        if auction.is_terminal() {
            return Err(StagepassError::AuctionNotActive(id));
        }
        if now < auction.end_time {
            return Err(StagepassError::StillOngoing {
                ends_at: auction.end_time,
            });
        }

        let seller = auction.seller;
        let item = auction.item;
        let winning_bid = auction.highest_bid;
        let winner = auction.highest_bidder;
        let fee = apply_bps(winning_bid, auction.platform_commission_bps);

        let Some(winner) = winner else {
            let auction = self.ledger.get_mut(id)?;
            auction.ended = true;
            auction.outcome = Some(AuctionOutcome::NoSale);
            self.events.push(MarketEvent::AuctionEnded {
                auction: id,
                outcome: AuctionOutcome::NoSale,
                winning_bid: 0,
            });
            tracing::info!(%id, "auction ended without sale");
            return Ok(AuctionOutcome::NoSale);
        };

        // Terminal flag first: the record is immutable from here and a
        // second call cannot re-run the legs.
        {
            let auction = self.ledger.get_mut(id)?;
            auction.ended = true;
            auction.outcome = Some(AuctionOutcome::Sale);
        }

        // Leg 1: platform fee.
        if fee > 0 {
            if bank.send(self.platform, fee).is_ok() {
                self.events.push(MarketEvent::PlatformFeeCollected {
                    auction: id,
                    amount: fee,
                });
            } else {
                self.pending
                    .record(self.platform, CreditReason::PlatformFee(id), fee);
                self.events.push(MarketEvent::PlatformFeeDeferred {
                    auction: id,
                    amount: fee,
                });
                tracing::warn!(%id, amount = fee, "platform fee deferred");
            }
        }

        // Leg 2: seller proceeds.
        let proceeds = winning_bid - fee;
        if bank.send(seller, proceeds).is_ok() {
            self.events.push(MarketEvent::SellerPaid {
                auction: id,
                seller,
                amount: proceeds,
            });
        } else {
            self.pending
                .record(seller, CreditReason::SellerProceeds(id), proceeds);
            self.events.push(MarketEvent::SellerPayoutDeferred {
                auction: id,
                seller,
                amount: proceeds,
            });
            tracing::warn!(%id, %seller, amount = proceeds, "seller payout deferred");
        }

        // Leg 3: item transfer to the winner.
        if token.transfer(seller, winner, item, 1).is_ok() {
            self.events.push(MarketEvent::ItemDelivered {
                auction: id,
                item,
                from: seller,
                to: winner,
            });
        } else {
            self.pending_deliveries
                .insert(id, PendingDelivery { item, to: winner });
            self.events.push(MarketEvent::DeliveryDeferred {
                auction: id,
                item,
                to: winner,
            });
            tracing::warn!(%id, %item, winner = %winner, "item delivery deferred");
        }

        self.events.push(MarketEvent::AuctionEnded {
            auction: id,
            outcome: AuctionOutcome::Sale,
            winning_bid,
        });
        tracing::info!(%id, winning_bid, fee, "auction settled");
        Ok(AuctionOutcome::Sale)
    }

    /// Retry delivery of an account's deferred settlement credits (seller
    /// proceeds, platform fees). Bid-refund credits are excluded: those go
    /// through [`Self::withdraw_bid`] and its lock check.
    ///
    /// Returns the total delivered; `Ok(0)` when nothing is owed. On a
    /// failed send the remaining credits stay on the books and the amount
    /// delivered so far is still gone, so the error carries the failed
    /// credit only.
    pub fn redeem_credits(
        &mut self,
        account: AccountId,
        bank: &mut dyn ValueTransfer,
    ) -> Result<Amount> {
        let reasons: Vec<CreditReason> = self
            .pending
            .reasons_for(account)
            .into_iter()
            .filter(|r| !matches!(r, CreditReason::BidRefund(_)))
            .collect();
        let mut redeemed = 0;
        for reason in reasons {
            let Some(amount) = self.pending.take(account, reason) else {
                continue;
            };
            if let Err(err) = bank.send(account, amount) {
                self.pending.record(account, reason, amount);
                return Err(err.into());
            }
            redeemed += amount;
            self.events.push(MarketEvent::CreditRedeemed {
                recipient: account,
                amount,
            });
        }
        Ok(redeemed)
    }

    /// Retry a failed item-transfer leg.
    ///
    /// # Errors
    /// - `NoPendingDelivery` if nothing is recorded for this auction
    /// - the token error, with the delivery kept for a later retry
    pub fn deliver_pending(&mut self, id: AuctionId, token: &mut dyn OwnershipToken) -> Result<()> {
        let Some(delivery) = self.pending_deliveries.remove(&id) else {
            return Err(StagepassError::NoPendingDelivery(id));
        };
        let seller = self.ledger.get(id)?.seller;
        if let Err(err) = token.transfer(seller, delivery.to, delivery.item, 1) {
            self.pending_deliveries.insert(id, delivery);
            return Err(err.into());
        }
        self.events.push(MarketEvent::ItemDelivered {
            auction: id,
            item: delivery.item,
            from: seller,
            to: delivery.to,
        });
        Ok(())
    }

    // =====================================================================
    // Read accessors
    // =====================================================================

    /// The auction record.
    pub fn auction(&self, id: AuctionId) -> Result<&Auction> {
        self.ledger.get(id)
    }

    /// The ledger's read views (pagination, bid history).
    #[must_use]
    pub fn ledger(&self) -> &AuctionLedger {
        &self.ledger
    }

    /// The deferred-credit ledger (read-only).
    #[must_use]
    pub fn pending_credits(&self) -> &PendingCredits {
        &self.pending
    }

    /// The recorded item-transfer failure for `id`, if any.
    #[must_use]
    pub fn pending_delivery(&self, id: AuctionId) -> Option<PendingDelivery> {
        self.pending_deliveries.get(&id).copied()
    }

    /// Drain the accumulated event journal.
    pub fn take_events(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }

    /// Paginated view of auctions currently accepting bids.
    #[must_use]
    pub fn active_auctions(
        &self,
        now: DateTime<Utc>,
        page: usize,
        page_size: usize,
    ) -> Page<Auction> {
        self.ledger.active_auctions(now, page, page_size)
    }

    /// Paginated view of terminal auctions.
    #[must_use]
    pub fn ended_auctions(&self, page: usize, page_size: usize) -> Page<Auction> {
        self.ledger.ended_auctions(page, page_size)
    }

    /// Every auction ever listed for `item`, any state.
    #[must_use]
    pub fn auctions_by_item(&self, item: ItemRef, page: usize, page_size: usize) -> Page<Auction> {
        self.ledger.auctions_by_item(item, page, page_size)
    }

    /// Every bid `account` has placed, across all auctions.
    #[must_use]
    pub fn user_bid_history(&self, account: AccountId, page: usize, page_size: usize) -> Page<Bid> {
        self.ledger.user_bid_history(account, page, page_size)
    }

    /// The bid history of one auction.
    pub fn auction_bid_history(
        &self,
        id: AuctionId,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Bid>> {
        self.ledger.auction_bid_history(id, page, page_size)
    }
}
