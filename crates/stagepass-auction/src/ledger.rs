//! The auction ledger.
//!
//! Owns every auction record plus the append-only bid history, keyed by
//! the monotonic [`AuctionId`]. All read views paginate with 1-indexed
//! pages, a clamped page size, and stable ordering by auction id.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagepass_types::{
    AccountId, Amount, AuctionId, AuctionOutcome, ItemRef, Result, StagepassError, apply_bps,
    constants,
};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One auction record. Configuration fields are a snapshot taken at
/// creation; only `highest_bid`, `highest_bidder`, `end_time`, and the
/// terminal flags mutate afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub item: ItemRef,
    pub seller: AccountId,

    // Config snapshot.
    pub starting_price: Amount,
    pub min_bid_increment: Amount,
    pub deposit_bps: u16,
    pub bid_lock_secs: i64,
    pub extension_threshold_secs: i64,
    pub platform_commission_bps: u16,

    // Live state.
    pub highest_bid: Amount,
    pub highest_bidder: Option<AccountId>,
    pub start_time: DateTime<Utc>,
    /// Mutable via anti-snipe extension only.
    pub end_time: DateTime<Utc>,
    pub ended: bool,
    pub cancelled: bool,
    pub outcome: Option<AuctionOutcome>,
}

impl Auction {
    /// Terminal records are immutable.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.ended || self.cancelled
    }

    /// Accepting bids: not terminal and before the end time.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminal() && now < self.end_time
    }

    /// Minimum acceptable next bid: the starting price for the first bid,
    /// otherwise the leader plus the increment.
    #[must_use]
    pub fn minimum_bid(&self) -> Amount {
        if self.highest_bidder.is_some() {
            self.starting_price
                .max(self.highest_bid.saturating_add(self.min_bid_increment))
        } else {
            self.starting_price
        }
    }

    /// Escrowed fraction of a bid of `amount`.
    #[must_use]
    pub fn escrow_for(&self, amount: Amount) -> Amount {
        apply_bps(amount, self.deposit_bps)
    }
}

/// One accepted bid. Appended, never mutated or removed; this is the
/// auction's audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub auction_id: AuctionId,
    pub bidder: AccountId,
    pub amount: Amount,
    pub placed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// One page of a read view: the requested slice plus the total count of
/// matching records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

fn paginate<T>(matching: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let total = matching.len();
    let page_size = page_size.min(constants::MAX_PAGE_SIZE);
    if page == 0 || page_size == 0 {
        return Page {
            items: Vec::new(),
            total,
        };
    }
    let items = matching
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect();
    Page { items, total }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Owned store of auctions and bids. Exclusively mutated by the auction
/// engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionLedger {
    auctions: BTreeMap<AuctionId, Auction>,
    bids: BTreeMap<AuctionId, Vec<Bid>>,
    next_id: u64,
}

impl AuctionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequential auction id.
    pub(crate) fn allocate_id(&mut self) -> AuctionId {
        self.next_id += 1;
        AuctionId(self.next_id)
    }

    pub(crate) fn insert(&mut self, auction: Auction) {
        // Ids are allocator-assigned; a collision is an engine bug.
        debug_assert!(!self.auctions.contains_key(&auction.id));
        self.bids.insert(auction.id, Vec::new());
        self.auctions.insert(auction.id, auction);
    }

    /// Look up an auction.
    pub fn get(&self, id: AuctionId) -> Result<&Auction> {
        self.auctions
            .get(&id)
            .ok_or(StagepassError::AuctionNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: AuctionId) -> Result<&mut Auction> {
        self.auctions
            .get_mut(&id)
            .ok_or(StagepassError::AuctionNotFound(id))
    }

    /// Append to an auction's bid history.
    pub(crate) fn record_bid(&mut self, bid: Bid) {
        self.bids.entry(bid.auction_id).or_default().push(bid);
    }

    /// Full bid history for an auction, in placement order.
    #[must_use]
    pub fn bids_for(&self, id: AuctionId) -> &[Bid] {
        self.bids.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Number of auctions ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }

    // =====================================================================
    // Paginated read views
    // =====================================================================

    /// Auctions currently accepting bids.
    #[must_use]
    pub fn active_auctions(
        &self,
        now: DateTime<Utc>,
        page: usize,
        page_size: usize,
    ) -> Page<Auction> {
        let matching = self
            .auctions
            .values()
            .filter(|a| a.is_active(now))
            .cloned()
            .collect();
        paginate(matching, page, page_size)
    }

    /// Terminal auctions (ended with or without sale, or cancelled).
    #[must_use]
    pub fn ended_auctions(&self, page: usize, page_size: usize) -> Page<Auction> {
        let matching = self
            .auctions
            .values()
            .filter(|a| a.is_terminal())
            .cloned()
            .collect();
        paginate(matching, page, page_size)
    }

    /// Every auction ever listed for `item`, any state.
    #[must_use]
    pub fn auctions_by_item(&self, item: ItemRef, page: usize, page_size: usize) -> Page<Auction> {
        let matching = self
            .auctions
            .values()
            .filter(|a| a.item == item)
            .cloned()
            .collect();
        paginate(matching, page, page_size)
    }

    /// Every bid `account` has placed, across all auctions, ordered by
    /// auction id then placement.
    #[must_use]
    pub fn user_bid_history(&self, account: AccountId, page: usize, page_size: usize) -> Page<Bid> {
        let matching = self
            .bids
            .values()
            .flatten()
            .filter(|b| b.bidder == account)
            .copied()
            .collect();
        paginate(matching, page, page_size)
    }

    /// The bid history of one auction.
    pub fn auction_bid_history(
        &self,
        id: AuctionId,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Bid>> {
        self.get(id)?;
        Ok(paginate(self.bids_for(id).to_vec(), page, page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_auction(ledger: &mut AuctionLedger, now: DateTime<Utc>, item: ItemRef) -> AuctionId {
        let id = ledger.allocate_id();
        ledger.insert(Auction {
            id,
            item,
            seller: AccountId::new(),
            starting_price: 100,
            min_bid_increment: 10,
            deposit_bps: 10_000,
            bid_lock_secs: 300,
            extension_threshold_secs: 600,
            platform_commission_bps: 250,
            highest_bid: 0,
            highest_bidder: None,
            start_time: now,
            end_time: now + Duration::hours(1),
            ended: false,
            cancelled: false,
            outcome: None,
        });
        id
    }

    #[test]
    fn ids_are_sequential() {
        let mut ledger = AuctionLedger::new();
        let now = Utc::now();
        let a = make_auction(&mut ledger, now, ItemRef::new(1, 1));
        let b = make_auction(&mut ledger, now, ItemRef::new(1, 2));
        assert_eq!(b, a.next());
    }

    #[test]
    fn minimum_bid_rules() {
        let mut ledger = AuctionLedger::new();
        let now = Utc::now();
        let id = make_auction(&mut ledger, now, ItemRef::new(1, 1));

        // First bid meets the starting price.
        assert_eq!(ledger.get(id).unwrap().minimum_bid(), 100);

        let auction = ledger.get_mut(id).unwrap();
        auction.highest_bid = 110;
        auction.highest_bidder = Some(AccountId::new());
        assert_eq!(ledger.get(id).unwrap().minimum_bid(), 120);
    }

    #[test]
    fn active_window_is_clock_driven() {
        let mut ledger = AuctionLedger::new();
        let now = Utc::now();
        let id = make_auction(&mut ledger, now, ItemRef::new(1, 1));

        let auction = ledger.get(id).unwrap();
        assert!(auction.is_active(now));
        assert!(!auction.is_active(now + Duration::hours(2)));
    }

    #[test]
    fn missing_auction_errors() {
        let ledger = AuctionLedger::new();
        let err = ledger.get(AuctionId(99)).unwrap_err();
        assert!(matches!(err, StagepassError::AuctionNotFound(_)));
    }

    #[test]
    fn pagination_is_one_indexed_and_stable() {
        let mut ledger = AuctionLedger::new();
        let now = Utc::now();
        for i in 0..25 {
            make_auction(&mut ledger, now, ItemRef::new(1, i));
        }

        let page1 = ledger.active_auctions(now, 1, 10);
        let page3 = ledger.active_auctions(now, 3, 10);
        assert_eq!(page1.total, 25);
        assert_eq!(page1.items.len(), 10);
        assert_eq!(page3.items.len(), 5);
        assert_eq!(page1.items[0].id, AuctionId(1));
        assert_eq!(page3.items[0].id, AuctionId(21));

        // Page 0 and an out-of-range page yield no items but the true total.
        assert!(ledger.active_auctions(now, 0, 10).items.is_empty());
        let beyond = ledger.active_auctions(now, 4, 10);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 25);
    }

    #[test]
    fn huge_page_number_yields_empty_page() {
        let mut ledger = AuctionLedger::new();
        let now = Utc::now();
        for i in 0..5 {
            make_auction(&mut ledger, now, ItemRef::new(1, i));
        }
        // Caller-supplied pagination must never panic, however large.
        let page = ledger.active_auctions(now, usize::MAX, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 5);
    }

    #[test]
    fn page_size_is_clamped() {
        let mut ledger = AuctionLedger::new();
        let now = Utc::now();
        for i in 0..150 {
            make_auction(&mut ledger, now, ItemRef::new(1, i));
        }
        let page = ledger.active_auctions(now, 1, 1_000);
        assert_eq!(page.items.len(), constants::MAX_PAGE_SIZE);
        assert_eq!(page.total, 150);
    }

    #[test]
    fn auctions_by_item_filters() {
        let mut ledger = AuctionLedger::new();
        let now = Utc::now();
        let target = ItemRef::new(2, 7);
        make_auction(&mut ledger, now, ItemRef::new(1, 1));
        make_auction(&mut ledger, now, target);
        make_auction(&mut ledger, now, target);

        let page = ledger.auctions_by_item(target, 1, 10);
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|a| a.item == target));
    }

    #[test]
    fn user_bid_history_spans_auctions() {
        let mut ledger = AuctionLedger::new();
        let now = Utc::now();
        let a = make_auction(&mut ledger, now, ItemRef::new(1, 1));
        let b = make_auction(&mut ledger, now, ItemRef::new(1, 2));
        let bidder = AccountId::new();

        for (auction_id, amount) in [(a, 100), (b, 200), (a, 300)] {
            ledger.record_bid(Bid {
                auction_id,
                bidder,
                amount,
                placed_at: now,
            });
        }
        ledger.record_bid(Bid {
            auction_id: a,
            bidder: AccountId::new(),
            amount: 400,
            placed_at: now,
        });

        let page = ledger.user_bid_history(bidder, 1, 10);
        assert_eq!(page.total, 3);
        // Ordered by auction id first.
        assert_eq!(page.items[0].auction_id, a);
        assert_eq!(page.items[1].auction_id, a);
        assert_eq!(page.items[2].auction_id, b);
    }

    #[test]
    fn auction_bid_history_requires_existing_auction() {
        let ledger = AuctionLedger::new();
        let err = ledger.auction_bid_history(AuctionId(1), 1, 10).unwrap_err();
        assert!(matches!(err, StagepassError::AuctionNotFound(_)));
    }
}
