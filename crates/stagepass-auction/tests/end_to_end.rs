//! End-to-end pipeline: an auction settles and the winner's purchase
//! feeds the multi-level commission walk, including deferred-credit
//! recovery across both engines against the same bank.

use chrono::{DateTime, Duration, Utc};

use stagepass_auction::AuctionEngine;
use stagepass_referral::CommissionEngine;
use stagepass_types::sim::{InMemoryBank, InMemoryToken, StaticGate};
use stagepass_types::{
    AccountId, Amount, AuctionConfig, AuctionId, AuctionOutcome, Capability, CommissionConfig,
    CreditReason, ItemRef, OwnershipToken, RankRequirement, RewardTable, apply_bps,
};

/// Both engines wired against shared collaborators, the way an embedding
/// marketplace would drive them.
struct Marketplace {
    auctions: AuctionEngine,
    referrals: CommissionEngine,
    bank: InMemoryBank,
    token: InMemoryToken,
    gate: StaticGate,
    operator: AccountId,
    platform: AccountId,
    now: DateTime<Utc>,
}

impl Marketplace {
    fn new() -> Self {
        let platform = AccountId::new();
        let operator = AccountId::new();
        let mut gate = StaticGate::new();
        gate.grant(operator, Capability::AuctionOperator);

        let free = RankRequirement {
            direct_referrals: 0,
            sales_volume: 0,
        };
        let commission =
            CommissionConfig::new(5, vec![free; 4], RewardTable::standard()).unwrap();

        Self {
            auctions: AuctionEngine::new(AuctionConfig::default(), platform).unwrap(),
            referrals: CommissionEngine::new(commission),
            bank: InMemoryBank::new(),
            token: InMemoryToken::new(),
            gate,
            operator,
            platform,
            now: Utc::now(),
        }
    }

    fn list(&mut self, seller: AccountId, item: ItemRef, price: Amount) -> AuctionId {
        self.token.mint(seller, item, 1);
        self.auctions
            .create_auction(seller, item, price, 86_400, self.now, &self.token)
            .unwrap()
    }

    /// Settle a finished auction, then run the commission walk on the
    /// winner's purchase.
    fn settle(&mut self, id: AuctionId) -> AuctionOutcome {
        let after = self.now + Duration::days(2);
        let outcome = self
            .auctions
            .end_auction(id, self.operator, after, &self.gate, &mut self.bank, &mut self.token)
            .unwrap();
        if outcome == AuctionOutcome::Sale {
            let auction = self.auctions.auction(id).unwrap();
            let (winner, price) = (auction.highest_bidder.unwrap(), auction.highest_bid);
            self.referrals.distribute_commission(winner, price, &mut self.bank);
        }
        outcome
    }
}

#[test]
fn sale_pays_seller_platform_and_referral_chain() {
    let mut m = Marketplace::new();
    let table = RewardTable::standard();

    // Referral chain: root <- mid <- winner.
    let root = AccountId::new();
    let mid = AccountId::new();
    let winner = AccountId::new();
    m.referrals.set_referrer(mid, root).unwrap();
    m.referrals.set_referrer(winner, mid).unwrap();

    let seller = AccountId::new();
    let item = ItemRef::new(1, 1);
    let id = m.list(seller, item, 10_000);
    m.auctions.place_bid(id, winner, 40_000, m.now, &mut m.bank).unwrap();

    assert_eq!(m.settle(id), AuctionOutcome::Sale);

    let fee = apply_bps(40_000, AuctionConfig::default().platform_commission_bps);
    assert_eq!(m.bank.received(m.platform), fee);
    assert_eq!(m.bank.received(seller), 40_000 - fee);
    assert_eq!(m.token.balance_of(winner, item), 1);

    // Commission walk from the winner: mid at depth 1, root at depth 2.
    assert_eq!(m.bank.received(mid), apply_bps(40_000, table.rate(1, 0)));
    assert_eq!(m.bank.received(root), apply_bps(40_000, table.rate(2, 0)));

    // The sale credited the direct referrer's volume.
    assert_eq!(m.referrals.sales_volume_of(mid), 40_000);
}

#[test]
fn no_sale_triggers_no_commission() {
    let mut m = Marketplace::new();
    let seller = AccountId::new();
    let id = m.list(seller, ItemRef::new(1, 2), 10_000);

    assert_eq!(m.settle(id), AuctionOutcome::NoSale);
    assert_eq!(m.bank.total_received(), 0);
    assert!(m.referrals.pending_credits().is_empty());
}

/// Failures on both engines' payout legs land in their deferred-credit
/// ledgers and are independently recoverable.
#[test]
fn deferred_legs_recover_across_both_engines() {
    let mut m = Marketplace::new();

    let referrer = AccountId::new();
    let winner = AccountId::new();
    m.referrals.set_referrer(winner, referrer).unwrap();

    let seller = AccountId::new();
    let id = m.list(seller, ItemRef::new(1, 3), 1_000);
    m.auctions.place_bid(id, winner, 10_000, m.now, &mut m.bank).unwrap();

    // Seller and referrer are both unreachable at settlement time.
    m.bank.reject(seller);
    m.bank.reject(referrer);
    m.settle(id);

    let fee = apply_bps(10_000, AuctionConfig::default().platform_commission_bps);
    assert_eq!(
        m.auctions
            .pending_credits()
            .amount_for(seller, CreditReason::SellerProceeds(id)),
        10_000 - fee
    );
    let commission = m
        .referrals
        .pending_credits()
        .amount_for(referrer, CreditReason::Commission);
    assert!(commission > 0);

    // Both come back online and collect.
    m.bank.accept(seller);
    m.bank.accept(referrer);
    let redeemed = m.referrals.redeem_credits(referrer, &mut m.bank).unwrap();
    assert_eq!(redeemed, commission);
    assert_eq!(m.bank.received(referrer), commission);
    assert!(m.referrals.pending_credits().is_empty());

    let proceeds = m.auctions.redeem_credits(seller, &mut m.bank).unwrap();
    assert_eq!(proceeds, 10_000 - fee);
    assert_eq!(m.bank.received(seller), proceeds);
    assert!(m.auctions.pending_credits().is_empty());
}
