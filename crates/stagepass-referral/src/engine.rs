//! The commission engine.
//!
//! Walks the referral graph at sale time and disburses rank-gated,
//! depth-decaying rewards. The payout set is computed from a consistent
//! read of the graph **before** any external transfer is attempted, so a
//! slow or failing recipient cannot stall the walk. A failed transfer
//! never aborts the sale: the amount lands in the deferred-credit ledger
//! and the walk continues to the next ancestor.

use stagepass_types::{
    AccountId, Amount, Capability, CapabilityGate, CommissionConfig, CreditReason, MarketEvent,
    PendingCredits, Result, RewardTable, StagepassError, ValueTransfer, apply_bps,
};

use crate::graph::ReferralGraph;
use crate::rank::RankPolicy;

/// One ancestor's share of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionShare {
    pub recipient: AccountId,
    pub depth: usize,
    pub rank: u8,
    pub amount: Amount,
    /// True if the transfer failed and the amount became a deferred credit.
    pub deferred: bool,
}

/// Exact books for one sale's distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionBreakdown {
    pub buyer: AccountId,
    pub price: Amount,
    pub shares: Vec<CommissionShare>,
    /// Sum of shares that were delivered synchronously.
    pub distributed: Amount,
    /// Sum of shares routed into the deferred-credit ledger.
    pub deferred: Amount,
    /// What the payer retains: price minus every share, truncation
    /// remainders included.
    pub retained: Amount,
}

/// Owns the referral graph and disburses commissions. The single
/// serialization point for all referral-side mutations is the exclusive
/// borrow on this engine.
pub struct CommissionEngine {
    graph: ReferralGraph,
    policy: RankPolicy,
    table: RewardTable,
    pending: PendingCredits,
    events: Vec<MarketEvent>,
}

impl CommissionEngine {
    #[must_use]
    pub fn new(config: CommissionConfig) -> Self {
        Self {
            graph: ReferralGraph::new(config.max_depth),
            policy: RankPolicy::new(config.rank_requirements),
            table: config.reward_table,
            pending: PendingCredits::new(),
            events: Vec::new(),
        }
    }

    // =====================================================================
    // Graph operations
    // =====================================================================

    /// Attribute `child` to `parent` (first attribution wins).
    pub fn set_referrer(&mut self, child: AccountId, parent: AccountId) -> Result<()> {
        self.graph.set_referrer(child, parent)?;
        self.events
            .push(MarketEvent::ReferralRegistered { child, parent });
        Ok(())
    }

    /// Authorized re-parenting of an account.
    pub fn set_referrer_override(
        &mut self,
        child: AccountId,
        parent: AccountId,
        caller: AccountId,
        gate: &dyn CapabilityGate,
    ) -> Result<()> {
        if !gate.has_capability(caller, Capability::ReferralOverride) {
            return Err(StagepassError::PermissionDenied {
                account: caller,
                capability: Capability::ReferralOverride,
            });
        }
        self.graph.reassign_referrer(child, parent)?;
        self.events
            .push(MarketEvent::ReferralRegistered { child, parent });
        Ok(())
    }

    /// Hops from `account` to its chain root (introspection only).
    #[must_use]
    pub fn referral_depth(&self, account: AccountId) -> usize {
        self.graph.referral_depth(account)
    }

    /// Add `amount` to `account`'s sales-volume accumulator.
    pub fn update_sales_volume(&mut self, account: AccountId, amount: Amount) {
        self.graph.update_sales_volume(account, amount);
    }

    // =====================================================================
    // Rank operations
    // =====================================================================

    /// Pure predicate: both of the next rank's thresholds are met.
    #[must_use]
    pub fn check_eligibility(&self, account: AccountId) -> bool {
        self.policy.is_eligible(&self.graph.node(account))
    }

    /// Advance `account` by exactly one rank. Never automatic, never
    /// skips ranks.
    ///
    /// # Errors
    /// - `PermissionDenied` without [`Capability::RankAdmin`]
    /// - `NotEligible` if the thresholds are not met (or at max rank)
    pub fn rank_up(
        &mut self,
        account: AccountId,
        caller: AccountId,
        gate: &dyn CapabilityGate,
    ) -> Result<u8> {
        if !gate.has_capability(caller, Capability::RankAdmin) {
            return Err(StagepassError::PermissionDenied {
                account: caller,
                capability: Capability::RankAdmin,
            });
        }
        let current = self.graph.rank_of(account);
        if !self.check_eligibility(account) {
            return Err(StagepassError::NotEligible {
                account,
                current_rank: current,
            });
        }
        let new_rank = self.graph.bump_rank(account);
        self.events.push(MarketEvent::RankChanged {
            account,
            old_rank: current,
            new_rank,
        });
        tracing::debug!(%account, new_rank, "rank advanced");
        Ok(new_rank)
    }

    // =====================================================================
    // Distribution
    // =====================================================================

    /// Distribute commission for a sale of `price` by `buyer`.
    ///
    /// Walks at most `max_depth` ancestors up from the buyer, paying each
    /// `price * table[depth][rank] / 10000` (truncated). A buyer with no
    /// referrer yields an empty no-op breakdown. Transfer failures become
    /// deferred credits; the sale itself never fails here.
    pub fn distribute_commission(
        &mut self,
        buyer: AccountId,
        price: Amount,
        bank: &mut dyn ValueTransfer,
    ) -> CommissionBreakdown {
        // Authoritative payout set first, from a consistent read. No
        // external call happens until the walk is done.
        let planned: Vec<(usize, AccountId, u8, Amount)> = self
            .graph
            .ancestors(buyer)
            .into_iter()
            .map(|(depth, ancestor)| {
                let rank = self.graph.rank_of(ancestor);
                let amount = apply_bps(price, self.table.rate(depth, rank));
                (depth, ancestor, rank, amount)
            })
            .collect();

        // Sales volume accrues to the direct referrer only: rank-up
        // eligibility is scoped to direct relationship performance.
        if let Some(&(1, direct, _, _)) = planned.first() {
            self.graph.update_sales_volume(direct, price);
        }

        let mut shares = Vec::with_capacity(planned.len());
        let mut distributed: Amount = 0;
        let mut deferred: Amount = 0;

        for (depth, recipient, rank, amount) in planned {
            if amount == 0 {
                continue;
            }
            let failed = bank.send(recipient, amount).is_err();
            if failed {
                self.pending
                    .record(recipient, CreditReason::Commission, amount);
                self.events.push(MarketEvent::CommissionDeferred {
                    buyer,
                    recipient,
                    depth,
                    amount,
                });
                tracing::warn!(%recipient, amount, depth, "commission transfer deferred");
                deferred += amount;
            } else {
                self.events.push(MarketEvent::CommissionPaid {
                    buyer,
                    recipient,
                    depth,
                    amount,
                });
                distributed += amount;
            }
            shares.push(CommissionShare {
                recipient,
                depth,
                rank,
                amount,
                deferred: failed,
            });
        }

        tracing::debug!(%buyer, price, distributed, deferred, "commission distributed");
        CommissionBreakdown {
            buyer,
            price,
            shares,
            distributed,
            deferred,
            retained: price.saturating_sub(distributed + deferred),
        }
    }

    /// Retry delivery of `account`'s deferred commission credit.
    ///
    /// Returns the delivered amount (0 if nothing was owed). Unlike the
    /// sale path this is caller-initiated, so a failed retry is surfaced
    /// and the credit stays on the books for next time.
    pub fn redeem_credits(
        &mut self,
        account: AccountId,
        bank: &mut dyn ValueTransfer,
    ) -> Result<Amount> {
        let Some(amount) = self.pending.take(account, CreditReason::Commission) else {
            return Ok(0);
        };
        if let Err(err) = bank.send(account, amount) {
            self.pending
                .record(account, CreditReason::Commission, amount);
            return Err(err.into());
        }
        self.events.push(MarketEvent::CreditRedeemed {
            recipient: account,
            amount,
        });
        Ok(amount)
    }

    // =====================================================================
    // Read accessors
    // =====================================================================

    #[must_use]
    pub fn referrer_of(&self, account: AccountId) -> Option<AccountId> {
        self.graph.referrer_of(account)
    }

    #[must_use]
    pub fn rank_of(&self, account: AccountId) -> u8 {
        self.graph.rank_of(account)
    }

    #[must_use]
    pub fn sales_volume_of(&self, account: AccountId) -> Amount {
        self.graph.sales_volume_of(account)
    }

    #[must_use]
    pub fn direct_referrals_of(&self, account: AccountId) -> u32 {
        self.graph.direct_referrals_of(account)
    }

    /// The deferred-credit ledger (read-only).
    #[must_use]
    pub fn pending_credits(&self) -> &PendingCredits {
        &self.pending
    }

    /// Drain the accumulated event journal.
    pub fn take_events(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }
}
