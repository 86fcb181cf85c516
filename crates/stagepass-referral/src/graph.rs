//! The referral graph store.
//!
//! An arena keyed by [`AccountId`]: each node holds an optional referrer
//! pointer (the forest edge), the account's rank, and the counters that
//! feed rank eligibility. Accounts are created implicitly on first touch.
//!
//! The referrer pointer is set at most once under normal flow (first
//! attribution wins); re-parenting goes through the authorized override on
//! the engine. Cycle detection walks the prospective parent's ancestor
//! chain for at most `max_depth + 1` hops; a cycle further away than the
//! commission horizon is unreachable by any payout walk.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stagepass_types::{AccountId, Amount, Result, StagepassError};

/// Per-account record in the referral graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountNode {
    /// The account credited with introducing this one. At most one, forms
    /// a forest.
    pub referrer: Option<AccountId>,
    /// Current rank; monotonically non-decreasing except via override.
    pub rank: u8,
    /// Cumulative currency units attributed to this account's referred
    /// sales.
    pub sales_volume: Amount,
    /// Number of accounts whose referrer is this account.
    pub direct_referrals: u32,
}

/// Owned store of referral relationships. Exclusively mutated by the
/// commission engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferralGraph {
    accounts: HashMap<AccountId, AccountNode>,
    max_depth: usize,
}

impl ReferralGraph {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            accounts: HashMap::new(),
            max_depth,
        }
    }

    /// Attribute `child` to `parent` (first attribution wins).
    ///
    /// # Errors
    /// - `AlreadyReferred` if `child` already has a referrer
    /// - `CycleDetected` if `parent` is `child` or a descendant of `child`
    ///   within `max_depth + 1` hops
    pub fn set_referrer(&mut self, child: AccountId, parent: AccountId) -> Result<()> {
        if self.node(child).referrer.is_some() {
            return Err(StagepassError::AlreadyReferred(child));
        }
        self.check_no_cycle(child, parent)?;

        self.accounts.entry(child).or_default().referrer = Some(parent);
        self.accounts.entry(parent).or_default().direct_referrals += 1;
        Ok(())
    }

    /// Re-parent `child` onto `parent`, fixing both parents' counters.
    /// Authorization is the engine's responsibility.
    ///
    /// # Errors
    /// `CycleDetected` under the same rule as [`Self::set_referrer`].
    pub fn reassign_referrer(&mut self, child: AccountId, parent: AccountId) -> Result<()> {
        self.check_no_cycle(child, parent)?;

        let previous = self.node(child).referrer;
        if previous == Some(parent) {
            return Ok(());
        }
        if let Some(old_parent) = previous {
            let node = self.accounts.entry(old_parent).or_default();
            node.direct_referrals = node.direct_referrals.saturating_sub(1);
        }
        self.accounts.entry(child).or_default().referrer = Some(parent);
        self.accounts.entry(parent).or_default().direct_referrals += 1;
        Ok(())
    }

    fn check_no_cycle(&self, child: AccountId, parent: AccountId) -> Result<()> {
        if child == parent {
            return Err(StagepassError::CycleDetected { child, parent });
        }
        // Walk parent's ancestor chain; seeing `child` means `parent` is
        // already below `child`.
        let mut cursor = parent;
        for _ in 0..=self.max_depth {
            match self.node(cursor).referrer {
                Some(ancestor) if ancestor == child => {
                    return Err(StagepassError::CycleDetected { child, parent });
                }
                Some(ancestor) => cursor = ancestor,
                None => break,
            }
        }
        Ok(())
    }

    /// Hops from `account` to the top of its chain (root has depth 0).
    /// Introspection only; commission capping always walks relative to
    /// the buyer via [`Self::ancestors`].
    #[must_use]
    pub fn referral_depth(&self, account: AccountId) -> usize {
        let mut depth = 0;
        let mut cursor = account;
        // The forest invariant makes this finite; the explicit bound makes
        // termination unconditional even on a corrupted store.
        for _ in 0..self.accounts.len() {
            match self.node(cursor).referrer {
                Some(parent) => {
                    depth += 1;
                    cursor = parent;
                }
                None => break,
            }
        }
        depth
    }

    /// The ancestors of `buyer`, closest first, capped at `max_depth`
    /// regardless of actual chain length. A chain shorter than `max_depth`
    /// simply yields fewer entries.
    #[must_use]
    pub fn ancestors(&self, buyer: AccountId) -> Vec<(usize, AccountId)> {
        let mut chain = Vec::new();
        let mut cursor = buyer;
        for depth in 1..=self.max_depth {
            match self.node(cursor).referrer {
                Some(parent) => {
                    chain.push((depth, parent));
                    cursor = parent;
                }
                None => break,
            }
        }
        chain
    }

    /// Add `amount` to `account.sales_volume` (saturating).
    pub fn update_sales_volume(&mut self, account: AccountId, amount: Amount) {
        let node = self.accounts.entry(account).or_default();
        node.sales_volume = node.sales_volume.saturating_add(amount);
    }

    /// Advance `account` by exactly one rank. Eligibility is the engine's
    /// responsibility.
    pub fn bump_rank(&mut self, account: AccountId) -> u8 {
        let node = self.accounts.entry(account).or_default();
        node.rank += 1;
        node.rank
    }

    /// Snapshot of the account's record (zeroed default if never touched).
    #[must_use]
    pub fn node(&self, account: AccountId) -> AccountNode {
        self.accounts.get(&account).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn referrer_of(&self, account: AccountId) -> Option<AccountId> {
        self.node(account).referrer
    }

    #[must_use]
    pub fn rank_of(&self, account: AccountId) -> u8 {
        self.node(account).rank
    }

    #[must_use]
    pub fn sales_volume_of(&self, account: AccountId) -> Amount {
        self.node(account).sales_volume
    }

    #[must_use]
    pub fn direct_referrals_of(&self, account: AccountId) -> u32 {
        self.node(account).direct_referrals
    }

    /// Number of accounts ever touched.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> ReferralGraph {
        ReferralGraph::new(5)
    }

    #[test]
    fn first_attribution_wins() {
        let mut g = graph();
        let child = AccountId::new();
        let parent = AccountId::new();
        let other = AccountId::new();

        g.set_referrer(child, parent).unwrap();
        assert_eq!(g.referrer_of(child), Some(parent));
        assert_eq!(g.direct_referrals_of(parent), 1);

        let err = g.set_referrer(child, other).unwrap_err();
        assert!(matches!(err, StagepassError::AlreadyReferred(a) if a == child));
        // Unchanged.
        assert_eq!(g.referrer_of(child), Some(parent));
        assert_eq!(g.direct_referrals_of(other), 0);
    }

    #[test]
    fn self_referral_is_a_cycle() {
        let mut g = graph();
        let a = AccountId::new();
        let err = g.set_referrer(a, a).unwrap_err();
        assert!(matches!(err, StagepassError::CycleDetected { .. }));
    }

    #[test]
    fn cycle_detected_through_chain() {
        let mut g = graph();
        let a = AccountId::new();
        let b = AccountId::new();
        let c = AccountId::new();
        g.set_referrer(b, a).unwrap();
        g.set_referrer(c, b).unwrap();

        // a <- b <- c; attributing a to c would close the loop.
        let err = g.set_referrer(a, c).unwrap_err();
        assert!(matches!(err, StagepassError::CycleDetected { .. }));
    }

    #[test]
    fn depth_counts_hops_to_root() {
        let mut g = graph();
        let a = AccountId::new();
        let b = AccountId::new();
        let c = AccountId::new();
        g.set_referrer(b, a).unwrap();
        g.set_referrer(c, b).unwrap();

        assert_eq!(g.referral_depth(a), 0);
        assert_eq!(g.referral_depth(b), 1);
        assert_eq!(g.referral_depth(c), 2);
    }

    #[test]
    fn ancestors_capped_at_max_depth() {
        let mut g = ReferralGraph::new(3);
        // Chain of 6: accts[0] is the root.
        let accts: Vec<AccountId> = (0..6).map(|_| AccountId::new()).collect();
        for pair in accts.windows(2) {
            g.set_referrer(pair[1], pair[0]).unwrap();
        }

        let chain = g.ancestors(accts[5]);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0], (1, accts[4]));
        assert_eq!(chain[2], (3, accts[2]));
    }

    #[test]
    fn short_chain_yields_fewer_ancestors() {
        let mut g = graph();
        let a = AccountId::new();
        let b = AccountId::new();
        g.set_referrer(b, a).unwrap();

        assert_eq!(g.ancestors(b), vec![(1, a)]);
        assert!(g.ancestors(a).is_empty());
    }

    #[test]
    fn reassign_fixes_counters() {
        let mut g = graph();
        let child = AccountId::new();
        let old_parent = AccountId::new();
        let new_parent = AccountId::new();
        g.set_referrer(child, old_parent).unwrap();

        g.reassign_referrer(child, new_parent).unwrap();
        assert_eq!(g.referrer_of(child), Some(new_parent));
        assert_eq!(g.direct_referrals_of(old_parent), 0);
        assert_eq!(g.direct_referrals_of(new_parent), 1);
    }

    #[test]
    fn sales_volume_accumulates() {
        let mut g = graph();
        let a = AccountId::new();
        g.update_sales_volume(a, 100);
        g.update_sales_volume(a, 250);
        assert_eq!(g.sales_volume_of(a), 350);
    }

    #[test]
    fn untouched_account_has_zeroed_node() {
        let g = graph();
        let node = g.node(AccountId::new());
        assert_eq!(node, AccountNode::default());
    }
}
