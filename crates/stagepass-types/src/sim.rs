//! In-memory collaborator implementations for tests.
//!
//! These stand in for the external value-transfer, ownership-token, and
//! authorization systems. The bank can be told to reject specific
//! recipients, which is how tests exercise the deferred-credit paths.

use std::collections::{HashMap, HashSet};

use crate::{
    AccountId, Amount, Capability, CapabilityGate, ItemRef, OwnershipToken, TokenError,
    TransferFailed, ValueTransfer,
};

// ---------------------------------------------------------------------------
// InMemoryBank
// ---------------------------------------------------------------------------

/// Records every successful send; configurable per-recipient rejection.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    received: HashMap<AccountId, Amount>,
    rejecting: HashSet<AccountId>,
}

impl InMemoryBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future send to `account` fail.
    pub fn reject(&mut self, account: AccountId) {
        self.rejecting.insert(account);
    }

    /// Make sends to `account` succeed again.
    pub fn accept(&mut self, account: AccountId) {
        self.rejecting.remove(&account);
    }

    /// Total successfully delivered to `account`.
    #[must_use]
    pub fn received(&self, account: AccountId) -> Amount {
        self.received.get(&account).copied().unwrap_or(0)
    }

    /// Sum delivered across all accounts.
    #[must_use]
    pub fn total_received(&self) -> Amount {
        self.received.values().sum()
    }
}

impl ValueTransfer for InMemoryBank {
    fn send(&mut self, to: AccountId, amount: Amount) -> Result<(), TransferFailed> {
        if self.rejecting.contains(&to) {
            return Err(TransferFailed { to, amount });
        }
        *self.received.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryToken
// ---------------------------------------------------------------------------

/// Holdings map plus a set of owners who approved the engine as operator.
#[derive(Debug, Default)]
pub struct InMemoryToken {
    holdings: HashMap<(AccountId, ItemRef), u64>,
    approved: HashSet<AccountId>,
}

impl InMemoryToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `qty` units of `item` to `account` and approve transfers out
    /// of it (the common test setup).
    pub fn mint(&mut self, account: AccountId, item: ItemRef, qty: u64) {
        *self.holdings.entry((account, item)).or_insert(0) += qty;
        self.approved.insert(account);
    }

    /// Approve transfers out of `account` without minting.
    pub fn approve(&mut self, account: AccountId) {
        self.approved.insert(account);
    }

    /// Withdraw the operator approval for `account`.
    pub fn revoke_approval(&mut self, account: AccountId) {
        self.approved.remove(&account);
    }
}

impl OwnershipToken for InMemoryToken {
    fn balance_of(&self, account: AccountId, item: ItemRef) -> u64 {
        self.holdings.get(&(account, item)).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        item: ItemRef,
        qty: u64,
    ) -> Result<(), TokenError> {
        if !self.approved.contains(&from) {
            return Err(TokenError::NotApproved);
        }
        let held = self.balance_of(from, item);
        if held < qty {
            return Err(TokenError::InsufficientBalance);
        }
        *self.holdings.entry((from, item)).or_insert(0) -= qty;
        *self.holdings.entry((to, item)).or_insert(0) += qty;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticGate
// ---------------------------------------------------------------------------

/// Capability gate backed by an explicit grant set.
#[derive(Debug, Default)]
pub struct StaticGate {
    grants: HashSet<(AccountId, Capability)>,
}

impl StaticGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, account: AccountId, capability: Capability) {
        self.grants.insert((account, capability));
    }
}

impl CapabilityGate for StaticGate {
    fn has_capability(&self, account: AccountId, capability: Capability) -> bool {
        self.grants.contains(&(account, capability))
    }
}
