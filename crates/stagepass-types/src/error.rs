//! Error types for the Stagepass settlement engine.
//!
//! All errors use the `SP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Referral / commission errors
//! - 2xx: Auction errors
//! - 3xx: Transfer / token collaborator errors
//! - 4xx: Permission errors
//! - 9xx: General / internal errors
//!
//! Rejected-input and precondition failures each get a distinct, stable
//! variant so calling UIs can render specific guidance ("bid too low,
//! minimum is X") instead of a generic failure.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{AccountId, Amount, AuctionId, Capability, ItemRef, TokenError, TransferFailed};

/// Central error enum for all Stagepass operations.
#[derive(Debug, Error)]
pub enum StagepassError {
    // =================================================================
    // Referral / Commission Errors (1xx)
    // =================================================================
    /// The account already has a referrer (first attribution wins).
    #[error("SP_ERR_100: Account {0} already has a referrer")]
    AlreadyReferred(AccountId),

    /// Setting this referrer would make the account its own ancestor.
    #[error("SP_ERR_101: Referral cycle: {parent} is a descendant of {child}")]
    CycleDetected { child: AccountId, parent: AccountId },

    /// The account does not meet the next rank's thresholds.
    #[error("SP_ERR_102: Account {account} not eligible to advance past rank {current_rank}")]
    NotEligible {
        account: AccountId,
        current_rank: u8,
    },

    // =================================================================
    // Auction Errors (2xx)
    // =================================================================
    /// The requested auction does not exist.
    #[error("SP_ERR_200: Auction not found: {0}")]
    AuctionNotFound(AuctionId),

    /// The auction has ended, been cancelled, or its end time has passed.
    #[error("SP_ERR_201: Auction {0} is not active")]
    AuctionNotActive(AuctionId),

    /// The bid does not meet the current minimum.
    #[error("SP_ERR_202: Bid too low: offered {amount}, minimum is {minimum}")]
    BidTooLow { amount: Amount, minimum: Amount },

    /// The leading bid stays committed until outbid or the auction ends.
    #[error("SP_ERR_203: Cannot withdraw the leading bid on {0}")]
    CannotWithdrawLeadingBid(AuctionId),

    /// The caller's most recent bid is still inside its lock period.
    #[error("SP_ERR_204: Bid locked until {unlocks_at}")]
    BidLocked { unlocks_at: DateTime<Utc> },

    /// An auction with committed capital cannot be cancelled by the seller.
    #[error("SP_ERR_205: Auction {0} has bids and cannot be cancelled")]
    HasBids(AuctionId),

    /// The auction cannot be ended before its end time.
    #[error("SP_ERR_206: Auction still ongoing, ends at {ends_at}")]
    StillOngoing { ends_at: DateTime<Utc> },

    /// The caller does not currently hold the item being listed.
    #[error("SP_ERR_207: Account {account} does not hold {item}")]
    NotOwner { account: AccountId, item: ItemRef },

    /// Only the seller may cancel their own auction.
    #[error("SP_ERR_208: Account {account} is not the seller of {auction}")]
    NotSeller {
        account: AccountId,
        auction: AuctionId,
    },

    /// The caller has no escrowed amount to withdraw on this auction.
    #[error("SP_ERR_209: Account {account} has no escrowed bid on {auction}")]
    NoEscrowedBid {
        account: AccountId,
        auction: AuctionId,
    },

    /// No pending item delivery is recorded for this auction.
    #[error("SP_ERR_210: No pending delivery for {0}")]
    NoPendingDelivery(AuctionId),

    // =================================================================
    // Transfer / Token Collaborator Errors (3xx)
    // =================================================================
    /// A native-currency transfer was rejected by the collaborator.
    #[error("SP_ERR_300: {0}")]
    Transfer(#[from] TransferFailed),

    /// An ownership-token operation was rejected by the collaborator.
    #[error("SP_ERR_301: Token operation failed: {0}")]
    Token(#[from] TokenError),

    // =================================================================
    // Permission Errors (4xx)
    // =================================================================
    /// The caller lacks the capability required for this operation.
    #[error("SP_ERR_400: Account {account} lacks capability {capability}")]
    PermissionDenied {
        account: AccountId,
        capability: Capability,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration rejected at construction (bad reward table, etc.).
    #[error("SP_ERR_901: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, StagepassError>;
