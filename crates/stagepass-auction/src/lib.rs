//! # stagepass-auction
//!
//! Auction ledger and timed English auction state machine.
//!
//! ## Architecture
//!
//! - [`AuctionLedger`] owns the auction records and the append-only bid
//!   history, and serves the paginated read views. No other component
//!   mutates it.
//! - [`AuctionEngine`] is the state machine over the ledger: bid
//!   admission, refunds, anti-snipe extension, cancellation, and
//!   three-leg settlement.
//!
//! States: `Created → Active → {Ended(Sale) | Ended(NoSale) | Cancelled}`.
//! `Created` and `Active` differ only by the clock; transitions out of
//! `Active` are terminal, and a terminal record is immutable.
//!
//! Auctions are independent of one another; the exclusive borrow on the
//! engine is the serialization point for all of them. Every currency leg
//! that fails against an untrusted recipient is recorded in the
//! deferred-credit ledger instead of rolling back the state transition
//! that triggered it.

pub mod engine;
pub mod ledger;

pub use engine::AuctionEngine;
pub use ledger::{Auction, AuctionLedger, Bid, Page};
