//! System-wide constants for the Stagepass settlement engine.

/// Basis-point denominator: 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default maximum number of ancestors above a buyer that can receive
/// commission, regardless of actual chain length.
pub const DEFAULT_MAX_COMMISSION_DEPTH: usize = 5;

/// Default minimum bid increment over the current highest bid, in minor units.
pub const DEFAULT_MIN_BID_INCREMENT: u64 = 10;

/// Default escrowed fraction of a bid, in basis points (10_000 = full escrow).
pub const DEFAULT_DEPOSIT_BPS: u16 = 10_000;

/// Default period a bid stays locked against withdrawal, in seconds.
pub const DEFAULT_BID_LOCK_SECS: i64 = 300;

/// Default anti-snipe trailing window: a bid landing inside this window
/// resets the countdown to exactly this many seconds.
pub const DEFAULT_EXTENSION_THRESHOLD_SECS: i64 = 600;

/// Default platform commission on auction sales, in basis points (2.5%).
pub const DEFAULT_PLATFORM_COMMISSION_BPS: u16 = 250;

/// Hard cap on `page_size` for paginated read views.
pub const MAX_PAGE_SIZE: usize = 100;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Stagepass";
