//! Configuration for the commission and auction engines.
//!
//! Both configs are validated at construction; a bad reward table or
//! out-of-range basis points is a [`StagepassError::Configuration`], never
//! a runtime surprise inside a payout walk.

use serde::{Deserialize, Serialize};

use crate::{Amount, Result, StagepassError, constants};

// ---------------------------------------------------------------------------
// Rank thresholds
// ---------------------------------------------------------------------------

/// Thresholds for one rank above 0. Rank `r` is attainable only if **both**
/// thresholds of entry `r - 1` are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRequirement {
    /// Accounts whose referrer is this account.
    pub direct_referrals: u32,
    /// Cumulative sales volume attributed to this account's direct referrals.
    pub sales_volume: Amount,
}

// ---------------------------------------------------------------------------
// Reward table
// ---------------------------------------------------------------------------

/// `max_depth × rank_count` matrix of basis-point reward rates.
///
/// Row `d - 1` holds the rates paid to the ancestor `d` hops above the
/// buyer, one column per rank. Validated invariants:
/// - every rate is at most 10_000 bps
/// - rates are non-increasing across depth (closer referrers earn more)
/// - rates are non-decreasing across rank (higher rank earns more)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTable {
    rates: Vec<Vec<u16>>,
}

impl RewardTable {
    /// Build a validated table. `rates[depth - 1][rank]` is the bps rate.
    pub fn new(rates: Vec<Vec<u16>>) -> Result<Self> {
        if rates.is_empty() {
            return Err(StagepassError::Configuration(
                "reward table must have at least one depth row".into(),
            ));
        }
        let rank_count = rates[0].len();
        if rank_count == 0 {
            return Err(StagepassError::Configuration(
                "reward table must have at least one rank column".into(),
            ));
        }
        for (d, row) in rates.iter().enumerate() {
            if row.len() != rank_count {
                return Err(StagepassError::Configuration(format!(
                    "reward table row {d} has {} columns, expected {rank_count}",
                    row.len()
                )));
            }
            for (r, &rate) in row.iter().enumerate() {
                if u64::from(rate) > constants::BPS_DENOMINATOR {
                    return Err(StagepassError::Configuration(format!(
                        "reward rate at depth {}, rank {r} exceeds 10000 bps",
                        d + 1
                    )));
                }
                if r > 0 && row[r - 1] > rate {
                    return Err(StagepassError::Configuration(format!(
                        "reward rates must be non-decreasing across rank (depth {})",
                        d + 1
                    )));
                }
                if d > 0 && rates[d - 1][r] < rate {
                    return Err(StagepassError::Configuration(format!(
                        "reward rates must be non-increasing across depth (rank {r})"
                    )));
                }
            }
        }
        Ok(Self { rates })
    }

    /// Rate in bps for the ancestor `depth` hops above the buyer at `rank`.
    /// Out-of-range lookups pay nothing.
    #[must_use]
    pub fn rate(&self, depth: usize, rank: u8) -> u16 {
        if depth == 0 {
            return 0;
        }
        self.rates
            .get(depth - 1)
            .and_then(|row| row.get(rank as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Number of depth rows.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.rates.len()
    }

    /// Number of rank columns.
    #[must_use]
    pub fn rank_count(&self) -> usize {
        self.rates[0].len()
    }

    /// The standard 5-depth, 5-rank table used when no custom schedule is
    /// configured.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            rates: vec![
                vec![500, 600, 700, 800, 900],
                vec![300, 400, 500, 600, 700],
                vec![200, 300, 400, 500, 600],
                vec![100, 200, 300, 400, 500],
                vec![50, 100, 150, 200, 250],
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Commission engine config
// ---------------------------------------------------------------------------

/// Configuration snapshot for the commission engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionConfig {
    /// How many ancestors above a buyer may receive commission. Depth is
    /// always measured relative to the purchaser, never a global root.
    pub max_depth: usize,
    /// One entry per rank above 0, in ascending rank order.
    pub rank_requirements: Vec<RankRequirement>,
    /// The depth × rank reward schedule.
    pub reward_table: RewardTable,
}

impl CommissionConfig {
    /// Build a validated config: the table's dimensions must agree with
    /// `max_depth` and the rank ladder.
    pub fn new(
        max_depth: usize,
        rank_requirements: Vec<RankRequirement>,
        reward_table: RewardTable,
    ) -> Result<Self> {
        if max_depth == 0 {
            return Err(StagepassError::Configuration(
                "max_depth must be at least 1".into(),
            ));
        }
        if reward_table.max_depth() < max_depth {
            return Err(StagepassError::Configuration(format!(
                "reward table covers {} depths, max_depth is {max_depth}",
                reward_table.max_depth()
            )));
        }
        if reward_table.rank_count() != rank_requirements.len() + 1 {
            return Err(StagepassError::Configuration(format!(
                "reward table has {} rank columns, rank ladder implies {}",
                reward_table.rank_count(),
                rank_requirements.len() + 1
            )));
        }
        Ok(Self {
            max_depth,
            rank_requirements,
            reward_table,
        })
    }

    /// Standard config: 5 depths, ranks 0-4 with escalating thresholds.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_COMMISSION_DEPTH,
            rank_requirements: vec![
                RankRequirement {
                    direct_referrals: 2,
                    sales_volume: 1_000,
                },
                RankRequirement {
                    direct_referrals: 5,
                    sales_volume: 10_000,
                },
                RankRequirement {
                    direct_referrals: 10,
                    sales_volume: 50_000,
                },
                RankRequirement {
                    direct_referrals: 20,
                    sales_volume: 250_000,
                },
            ],
            reward_table: RewardTable::standard(),
        }
    }

    /// Highest attainable rank (rank 0 plus one per requirement entry).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_rank(&self) -> u8 {
        self.rank_requirements.len() as u8
    }
}

// ---------------------------------------------------------------------------
// Auction engine config
// ---------------------------------------------------------------------------

/// Engine-wide auction defaults, snapshotted into each auction at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// Minimum increment over the current highest bid.
    pub min_bid_increment: Amount,
    /// Escrowed fraction of each bid, in basis points.
    pub deposit_bps: u16,
    /// Seconds a bid stays locked against withdrawal after placement.
    pub bid_lock_secs: i64,
    /// Anti-snipe trailing window in seconds.
    pub extension_threshold_secs: i64,
    /// Platform commission on the winning bid, in basis points.
    pub platform_commission_bps: u16,
}

impl AuctionConfig {
    /// Validate basis-point fields.
    pub fn validate(&self) -> Result<()> {
        if u64::from(self.deposit_bps) > constants::BPS_DENOMINATOR {
            return Err(StagepassError::Configuration(
                "deposit_bps exceeds 10000".into(),
            ));
        }
        if u64::from(self.platform_commission_bps) > constants::BPS_DENOMINATOR {
            return Err(StagepassError::Configuration(
                "platform_commission_bps exceeds 10000".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            min_bid_increment: constants::DEFAULT_MIN_BID_INCREMENT,
            deposit_bps: constants::DEFAULT_DEPOSIT_BPS,
            bid_lock_secs: constants::DEFAULT_BID_LOCK_SECS,
            extension_threshold_secs: constants::DEFAULT_EXTENSION_THRESHOLD_SECS,
            platform_commission_bps: constants::DEFAULT_PLATFORM_COMMISSION_BPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_is_valid() {
        let table = RewardTable::standard();
        RewardTable::new(table.rates.clone()).unwrap();
        assert_eq!(table.max_depth(), 5);
        assert_eq!(table.rank_count(), 5);
    }

    #[test]
    fn rate_lookup() {
        let table = RewardTable::standard();
        assert_eq!(table.rate(1, 0), 500);
        assert_eq!(table.rate(5, 4), 250);
        // Depth 0 and out-of-range lookups pay nothing.
        assert_eq!(table.rate(0, 0), 0);
        assert_eq!(table.rate(6, 0), 0);
        assert_eq!(table.rate(1, 9), 0);
    }

    #[test]
    fn increasing_depth_rejected() {
        let err = RewardTable::new(vec![vec![100], vec![200]]).unwrap_err();
        assert!(matches!(err, StagepassError::Configuration(_)));
    }

    #[test]
    fn decreasing_rank_rejected() {
        let err = RewardTable::new(vec![vec![300, 200]]).unwrap_err();
        assert!(matches!(err, StagepassError::Configuration(_)));
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = RewardTable::new(vec![vec![100, 200], vec![100]]).unwrap_err();
        assert!(matches!(err, StagepassError::Configuration(_)));
    }

    #[test]
    fn commission_config_dimension_check() {
        let table = RewardTable::standard(); // 5 ranks
        let err = CommissionConfig::new(5, vec![], table).unwrap_err();
        assert!(matches!(err, StagepassError::Configuration(_)));
    }

    #[test]
    fn standard_commission_config_is_consistent() {
        let cfg = CommissionConfig::standard();
        assert_eq!(cfg.max_rank(), 4);
        assert_eq!(cfg.reward_table.rank_count(), 5);
        assert!(cfg.reward_table.max_depth() >= cfg.max_depth);
    }

    #[test]
    fn auction_config_defaults_validate() {
        AuctionConfig::default().validate().unwrap();
    }

    #[test]
    fn auction_config_bad_bps_rejected() {
        let cfg = AuctionConfig {
            platform_commission_bps: 10_001,
            ..AuctionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = CommissionConfig::standard();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: CommissionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
