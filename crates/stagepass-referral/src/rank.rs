//! Rank promotion policy.
//!
//! The threshold table gating rank advancement: one [`RankRequirement`]
//! per rank above 0, both thresholds required. Promotion is never
//! automatic: the engine checks this policy only inside an explicit,
//! authorized `rank_up` call, which keeps rank progression auditable.

use serde::{Deserialize, Serialize};

use stagepass_types::RankRequirement;

use crate::graph::AccountNode;

/// Ordered rank ladder. Entry `r - 1` holds the thresholds for rank `r`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankPolicy {
    requirements: Vec<RankRequirement>,
}

impl RankPolicy {
    #[must_use]
    pub fn new(requirements: Vec<RankRequirement>) -> Self {
        Self { requirements }
    }

    /// Highest attainable rank.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_rank(&self) -> u8 {
        self.requirements.len() as u8
    }

    /// Thresholds for attaining `rank`, if such a rank exists.
    #[must_use]
    pub fn requirement_for(&self, rank: u8) -> Option<&RankRequirement> {
        if rank == 0 {
            return None;
        }
        self.requirements.get(rank as usize - 1)
    }

    /// Pure predicate: can this account advance to the next rank right now?
    /// False at the top of the ladder.
    #[must_use]
    pub fn is_eligible(&self, node: &AccountNode) -> bool {
        let Some(next) = node.rank.checked_add(1) else {
            return false;
        };
        let Some(req) = self.requirement_for(next) else {
            return false;
        };
        node.direct_referrals >= req.direct_referrals && node.sales_volume >= req.sales_volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RankPolicy {
        RankPolicy::new(vec![
            RankRequirement {
                direct_referrals: 2,
                sales_volume: 1_000,
            },
            RankRequirement {
                direct_referrals: 5,
                sales_volume: 10_000,
            },
        ])
    }

    fn node(rank: u8, referrals: u32, volume: u64) -> AccountNode {
        AccountNode {
            referrer: None,
            rank,
            sales_volume: volume,
            direct_referrals: referrals,
        }
    }

    #[test]
    fn both_thresholds_required() {
        let p = policy();
        assert!(p.is_eligible(&node(0, 2, 1_000)));
        assert!(!p.is_eligible(&node(0, 2, 999)));
        assert!(!p.is_eligible(&node(0, 1, 1_000_000)));
    }

    #[test]
    fn eligibility_tracks_current_rank() {
        let p = policy();
        // Rank 1 -> 2 needs the second entry.
        assert!(p.is_eligible(&node(1, 5, 10_000)));
        assert!(!p.is_eligible(&node(1, 2, 1_000)));
    }

    #[test]
    fn max_rank_is_never_eligible() {
        let p = policy();
        assert_eq!(p.max_rank(), 2);
        assert!(!p.is_eligible(&node(2, 100, 1_000_000)));
    }

    #[test]
    fn requirement_lookup() {
        let p = policy();
        assert!(p.requirement_for(0).is_none());
        assert_eq!(p.requirement_for(1).unwrap().direct_referrals, 2);
        assert!(p.requirement_for(3).is_none());
    }
}
