//! Reward milestones and claims (`reward_milestones`, `reward_claims`).
//!
//! Both are owned and transitioned by the backend; the storefront only
//! displays them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ClaimId, MilestoneId, Money, ProfileId, RewardStatus};

/// A reward target (referral count, sales count or customer count).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardMilestone {
    pub id: MilestoneId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_referrals: Option<i32>,
    #[serde(default)]
    pub target_sales: Option<i32>,
    #[serde(default)]
    pub target_customers: Option<i32>,
    #[serde(default)]
    pub reward_amount: Option<Money>,
    #[serde(default)]
    pub reward_type: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RewardMilestone {
    /// Progress towards the referral target, as `(achieved, target)`.
    ///
    /// `None` when the milestone has no referral target.
    #[must_use]
    pub fn referral_progress(&self, referral_count: usize) -> Option<(usize, usize)> {
        let target = usize::try_from(self.target_referrals?).ok()?;
        Some((referral_count.min(target), target))
    }
}

/// A user's claim against a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardClaim {
    pub id: ClaimId,
    /// Claimant profile.
    pub user_id: ProfileId,
    pub milestone_id: MilestoneId,
    #[serde(default)]
    pub status: Option<RewardStatus>,
    #[serde(default)]
    pub proof_url: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_progress_caps_at_target() {
        let milestone: RewardMilestone = serde_json::from_value(serde_json::json!({
            "id": MilestoneId::random(),
            "title": "Ten friends",
            "target_referrals": 10,
            "reward_amount": 1000
        }))
        .unwrap();
        assert_eq!(milestone.referral_progress(3), Some((3, 10)));
        assert_eq!(milestone.referral_progress(14), Some((10, 10)));
    }

    #[test]
    fn test_referral_progress_without_target() {
        let milestone: RewardMilestone = serde_json::from_value(serde_json::json!({
            "id": MilestoneId::random(),
            "title": "Big seller",
            "target_sales": 50
        }))
        .unwrap();
        assert_eq!(milestone.referral_progress(3), None);
    }
}
