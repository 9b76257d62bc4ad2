//! Referral edges (`referrals`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProfileId, ReferralId};

/// A referrer-to-referred link. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub referrer_id: ProfileId,
    pub referred_id: ProfileId,
    pub referral_code: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
