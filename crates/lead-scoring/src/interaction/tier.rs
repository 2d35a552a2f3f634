use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered lead-quality classification derived from the total score.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    #[default]
    Browser,
    Engaged,
    SoftMember,
    HotLead,
}

/// Lowest total for each tier, in ascending order. Ranges are contiguous by construction.
const TIER_FLOORS: [(Tier, i32); 4] = [
    (Tier::Browser, i32::MIN),
    (Tier::Engaged, 26),
    (Tier::SoftMember, 76),
    (Tier::HotLead, 151),
];

impl Tier {
    pub fn from_score(total: i32) -> Self {
        TIER_FLOORS
            .iter()
            .rev()
            .find(|(_, floor)| total >= *floor)
            .map(|(tier, _)| *tier)
            .unwrap_or(Tier::Browser)
    }

    /// Minimum total required to sit in this tier.
    pub fn floor(self) -> i32 {
        TIER_FLOORS
            .iter()
            .find(|(tier, _)| *tier == self)
            .map(|(_, floor)| *floor)
            .unwrap_or(i32::MIN)
    }

    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Browser => Some(Tier::Engaged),
            Tier::Engaged => Some(Tier::SoftMember),
            Tier::SoftMember => Some(Tier::HotLead),
            Tier::HotLead => None,
        }
    }

    /// Points still needed to reach the next tier, `None` at the top tier.
    pub fn points_to_next(total: i32) -> Option<i32> {
        Tier::from_score(total)
            .next()
            .map(|next| next.floor().saturating_sub(total).max(0))
    }

    pub const fn label(self) -> &'static str {
        match self {
            Tier::Browser => "browser",
            Tier::Engaged => "engaged",
            Tier::SoftMember => "soft-member",
            Tier::HotLead => "hot-lead",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
