use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric catalog id of a reward kind.
pub type RewardId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// 32 hex chars drawn from a CSPRNG at signup.
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_reward_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rarity {
    Common,
    UltraRare,
}

impl Rarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::UltraRare => "ultra-rare",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardKind {
    pub id: RewardId,
    pub name: String,
    pub glyph: String,
    pub rarity: Rarity,
    pub description: String,
    /// Probability of this kind per draw, derived from rarity by the catalog.
    pub weight: f64,
}

/// Aggregated ownership of one reward kind by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub user_id: String,
    pub reward_id: RewardId,
    pub count: u32,
    pub first_obtained: DateTime<Utc>,
}

/// Ledger row. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantEvent {
    pub id: i64,
    pub user_id: String,
    pub reward_id: RewardId,
    pub sent_at: DateTime<Utc>,
}

/// Result of a single persisted grant, handed to the notifier by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantOutcome {
    pub user_id: String,
    pub email: String,
    pub reward_id: RewardId,
    pub reward: RewardKind,
    pub is_ultra_rare: bool,
    pub granted_at: DateTime<Utc>,
}
