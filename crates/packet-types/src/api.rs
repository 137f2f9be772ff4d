use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Rarity, RewardId};

// -- Signup --

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: String,
    pub message: String,
}

// -- Collection --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    pub name: String,
    pub emoji: String,
    pub rarity: Rarity,
    pub desc: String,
    pub count: u32,
}

/// Keys serialize as strings ("1".."6") since JSON object keys are strings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub collection: BTreeMap<RewardId, CollectionItem>,
    pub completed: bool,
    pub total_monsters: usize,
    pub total_found: u64,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
