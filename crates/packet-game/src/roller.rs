use std::sync::Arc;

use packet_types::models::RewardId;
use rand::Rng;

use crate::catalog::{ROLL_SPACE, RewardCatalog, ULTRA_RARE_SLOTS};

/// Two-stage draw: a 1-in-1000 slot for the ultra-rare kind, otherwise a
/// uniform pick among the common kinds.
#[derive(Debug, Clone)]
pub struct RewardRoller {
    catalog: Arc<RewardCatalog>,
}

impl RewardRoller {
    pub fn new(catalog: Arc<RewardCatalog>) -> Self {
        Self { catalog }
    }

    pub fn roll(&self) -> RewardId {
        self.roll_with(&mut rand::rng())
    }

    pub fn roll_with<R: Rng + ?Sized>(&self, rng: &mut R) -> RewardId {
        if rng.random_range(0..ROLL_SPACE) < ULTRA_RARE_SLOTS {
            return self.catalog.ultra_rare_id();
        }
        let commons = self.catalog.common_ids();
        commons[rng.random_range(0..commons.len())]
    }
}
