use std::collections::BTreeMap;

use packet_types::models::{Rarity, RewardId, RewardKind};

use crate::error::CatalogError;

/// Draw space of the roller. One slot of it belongs to the ultra-rare kind.
pub const ROLL_SPACE: u32 = 1000;
pub const ULTRA_RARE_SLOTS: u32 = 1;

/// Immutable id -> kind registry. Build once and share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RewardCatalog {
    kinds: BTreeMap<RewardId, RewardKind>,
    ultra_rare: RewardId,
    commons: Vec<RewardId>,
}

impl RewardCatalog {
    /// Build a catalog, recomputing each kind's weight from its rarity.
    pub fn new(kinds: impl IntoIterator<Item = RewardKind>) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for kind in kinds {
            let id = kind.id;
            if map.insert(id, kind).is_some() {
                return Err(CatalogError::DuplicateId(id));
            }
        }

        let ultra: Vec<RewardId> = map
            .values()
            .filter(|k| k.rarity == Rarity::UltraRare)
            .map(|k| k.id)
            .collect();
        let commons: Vec<RewardId> = map
            .values()
            .filter(|k| k.rarity == Rarity::Common)
            .map(|k| k.id)
            .collect();

        if ultra.len() != 1 {
            return Err(CatalogError::UltraRareCount(ultra.len()));
        }
        if commons.is_empty() {
            return Err(CatalogError::NoCommon);
        }

        let ultra_weight = f64::from(ULTRA_RARE_SLOTS) / f64::from(ROLL_SPACE);
        let common_weight = (1.0 - ultra_weight) / commons.len() as f64;
        for kind in map.values_mut() {
            kind.weight = match kind.rarity {
                Rarity::UltraRare => ultra_weight,
                Rarity::Common => common_weight,
            };
        }

        Ok(Self {
            kinds: map,
            ultra_rare: ultra[0],
            commons,
        })
    }

    /// The six monsters the service ships with.
    pub fn standard() -> Self {
        let kinds = [
            (1, "Blobby", "\u{1F7E6}", Rarity::Common, "A geometric dreamer"),
            (2, "Spindle", "\u{1F300}", Rarity::Common, "Ever rotating"),
            (3, "Gloop", "\u{1FAE7}", Rarity::Common, "Bouncy & buoyant"),
            (4, "Whisper", "\u{1F47B}", Rarity::Common, "Soft & spectral"),
            (5, "Zinger", "\u{26A1}", Rarity::Common, "Pure energy"),
            (6, "Arcana", "\u{2728}", Rarity::UltraRare, "The legendary one"),
        ]
        .into_iter()
        .map(|(id, name, glyph, rarity, description)| RewardKind {
            id,
            name: name.to_string(),
            glyph: glyph.to_string(),
            rarity,
            description: description.to_string(),
            weight: 0.0,
        });

        match Self::new(kinds) {
            Ok(catalog) => catalog,
            Err(e) => unreachable!("built-in catalog is valid: {e}"),
        }
    }

    pub fn lookup(&self, id: RewardId) -> Option<&RewardKind> {
        self.kinds.get(&id)
    }

    /// Ids in ascending order.
    pub fn all_ids(&self) -> Vec<RewardId> {
        self.kinds.keys().copied().collect()
    }

    pub fn monster_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn ultra_rare_id(&self) -> RewardId {
        self.ultra_rare
    }

    pub fn common_ids(&self) -> &[RewardId] {
        &self.commons
    }

    pub fn is_ultra_rare(&self, id: RewardId) -> bool {
        id == self.ultra_rare
    }
}
