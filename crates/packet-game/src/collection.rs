use std::collections::BTreeMap;

use packet_types::api::{CollectionItem, CollectionResponse};
use packet_types::models::CollectionEntry;

use crate::catalog::RewardCatalog;

/// True when every catalog id is present with count >= 1.
pub fn is_complete(catalog: &RewardCatalog, entries: &[CollectionEntry]) -> bool {
    catalog
        .all_ids()
        .iter()
        .all(|id| entries.iter().any(|e| e.reward_id == *id && e.count >= 1))
}

/// Sum of counts; equals the user's ledger row count.
pub fn total_found(entries: &[CollectionEntry]) -> u64 {
    entries.iter().map(|e| u64::from(e.count)).sum()
}

/// Join stored counts with catalog metadata. Rows for ids no longer in the
/// catalog are left out of the view but still count toward `total_found`.
pub fn summarize(catalog: &RewardCatalog, entries: &[CollectionEntry]) -> CollectionResponse {
    let collection: BTreeMap<_, _> = entries
        .iter()
        .filter_map(|entry| {
            let kind = catalog.lookup(entry.reward_id)?;
            Some((
                entry.reward_id,
                CollectionItem {
                    name: kind.name.clone(),
                    emoji: kind.glyph.clone(),
                    rarity: kind.rarity,
                    desc: kind.description.clone(),
                    count: entry.count,
                },
            ))
        })
        .collect();

    CollectionResponse {
        collection,
        completed: is_complete(catalog, entries),
        total_monsters: catalog.monster_count(),
        total_found: total_found(entries),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use packet_types::models::RewardId;

    use super::*;

    fn entry(reward_id: RewardId, count: u32) -> CollectionEntry {
        CollectionEntry {
            user_id: "u".into(),
            reward_id,
            count,
            first_obtained: Utc::now(),
        }
    }

    #[test]
    fn complete_only_with_all_six() {
        let catalog = RewardCatalog::standard();
        let mut entries: Vec<_> = (1..=5).map(|id| entry(id, 2)).collect();
        assert!(!is_complete(&catalog, &entries));

        entries.push(entry(6, 1));
        assert!(is_complete(&catalog, &entries));
    }

    #[test]
    fn empty_collection() {
        let catalog = RewardCatalog::standard();
        let view = summarize(&catalog, &[]);
        assert!(view.collection.is_empty());
        assert!(!view.completed);
        assert_eq!(view.total_monsters, 6);
        assert_eq!(view.total_found, 0);
    }

    #[test]
    fn summary_joins_catalog_metadata() {
        let catalog = RewardCatalog::standard();
        let view = summarize(&catalog, &[entry(2, 3), entry(6, 1), entry(42, 1)]);

        assert_eq!(view.collection.len(), 2);
        let spindle = &view.collection[&2];
        assert_eq!(spindle.name, "Spindle");
        assert_eq!(spindle.count, 3);
        assert_eq!(view.collection[&6].rarity.as_str(), "ultra-rare");
        assert_eq!(view.total_found, 5);
    }
}
