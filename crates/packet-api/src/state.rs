use std::sync::Arc;

use packet_db::Database;
use packet_game::{Notifier, RewardCatalog, RewardGrantService};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub catalog: Arc<RewardCatalog>,
    pub grants: RewardGrantService,
    pub notifier: Arc<dyn Notifier>,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, catalog: Arc<RewardCatalog>, notifier: Arc<dyn Notifier>) -> AppState {
        let grants = RewardGrantService::new(db.clone(), catalog.clone());
        Arc::new(Self {
            db,
            catalog,
            grants,
            notifier,
        })
    }
}
