use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use packet_db::Database;
use packet_types::models::GrantOutcome;
use tracing::{debug, info};

use crate::catalog::RewardCatalog;
use crate::error::GrantError;
use crate::roller::RewardRoller;

/// Draws a reward for a user and persists it.
///
/// Order of writes: collection + ledger (one transaction), then the user's
/// `last_reward_at`. A crash between the two leaves the ledger authoritative.
/// Notification is left to the caller.
#[derive(Clone)]
pub struct RewardGrantService {
    db: Arc<Database>,
    catalog: Arc<RewardCatalog>,
    roller: RewardRoller,
}

impl RewardGrantService {
    pub fn new(db: Arc<Database>, catalog: Arc<RewardCatalog>) -> Self {
        let roller = RewardRoller::new(catalog.clone());
        Self { db, catalog, roller }
    }

    pub fn catalog(&self) -> &Arc<RewardCatalog> {
        &self.catalog
    }

    /// Blocking grant. Call from a blocking context or through [`Self::grant`].
    pub fn grant_one(&self, user_id: &str) -> Result<GrantOutcome, GrantError> {
        self.grant_one_until(user_id, None)
    }

    /// Blocking grant that gives up with [`GrantError::Timeout`] if the
    /// writer is not available before `deadline`. Nothing is written in that
    /// case, so a timed-out grant never lands later.
    pub fn grant_one_until(&self, user_id: &str, deadline: Option<Instant>) -> Result<GrantOutcome, GrantError> {
        let user = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| GrantError::UnknownUser(user_id.to_string()))?;

        let reward_id = self.roller.roll();
        let reward = self
            .catalog
            .lookup(reward_id)
            .cloned()
            .ok_or(GrantError::UnknownReward(reward_id))?;

        let granted_at = Utc::now();
        let event_id = match deadline {
            Some(deadline) => self
                .db
                .apply_grant_before(&user.id, reward_id, granted_at, deadline)?
                .ok_or(GrantError::Timeout)?,
            None => self.db.apply_grant(&user.id, reward_id, granted_at)?,
        };
        self.db.touch_last_reward(&user.id, granted_at)?;

        let is_ultra_rare = self.catalog.is_ultra_rare(reward_id);
        if is_ultra_rare {
            info!(user_id = %user.id, event_id, "Ultra-rare {} granted", reward.name);
        } else {
            debug!(user_id = %user.id, event_id, "Granted {}", reward.name);
        }

        Ok(GrantOutcome {
            user_id: user.id,
            email: user.email,
            reward_id,
            reward,
            is_ultra_rare,
            granted_at,
        })
    }

    /// Run [`Self::grant_one`] off the async runtime.
    pub async fn grant(&self, user_id: String) -> Result<GrantOutcome, GrantError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.grant_one(&user_id)).await?
    }

    /// Async grant bounded by `timeout`. The bound is enforced inside the
    /// blocking unit, so the result always reflects what was persisted.
    pub async fn grant_within(&self, user_id: String, timeout: Duration) -> Result<GrantOutcome, GrantError> {
        let service = self.clone();
        let deadline = Instant::now() + timeout;
        tokio::task::spawn_blocking(move || service.grant_one_until(&user_id, Some(deadline))).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Arc<Database>, RewardGrantService) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("game.db")).unwrap());
        let service = RewardGrantService::new(db.clone(), Arc::new(RewardCatalog::standard()));
        (dir, db, service)
    }

    #[test]
    fn grant_persists_collection_ledger_and_timestamp() {
        let (_dir, db, service) = setup();
        let user = db.create_user("a@x.com").unwrap();

        let outcome = service.grant_one(&user.id).unwrap();
        assert_eq!(outcome.email, "a@x.com");
        assert_eq!(outcome.reward.id, outcome.reward_id);
        assert_eq!(outcome.is_ultra_rare, outcome.reward_id == 6);

        let collection = db.get_collection(&user.id).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection[0].reward_id, outcome.reward_id);
        assert_eq!(collection[0].count, 1);

        let events = db.list_grants(&user.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reward_id, outcome.reward_id);

        let stored = db.get_user(&user.id).unwrap().unwrap();
        assert!(stored.last_reward_at.is_some());
    }

    #[test]
    fn unknown_user_is_rejected_without_writes() {
        let (_dir, db, service) = setup();
        let err = service.grant_one("nope").unwrap_err();
        assert!(matches!(err, GrantError::UnknownUser(id) if id == "nope"));
        assert_eq!(db.count_grants("nope").unwrap(), 0);
    }

    #[test]
    fn expired_deadline_is_a_timeout_without_writes() {
        let (_dir, db, service) = setup();
        let user = db.create_user("a@x.com").unwrap();

        let err = service.grant_one_until(&user.id, Some(Instant::now())).unwrap_err();
        assert!(matches!(err, GrantError::Timeout));
        assert_eq!(db.count_grants(&user.id).unwrap(), 0);
        assert!(db.get_user(&user.id).unwrap().unwrap().last_reward_at.is_none());
    }

    #[tokio::test]
    async fn many_grants_keep_totals_consistent() {
        let (_dir, db, service) = setup();
        let user = db.create_user("a@x.com").unwrap();

        for _ in 0..50 {
            service.grant(user.id.clone()).await.unwrap();
        }

        let collection = db.get_collection(&user.id).unwrap();
        assert_eq!(crate::collection::total_found(&collection), 50);
        assert_eq!(db.count_grants(&user.id).unwrap(), 50);
    }
}
