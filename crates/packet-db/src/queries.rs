use std::time::Instant;

use chrono::{DateTime, Utc};
use packet_types::models::{CollectionEntry, GrantEvent, RewardId, User};
use rand::RngCore;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use crate::{Database, DbError, Result};

/// Random bytes behind a user identity (128 bits).
const USER_ID_BYTES: usize = 16;

const UPSERT_COLLECTION: &str = "INSERT INTO collections (user_id, reward_id, count, first_obtained)
     VALUES (?1, ?2, 1, ?3)
     ON CONFLICT(user_id, reward_id) DO UPDATE SET count = count + 1";

const INSERT_GRANT_EVENT: &str =
    "INSERT INTO grant_events (user_id, reward_id, sent_at) VALUES (?1, ?2, ?3)";

impl Database {
    // -- Users --

    /// Register a new user. Emails are compared case-insensitively.
    pub fn create_user(&self, email: &str) -> Result<User> {
        let user = User {
            id: generate_user_id(),
            email: normalize_email(email),
            created_at: Utc::now(),
            last_reward_at: None,
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
                (&user.id, &user.email, user.created_at),
            )
            .map_err(|e| {
                if DbError::is_unique_violation(&e) {
                    DbError::DuplicateEmail
                } else {
                    DbError::Sqlite(e)
                }
            })?;
            Ok(())
        })?;

        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Set `last_reward_at`. Silently does nothing for an unknown id.
    pub fn touch_last_reward(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_reward_at = ?1 WHERE id = ?2",
                (at, id),
            )?;
            Ok(())
        })
    }

    /// Snapshot of every user, oldest first. Users inserted after the
    /// statement starts are not part of the result.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, created_at, last_reward_at FROM users
                 ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(u64::try_from(n).unwrap_or_default())
        })
    }

    // -- Collections --

    /// Insert with count = 1 or bump the existing count, in one statement.
    pub fn grant_reward(&self, user_id: &str, reward_id: RewardId, at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(UPSERT_COLLECTION, (user_id, reward_id, at))?;
            Ok(())
        })
    }

    pub fn get_collection(&self, user_id: &str) -> Result<Vec<CollectionEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, reward_id, count, first_obtained FROM collections
                 WHERE user_id = ?1
                 ORDER BY reward_id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(CollectionEntry {
                        user_id: row.get(0)?,
                        reward_id: row.get(1)?,
                        count: row.get(2)?,
                        first_obtained: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Ledger --

    /// Append a grant event and return its id.
    pub fn record_grant(&self, user_id: &str, reward_id: RewardId, sent_at: DateTime<Utc>) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(INSERT_GRANT_EVENT, (user_id, reward_id, sent_at))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn count_grants(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM grant_events WHERE user_id = ?1",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(u64::try_from(n).unwrap_or_default())
        })
    }

    pub fn list_grants(&self, user_id: &str) -> Result<Vec<GrantEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, reward_id, sent_at FROM grant_events
                 WHERE user_id = ?1
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(GrantEvent {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        reward_id: row.get(2)?,
                        sent_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Grants --

    /// Collection upsert and ledger append in one IMMEDIATE transaction.
    /// Returns the ledger event id. `last_reward_at` is left to the caller
    /// so the ledger is always written first.
    pub fn apply_grant(&self, user_id: &str, reward_id: RewardId, at: DateTime<Utc>) -> Result<i64> {
        self.with_conn_mut(|conn| insert_grant(conn, user_id, reward_id, at))
    }

    /// Like [`Self::apply_grant`], but writes nothing and returns `None` if
    /// the writer only became available after `deadline`.
    pub fn apply_grant_before(
        &self,
        user_id: &str,
        reward_id: RewardId,
        at: DateTime<Utc>,
        deadline: Instant,
    ) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            if Instant::now() >= deadline {
                return Ok(None);
            }
            insert_grant(conn, user_id, reward_id, at).map(Some)
        })
    }
}

fn insert_grant(conn: &mut Connection, user_id: &str, reward_id: RewardId, at: DateTime<Utc>) -> Result<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(UPSERT_COLLECTION, (user_id, reward_id, at))?;
    tx.execute(INSERT_GRANT_EVENT, (user_id, reward_id, at))?;
    let event_id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(event_id)
}

fn query_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    let mut stmt =
        conn.prepare("SELECT id, email, created_at, last_reward_at FROM users WHERE id = ?1")?;
    let row = stmt.query_row([id], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: row.get(2)?,
        last_reward_at: row.get(3)?,
    })
}

fn generate_user_id() -> String {
    // ThreadRng is a CSPRNG reseeded from the OS.
    let mut bytes = [0u8; USER_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn user_ids_are_random_hex() {
        let a = generate_user_id();
        let b = generate_user_id();
        assert_eq!(a.len(), USER_ID_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn create_and_fetch_user() {
        let (_dir, db) = open_temp();
        let user = db.create_user("  A@X.com ").unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(user.last_reward_at.is_none());

        let fetched = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.email, "a@x.com");
        assert!(db.get_user("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (_dir, db) = open_temp();
        db.create_user("a@x.com").unwrap();
        let err = db.create_user("A@x.com").unwrap_err();
        assert!(matches!(err, DbError::DuplicateEmail));
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn touch_last_reward_updates_and_ignores_unknown() {
        let (_dir, db) = open_temp();
        let user = db.create_user("a@x.com").unwrap();
        let now = Utc::now();
        db.touch_last_reward(&user.id, now).unwrap();
        db.touch_last_reward("nobody", now).unwrap();

        let fetched = db.get_user(&user.id).unwrap().unwrap();
        let stamped = fetched.last_reward_at.unwrap();
        assert!((stamped - now).num_milliseconds().abs() < 5);
    }

    #[test]
    fn repeated_grant_increments_single_row() {
        let (_dir, db) = open_temp();
        let user = db.create_user("a@x.com").unwrap();
        let first = Utc::now();

        db.apply_grant(&user.id, 3, first).unwrap();
        db.apply_grant(&user.id, 3, first + chrono::Duration::days(1)).unwrap();

        let collection = db.get_collection(&user.id).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection[0].count, 2);
        assert!((collection[0].first_obtained - first).num_milliseconds().abs() < 5);
        assert_eq!(db.count_grants(&user.id).unwrap(), 2);
    }

    #[test]
    fn standalone_upsert_and_ledger() {
        let (_dir, db) = open_temp();
        let user = db.create_user("a@x.com").unwrap();
        let now = Utc::now();

        db.grant_reward(&user.id, 1, now).unwrap();
        db.grant_reward(&user.id, 1, now).unwrap();
        db.grant_reward(&user.id, 2, now).unwrap();
        let first = db.record_grant(&user.id, 1, now).unwrap();
        let second = db.record_grant(&user.id, 2, now).unwrap();
        assert!(second > first);

        let collection = db.get_collection(&user.id).unwrap();
        assert_eq!(collection.iter().map(|e| e.reward_id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(collection[0].count, 2);

        let events = db.list_grants(&user.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, first);
        assert_eq!(events[1].reward_id, 2);
    }

    #[test]
    fn expired_deadline_writes_nothing() {
        let (_dir, db) = open_temp();
        let user = db.create_user("a@x.com").unwrap();

        let late = db.apply_grant_before(&user.id, 1, Utc::now(), Instant::now()).unwrap();
        assert!(late.is_none());
        assert!(db.get_collection(&user.id).unwrap().is_empty());
        assert_eq!(db.count_grants(&user.id).unwrap(), 0);

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let id = db.apply_grant_before(&user.id, 1, Utc::now(), deadline).unwrap();
        assert!(id.is_some());
        assert_eq!(db.count_grants(&user.id).unwrap(), 1);
    }

    #[test]
    fn grant_for_unknown_user_violates_foreign_key() {
        let (_dir, db) = open_temp();
        let err = db.apply_grant("ghost", 1, Utc::now()).unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
        assert_eq!(db.count_grants("ghost").unwrap(), 0);
    }

    #[test]
    fn list_users_is_ordered_snapshot() {
        let (_dir, db) = open_temp();
        let a = db.create_user("a@x.com").unwrap();
        let b = db.create_user("b@x.com").unwrap();
        let users = db.list_users().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].created_at <= users[1].created_at);

        let mut ids: Vec<_> = users.into_iter().map(|u| u.id).collect();
        let mut expected = vec![a.id, b.id];
        ids.sort();
        expected.sort();
        assert_eq!(ids, expected);
    }
}
