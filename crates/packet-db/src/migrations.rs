use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, collections, grant_events)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                created_at      TEXT NOT NULL,
                last_reward_at  TEXT
            );

            CREATE TABLE collections (
                user_id         TEXT NOT NULL REFERENCES users(id),
                reward_id       INTEGER NOT NULL,
                count           INTEGER NOT NULL DEFAULT 1 CHECK (count >= 1),
                first_obtained  TEXT NOT NULL,
                PRIMARY KEY (user_id, reward_id)
            );

            CREATE TABLE grant_events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES users(id),
                reward_id   INTEGER NOT NULL,
                sent_at     TEXT NOT NULL
            );

            CREATE INDEX idx_grant_events_user
                ON grant_events(user_id, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
