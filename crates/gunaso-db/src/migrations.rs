use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL,
            city        TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS complaints (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL,
            category        TEXT NOT NULL,
            city            TEXT NOT NULL,
            lat             REAL NOT NULL,
            lng             REAL NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending',
            urgency         TEXT NOT NULL DEFAULT 'medium',
            images          TEXT NOT NULL DEFAULT '[]',
            upvote_count    INTEGER NOT NULL DEFAULT 0,
            created_by      TEXT NOT NULL REFERENCES users(id),
            assigned_to     TEXT REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_complaints_city
            ON complaints(city, created_at);

        CREATE INDEX IF NOT EXISTS idx_complaints_location
            ON complaints(lat, lng);

        -- No UNIQUE(complaint_id, user_id): duplicate verifications from the
        -- same user are allowed. The has-verified check is existence-only.
        CREATE TABLE IF NOT EXISTS verifications (
            id              TEXT PRIMARY KEY,
            complaint_id    TEXT NOT NULL REFERENCES complaints(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            is_resolved     INTEGER NOT NULL,
            comment         TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_verifications_complaint
            ON verifications(complaint_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
