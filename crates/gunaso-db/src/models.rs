/// Database row types — these map directly to SQLite rows.
/// Distinct from the gunaso-types API models to keep the DB layer independent.
use chrono::{DateTime, Utc};
use tracing::warn;

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub city: Option<String>,
    pub created_at: String,
}

/// Insert payload for a fresh complaint. Status, upvote count, assignment
/// and timestamps all come from column defaults.
pub struct NewComplaint {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub lat: f64,
    pub lng: f64,
    pub urgency: String,
    /// JSON array of image URLs.
    pub images: String,
    pub created_by: String,
}

#[derive(Debug)]
pub struct ComplaintRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub lat: f64,
    pub lng: f64,
    pub status: String,
    pub urgency: String,
    /// JSON array of image URLs, stored as text.
    pub images: String,
    pub upvote_count: i64,
    pub created_by: String,
    pub created_by_name: String,
    pub created_by_email: String,
    pub assigned_to: Option<String>,
    pub assigned_to_name: Option<String>,
    pub assigned_to_email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct VerificationRow {
    pub id: String,
    pub complaint_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub is_resolved: bool,
    pub comment: Option<String>,
    pub created_at: String,
}

/// Parse a SQLite timestamp column. SQLite's datetime('now') emits
/// "YYYY-MM-DD HH:MM:SS" without a timezone; treat it as naive UTC.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
