use crate::Database;
use crate::models::{ComplaintRow, NewComplaint, UserRow, VerificationRow};
use anyhow::Result;
use rusqlite::Connection;

const COMPLAINT_SELECT: &str = "SELECT c.id, c.title, c.description, c.category, c.city, c.lat, c.lng,
            c.status, c.urgency, c.images, c.upvote_count, c.created_by, c.assigned_to,
            c.created_at, c.updated_at,
            cu.name, cu.email, au.name, au.email
     FROM complaints c
     LEFT JOIN users cu ON c.created_by = cu.id
     LEFT JOIN users au ON c.assigned_to = au.id";

const VERIFICATION_SELECT: &str = "SELECT v.id, v.complaint_id, v.user_id, u.name, u.email,
            v.is_resolved, v.comment, v.created_at
     FROM verifications v
     LEFT JOIN users u ON v.user_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
        city: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, city) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, name, email, password_hash, role, city],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Complaints --

    pub fn insert_complaint(&self, new: &NewComplaint) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO complaints (id, title, description, category, city, lat, lng, urgency, images, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    new.id,
                    new.title,
                    new.description,
                    new.category,
                    new.city,
                    new.lat,
                    new.lng,
                    new.urgency,
                    new.images,
                    new.created_by,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_complaint(&self, id: &str) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| query_complaint_by_id(conn, id))
    }

    /// City listing with optional status/category/urgency filters,
    /// newest first.
    pub fn list_complaints_by_city(
        &self,
        city: &str,
        status: Option<&str>,
        category: Option<&str>,
        urgency: Option<&str>,
    ) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let mut sql = format!("{COMPLAINT_SELECT} WHERE c.city = ?1");
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&city];

            if let Some(s) = &status {
                sql.push_str(&format!(" AND c.status = ?{}", params.len() + 1));
                params.push(s);
            }
            if let Some(c) = &category {
                sql.push_str(&format!(" AND c.category = ?{}", params.len() + 1));
                params.push(c);
            }
            if let Some(u) = &urgency {
                sql.push_str(&format!(" AND c.urgency = ?{}", params.len() + 1));
                params.push(u);
            }
            sql.push_str(" ORDER BY c.created_at DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), map_complaint)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All complaints inside a lat/lng bounding box. Callers compute the box;
    /// this is a plain range scan over the (lat, lng) index.
    pub fn list_complaints_in_box(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lng: f64,
        max_lng: f64,
    ) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{COMPLAINT_SELECT}
                 WHERE c.lat >= ?1 AND c.lat <= ?2 AND c.lng >= ?3 AND c.lng <= ?4
                 ORDER BY c.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![min_lat, max_lat, min_lng, max_lng], map_complaint)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Atomic single-statement increment; returns the updated row, or None if
    /// the complaint does not exist.
    pub fn upvote_complaint(&self, id: &str) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE complaints
                 SET upvote_count = upvote_count + 1, updated_at = datetime('now')
                 WHERE id = ?1",
                [id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_complaint_by_id(conn, id)
        })
    }

    /// Authority status update. The COALESCE keeps the first authority to
    /// touch the complaint as its permanent assignee.
    pub fn set_complaint_status(
        &self,
        id: &str,
        status: &str,
        authority_id: &str,
    ) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE complaints
                 SET status = ?1, assigned_to = COALESCE(assigned_to, ?2), updated_at = datetime('now')
                 WHERE id = ?3",
                rusqlite::params![status, authority_id, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_complaint_by_id(conn, id)
        })
    }

    /// Promotion path: sets status without touching assigned_to.
    pub fn mark_complaint_verified(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE complaints SET status = 'verified', updated_at = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    // -- Verifications --

    pub fn insert_verification(
        &self,
        id: &str,
        complaint_id: &str,
        user_id: &str,
        is_resolved: bool,
        comment: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO verifications (id, complaint_id, user_id, is_resolved, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, complaint_id, user_id, is_resolved, comment],
            )?;
            Ok(())
        })
    }

    /// Single verification as stored, enriched with its author. Used to echo
    /// back exactly what a later listing will report.
    pub fn get_verification(&self, id: &str) -> Result<Option<VerificationRow>> {
        self.with_conn(|conn| {
            let sql = format!("{VERIFICATION_SELECT} WHERE v.id = ?1");
            let mut stmt = conn.prepare(&sql)?;

            let row = stmt.query_row([id], map_verification).optional()?;
            Ok(row)
        })
    }

    pub fn list_verifications(&self, complaint_id: &str) -> Result<Vec<VerificationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{VERIFICATION_SELECT} WHERE v.complaint_id = ?1 ORDER BY v.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([complaint_id], map_verification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_resolved_verifications(&self, complaint_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM verifications WHERE complaint_id = ?1 AND is_resolved = 1",
                [complaint_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Existence check only: any verification row counts, regardless of its
    /// is_resolved value, and duplicates are indistinguishable from one.
    pub fn has_verified(&self, complaint_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM verifications WHERE complaint_id = ?1 AND user_id = ?2)",
                [complaint_id, user_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column is always a compile-time constant, never user input
    let sql = format!(
        "SELECT id, name, email, password, role, city, created_at FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                city: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_complaint_by_id(conn: &Connection, id: &str) -> Result<Option<ComplaintRow>> {
    let sql = format!("{COMPLAINT_SELECT} WHERE c.id = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt.query_row([id], map_complaint).optional()?;
    Ok(row)
}

fn map_verification(row: &rusqlite::Row) -> rusqlite::Result<VerificationRow> {
    Ok(VerificationRow {
        id: row.get(0)?,
        complaint_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get::<_, Option<String>>(3)?.unwrap_or_else(|| "unknown".to_string()),
        user_email: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        is_resolved: row.get(5)?,
        comment: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_complaint(row: &rusqlite::Row) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        city: row.get(4)?,
        lat: row.get(5)?,
        lng: row.get(6)?,
        status: row.get(7)?,
        urgency: row.get(8)?,
        images: row.get(9)?,
        upvote_count: row.get(10)?,
        created_by: row.get(11)?,
        assigned_to: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        created_by_name: row.get::<_, Option<String>>(15)?.unwrap_or_else(|| "unknown".to_string()),
        created_by_email: row.get::<_, Option<String>>(16)?.unwrap_or_default(),
        assigned_to_name: row.get(17)?,
        assigned_to_email: row.get(18)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
