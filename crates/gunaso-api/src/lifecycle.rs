//! Complaint lifecycle rules: authority-driven status changes and the
//! verification-driven promotion to "verified".

use chrono::{Duration, Utc};
use uuid::Uuid;

use gunaso_db::Database;
use gunaso_db::models::{ComplaintRow, parse_timestamp};
use gunaso_types::models::Status;

use crate::error::ApiError;

/// Resolved verifications needed for community promotion.
pub const PROMOTION_QUORUM: i64 = 3;
/// Minimum complaint age before community promotion applies.
pub const PROMOTION_MIN_AGE_DAYS: i64 = 7;

/// Authority status update. Any status value is accepted — the
/// pending → in-progress → solved order is a convention, not an enforced
/// state machine. The first authority to touch a complaint becomes its
/// permanent assignee; the role check itself lives in the middleware.
pub fn apply_status(
    db: &Database,
    complaint_id: Uuid,
    status: Status,
    authority_id: Uuid,
) -> Result<ComplaintRow, ApiError> {
    db.set_complaint_status(
        &complaint_id.to_string(),
        status.as_str(),
        &authority_id.to_string(),
    )?
    .ok_or(ApiError::NotFound("Complaint not found"))
}

/// Run after every recorded verification. Both rules are checked in order on
/// every call; they are not mutually exclusive branches.
///
/// `complaint` is the row as read around the insert, so `complaint.status`
/// may be stale under concurrent verifications. That read-modify-write race
/// is accepted: marking a complaint verified twice converges to the same
/// state.
pub fn evaluate_promotion(
    db: &Database,
    complaint: &ComplaintRow,
    verifier: Uuid,
    is_resolved: bool,
) -> anyhow::Result<()> {
    // Rule 1: the original reporter confirming the fix promotes immediately,
    // whatever the current status.
    if is_resolved && complaint.created_by == verifier.to_string() {
        db.mark_complaint_verified(&complaint.id)?;
    }

    // Rule 2: community consensus on an already-solved, aged complaint.
    let resolved_count = db.count_resolved_verifications(&complaint.id)?;
    let age = Utc::now() - parse_timestamp(&complaint.created_at);

    if resolved_count >= PROMOTION_QUORUM
        && age > Duration::days(PROMOTION_MIN_AGE_DAYS)
        && complaint.status == Status::Solved.as_str()
    {
        db.mark_complaint_verified(&complaint.id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gunaso_db::models::NewComplaint;

    fn test_db() -> Database {
        Database::open(":memory:").unwrap()
    }

    fn seed_user(db: &Database, name: &str, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.create_user(
            &id.to_string(),
            name,
            &format!("{}@example.com", name),
            "hash",
            role,
            None,
        )
        .unwrap();
        id
    }

    fn seed_complaint(db: &Database, created_by: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        db.insert_complaint(&NewComplaint {
            id: id.to_string(),
            title: "Overflowing bin".into(),
            description: "Garbage not collected for a week".into(),
            category: "garbage".into(),
            city: "Kathmandu".into(),
            lat: 27.7,
            lng: 85.3,
            urgency: "high".into(),
            images: "[]".into(),
            created_by: created_by.to_string(),
        })
        .unwrap();
        id
    }

    fn backdate_complaint(db: &Database, id: Uuid, days: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE complaints SET created_at = datetime('now', ?1) WHERE id = ?2",
                [format!("-{} days", days), id.to_string()],
            )?;
            Ok(())
        })
        .unwrap();
    }

    /// Mirrors the record-verification handler: insert, re-read, evaluate.
    fn record(db: &Database, complaint_id: Uuid, user_id: Uuid, is_resolved: bool) {
        db.insert_verification(
            &Uuid::new_v4().to_string(),
            &complaint_id.to_string(),
            &user_id.to_string(),
            is_resolved,
            None,
        )
        .unwrap();
        let complaint = db.get_complaint(&complaint_id.to_string()).unwrap().unwrap();
        evaluate_promotion(db, &complaint, user_id, is_resolved).unwrap();
    }

    fn status_of(db: &Database, id: Uuid) -> String {
        db.get_complaint(&id.to_string()).unwrap().unwrap().status
    }

    #[test]
    fn creator_confirmation_promotes_immediately() {
        let db = test_db();
        let creator = seed_user(&db, "asha", "citizen");
        let complaint = seed_complaint(&db, creator);

        // Still pending — the creator short-circuit has no status precondition.
        record(&db, complaint, creator, true);
        assert_eq!(status_of(&db, complaint), "verified");
    }

    #[test]
    fn creator_denial_changes_nothing() {
        let db = test_db();
        let creator = seed_user(&db, "asha", "citizen");
        let complaint = seed_complaint(&db, creator);

        record(&db, complaint, creator, false);
        assert_eq!(status_of(&db, complaint), "pending");
    }

    #[test]
    fn quorum_promotes_aged_solved_complaint() {
        let db = test_db();
        let creator = seed_user(&db, "asha", "citizen");
        let authority = seed_user(&db, "ward", "authority");
        let complaint = seed_complaint(&db, creator);
        apply_status(&db, complaint, Status::Solved, authority).unwrap();
        backdate_complaint(&db, complaint, 8);

        let v1 = seed_user(&db, "bina", "citizen");
        let v2 = seed_user(&db, "chandra", "citizen");
        let v3 = seed_user(&db, "dipesh", "citizen");

        record(&db, complaint, v1, true);
        record(&db, complaint, v2, true);
        assert_eq!(status_of(&db, complaint), "solved");

        record(&db, complaint, v3, true);
        assert_eq!(status_of(&db, complaint), "verified");
    }

    #[test]
    fn quorum_does_not_promote_young_complaint() {
        let db = test_db();
        let creator = seed_user(&db, "asha", "citizen");
        let authority = seed_user(&db, "ward", "authority");
        let complaint = seed_complaint(&db, creator);
        apply_status(&db, complaint, Status::Solved, authority).unwrap();
        backdate_complaint(&db, complaint, 2);

        for name in ["bina", "chandra", "dipesh"] {
            let voter = seed_user(&db, name, "citizen");
            record(&db, complaint, voter, true);
        }
        assert_eq!(status_of(&db, complaint), "solved");
    }

    #[test]
    fn quorum_requires_solved_status() {
        let db = test_db();
        let creator = seed_user(&db, "asha", "citizen");
        let complaint = seed_complaint(&db, creator);
        backdate_complaint(&db, complaint, 8);

        for name in ["bina", "chandra", "dipesh"] {
            let voter = seed_user(&db, name, "citizen");
            record(&db, complaint, voter, true);
        }
        assert_eq!(status_of(&db, complaint), "pending");
    }

    #[test]
    fn unresolved_votes_do_not_count_toward_quorum() {
        let db = test_db();
        let creator = seed_user(&db, "asha", "citizen");
        let authority = seed_user(&db, "ward", "authority");
        let complaint = seed_complaint(&db, creator);
        apply_status(&db, complaint, Status::Solved, authority).unwrap();
        backdate_complaint(&db, complaint, 8);

        for name in ["bina", "chandra", "dipesh"] {
            let voter = seed_user(&db, name, "citizen");
            record(&db, complaint, voter, false);
        }
        assert_eq!(status_of(&db, complaint), "solved");
    }

    #[test]
    fn apply_status_missing_complaint_is_not_found() {
        let db = test_db();
        let authority = seed_user(&db, "ward", "authority");

        let err = apply_status(&db, Uuid::new_v4(), Status::InProgress, authority).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
