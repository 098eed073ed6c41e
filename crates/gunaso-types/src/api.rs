use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Location, Role, Status, Urgency};

// -- JWT Claims --

/// JWT claims shared between token issuance (auth handlers) and the bearer
/// middleware. Canonical definition lives here in gunaso-types to eliminate
/// duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User shape returned by register/login/profile. Never carries the
/// password hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

// -- Complaints --

#[derive(Debug, Deserialize)]
pub struct CreateComplaintRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub city: String,
    pub location: Location,
    pub urgency: Option<Urgency>,
    pub images: Option<Vec<String>>,
}

/// Reference to a user embedded in enriched responses (the moral equivalent
/// of a populated foreign key).
#[derive(Debug, Clone, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub city: String,
    pub location: Location,
    pub status: Status,
    pub urgency: Urgency,
    pub images: Vec<String>,
    pub upvote_count: i64,
    pub created_by: UserRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: Status,
}

// -- Verifications --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateVerificationRequest {
    pub complaint_id: Uuid,
    pub is_resolved: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub user: UserRef,
    pub is_resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVerifiedResponse {
    pub has_verified: bool,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub urls: Vec<String>,
}
