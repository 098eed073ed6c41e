use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use gunaso_db::models::{VerificationRow, parse_timestamp};
use gunaso_types::api::{
    Claims, CreateVerificationRequest, HasVerifiedResponse, UserRef, VerificationResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::lifecycle;

pub async fn create_verification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateVerificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // The complaint must exist before the ledger row goes in (the row
    // references it), but nothing prevents the same user verifying twice.
    let complaint = state
        .db
        .get_complaint(&req.complaint_id.to_string())?
        .ok_or(ApiError::NotFound("Complaint not found"))?;

    let verification_id = Uuid::new_v4();
    state.db.insert_verification(
        &verification_id.to_string(),
        &req.complaint_id.to_string(),
        &claims.sub.to_string(),
        req.is_resolved,
        req.comment.as_deref(),
    )?;

    lifecycle::evaluate_promotion(&state.db, &complaint, claims.sub, req.is_resolved)?;

    // Echo the stored row so the response carries the same created_at a
    // later listing will report.
    let row = state
        .db
        .get_verification(&verification_id.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Verification vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

pub async fn list_verifications(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_verifications(&complaint_id.to_string())?;
    let verifications: Vec<VerificationResponse> = rows.into_iter().map(to_response).collect();
    Ok(Json(verifications))
}

pub async fn check_verification(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let has_verified = state
        .db
        .has_verified(&complaint_id.to_string(), &claims.sub.to_string())?;

    Ok(Json(HasVerifiedResponse { has_verified }))
}

fn to_response(row: VerificationRow) -> VerificationResponse {
    VerificationResponse {
        id: parse_uuid(&row.id, "verification id"),
        complaint_id: parse_uuid(&row.complaint_id, "complaint_id"),
        user: UserRef {
            id: parse_uuid(&row.user_id, "user_id"),
            name: row.user_name,
            email: row.user_email,
        },
        is_resolved: row.is_resolved,
        comment: row.comment,
        created_at: parse_timestamp(&row.created_at),
    }
}

fn parse_uuid(raw: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}
