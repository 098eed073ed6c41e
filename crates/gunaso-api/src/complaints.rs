use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use gunaso_db::models::{ComplaintRow, NewComplaint, parse_timestamp};
use gunaso_types::api::{Claims, ComplaintResponse, CreateComplaintRequest, UpdateStatusRequest, UserRef};
use gunaso_types::models::{Category, Location, Status, Urgency};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::lifecycle;

/// Flat-earth degrees-per-kilometre divisor. Good enough at city scale,
/// inexact near the poles or for large radii.
const KM_PER_DEGREE: f64 = 111.0;
const DEFAULT_RADIUS_KM: f64 = 1.0;

#[derive(Debug, Deserialize)]
pub struct CityFilters {
    pub status: Option<Status>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<f64>,
}

pub async fn create_complaint(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateComplaintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".into()));
    }
    if req.description.trim().is_empty() {
        return Err(ApiError::Validation("Description is required".into()));
    }
    if req.city.trim().is_empty() {
        return Err(ApiError::Validation("City is required".into()));
    }
    if !(-90.0..=90.0).contains(&req.location.lat) || !(-180.0..=180.0).contains(&req.location.lng) {
        return Err(ApiError::Validation("Location is out of range".into()));
    }

    let id = Uuid::new_v4();
    let images = req.images.unwrap_or_default();
    let images_json =
        serde_json::to_string(&images).map_err(|e| ApiError::Internal(e.into()))?;

    state.db.insert_complaint(&NewComplaint {
        id: id.to_string(),
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        category: req.category.as_str().to_string(),
        city: req.city.trim().to_string(),
        lat: req.location.lat,
        lng: req.location.lng,
        urgency: req.urgency.unwrap_or(Urgency::Medium).as_str().to_string(),
        images: images_json,
        created_by: claims.sub.to_string(),
    })?;

    let row = state
        .db
        .get_complaint(&id.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Complaint vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

pub async fn list_by_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(filters): Query<CityFilters>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // Run the blocking DB scan off the async runtime
    let db = state.clone();
    let status = filters.status.map(|s| s.as_str());
    let category = filters.category.map(|c| c.as_str());
    let urgency = filters.urgency.map(|u| u.as_str());

    let rows = tokio::task::spawn_blocking(move || {
        db.db.list_complaints_by_city(&city, status, category, urgency)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    let complaints: Vec<ComplaintResponse> = rows.into_iter().map(to_response).collect();
    Ok(Json(complaints))
}

pub async fn get_complaint(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_complaint(&id.to_string())?
        .ok_or(ApiError::NotFound("Complaint not found"))?;

    Ok(Json(to_response(row)))
}

pub async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let radius_km = query.radius.unwrap_or(DEFAULT_RADIUS_KM);
    let (min_lat, max_lat, min_lng, max_lng) = bounding_box(query.lat, query.lng, radius_km);

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.db.list_complaints_in_box(min_lat, max_lat, min_lng, max_lng)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    let complaints: Vec<ComplaintResponse> = rows.into_iter().map(to_response).collect();
    Ok(Json(complaints))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = lifecycle::apply_status(&state.db, id, req.status, claims.sub)?;
    Ok(Json(to_response(row)))
}

pub async fn upvote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .upvote_complaint(&id.to_string())?
        .ok_or(ApiError::NotFound("Complaint not found"))?;

    Ok(Json(to_response(row)))
}

/// ± radius/111 degrees on both axes around the center.
pub fn bounding_box(lat: f64, lng: f64, radius_km: f64) -> (f64, f64, f64, f64) {
    let delta = radius_km / KM_PER_DEGREE;
    (lat - delta, lat + delta, lng - delta, lng + delta)
}

pub(crate) fn to_response(row: ComplaintRow) -> ComplaintResponse {
    let images: Vec<String> = serde_json::from_str(&row.images).unwrap_or_else(|e| {
        warn!("Corrupt images on complaint '{}': {}", row.id, e);
        Vec::new()
    });

    let assigned_to = row.assigned_to.as_ref().map(|id| UserRef {
        id: parse_uuid(id, "assigned_to"),
        name: row.assigned_to_name.clone().unwrap_or_else(|| "unknown".to_string()),
        email: row.assigned_to_email.clone().unwrap_or_default(),
    });

    ComplaintResponse {
        id: parse_uuid(&row.id, "complaint id"),
        title: row.title,
        description: row.description,
        category: Category::parse(&row.category).unwrap_or_else(|| {
            warn!("Corrupt category '{}' on complaint '{}'", row.category, row.id);
            Category::Other
        }),
        city: row.city,
        location: Location { lat: row.lat, lng: row.lng },
        status: Status::parse(&row.status).unwrap_or_else(|| {
            warn!("Corrupt status '{}' on complaint '{}'", row.status, row.id);
            Status::Pending
        }),
        urgency: Urgency::parse(&row.urgency).unwrap_or_else(|| {
            warn!("Corrupt urgency '{}' on complaint '{}'", row.urgency, row.id);
            Urgency::Medium
        }),
        images,
        upvote_count: row.upvote_count,
        created_by: UserRef {
            id: parse_uuid(&row.created_by, "created_by"),
            name: row.created_by_name,
            email: row.created_by_email,
        },
        assigned_to,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

fn parse_uuid(raw: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}
