use std::sync::Arc;

use anyhow::Context;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use axum::extract::State;
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use gunaso_db::Database;
use gunaso_db::models::UserRow;
use gunaso_types::api::{AuthResponse, Claims, LoginRequest, PublicUser, RegisterRequest};
use gunaso_types::models::Role;

use crate::error::ApiError;
use crate::uploads::ImageHost;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub uploader: ImageHost,
}

const TOKEN_TTL_DAYS: i64 = 7;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !req.email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    // Authorities are scoped to a city; a city supplied by a citizen is
    // silently dropped.
    let city = match req.role {
        Role::Authority => match req.city.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => Some(c.to_string()),
            _ => return Err(ApiError::Validation("City is required for authorities".into())),
        },
        Role::Citizen => None,
    };

    if state
        .db
        .get_user_by_email(&req.email)?
        .is_some()
    {
        return Err(ApiError::Validation("Email already registered".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    // The pre-check above can lose a race against a concurrent registration;
    // the UNIQUE index on email is the real arbiter.
    if let Err(e) = state.db.create_user(
        &user_id.to_string(),
        name,
        &req.email,
        &password_hash,
        req.role.as_str(),
        city.as_deref(),
    ) {
        if gunaso_db::is_unique_violation(&e) {
            return Err(ApiError::Validation("Email already registered".into()));
        }
        return Err(e.into());
    }

    let token = create_token(&state.jwt_secret, user_id, req.role)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: PublicUser {
                id: user_id,
                name: name.to_string(),
                email: req.email,
                role: req.role,
                city,
            },
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Same message for unknown email and wrong password, so responses cannot
    // be used for account enumeration.
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    if !verify_password(&req.password, &user.password) {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let public = to_public_user(user)?;
    let token = create_token(&state.jwt_secret, public.id, public.role)?;

    Ok(Json(AuthResponse { user: public, token }))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(to_public_user(user)?))
}

fn to_public_user(row: UserRow) -> anyhow::Result<PublicUser> {
    let id: Uuid = row.id.parse().with_context(|| format!("Corrupt user id '{}'", row.id))?;
    let role = Role::parse(&row.role)
        .with_context(|| format!("Corrupt role '{}' on user '{}'", row.role, row.id))?;

    Ok(PublicUser {
        id,
        name: row.name,
        email: row.email,
        role,
        city: row.city,
    })
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn create_token(secret: &str, user_id: Uuid, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
