use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use gunaso_types::api::Claims;
use gunaso_types::models::Role;

use crate::error::ApiError;

pub fn jwt_secret_from_env() -> String {
    std::env::var("GUNASO_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into())
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Extract and validate the bearer token from the Authorization header.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    let secret = jwt_secret_from_env();
    let claims = decode_token(&secret, token).ok_or(ApiError::Unauthorized("Invalid token"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Role gate for authority-only routes. Must run inside require_auth so the
/// claims extension is present.
pub async fn require_authority(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    if claims.role != Role::Authority {
        return Err(ApiError::Forbidden("Authority access only"));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn,
        routing::patch,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn gated_app() -> Router {
        Router::new()
            .route("/status", patch(ok_handler))
            .layer(from_fn(require_authority))
            .layer(from_fn(require_auth))
    }

    fn request_with_token(token: &str) -> Request<Body> {
        Request::builder()
            .method("PATCH")
            .uri("/status")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let req = Request::builder()
            .method("PATCH")
            .uri("/status")
            .body(Body::empty())
            .unwrap();

        let res = gated_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let res = gated_app()
            .oneshot(request_with_token("not.a.jwt"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn citizen_is_forbidden_from_authority_routes() {
        let token =
            crate::auth::create_token(&jwt_secret_from_env(), Uuid::new_v4(), Role::Citizen)
                .unwrap();

        let res = gated_app().oneshot(request_with_token(&token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn authority_passes_both_gates() {
        let token =
            crate::auth::create_token(&jwt_secret_from_env(), Uuid::new_v4(), Role::Authority)
                .unwrap();

        let res = gated_app().oneshot(request_with_token(&token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}

