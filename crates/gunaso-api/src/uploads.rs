use axum::{Extension, Json, extract::Multipart, extract::State, response::IntoResponse};
use futures_util::future::try_join_all;
use serde::Deserialize;
use tracing::debug;

use gunaso_types::api::{Claims, UploadResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// Upload cap per request, matching the frontend's three-image picker.
const MAX_UPLOAD_FILES: usize = 3;

/// Thin relay to the hosted image service. The server never stores image
/// bytes itself; it forwards them and hands the public URLs back.
pub struct ImageHost {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct HostUploadResponse {
    url: String,
}

impl ImageHost {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    async fn upload_one(&self, filename: String, bytes: Vec<u8>) -> Result<String, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new()
            .text("key", self.api_key.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Upload(format!("Image upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Upload(format!(
                "Image host returned {}",
                response.status()
            )));
        }

        let body: HostUploadResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Upload(format!("Invalid image host response: {}", e)))?;

        Ok(body.url)
    }
}

/// POST /api/upload — multipart field "images", at most three files. All
/// uploads run concurrently; one failure fails the whole request (uploads
/// that already landed on the host are not rolled back).
pub async fn upload_images(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart payload".into()))?
    {
        if field.name() != Some("images") {
            continue;
        }
        if files.len() == MAX_UPLOAD_FILES {
            return Err(ApiError::Validation(format!(
                "At most {} images per upload",
                MAX_UPLOAD_FILES
            )));
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::Validation("Malformed multipart payload".into()))?;

        if bytes.is_empty() {
            return Err(ApiError::Validation("Empty image file".into()));
        }
        files.push((filename, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(ApiError::Validation("No images provided".into()));
    }

    debug!("Relaying {} image(s) to the image host", files.len());

    // Fan out, join all; URL order matches input order.
    let uploads = files
        .into_iter()
        .map(|(filename, bytes)| state.uploader.upload_one(filename, bytes));
    let urls = try_join_all(uploads).await?;

    Ok(Json(UploadResponse { urls }))
}
