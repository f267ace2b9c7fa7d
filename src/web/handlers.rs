use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::errors::AppError;
use crate::fingerprint::parse_request_fingerprint;

/// Size parameters accepted on avatar requests; `s` wins over `size`
#[derive(Debug, Default, Deserialize)]
pub struct AvatarQuery {
    pub s: Option<String>,
    pub size: Option<String>,
}

impl AvatarQuery {
    /// Requested width, falling back to `default` when the parameter is
    /// missing or unparsable and clamped to `max`
    pub fn width(&self, default: u32, max: u32) -> u32 {
        self.s
            .as_deref()
            .or(self.size.as_deref())
            .and_then(|value| value.trim().parse::<u32>().ok())
            .map(|width| width.min(max))
            .unwrap_or(default)
    }
}

pub async fn serve_avatar(
    Path(segment): Path<String>,
    Query(query): Query<AvatarQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let fingerprint = parse_request_fingerprint(&segment)
        .ok_or_else(|| AppError::invalid_request("hash", "missing avatar hash"))?;
    let width = query.width(state.web.default_size, state.web.max_size);

    let image = state.resolver.resolve_image(&fingerprint, width).await?;

    Ok((
        [
            (header::CONTENT_TYPE, image.format.mime_type().to_string()),
            (header::CONTENT_LENGTH, image.bytes.len().to_string()),
        ],
        image.bytes,
    )
        .into_response())
}

pub async fn healthz() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "OK")
}

pub async fn version() -> impl IntoResponse {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}
