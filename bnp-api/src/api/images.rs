//! Species image endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::non_empty;
use crate::error::ApiResult;
use crate::images::{BirdImage, ProviderKind};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub force_refresh: bool,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BlacklistQuery {
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlacklistResponse {
    pub sci_name: String,
    pub provider: ProviderKind,
    pub removed: bool,
}

/// Provider from the query, falling back to the station's configured one
fn pick_provider(state: &AppState, requested: Option<String>) -> ApiResult<ProviderKind> {
    let name = non_empty(requested).unwrap_or_else(|| state.settings.current().image_provider.clone());
    Ok(name.parse()?)
}

/// GET /api/image/:sci_name?force_refresh=&provider=
pub async fn get_bird_image(
    State(state): State<AppState>,
    Path(sci_name): Path<String>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<Json<BirdImage>> {
    let provider = pick_provider(&state, query.provider)?;
    let image = state
        .images
        .resolve(&sci_name, provider, query.force_refresh)
        .await?;
    Ok(Json(image))
}

/// POST /api/image/:sci_name/blacklist?provider=
pub async fn blacklist_image(
    State(state): State<AppState>,
    Path(sci_name): Path<String>,
    Query(query): Query<BlacklistQuery>,
) -> ApiResult<Json<BlacklistResponse>> {
    let provider = pick_provider(&state, query.provider)?;
    let removed = state.images.blacklist(&sci_name, provider).await?;
    Ok(Json(BlacklistResponse {
        sci_name,
        provider,
        removed,
    }))
}

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/api/image/:sci_name", get(get_bird_image))
        .route("/api/image/:sci_name/blacklist", post(blacklist_image))
}
