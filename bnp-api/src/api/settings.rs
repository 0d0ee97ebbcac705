//! Station settings, BirdWeather status and helper-script endpoints

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use bnp_common::config::Settings;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::labels::{LanguageList, ModelList};
use crate::scripts::{NotificationResult, SpeciesPreview, DEFAULT_PREVIEW_THRESHOLD};
use crate::AppState;

/// Settings safe to expose to clients
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub site_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub database_lang: String,
    pub color_scheme: String,
    pub model: String,
    pub confidence: f64,
    pub sensitivity: f64,
    pub overlap: f64,
    pub image_provider: String,
    pub birdweather_enabled: bool,
    pub has_flickr_key: bool,
}

impl From<&Settings> for ConfigView {
    fn from(s: &Settings) -> Self {
        Self {
            site_name: s.site_name.clone(),
            latitude: s.latitude,
            longitude: s.longitude,
            database_lang: s.database_lang.clone(),
            color_scheme: s.color_scheme.clone(),
            model: s.model.clone(),
            confidence: s.confidence,
            sensitivity: s.sensitivity,
            overlap: s.overlap,
            image_provider: s.image_provider.clone(),
            birdweather_enabled: !s.birdweather_id.is_empty(),
            has_flickr_key: !s.flickr_api_key.is_empty(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BirdWeatherStatus {
    pub enabled: bool,
    pub station_id: Option<String>,
    pub station_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestNotificationRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigView> {
    Json(ConfigView::from(state.settings.current().as_ref()))
}

/// POST /api/config/reload
pub async fn reload_config(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let settings = state.settings.reload()?;
    Ok(Json(json!({
        "message": "Configuration reloaded",
        "config": ConfigView::from(settings.as_ref()),
    })))
}

/// GET /api/config/models
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<ModelList>> {
    let current = state.settings.current().model.clone();
    Ok(Json(state.models.models(&current).await?))
}

/// GET /api/config/languages
pub async fn list_languages(State(state): State<AppState>) -> ApiResult<Json<LanguageList>> {
    let current = state.settings.current().database_lang.clone();
    Ok(Json(state.models.languages(&current).await?))
}

/// GET /api/config/preview-species?threshold=
pub async fn preview_species(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<SpeciesPreview>> {
    let threshold = query.threshold.unwrap_or(DEFAULT_PREVIEW_THRESHOLD);
    Ok(Json(state.scripts.preview_species(threshold).await?))
}

/// POST /api/config/test-notification
pub async fn test_notification(
    State(state): State<AppState>,
    body: Option<Json<TestNotificationRequest>>,
) -> ApiResult<Json<NotificationResult>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let result = state
        .scripts
        .send_test_notification(request.title.as_deref(), request.body.as_deref())
        .await?;
    Ok(Json(result))
}

/// GET /api/birdweather/status
pub async fn birdweather_status(State(state): State<AppState>) -> Json<BirdWeatherStatus> {
    let settings = state.settings.current();
    let station_id = Some(settings.birdweather_id.trim().to_string()).filter(|id| !id.is_empty());
    Json(BirdWeatherStatus {
        enabled: station_id.is_some(),
        station_url: station_id
            .as_ref()
            .map(|id| format!("https://app.birdweather.com/stations/{}", id)),
        station_id,
    })
}

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/config/reload", post(reload_config))
        .route("/api/config/models", get(list_models))
        .route("/api/config/languages", get(list_languages))
        .route("/api/config/preview-species", get(preview_species))
        .route("/api/config/test-notification", post(test_notification))
        .route("/api/birdweather/status", get(birdweather_status))
}
