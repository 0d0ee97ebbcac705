//! Health and station info endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub site_name: String,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: String,
    pub api_version: &'static str,
    pub site_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub model: String,
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        site_name: state.settings.current().site_name.clone(),
    })
}

/// GET /api/info
///
/// The installation version comes from `<base>/version.md` when present.
pub async fn station_info(State(state): State<AppState>) -> Json<InfoResponse> {
    let version = tokio::fs::read_to_string(state.base_path.join("version.md"))
        .await
        .ok()
        .and_then(|text| text.lines().next().map(|line| line.trim().to_string()))
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let settings = state.settings.current();
    Json(InfoResponse {
        name: "BirdNET-Pi",
        version,
        api_version: env!("CARGO_PKG_VERSION"),
        site_name: settings.site_name.clone(),
        latitude: settings.latitude,
        longitude: settings.longitude,
        model: settings.model.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/info", get(station_info))
}
