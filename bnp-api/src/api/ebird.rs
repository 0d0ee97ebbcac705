//! eBird export endpoint

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::parse_date;
use crate::analytics::{self, EbirdExport, DEFAULT_MIN_CONFIDENCE};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub min_confidence: Option<f64>,
}

/// GET /api/ebird/export/:date?min_confidence=
pub async fn export_ebird(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Json<EbirdExport>> {
    let date = parse_date(&date)?;
    let min_confidence = query.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE);
    let location = state.settings.current().site_name.clone();

    Ok(Json(
        analytics::export_ebird(&state.db, date, min_confidence, &location).await?,
    ))
}

pub fn ebird_routes() -> Router<AppState> {
    Router::new().route("/api/ebird/export/:date", get(export_ebird))
}
