//! Recording, spectrogram and chart file endpoints

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::artifacts::{self, RecordingFile, SpeciesRecordings};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DatesResponse {
    pub dates: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeciesForDateResponse {
    pub date: String,
    pub species: Vec<SpeciesRecordings>,
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub date: String,
    pub species: String,
    pub files: Vec<RecordingFile>,
}

/// Serve a resolved artifact with Range, conditional and streaming support
async fn serve_artifact(
    path: PathBuf,
    request: Request,
    content_type: &'static str,
) -> ApiResult<Response> {
    artifacts::require_file(&path).await?;

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    Ok(response)
}

/// GET /api/media/audio/:date/:species/:file
pub async fn get_audio(
    State(state): State<AppState>,
    Path((date, species, file)): Path<(String, String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let by_date = state.settings.current().by_date_dir();
    let path = artifacts::resolve_within(&by_date, &[date.as_str(), species.as_str(), file.as_str()])?;
    serve_artifact(path, request, artifacts::audio_content_type(&file)).await
}

/// GET /api/media/spectrogram/:date/:species/:file
pub async fn get_spectrogram(
    State(state): State<AppState>,
    Path((date, species, file)): Path<(String, String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let by_date = state.settings.current().by_date_dir();
    let file = artifacts::spectrogram_name(&file);
    let path = artifacts::resolve_within(&by_date, &[date.as_str(), species.as_str(), file.as_str()])?;
    serve_artifact(path, request, "image/png").await
}

/// GET /api/media/chart/:date
pub async fn get_daily_chart(
    State(state): State<AppState>,
    Path(date): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let charts = state.settings.current().charts_dir();
    let name = format!("Combo-{}.png", date);
    let path = artifacts::resolve_within(&charts, &[name.as_str()])?;
    serve_artifact(path, request, "image/png").await
}

/// GET /api/media/dates
pub async fn recording_dates(State(state): State<AppState>) -> ApiResult<Json<DatesResponse>> {
    let by_date = state.settings.current().by_date_dir();
    let dates = artifacts::recording_dates(&by_date).await?;
    Ok(Json(DatesResponse { dates }))
}

/// GET /api/media/dates/:date/species
pub async fn species_for_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<SpeciesForDateResponse>> {
    let by_date = state.settings.current().by_date_dir();
    let species = artifacts::species_for_date(&by_date, &date).await?;
    Ok(Json(SpeciesForDateResponse { date, species }))
}

/// GET /api/media/dates/:date/:species/files
pub async fn files_for_species(
    State(state): State<AppState>,
    Path((date, species)): Path<(String, String)>,
) -> ApiResult<Json<FilesResponse>> {
    let by_date = state.settings.current().by_date_dir();
    let files = artifacts::files_for_species(&by_date, &date, &species).await?;
    Ok(Json(FilesResponse {
        date,
        species,
        files,
    }))
}

pub fn media_routes() -> Router<AppState> {
    Router::new()
        .route("/api/media/audio/:date/:species/:file", get(get_audio))
        .route("/api/media/spectrogram/:date/:species/:file", get(get_spectrogram))
        .route("/api/media/chart/:date", get(get_daily_chart))
        .route("/api/media/dates", get(recording_dates))
        .route("/api/media/dates/:date/species", get(species_for_date))
        .route("/api/media/dates/:date/:species/files", get(files_for_species))
}
