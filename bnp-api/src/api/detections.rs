//! Detection listing, statistics, chart and deletion endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use bnp_common::db::Detection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{non_empty, parse_date};
use crate::analytics::{
    self, ChartData, DetectionDeletion, DetectionFilter, DetectionPage, DetectionSummary,
    TodaysDetections,
};
use crate::error::ApiResult;
use crate::pagination::{Page, DEFAULT_LIMIT, MAX_LIMIT};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub date: Option<String>,
    pub species: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TodayQuery {
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DatesResponse {
    pub dates: Vec<NaiveDate>,
}

/// GET /api/detections?limit=&offset=&date=&species=
pub async fn list_detections(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<DetectionPage>> {
    let page = Page::new(
        query.limit.unwrap_or(DEFAULT_LIMIT),
        query.offset.unwrap_or(0),
        MAX_LIMIT,
    )?;
    let filter = DetectionFilter {
        date: non_empty(query.date).as_deref().map(parse_date).transpose()?,
        species: non_empty(query.species),
    };

    Ok(Json(analytics::list_detections(&state.db, &filter, page).await?))
}

/// GET /api/detections/today?limit=&search=
pub async fn todays_detections(
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> ApiResult<Json<TodaysDetections>> {
    let page = Page::new(query.limit.unwrap_or(DEFAULT_LIMIT), 0, MAX_LIMIT)?;
    let search = non_empty(query.search);
    let result =
        analytics::todays_detections(&state.db, state.clock.as_ref(), search.as_deref(), page.limit)
            .await?;
    Ok(Json(result))
}

/// GET /api/detections/latest
///
/// Responds with `null` when the log is empty.
pub async fn latest_detection(State(state): State<AppState>) -> ApiResult<Json<Option<Detection>>> {
    Ok(Json(analytics::latest_detection(&state.db).await?))
}

/// GET /api/detections/stats
pub async fn detection_stats(State(state): State<AppState>) -> ApiResult<Json<DetectionSummary>> {
    Ok(Json(
        analytics::detection_stats(&state.db, state.clock.as_ref()).await?,
    ))
}

/// GET /api/detections/dates
pub async fn detection_dates(State(state): State<AppState>) -> ApiResult<Json<DatesResponse>> {
    let dates = analytics::detection_dates(&state.db).await?;
    Ok(Json(DatesResponse { dates }))
}

/// GET /api/detections/chart/:date
pub async fn chart_data(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<ChartData>> {
    let date = parse_date(&date)?;
    Ok(Json(analytics::chart_data(&state.db, date).await?))
}

/// GET /api/detections/by-file/:file_name
pub async fn detection_by_file(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> ApiResult<Json<Detection>> {
    Ok(Json(analytics::detection_by_file(&state.db, &file_name).await?))
}

/// DELETE /api/detections/:file_name
pub async fn delete_detection(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> ApiResult<Json<DetectionDeletion>> {
    let by_date = state.settings.current().by_date_dir();
    Ok(Json(
        analytics::delete_detection(&state.db, &by_date, &file_name).await?,
    ))
}

pub fn detection_routes() -> Router<AppState> {
    Router::new()
        .route("/api/detections", get(list_detections))
        .route("/api/detections/today", get(todays_detections))
        .route("/api/detections/latest", get(latest_detection))
        .route("/api/detections/stats", get(detection_stats))
        .route("/api/detections/dates", get(detection_dates))
        .route("/api/detections/chart/:date", get(chart_data))
        .route("/api/detections/by-file/:file_name", get(detection_by_file))
        .route(
            "/api/detections/:file_name",
            axum::routing::delete(delete_detection),
        )
}
