//! Species rollup and per-species detail endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{non_empty, parse_date};
use crate::analytics::{
    self, charts::DEFAULT_SERIES_DAYS, SpeciesChartSeries, SpeciesDeletion, SpeciesDetections,
    SpeciesRollup, SpeciesSort, SpeciesStats,
};
use crate::error::ApiResult;
use crate::pagination::{Page, SPECIES_DEFAULT_LIMIT, SPECIES_MAX_LIMIT};
use crate::species_lists::ListMembership;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RollupQuery {
    pub sort: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpeciesPageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub days: Option<i64>,
}

/// GET /api/species?sort=&date=
pub async fn list_species(
    State(state): State<AppState>,
    Query(query): Query<RollupQuery>,
) -> ApiResult<Json<SpeciesRollup>> {
    let sort = match non_empty(query.sort) {
        Some(sort) => sort.parse::<SpeciesSort>()?,
        None => SpeciesSort::default(),
    };
    let date = non_empty(query.date).as_deref().map(parse_date).transpose()?;

    Ok(Json(analytics::species_rollup(&state.db, sort, date).await?))
}

/// GET /api/species/:sci_name/detections?limit=&offset=
pub async fn species_detections(
    State(state): State<AppState>,
    Path(sci_name): Path<String>,
    Query(query): Query<SpeciesPageQuery>,
) -> ApiResult<Json<SpeciesDetections>> {
    let page = Page::new(
        query.limit.unwrap_or(SPECIES_DEFAULT_LIMIT),
        query.offset.unwrap_or(0),
        SPECIES_MAX_LIMIT,
    )?;
    Ok(Json(
        analytics::species_detections(&state.db, &sci_name, page).await?,
    ))
}

/// GET /api/species/:sci_name/chart-data?days=
pub async fn species_chart_data(
    State(state): State<AppState>,
    Path(sci_name): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> ApiResult<Json<SpeciesChartSeries>> {
    let days = query.days.unwrap_or(DEFAULT_SERIES_DAYS);
    Ok(Json(
        analytics::species_chart_series(&state.db, state.clock.as_ref(), &sci_name, days).await?,
    ))
}

/// GET /api/species/:sci_name/stats
pub async fn species_stats(
    State(state): State<AppState>,
    Path(sci_name): Path<String>,
) -> ApiResult<Json<SpeciesStats>> {
    Ok(Json(analytics::species_stats(&state.db, &sci_name).await?))
}

/// GET /api/species/:sci_name/lists
pub async fn species_list_membership(
    State(state): State<AppState>,
    Path(sci_name): Path<String>,
) -> ApiResult<Json<ListMembership>> {
    Ok(Json(state.species_lists.membership(&sci_name).await?))
}

/// DELETE /api/species/:sci_name
pub async fn delete_species(
    State(state): State<AppState>,
    Path(sci_name): Path<String>,
) -> ApiResult<Json<SpeciesDeletion>> {
    let by_date = state.settings.current().by_date_dir();
    Ok(Json(
        analytics::delete_species(&state.db, &by_date, &sci_name).await?,
    ))
}

pub fn species_routes() -> Router<AppState> {
    Router::new()
        .route("/api/species", get(list_species))
        .route("/api/species/:sci_name", axum::routing::delete(delete_species))
        .route("/api/species/:sci_name/detections", get(species_detections))
        .route("/api/species/:sci_name/chart-data", get(species_chart_data))
        .route("/api/species/:sci_name/stats", get(species_stats))
        .route("/api/species/:sci_name/lists", get(species_list_membership))
}
