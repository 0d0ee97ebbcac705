//! Curated species list endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::ApiResult;
use crate::species_lists::{ListChange, ListType, ListUpdate, SpeciesList};
use crate::AppState;

/// GET /api/species-lists/:list_type
pub async fn get_species_list(
    State(state): State<AppState>,
    Path(list_type): Path<String>,
) -> ApiResult<Json<SpeciesList>> {
    let list_type: ListType = list_type.parse()?;
    Ok(Json(state.species_lists.read(list_type).await?))
}

/// POST /api/species-lists/:list_type with `{species, action: add|remove}`
pub async fn update_species_list(
    State(state): State<AppState>,
    Path(list_type): Path<String>,
    Json(update): Json<ListUpdate>,
) -> ApiResult<Json<ListChange>> {
    let list_type: ListType = list_type.parse()?;
    Ok(Json(state.species_lists.update(list_type, &update).await?))
}

pub fn species_list_routes() -> Router<AppState> {
    Router::new().route(
        "/api/species-lists/:list_type",
        get(get_species_list).post(update_species_list),
    )
}
