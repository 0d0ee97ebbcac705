//! Localized species label endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::ApiResult;
use crate::labels::{LabelSet, SpeciesLabel};
use crate::AppState;

/// GET /api/labels
///
/// Every label of the active model in the station's language.
pub async fn all_labels(State(state): State<AppState>) -> ApiResult<Json<LabelSet>> {
    let settings = state.settings.current();
    Ok(Json(
        state
            .models
            .label_set(&settings.model, &settings.database_lang)
            .await?,
    ))
}

/// GET /api/labels/:sci_name
pub async fn species_label(
    State(state): State<AppState>,
    Path(sci_name): Path<String>,
) -> ApiResult<Json<SpeciesLabel>> {
    let language = state.settings.current().database_lang.clone();
    Ok(Json(state.models.label(&sci_name, &language).await?))
}

pub fn label_routes() -> Router<AppState> {
    Router::new()
        .route("/api/labels", get(all_labels))
        .route("/api/labels/:sci_name", get(species_label))
}
