use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use clinisim_core::models::case::{CaseSummary, InvestigationMenuItem};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_cases(State(state): State<AppState>) -> Result<Json<Vec<CaseSummary>>, ApiError> {
    Ok(Json(state.sessions.list_cases().await?))
}

pub async fn list_case_investigations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InvestigationMenuItem>>, ApiError> {
    Ok(Json(state.sessions.case_menu(id).await?))
}
