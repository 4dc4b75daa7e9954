use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use clinisim_core::models::investigation::InvestigationOrder;
use clinisim_llm::extract::investigation_type;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderInvestigation {
    /// A type code or a recognised alternate name ("ECG", "胸片").
    #[serde(rename = "type")]
    pub kind: String,
}

pub async fn order_investigation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<OrderInvestigation>,
) -> Result<(StatusCode, Json<InvestigationOrder>), ApiError> {
    let kind = investigation_type(&body.kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown investigation type: {}", body.kind)))?;
    let order = state.sessions.order_investigation(id, &user.sub, kind).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_investigations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InvestigationOrder>>, ApiError> {
    Ok(Json(state.sessions.list_investigations(id, &user.sub).await?))
}
