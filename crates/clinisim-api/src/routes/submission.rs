use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use clinisim_core::models::score::ScoreReport;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitDiagnosis {
    pub diagnosis: String,
}

/// Submit the learner's diagnosis. Repeating the call returns the report
/// from the first submission.
pub async fn submit_diagnosis(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitDiagnosis>,
) -> Result<Json<ScoreReport>, ApiError> {
    Ok(Json(state.sessions.submit(id, &user.sub, &body.diagnosis).await?))
}

pub async fn get_score(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreReport>, ApiError> {
    Ok(Json(state.sessions.report(id, &user.sub).await?))
}
