use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clinisim_core::models::case::CaseBrief;
use clinisim_core::models::session::Session;
use clinisim_sessions::lifecycle::{CaseSelector, SessionDetail};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Either an existing case or a synthesized one. With neither field set a
/// case is synthesized for a random disease.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSession {
    #[serde(default)]
    pub case_id: Option<Uuid>,
    #[serde(default)]
    pub disease_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session: Session,
    pub case: CaseBrief,
}

pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateSession>,
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let selector = match (body.case_id, body.disease_id) {
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "give case_id or disease_id, not both".to_string(),
            ));
        }
        (Some(id), None) => CaseSelector::Case(id),
        (None, disease_id) => CaseSelector::Synthesize { disease_id },
    };
    let (session, case) = state.sessions.create(&user.sub, selector).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session,
            case: case.brief(),
        }),
    ))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(state.sessions.list(&user.sub).await?))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, ApiError> {
    Ok(Json(state.sessions.get(id, &user.sub).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.sessions.delete(id, &user.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
