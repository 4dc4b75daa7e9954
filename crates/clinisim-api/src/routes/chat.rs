use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::{Extension, Json};
use futures::stream::Stream;
use serde::Deserialize;
use uuid::Uuid;

use clinisim_sessions::relay::DONE_SENTINEL;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub message: String,
}

/// Stream the patient's reply as server-sent events. Ownership, state and
/// input errors are plain HTTP errors; anything that goes wrong after the
/// stream opens arrives as an `{error}` frame. Every stream ends with
/// `[DONE]`.
pub async fn post_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChatMessage>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut frames = state.sessions.post_turn(id, &user.sub, &body.message).await?;

    let stream = async_stream::stream! {
        while let Some(frame) = frames.recv().await {
            yield Ok(Event::default().data(frame.payload().to_string()));
        }
        yield Ok(Event::default().data(DONE_SENTINEL));
    };

    Ok(Sse::new(stream))
}
