use axum::{
    Json, Router, extract::State, http::StatusCode, middleware, response::IntoResponse,
    routing::post,
};

use crate::web::{
    AppState, RequestContext, WebError, WebResult,
    dto::chat::{ChatBody, ChatResponse},
    error::ErrorResponse,
    middlewares,
    validation::Validator,
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(chat_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/chat",
    description = "Asks the learning assistant. `context` is passed along as extra system input",
    request_body = ChatBody,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Empty or too long message", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Chat provider failure", body = ErrorResponse),
    ),
    tag = "chat",
    security(("bearer" = []), ("cookie" = []))
)]
async fn chat_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ChatBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    Validator::new().chat_message(&payload.message).finish()?;

    let context = payload
        .context
        .as_deref()
        .map(str::trim)
        .filter(|context| !context.is_empty());

    let reply = state
        .integrations()
        .chat()
        .reply(payload.message.trim(), context)
        .await
        .map_err(WebError::upstream_error)?;

    tracing::debug!(user_id = %user.user_id(), "chat reply delivered");
    Ok((StatusCode::OK, Json(ChatResponse { reply })))
}
