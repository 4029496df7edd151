use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};

use crate::{
    model::{
        ResourceTyped,
        entity::{LearningStatsRow, LeaderboardEntry, LessonProgress, Profile},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::learning::{LeaderboardQuery, LearningStats},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/stats", get(progress_stats_handler))
        .route("/leaderboard", get(progress_leaderboard_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/stats",
    description = "Learning totals of the caller",
    responses(
        (status = 200, description = "Statistics", body = LearningStats),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "progress",
    security(("bearer" = []), ("cookie" = []))
)]
async fn progress_stats_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let stats = LearningStatsRow::fetch(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(LearningStats::from(stats))))
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Top learners by points", body = Vec<LeaderboardEntry>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "progress",
    security(("bearer" = []), ("cookie" = []))
)]
async fn progress_leaderboard_handler(
    ctx: RequestContext,
    Query(query): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let entries = Profile::leaderboard(state.pool(), user, query.limit())
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(entries)))
}
