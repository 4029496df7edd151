use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use chrono::{Datelike, Utc};

use crate::{
    model::{
        ResourceTyped,
        entity::{DailyChallengeRow, Exercise, PracticeExerciseRow, PracticeStatsRow, Submission},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::analytics::{DailyChallengeResponse, PracticeQuery, PracticeStatsResponse},
        error::ErrorResponse,
        middlewares,
        validation::Validator,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/daily-challenge", get(practice_daily_handler))
        .route("/exercises", get(practice_browse_handler))
        .route("/exercises/random", get(practice_random_handler))
        .route("/stats", get(practice_stats_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn validate_query(query: &PracticeQuery) -> WebResult<()> {
    let mut validator = Validator::new();
    if let Some(difficulty) = query.filter().difficulty {
        validator.difficulty(&difficulty);
    }
    validator.finish()
}

#[utoipa::path(
    get,
    path = "/api/v1/practice/daily-challenge",
    description = "Today's challenge, worth double the exercise's points",
    responses(
        (status = 200, description = "Challenge of the day", body = DailyChallengeResponse),
        (status = 404, description = "No daily challenge available", body = ErrorResponse),
    ),
    tag = "practice",
    security(("bearer" = []), ("cookie" = []))
)]
async fn practice_daily_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let today = Utc::now().date_naive();

    let challenge =
        DailyChallengeRow::for_day(state.pool(), user, today, i64::from(today.num_days_from_ce()))
            .await
            .map_err(|e| WebError::resource_fetch_error(Exercise::get_resource_type(), e))?
            .ok_or_else(|| WebError::resource_not_found(Exercise::get_resource_type()))?;

    Ok((StatusCode::OK, Json(DailyChallengeResponse::new(challenge, today))))
}

#[utoipa::path(
    get,
    path = "/api/v1/practice/exercises",
    description = "Practice exercises with the caller's best score, filtered by difficulty and course category",
    params(PracticeQuery),
    responses(
        (status = 200, description = "Exercises", body = Vec<PracticeExerciseRow>),
        (status = 400, description = "Unknown difficulty", body = ErrorResponse),
    ),
    tag = "practice",
    security(("bearer" = []), ("cookie" = []))
)]
async fn practice_browse_handler(
    ctx: RequestContext,
    Query(query): Query<PracticeQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    validate_query(&query)?;

    let exercises = PracticeExerciseRow::browse(state.pool(), user, &query.filter(), query.limit())
        .await
        .map_err(|e| WebError::resource_fetch_error(Exercise::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(exercises)))
}

#[utoipa::path(
    get,
    path = "/api/v1/practice/exercises/random",
    params(PracticeQuery),
    responses(
        (status = 200, description = "A random matching exercise", body = PracticeExerciseRow),
        (status = 400, description = "Unknown difficulty", body = ErrorResponse),
        (status = 404, description = "No exercise matches", body = ErrorResponse),
    ),
    tag = "practice",
    security(("bearer" = []), ("cookie" = []))
)]
async fn practice_random_handler(
    ctx: RequestContext,
    Query(query): Query<PracticeQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    validate_query(&query)?;

    let exercise = PracticeExerciseRow::random(state.pool(), user, &query.filter())
        .await
        .map_err(|e| WebError::resource_fetch_error(Exercise::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Exercise::get_resource_type()))?;

    Ok((StatusCode::OK, Json(exercise)))
}

#[utoipa::path(
    get,
    path = "/api/v1/practice/stats",
    description = "Submission statistics of the caller with strengths and areas to improve",
    responses(
        (status = 200, description = "Practice statistics", body = PracticeStatsResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "practice",
    security(("bearer" = []), ("cookie" = []))
)]
async fn practice_stats_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let stats = PracticeStatsRow::fetch(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(PracticeStatsResponse::from(stats))))
}
