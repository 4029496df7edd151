use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{
            CoursePerformanceRow, DailyActivityRow, Enrollment, ExerciseAnalyticsRow,
            LearningStatsRow, LessonAnalyticsRow, LessonProgress, Profile,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::analytics::{CourseAnalyticsResponse, DashboardResponse, TrendQuery, TrendResponse},
        error::ErrorResponse,
        middlewares,
        routes::courses::find_visible_course,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/dashboard", get(analytics_dashboard_handler))
        .route("/progress-trend", get(analytics_trend_handler))
        .route("/courses/{course_id}", get(analytics_course_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    description = "Totals and per-course performance of the caller",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "analytics",
    security(("bearer" = []), ("cookie" = []))
)]
async fn analytics_dashboard_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let mm = state.pool();
    let fetch_err = |e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e);

    let (profile, stats, courses) = tokio::try_join!(
        Profile::find_by_id(mm, user, user.user_id()),
        LearningStatsRow::fetch(mm, user),
        CoursePerformanceRow::list_for_user(mm, user),
    )
    .map_err(fetch_err)?;
    let profile =
        profile.ok_or_else(|| WebError::resource_not_found(Profile::get_resource_type()))?;

    Ok((
        StatusCode::OK,
        Json(DashboardResponse::new(&profile, stats, courses)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/progress-trend",
    description = "Daily activity of the caller, one entry per day including idle days",
    params(TrendQuery),
    responses(
        (status = 200, description = "Daily activity, oldest first", body = TrendResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "analytics",
    security(("bearer" = []), ("cookie" = []))
)]
async fn analytics_trend_handler(
    ctx: RequestContext,
    Query(query): Query<TrendQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let trend = DailyActivityRow::trend(state.pool(), user, query.days())
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(TrendResponse::from(trend))))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/courses/{course_id}",
    description = "Lesson and exercise breakdown of the caller in an enrolled course",
    params(("course_id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course analytics", body = CourseAnalyticsResponse),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "analytics",
    security(("bearer" = []), ("cookie" = []))
)]
async fn analytics_course_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, course_id).await?;
    let mm = state.pool();
    let fetch_err = |e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e);

    let enrollment = Enrollment::find_for(mm, user.user_id(), course.id())
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_forbidden(Enrollment::get_resource_type()))?;

    let (lessons, exercises) = tokio::try_join!(
        LessonAnalyticsRow::list_for_course(mm, user, course.id()),
        ExerciseAnalyticsRow::list_for_course(mm, user, course.id()),
    )
    .map_err(fetch_err)?;

    Ok((
        StatusCode::OK,
        Json(CourseAnalyticsResponse::new(&course, &enrollment, lessons, exercises)),
    ))
}
