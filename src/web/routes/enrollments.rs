use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    model::{
        ResourceTyped,
        entity::{
            Achievement, Enrollment, EnrollmentWithCourseRow, LessonProgress, Payment, Submission,
            achievement_codes,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::learning::{CourseProgressResponse, EnrollBody},
        error::ErrorResponse,
        middlewares,
        routes::courses::find_visible_course,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(enrollments_list_handler).post(enrollments_create_handler))
        .route("/{course_id}/progress", get(enrollments_progress_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/enrollments",
    description = "Enrolls the caller into a course. Paid courses need a completed payment first",
    request_body = EnrollBody,
    responses(
        (status = 201, description = "Enrolled", body = Enrollment),
        (status = 402, description = "Course requires a completed payment", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Already enrolled", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(("bearer" = []), ("cookie" = []))
)]
async fn enrollments_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<EnrollBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, payload.course_id).await?;
    let mm = state.pool();
    let enrollment_err = |e| WebError::resource_db_error(Enrollment::get_resource_type(), e);

    let existing = Enrollment::find_for(mm, user.user_id(), course.id())
        .await
        .map_err(enrollment_err)?;
    if existing.is_some() {
        return Err(WebError::resource_conflict(
            Enrollment::get_resource_type(),
            "Already enrolled in this course",
        ));
    }

    if !course.is_free() {
        let paid = Payment::has_completed(mm, user.user_id(), course.id())
            .await
            .map_err(enrollment_err)?;
        if !paid {
            return Err(WebError::payment_required(Enrollment::get_resource_type()));
        }
    }

    let created = Enrollment::create(mm, user, course.id())
        .await
        .map_err(enrollment_err)?;

    // no-op after the first enrollment
    Achievement::grant_if_absent(mm, user.user_id(), achievement_codes::FIRST_ENROLLMENT)
        .await
        .map_err(enrollment_err)?;

    tracing::info!(user_id = %user.user_id(), course_id = %course.id(), "enrolled");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments",
    description = "The caller's enrollments, newest first",
    responses(
        (status = 200, description = "Enrollments", body = Vec<EnrollmentWithCourseRow>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(("bearer" = []), ("cookie" = []))
)]
async fn enrollments_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollments = Enrollment::list_for_user(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(enrollments)))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/{course_id}/progress",
    description = "Per-lesson and per-exercise progress of the caller in a course",
    params(("course_id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course progress", body = CourseProgressResponse),
        (status = 404, description = "Not enrolled in the course", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(("bearer" = []), ("cookie" = []))
)]
async fn enrollments_progress_handler(
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
        .ok_or_else(|| WebError::resource_not_found(Enrollment::get_resource_type()))?;

    let (total_lessons, lessons, exercises) = tokio::try_join!(
        course.lesson_count(mm),
        LessonProgress::list_for_course(mm, user, course.id()),
        Submission::scores_for_course(mm, user, course.id()),
    )
    .map_err(fetch_err)?;

    let response = CourseProgressResponse::new(
        &enrollment,
        course.title().to_string(),
        total_lessons,
        lessons,
        exercises,
    );
    Ok((StatusCode::OK, Json(response)))
}
