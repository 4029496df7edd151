use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{
            Achievement, Enrollment, Exercise, Lesson, LessonProgress, LessonProgressUpdate,
            LessonWithProgressRow, Profile, achievement_codes,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::{
            exercises::ExerciseBody,
            learning::{LessonBody, LessonResponse, ProgressBody, ProgressResponse},
        },
        error::ErrorResponse,
        middlewares,
        routes::{ensure_enrolled_in, ensure_owner},
        validation::Validator,
    },
};

/// Points credited when a lesson is completed for the first time.
pub const LESSON_COMPLETION_POINTS: i64 = 10;

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/{id}",
            get(lessons_get_handler)
                .put(lessons_update_handler)
                .delete(lessons_delete_handler),
        )
        .route("/{id}/progress", put(lessons_progress_handler))
        .route(
            "/{id}/exercises",
            get(lessons_exercises_handler).post(lessons_add_exercise_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn find_visible_lesson(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Lesson> {
    Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))
}

/// Resolves a lesson the caller may study: visible, and enrolled (or owner).
async fn find_enrolled_lesson(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<(Lesson, Uuid)> {
    let lesson = find_visible_lesson(state, user, id).await?;
    let course_id = lesson
        .course_id(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;
    ensure_enrolled_in::<Lesson>(state.pool(), user, course_id).await?;
    Ok((lesson, course_id))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}",
    description = "Lesson content together with the caller's progress",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson found", body = LessonResponse),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("bearer" = []), ("cookie" = []))
)]
async fn lessons_get_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    find_enrolled_lesson(&state, user, id).await?;

    let lesson = LessonWithProgressRow::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .map(LessonResponse::from)
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    Ok((StatusCode::OK, Json(lesson)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{id}",
    request_body = LessonBody,
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("bearer" = []), ("cookie" = []))
)]
async fn lessons_update_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<LessonBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = find_visible_lesson(&state, user, id).await?;
    ensure_owner(state.pool(), user, &lesson).await?;
    Validator::new()
        .title("Lesson", &payload.title)
        .lesson_type(&payload.lesson_type)
        .non_negative("Duration", i64::from(payload.duration_minutes))
        .finish()?;

    let data = payload.into_create(lesson.module_id());
    let updated = lesson
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_db_error(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("bearer" = []), ("cookie" = []))
)]
async fn lessons_delete_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = find_visible_lesson(&state, user, id).await?;
    ensure_owner(state.pool(), user, &lesson).await?;

    lesson
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{id}/progress",
    description = "Records progress on a lesson. Reaching 100% completes the lesson once, \
                   credits points and updates the course progress",
    request_body = ProgressBody,
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Progress recorded", body = ProgressResponse),
        (status = 400, description = "Percentage outside [0, 100]", body = ErrorResponse),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("bearer" = []), ("cookie" = []))
)]
async fn lessons_progress_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<ProgressBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    Validator::new()
        .percentage(payload.progress_percentage)
        .non_negative("Time spent", payload.time_spent_seconds)
        .finish()?;

    let (lesson, course_id) = find_enrolled_lesson(&state, user, id).await?;
    let mm = state.pool();
    let progress_err = |e| WebError::resource_db_error(LessonProgress::get_resource_type(), e);

    let data = LessonProgressUpdate {
        lesson_id: lesson.id(),
        progress_percentage: payload.progress_percentage,
        time_spent_seconds: payload.time_spent_seconds,
        notes: payload.notes,
    };
    let (progress, lesson_completed) = LessonProgress::record(mm, user, data)
        .await
        .map_err(progress_err)?;

    if lesson_completed {
        tracing::info!(user_id = %user.user_id(), lesson_id = %lesson.id(), "lesson completed");
        Profile::add_points(mm, user.user_id(), LESSON_COMPLETION_POINTS)
            .await
            .map_err(progress_err)?;
        Achievement::grant_if_absent(mm, user.user_id(), achievement_codes::FIRST_LESSON)
            .await
            .map_err(progress_err)?;
    }

    let mut course_progress = 0.0;
    let mut course_completed = false;
    let enrollment = Enrollment::find_for(mm, user.user_id(), course_id)
        .await
        .map_err(progress_err)?;
    if let Some(enrollment) = enrollment {
        let (enrollment, just_completed) =
            enrollment.recompute_progress(mm).await.map_err(progress_err)?;
        course_progress = enrollment.progress();
        course_completed = enrollment.completed_at().is_some();

        if just_completed {
            tracing::info!(user_id = %user.user_id(), %course_id, "course completed");
            Achievement::grant_if_absent(mm, user.user_id(), achievement_codes::COURSE_COMPLETED)
                .await
                .map_err(progress_err)?;
        }
    }

    let response = ProgressResponse {
        progress,
        lesson_completed,
        course_progress,
        course_completed,
    };
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}/exercises",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Exercises of the lesson", body = Vec<Exercise>),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("bearer" = []), ("cookie" = []))
)]
async fn lessons_exercises_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let (lesson, _) = find_enrolled_lesson(&state, user, id).await?;

    let exercises = Exercise::list_for_lesson(state.pool(), user, lesson.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Exercise::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(exercises)))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{id}/exercises",
    request_body = ExerciseBody,
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 201, description = "Exercise created", body = Exercise),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("bearer" = []), ("cookie" = []))
)]
async fn lessons_add_exercise_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<ExerciseBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = find_visible_lesson(&state, user, id).await?;
    ensure_owner(state.pool(), user, &lesson).await?;
    Validator::new()
        .title("Exercise", &payload.title)
        .difficulty(&payload.difficulty)
        .non_negative("Points", i64::from(payload.points))
        .finish()?;

    let created = Exercise::create(state.pool(), user, payload.into_create(lesson.id()))
        .await
        .map_err(|e| WebError::resource_db_error(Exercise::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}
