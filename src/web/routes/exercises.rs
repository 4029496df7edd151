use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{Exercise, Submission, SubmissionCreate},
        grading::grade_submission,
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::exercises::{ExerciseBody, SubmissionResponse, SubmitBody},
        error::ErrorResponse,
        middlewares,
        routes::{ensure_enrolled_in, ensure_owner},
        validation::Validator,
    },
};

const MAX_CODE_LENGTH: usize = 100_000;

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/{id}",
            get(exercises_get_handler)
                .put(exercises_update_handler)
                .delete(exercises_delete_handler),
        )
        .route("/{id}/submit", post(exercises_submit_handler))
        .route("/{id}/submissions", get(exercises_submissions_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn find_visible_exercise(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Exercise> {
    Exercise::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Exercise::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Exercise::get_resource_type()))
}

async fn find_enrolled_exercise(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Exercise> {
    let exercise = find_visible_exercise(state, user, id).await?;
    let course_id = exercise
        .course_id(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Exercise::get_resource_type(), e))?;
    ensure_enrolled_in::<Exercise>(state.pool(), user, course_id).await?;
    Ok(exercise)
}

#[utoipa::path(
    get,
    path = "/api/v1/exercises/{id}",
    params(("id" = Uuid, Path, description = "Exercise id")),
    responses(
        (status = 200, description = "Exercise found", body = Exercise),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Exercise not found", body = ErrorResponse),
    ),
    tag = "exercises",
    security(("bearer" = []), ("cookie" = []))
)]
async fn exercises_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let exercise = find_enrolled_exercise(&state, user, id).await?;
    Ok((StatusCode::OK, Json(exercise)))
}

#[utoipa::path(
    put,
    path = "/api/v1/exercises/{id}",
    request_body = ExerciseBody,
    params(("id" = Uuid, Path, description = "Exercise id")),
    responses(
        (status = 200, description = "Exercise updated", body = Exercise),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Exercise not found", body = ErrorResponse),
    ),
    tag = "exercises",
    security(("bearer" = []), ("cookie" = []))
)]
async fn exercises_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExerciseBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let exercise = find_visible_exercise(&state, user, id).await?;
    ensure_owner(state.pool(), user, &exercise).await?;
    Validator::new()
        .title("Exercise", &payload.title)
        .difficulty(&payload.difficulty)
        .non_negative("Points", i64::from(payload.points))
        .finish()?;

    let data = payload.into_create(exercise.lesson_id());
    let updated = exercise
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_db_error(Exercise::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/exercises/{id}",
    params(("id" = Uuid, Path, description = "Exercise id")),
    responses(
        (status = 200, description = "Exercise deleted"),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Exercise not found", body = ErrorResponse),
    ),
    tag = "exercises",
    security(("bearer" = []), ("cookie" = []))
)]
async fn exercises_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let exercise = find_visible_exercise(&state, user, id).await?;
    ensure_owner(state.pool(), user, &exercise).await?;

    exercise
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Exercise::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/exercises/{id}/submit",
    description = "Grades a solution, stores the submission and credits the earned points",
    request_body = SubmitBody,
    params(("id" = Uuid, Path, description = "Exercise id")),
    responses(
        (status = 201, description = "Submission graded", body = SubmissionResponse),
        (status = 400, description = "Code too long", body = ErrorResponse),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Exercise not found", body = ErrorResponse),
    ),
    tag = "exercises",
    security(("bearer" = []), ("cookie" = []))
)]
async fn exercises_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    Validator::new()
        .check(
            payload.code.len() <= MAX_CODE_LENGTH,
            format!("Code must be at most {MAX_CODE_LENGTH} bytes"),
        )
        .finish()?;

    let exercise = find_enrolled_exercise(&state, user, id).await?;
    let mm = state.pool();
    let submission_err = |e| WebError::resource_db_error(Submission::get_resource_type(), e);

    let language = payload
        .language
        .filter(|language| !language.trim().is_empty())
        .map(|language| language.to_lowercase())
        .unwrap_or_else(|| exercise.language().to_string());
    let grade = grade_submission(&payload.code, &language);

    let data = SubmissionCreate {
        exercise_id: exercise.id(),
        code: payload.code,
        language,
        grade: grade.clone(),
    };
    let submission = Submission::create(mm, user, data)
        .await
        .map_err(submission_err)?;

    tracing::info!(
        user_id = %user.user_id(),
        exercise_id = %exercise.id(),
        score = submission.score(),
        "exercise submitted"
    );
    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse::new(&submission, grade)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/exercises/{id}/submissions",
    description = "The caller's submissions for an exercise, newest first",
    params(("id" = Uuid, Path, description = "Exercise id")),
    responses(
        (status = 200, description = "Submissions", body = Vec<Submission>),
        (status = 404, description = "Exercise not found", body = ErrorResponse),
    ),
    tag = "exercises",
    security(("bearer" = []), ("cookie" = []))
)]
async fn exercises_submissions_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let exercise = find_visible_exercise(&state, user, id).await?;

    let submissions = Submission::list_for_exercise(state.pool(), user, exercise.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(submissions)))
}
