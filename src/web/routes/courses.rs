use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped,
        entity::{Course, CourseCreateUpdate, Enrollment, Module, ModuleOutlineRow},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::{
            courses::{CourseBody, CourseOutline, ModuleWithLessons, PublishBody},
            learning::ModuleBody,
        },
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, ensure_owner},
        validation::Validator,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(courses_list_handler).post(courses_create_handler))
        .route(
            "/{id}",
            get(courses_get_handler)
                .put(courses_update_handler)
                .delete(courses_delete_handler),
        )
        .route("/{id}/publish", put(courses_publish_handler))
        .route("/{id}/outline", get(courses_outline_handler))
        .route(
            "/{id}/modules",
            get(courses_modules_handler).post(courses_add_module_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Hidden and missing courses look the same to the caller.
pub(crate) async fn find_visible_course(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Course> {
    Course::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))
}

fn validate_course(body: &CourseBody) -> WebResult<()> {
    Validator::new()
        .course(&body.title, &body.description, &body.difficulty)
        .non_negative("Price", body.price)
        .check(
            body.currency.len() == 3 && body.currency.chars().all(|c| c.is_ascii_alphabetic()),
            "Currency must be a 3 letter code",
        )
        .finish()
}

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    description = "Lists published courses, plus drafts owned by the caller",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Requested page", body = crate::model::Page<Course>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let courses = Course::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses",
    description = "Creates an unpublished course owned by the caller",
    request_body = CourseBody,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Only instructors and admins author courses", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if !user.can_author() {
        return Err(WebError::resource_forbidden(Course::get_resource_type()));
    }
    validate_course(&payload)?;

    let created = Course::create(state.pool(), user, CourseCreateUpdate::from(payload))
        .await
        .map_err(|e| WebError::resource_db_error(Course::get_resource_type(), e))?;

    tracing::info!(course_id = %created.id(), "course created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course found", body = Course),
        (status = 404, description = "Course not found or not published", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, id).await?;
    Ok((StatusCode::OK, Json(course)))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    request_body = CourseBody,
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, id).await?;
    ensure_owner(state.pool(), user, &course).await?;
    validate_course(&payload)?;

    let updated = course
        .update(state.pool(), user, CourseCreateUpdate::from(payload))
        .await
        .map_err(|e| WebError::resource_db_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted with its content"),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, id).await?;
    ensure_owner(state.pool(), user, &course).await?;

    course
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}/publish",
    request_body = PublishBody,
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Publication state changed", body = Course),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_publish_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PublishBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, id).await?;
    ensure_owner(state.pool(), user, &course).await?;

    let updated = course
        .set_published(state.pool(), user, payload.published)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    tracing::info!(course_id = %updated.id(), published = payload.published, "course publication changed");
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/outline",
    description = "Course with its modules and lesson titles, marked with the caller's completion",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Outline", body = CourseOutline),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_outline_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, id).await?;

    let (rows, enrollment) = tokio::try_join!(
        ModuleOutlineRow::fetch_for_course(state.pool(), user, course.id()),
        Enrollment::find_for(state.pool(), user.user_id(), course.id()),
    )
    .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    let modules = ModuleWithLessons::from_rows(rows)
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    let outline = CourseOutline {
        course,
        enrolled: enrollment.is_some(),
        modules,
    };
    Ok((StatusCode::OK, Json(outline)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Modules of the course", body = Vec<Module>),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_modules_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, id).await?;

    let modules = Module::list_for_course(state.pool(), user, course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(modules)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/modules",
    request_body = ModuleBody,
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 201, description = "Module created", body = Module),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_add_module_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModuleBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, id).await?;
    ensure_owner(state.pool(), user, &course).await?;
    Validator::new().title("Module", &payload.title).finish()?;

    let created = Module::create(state.pool(), user, payload.into_create(course.id()))
        .await
        .map_err(|e| WebError::resource_db_error(Module::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}
