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
        entity::{Lesson, Module, ModuleCreate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::learning::{LessonBody, ModuleBody},
        error::ErrorResponse,
        middlewares,
        routes::ensure_owner,
        validation::Validator,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/{id}",
            get(modules_get_handler)
                .put(modules_update_handler)
                .delete(modules_delete_handler),
        )
        .route("/{id}/lessons", post(modules_add_lesson_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn find_visible_module(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Module> {
    Module::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Module::get_resource_type()))
}

#[utoipa::path(
    get,
    path = "/api/v1/modules/{id}",
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module found", body = Module),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("bearer" = []), ("cookie" = []))
)]
async fn modules_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = find_visible_module(&state, user, id).await?;
    Ok((StatusCode::OK, Json(module)))
}

#[utoipa::path(
    put,
    path = "/api/v1/modules/{id}",
    request_body = ModuleBody,
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module updated", body = Module),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("bearer" = []), ("cookie" = []))
)]
async fn modules_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModuleBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = find_visible_module(&state, user, id).await?;
    ensure_owner(state.pool(), user, &module).await?;
    Validator::new().title("Module", &payload.title).finish()?;

    let data: ModuleCreate = payload.into_create(module.course_id());
    let updated = module
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_db_error(Module::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/modules/{id}",
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module deleted with its lessons"),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("bearer" = []), ("cookie" = []))
)]
async fn modules_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = find_visible_module(&state, user, id).await?;
    ensure_owner(state.pool(), user, &module).await?;

    module
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/modules/{id}/lessons",
    request_body = LessonBody,
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 201, description = "Lesson created", body = Lesson),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the course instructor", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("bearer" = []), ("cookie" = []))
)]
async fn modules_add_lesson_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LessonBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = find_visible_module(&state, user, id).await?;
    ensure_owner(state.pool(), user, &module).await?;
    Validator::new()
        .title("Lesson", &payload.title)
        .lesson_type(&payload.lesson_type)
        .non_negative("Duration", i64::from(payload.duration_minutes))
        .finish()?;

    let created = Lesson::create(state.pool(), user, payload.into_create(module.id()))
        .await
        .map_err(|e| WebError::resource_db_error(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}
