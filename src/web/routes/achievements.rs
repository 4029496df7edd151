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
        CrudRepository, PaginatableRepository, ResourceTyped,
        entity::{Achievement, AchievementCreate, EarnedAchievementRow},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        error::ErrorResponse,
        middlewares,
        routes::PaginationQuery,
        validation::Validator,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/",
            get(achievements_list_handler).post(achievements_create_handler),
        )
        .route("/mine", get(achievements_mine_handler))
        .route("/{id}", get(achievements_get_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/achievements",
    request_body = AchievementCreate,
    responses(
        (status = 201, description = "Achievement created", body = Achievement),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 409, description = "Code already used", body = ErrorResponse),
    ),
    tag = "achievements",
    security(("bearer" = []), ("cookie" = []))
)]
async fn achievements_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<AchievementCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if !user.is_admin() {
        return Err(WebError::resource_forbidden(Achievement::get_resource_type()));
    }
    Validator::new()
        .title("Name", &payload.name)
        .check(!payload.code.trim().is_empty(), "Code is required")
        .non_negative("Points", i64::from(payload.points))
        .finish()?;

    let created = Achievement::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_db_error(Achievement::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/achievements",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Achievement catalog", body = crate::model::Page<Achievement>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "achievements",
    security(("bearer" = []), ("cookie" = []))
)]
async fn achievements_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let achievements = Achievement::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::resource_fetch_error(Achievement::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(achievements)))
}

#[utoipa::path(
    get,
    path = "/api/v1/achievements/mine",
    responses(
        (status = 200, description = "Achievements earned by the caller", body = Vec<EarnedAchievementRow>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "achievements",
    security(("bearer" = []), ("cookie" = []))
)]
async fn achievements_mine_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let earned = Achievement::list_earned(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Achievement::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(earned)))
}

#[utoipa::path(
    get,
    path = "/api/v1/achievements/{id}",
    params(("id" = Uuid, Path, description = "Achievement id")),
    responses(
        (status = 200, description = "Achievement found", body = Achievement),
        (status = 404, description = "Achievement not found", body = ErrorResponse),
    ),
    tag = "achievements",
    security(("bearer" = []), ("cookie" = []))
)]
async fn achievements_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let achievement = Achievement::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Achievement::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Achievement::get_resource_type()))?;

    Ok((StatusCode::OK, Json(achievement)))
}
