use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    Config,
    auth::{self, UserClaims, hash_password, verify_password},
    model::{
        CrudRepository, DatabaseError, PaginatableRepository, ResourceTyped,
        entity::{Profile, ProfileCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::account::{AuthResponse, LoginBody, ProfileUpdateBody, RegisterBody, RoleUpdateBody},
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN, session_cookie},
        routes::{PaginationQuery, ensure_owner},
        validation::Validator,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/page", get(account_list_handler))
        .route("/me", get(account_me_handler))
        .route(
            "/{id}",
            put(account_update_handler).delete(account_delete_handler),
        )
        .route("/{id}/role", put(account_role_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/register", post(account_register_handler))
        .route("/login", post(account_login_handler))
        .route("/logout", post(account_logout_handler))
        .merge(protected)
        .with_state(state)
}

fn profile_error(e: DatabaseError) -> WebError {
    match e {
        DatabaseError::Conflict(_) => WebError::registration_conflict(),
        e => WebError::resource_db_error(Profile::get_resource_type(), e),
    }
}

async fn issue_session(cookies: &Cookies, profile: &Profile) -> WebResult<String> {
    let config = Config::get_or_init(false).await;
    let claims = UserClaims::for_user(profile.id(), config.app().token_ttl_minutes());
    let token = auth::generate_token(claims, config.app().jwt())
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    cookies.add(session_cookie(token.clone()));
    Ok(token)
}

#[utoipa::path(
    post,
    path = "/api/v1/account/register",
    request_body = RegisterBody,
    description = "Creates a new profile and opens a session",
    responses(
        (status = 201, description = "Profile created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Username or e-mail already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account"
)]
async fn account_register_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterBody>,
) -> WebResult<impl IntoResponse> {
    let role = payload.role.unwrap_or(UserRole::Student);
    if role == UserRole::Admin {
        return Err(WebError::registration_role_not_allowed(role.as_str()));
    }

    Validator::new()
        .username(&payload.username)
        .email(&payload.email)
        .password(&payload.password)
        .finish()?;

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let data = ProfileCreateUpdate {
        username: payload.username,
        email: payload.email.to_lowercase(),
        full_name: payload.full_name.trim().to_string(),
        password_hash: hash,
        role,
    };

    let created = Profile::create(state.pool(), &AuthenticatedUser::admin(), data)
        .await
        .map_err(profile_error)?;

    tracing::info!(user_id = %created.id(), role = %role, "profile registered");
    let token = issue_session(&cookies, &created).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::bearer(token, created))))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/login",
    description = "Authorizes a profile by username or e-mail",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
)]
async fn account_login_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginBody>,
) -> WebResult<impl IntoResponse> {
    let found = Profile::find_by_login(state.pool(), &AuthenticatedUser::admin(), payload.login.trim())
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?
        .ok_or_else(WebError::auth_invalid_credentials)?;

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;

    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let token = issue_session(&cookies, &found).await?;
    Ok((StatusCode::OK, Json(AuthResponse::bearer(token, found))))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/logout",
    description = "Drops the session cookie",
    responses((status = 204, description = "Signed out")),
    tag = "account",
)]
async fn account_logout_handler(cookies: Cookies) -> impl IntoResponse {
    let mut cookie = Cookie::from(AUTH_TOKEN);
    cookie.set_path("/");
    cookies.remove(cookie);
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/api/v1/account/me",
    responses(
        (status = 200, description = "Current profile", body = Profile),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "account",
    security(("bearer" = []), ("cookie" = []))
)]
async fn account_me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = Profile::find_by_id(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Profile::get_resource_type()))?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<Profile>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(("bearer" = []), ("cookie" = []))
)]
async fn account_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if !user.is_admin() {
        return Err(WebError::resource_forbidden(Profile::get_resource_type()));
    }

    let profiles = Profile::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(profiles)))
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{id}",
    request_body = ProfileUpdateBody,
    params(("id" = Uuid, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not your profile", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse),
        (status = 409, description = "Username or e-mail already taken", body = ErrorResponse),
    ),
    tag = "account",
    security(("bearer" = []), ("cookie" = []))
)]
async fn account_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProfileUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let found = Profile::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Profile::get_resource_type()))?;
    ensure_owner(state.pool(), user, &found).await?;

    let mut validator = Validator::new();
    if let Some(username) = &payload.username {
        validator.username(username);
    }
    if let Some(email) = &payload.email {
        validator.email(email);
    }
    if let Some(password) = &payload.password {
        validator.password(password);
    }
    validator.finish()?;

    let password_hash = match &payload.password {
        Some(password) => hash_password(password).map_err(WebError::server_crypt_error)?,
        None => String::new(), // keeps the stored hash
    };

    let data = ProfileCreateUpdate {
        username: payload.username.unwrap_or_else(|| found.username().to_string()),
        email: payload
            .email
            .map(|email| email.to_lowercase())
            .unwrap_or_else(|| found.email().to_string()),
        full_name: payload
            .full_name
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|| found.full_name().to_string()),
        password_hash,
        role: found.role(),
    };

    let updated = found
        .update(state.pool(), user, data)
        .await
        .map_err(profile_error)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{id}/role",
    request_body = RoleUpdateBody,
    params(("id" = Uuid, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Role changed", body = Profile),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse),
    ),
    tag = "account",
    security(("bearer" = []), ("cookie" = []))
)]
async fn account_role_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if !user.is_admin() {
        return Err(WebError::resource_forbidden(Profile::get_resource_type()));
    }

    let found = Profile::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Profile::get_resource_type()))?;

    let updated = found
        .set_role(state.pool(), user, payload.role)
        .await
        .map_err(profile_error)?;

    tracing::info!(user_id = %updated.id(), role = %payload.role, "role changed");
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/account/{id}",
    description = "Deletes the profile and everything it owns",
    params(("id" = Uuid, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile deleted"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not your profile", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse),
    ),
    tag = "account",
    security(("bearer" = []), ("cookie" = []))
)]
async fn account_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let found = Profile::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Profile::get_resource_type()))?;
    ensure_owner(state.pool(), user, &found).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
