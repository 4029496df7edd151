use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tower_cookies::{Cookie, Cookies, cookie::SameSite};

use crate::{
    Config, auth,
    model::{CrudRepository, ResourceTyped, entity::Profile},
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_TOKEN: &str = "SID";

/// Resolves the caller from `Authorization: Bearer <jwt>` or, failing that,
/// from the `SID` cookie. Requests without credentials continue anonymously;
/// invalid credentials are rejected with `401`.
pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| (String::from("Authorization"), token.trim().to_string()));

    let token = bearer.or_else(|| {
        cookies
            .get(AUTH_TOKEN)
            .map(|cookie| (String::from(AUTH_TOKEN), cookie.value().to_string()))
    });

    let Some((source, token)) = token else {
        req.extensions_mut().insert(RequestContext::new(None));
        return Ok(next.run(req).await);
    };

    let claims = auth::process_token(&token, Config::get_or_init(false).await.app().jwt())
        .map_err(|e| WebError::auth_token_invalid(source.as_str(), e))?;

    let Some(id) = claims.claims.user_id() else {
        return Err(WebError::auth_required());
    };

    let profile = Profile::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Profile::get_resource_type(), e))?;

    // deleted accounts keep valid tokens until they expire
    let ctx = profile.map(|profile| profile.actor());
    req.extensions_mut().insert(RequestContext::new(ctx));
    Ok(next.run(req).await)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_TOKEN, token);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie
}
