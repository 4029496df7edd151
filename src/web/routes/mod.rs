use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{
    Config,
    model::{HasOwner, ModelManager, ResourceTyped, check_access, ensure_enrolled},
    web::{AppState, AuthenticatedUser, WebError, WebResult, doc::ApiDoc},
};

pub mod account;
pub mod achievements;
pub mod analytics;
pub mod chat;
pub mod courses;
pub mod enrollments;
pub mod exercises;
pub mod lessons;
pub mod modules;
pub mod payments;
pub mod practice;
pub mod progress;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl PaginationQuery {
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

pub fn build_app<S: Send + Sync + Clone + 'static>(
    state: AppState,
    config: &'static Config,
) -> Router<S> {
    let mut router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/v1", get(api_info_handler))
        .nest("/api/v1/account", account::routes(state.clone()))
        .nest("/api/v1/courses", courses::routes(state.clone()))
        .nest("/api/v1/modules", modules::routes(state.clone()))
        .nest("/api/v1/lessons", lessons::routes(state.clone()))
        .nest("/api/v1/exercises", exercises::routes(state.clone()))
        .nest("/api/v1/enrollments", enrollments::routes(state.clone()))
        .nest("/api/v1/progress", progress::routes(state.clone()))
        .nest("/api/v1/analytics", analytics::routes(state.clone()))
        .nest("/api/v1/practice", practice::routes(state.clone()))
        .nest("/api/v1/achievements", achievements::routes(state.clone()))
        .nest("/api/v1/payments", payments::routes(state.clone()))
        .nest("/api/v1/chat", chat::routes(state.clone()))
        .layer(CookieManagerLayer::default())
        .layer(cors_layer(config.app().allowed_origins()))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.app().docs() {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}

/// Without configured origins every origin is allowed, which is only meant
/// for local development.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "name": crate::APPLICATION_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/api/v1/docs",
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let database = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(state.pool().executor())
        .await
        .is_ok();

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if database { "healthy" } else { "degraded" },
            "database": database,
        })),
    )
}

async fn api_info_handler() -> impl IntoResponse {
    Json(json!({
        "version": "v1",
        "resources": [
            "account", "courses", "modules", "lessons", "exercises",
            "enrollments", "progress", "analytics", "practice", "achievements",
            "payments", "chat",
        ],
    }))
}

// Shared handler steps

/// Owner (or admin) check with the failure mapped for `T`.
pub(crate) async fn ensure_owner<T>(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    resource: &T,
) -> WebResult<()>
where
    T: HasOwner<OwnerId = Uuid> + ResourceTyped + Sync,
{
    check_access(mm, user, resource, user.user_id())
        .await
        .map_err(|e| WebError::resource_db_error(T::get_resource_type(), e))
}

pub(crate) async fn ensure_enrolled_in<T: ResourceTyped>(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<()> {
    ensure_enrolled(mm, user, course_id)
        .await
        .map_err(|e| WebError::resource_db_error(T::get_resource_type(), e))
}
