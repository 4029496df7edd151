use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers both ways of presenting the session token.
pub struct SessionAuthModifier;

impl Modify for SessionAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "CampoCode Forge API", description = "Courses, progress tracking and payments"),
    paths(
        crate::web::routes::account::account_register_handler,
        crate::web::routes::account::account_login_handler,
        crate::web::routes::account::account_logout_handler,
        crate::web::routes::account::account_me_handler,
        crate::web::routes::account::account_list_handler,
        crate::web::routes::account::account_update_handler,
        crate::web::routes::account::account_role_handler,
        crate::web::routes::account::account_delete_handler,
        crate::web::routes::courses::courses_list_handler,
        crate::web::routes::courses::courses_create_handler,
        crate::web::routes::courses::courses_get_handler,
        crate::web::routes::courses::courses_update_handler,
        crate::web::routes::courses::courses_delete_handler,
        crate::web::routes::courses::courses_publish_handler,
        crate::web::routes::courses::courses_outline_handler,
        crate::web::routes::courses::courses_modules_handler,
        crate::web::routes::courses::courses_add_module_handler,
        crate::web::routes::modules::modules_get_handler,
        crate::web::routes::modules::modules_update_handler,
        crate::web::routes::modules::modules_delete_handler,
        crate::web::routes::modules::modules_add_lesson_handler,
        crate::web::routes::lessons::lessons_get_handler,
        crate::web::routes::lessons::lessons_update_handler,
        crate::web::routes::lessons::lessons_delete_handler,
        crate::web::routes::lessons::lessons_progress_handler,
        crate::web::routes::lessons::lessons_exercises_handler,
        crate::web::routes::lessons::lessons_add_exercise_handler,
        crate::web::routes::exercises::exercises_get_handler,
        crate::web::routes::exercises::exercises_update_handler,
        crate::web::routes::exercises::exercises_delete_handler,
        crate::web::routes::exercises::exercises_submit_handler,
        crate::web::routes::exercises::exercises_submissions_handler,
        crate::web::routes::enrollments::enrollments_create_handler,
        crate::web::routes::enrollments::enrollments_list_handler,
        crate::web::routes::enrollments::enrollments_progress_handler,
        crate::web::routes::progress::progress_stats_handler,
        crate::web::routes::progress::progress_leaderboard_handler,
        crate::web::routes::analytics::analytics_dashboard_handler,
        crate::web::routes::analytics::analytics_trend_handler,
        crate::web::routes::analytics::analytics_course_handler,
        crate::web::routes::practice::practice_daily_handler,
        crate::web::routes::practice::practice_browse_handler,
        crate::web::routes::practice::practice_random_handler,
        crate::web::routes::practice::practice_stats_handler,
        crate::web::routes::achievements::achievements_create_handler,
        crate::web::routes::achievements::achievements_list_handler,
        crate::web::routes::achievements::achievements_mine_handler,
        crate::web::routes::achievements::achievements_get_handler,
        crate::web::routes::payments::payments_initiate_handler,
        crate::web::routes::payments::payments_list_handler,
        crate::web::routes::payments::payments_verify_handler,
        crate::web::routes::payments::payments_callback_handler,
        crate::web::routes::chat::chat_handler,
    ),
    tags(
        (name = "account", description = "Registration, sessions and profiles"),
        (name = "courses", description = "Course catalog and authoring"),
        (name = "modules"),
        (name = "lessons"),
        (name = "exercises", description = "Exercises and graded submissions"),
        (name = "enrollments"),
        (name = "progress", description = "Learning statistics and leaderboard"),
        (name = "analytics", description = "Dashboard, activity trend and per-course breakdown"),
        (name = "practice", description = "Daily challenge and practice exercises"),
        (name = "achievements"),
        (name = "payments", description = "Course purchases through the payment gateway"),
        (name = "chat", description = "Learning assistant"),
    ),
    modifiers(&SessionAuthModifier),
)]
pub struct ApiDoc;
