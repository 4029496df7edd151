mod common;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, STUDENT_PASSWORD, INSTRUCTOR_PASSWORD, authored_course_flow, create_admin, id_of,
    login_action, register_action, setup_server, setup_test_db,
};

#[tokio::test]
async fn route_course_create_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(Action::new("anonymous create", "POST", "/api/v1/courses")
            .with_body(json!({ "title": "Nope", "description": "Nope" }))
            .with_expect(StatusCode::UNAUTHORIZED))
        .step(register_action("pupil", STUDENT_PASSWORD, "student"))
        .step(
            Action::new("student create", "POST", "/api/v1/courses")
                .with_body(json!({ "title": "Mine", "description": "Mine" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(register_action("author", INSTRUCTOR_PASSWORD, "instructor"))
        .step(
            Action::new("invalid course", "POST", "/api/v1/courses")
                .with_body(json!({
                    "title": "",
                    "description": "",
                    "difficulty": "legendary",
                    "price": -5,
                    "currency": "shillings",
                }))
                .assert_body(|body| {
                    assert!(body.contains("Validation error"));
                    assert!(body.contains("Currency"));
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("instructor create", "POST", "/api/v1/courses")
                .with_body(json!({
                    "title": "  Web Basics ",
                    "description": "HTML and CSS",
                    "currency": "usd",
                }))
                .assert_body(|body| {
                    let course: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(course["title"], "Web Basics");
                    assert_eq!(course["currency"], "USD");
                    assert_eq!(course["is_published"], false);
                    assert_eq!(course["difficulty"], "beginner");
                })
                .with_expect(StatusCode::CREATED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_course_visibility_test() {
    let pool = setup_test_db().await;
    create_admin(&pool, "root", "Adm1n!pass").await;
    let mut server = setup_server(&pool).await;

    authored_course_flow(Flow::new(), 0, false)
        // the author sees the draft
        .step(
            Action::new("author lists", "GET", "/api/v1/courses")
                .assert_body(|body| assert!(body.contains("\"total\":1"))),
        )
        .step(register_action("viewer", STUDENT_PASSWORD, "student"))
        .step(
            Action::new("student lists", "GET", "/api/v1/courses")
                .assert_body(|body| assert!(body.contains("\"total\":0"))),
        )
        .step(
            Action::new("student gets draft", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}", id_of(ctx, "course")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("student reads draft module", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/modules/{}", id_of(ctx, "module")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("student enrolls into draft", "POST", "/api/v1/enrollments")
                .with_dyn_body(|ctx| json!({ "course_id": id_of(ctx, "course") }))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(login_action("root", "Adm1n!pass").with_clear_cookies(true))
        .step(
            Action::new("admin gets draft", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}", id_of(ctx, "course"))),
        )
        .step(login_action("tutor", INSTRUCTOR_PASSWORD).with_clear_cookies(true))
        .step(
            Action::new("publish", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/publish", id_of(ctx, "course")))
                .with_body(json!({ "published": true }))
                .assert_body(|body| assert!(body.contains("\"is_published\":true"))),
        )
        .step(login_action("viewer", STUDENT_PASSWORD).with_clear_cookies(true))
        .step(
            Action::new("student gets published", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}", id_of(ctx, "course"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_course_ownership_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    authored_course_flow(Flow::new(), 0, true)
        .step(register_action("rival", INSTRUCTOR_PASSWORD, "instructor"))
        .step(
            Action::new("rival updates course", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}", id_of(ctx, "course")))
                .with_body(json!({ "title": "Taken", "description": "Taken" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("rival adds module", "POST", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/modules", id_of(ctx, "course")))
                .with_body(json!({ "title": "Extra" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("rival edits lesson", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", id_of(ctx, "lesson1")))
                .with_body(json!({ "title": "Changed" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("rival deletes exercise", "DELETE", "")
                .with_dyn_path(|ctx| format!("/api/v1/exercises/{}", id_of(ctx, "exercise")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(login_action("tutor", INSTRUCTOR_PASSWORD).with_clear_cookies(true))
        .step(
            Action::new("owner renames lesson", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", id_of(ctx, "lesson2")))
                .with_body(json!({ "title": "Functions in depth", "lesson_type": "video" }))
                .assert_body(|body| assert!(body.contains("Functions in depth"))),
        )
        .step(
            Action::new("owner rejects bad lesson type", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", id_of(ctx, "lesson2")))
                .with_body(json!({ "title": "Functions", "lesson_type": "podcast" }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("owner deletes course", "DELETE", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}", id_of(ctx, "course"))),
        )
        .step(
            Action::new("lesson went with it", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", id_of(ctx, "lesson1")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_course_outline_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    authored_course_flow(Flow::new(), 0, true)
        .step(
            Action::new("outline", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/outline", id_of(ctx, "course")))
                .assert_body(|body| {
                    let outline: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(outline["enrolled"], false);
                    let modules = outline["modules"].as_array().unwrap();
                    assert_eq!(modules.len(), 1);
                    let lessons = modules[0]["lessons"].as_array().unwrap();
                    assert_eq!(lessons.len(), 2);
                    assert_eq!(lessons[0]["title"], "Hello world");
                    assert_eq!(lessons[1]["title"], "Functions");
                    assert_eq!(lessons[0]["completed"], false);
                }),
        )
        .step(
            Action::new("modules", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/modules", id_of(ctx, "course")))
                .assert_body(|body| assert!(body.contains("Getting started"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_service_info_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(Action::new("root", "GET", "/").assert_body(|body| assert!(body.contains("campocode-forge"))))
        .step(Action::new("health", "GET", "/health").assert_body(|body| {
            assert!(body.contains("\"status\":\"healthy\""));
            assert!(body.contains("\"database\":true"));
        }))
        .step(Action::new("api info", "GET", "/api/v1").assert_body(|body| assert!(body.contains("enrollments"))))
        .run(&mut server, pool)
        .await;
}
