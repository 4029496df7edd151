mod common;
use reqwest::StatusCode;
use serde_json::{Value, json};

use std::future::IntoFuture;

use axum_test::TestServer;

use crate::common::{
    Action, Flow, INSTRUCTOR_PASSWORD, STUDENT_PASSWORD, authored_course_flow, id_of,
    register_action, setup_server, setup_test_db,
};

fn enroll_action() -> Action {
    Action::new("enroll", "POST", "/api/v1/enrollments")
        .with_dyn_body(|ctx| json!({ "course_id": id_of(ctx, "course") }))
}

fn progress_action(lesson: &'static str, percentage: f64) -> Action {
    Action::new("lesson progress", "PUT", "")
        .with_dyn_path(move |ctx| format!("/api/v1/lessons/{}/progress", id_of(ctx, lesson)))
        .with_body(json!({ "progress_percentage": percentage, "time_spent_seconds": 120 }))
}

#[tokio::test]
async fn route_enrollment_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    authored_course_flow(Flow::new(), 0, true)
        .step(register_action("learner", STUDENT_PASSWORD, "student"))
        .step(
            Action::new("lesson before enrolling", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", id_of(ctx, "lesson1")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            enroll_action()
                .assert_body(|body| {
                    let enrollment: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(enrollment["progress"], 0.0);
                    assert!(enrollment["completed_at"].is_null());
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(enroll_action().with_expect(StatusCode::CONFLICT))
        .step(
            Action::new("first enrollment achievement", "GET", "/api/v1/achievements/mine")
                .assert_body(|body| {
                    let earned: Vec<Value> = serde_json::from_str(body).unwrap();
                    assert_eq!(earned.len(), 1);
                    assert_eq!(earned[0]["code"], "first_enrollment");
                }),
        )
        .step(
            Action::new("my enrollments", "GET", "/api/v1/enrollments")
                .assert_body(|body| assert!(body.contains("Python Fundamentals"))),
        )
        .step(
            Action::new("outline marks enrollment", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/outline", id_of(ctx, "course")))
                .assert_body(|body| assert!(body.contains("\"enrolled\":true"))),
        )
        .step(
            Action::new("lesson after enrolling", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", id_of(ctx, "lesson1")))
                .assert_body(|body| {
                    let lesson: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(lesson["title"], "Hello world");
                    assert_eq!(lesson["progress_percentage"], 0.0);
                    assert_eq!(lesson["completed"], false);
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_lesson_progress_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    authored_course_flow(Flow::new(), 0, true)
        .step(register_action("learner", STUDENT_PASSWORD, "student"))
        .step(progress_action("lesson1", 50.0).with_expect(StatusCode::FORBIDDEN))
        .step(enroll_action().with_expect(StatusCode::CREATED))
        .step(progress_action("lesson1", 150.0).with_expect(StatusCode::BAD_REQUEST))
        .step(progress_action("lesson1", -1.0).with_expect(StatusCode::BAD_REQUEST))
        .step(
            progress_action("lesson1", 50.0).assert_body(|body| {
                let progress: Value = serde_json::from_str(body).unwrap();
                assert_eq!(progress["lesson_completed"], false);
                assert_eq!(progress["course_progress"], 0.0);
            }),
        )
        .step(
            progress_action("lesson1", 100.0).assert_body(|body| {
                let progress: Value = serde_json::from_str(body).unwrap();
                assert_eq!(progress["lesson_completed"], true);
                assert_eq!(progress["course_progress"], 50.0);
                assert_eq!(progress["course_completed"], false);
                assert_eq!(progress["progress"]["time_spent_seconds"], 240);
            }),
        )
        // completing again awards nothing new
        .step(
            progress_action("lesson1", 100.0)
                .assert_body(|body| assert!(body.contains("\"lesson_completed\":false"))),
        )
        .step(
            progress_action("lesson2", 100.0).assert_body(|body| {
                let progress: Value = serde_json::from_str(body).unwrap();
                assert_eq!(progress["course_progress"], 100.0);
                assert_eq!(progress["course_completed"], true);
            }),
        )
        .step(
            Action::new("course progress", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/enrollments/{}/progress", id_of(ctx, "course")))
                .assert_body(|body| {
                    let progress: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(progress["total_lessons"], 2);
                    assert_eq!(progress["lessons_completed"], 2);
                    assert_eq!(progress["overall_progress"], 100.0);
                    assert!(!progress["completed_at"].is_null());
                }),
        )
        .step(
            Action::new("achievements", "GET", "/api/v1/achievements/mine").assert_body(|body| {
                assert!(body.contains("first_enrollment"));
                assert!(body.contains("first_lesson"));
                assert!(body.contains("course_completed"));
                assert!(!body.contains("first_exercise"));
            }),
        )
        .step(
            Action::new("stats", "GET", "/api/v1/progress/stats").assert_body(|body| {
                let stats: Value = serde_json::from_str(body).unwrap();
                assert_eq!(stats["total_courses_enrolled"], 1);
                assert_eq!(stats["completed_courses"], 1);
                assert_eq!(stats["total_lessons_completed"], 2);
                assert_eq!(stats["total_exercises_submitted"], 0);
                // 120s on three accepted updates of lesson1 and one of lesson2
                assert_eq!(stats["total_study_time_minutes"], 8);
                assert_eq!(stats["average_progress"], 100.0);
            }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_exercise_submit_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    authored_course_flow(Flow::new(), 0, true)
        .step(register_action("coder", STUDENT_PASSWORD, "student"))
        .step(
            Action::new("submit before enrolling", "POST", "")
                .with_dyn_path(|ctx| format!("/api/v1/exercises/{}/submit", id_of(ctx, "exercise")))
                .with_body(json!({ "code": "print(1)" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(enroll_action().with_expect(StatusCode::CREATED))
        .step(
            Action::new("lesson exercises", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/exercises", id_of(ctx, "lesson1")))
                .assert_body(|body| assert!(body.contains("Add two numbers"))),
        )
        .step(
            Action::new("submit", "POST", "")
                .with_dyn_path(|ctx| format!("/api/v1/exercises/{}/submit", id_of(ctx, "exercise")))
                .with_body(json!({ "code": "def add(a, b):\n    return a + b" }))
                .assert_body(|body| {
                    let result: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(result["score"], 85.0);
                    assert_eq!(result["points_earned"], 8);
                    assert_eq!(result["test_results"].as_array().unwrap().len(), 3);
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("blank submit", "POST", "")
                .with_dyn_path(|ctx| format!("/api/v1/exercises/{}/submit", id_of(ctx, "exercise")))
                .with_body(json!({ "code": "   " }))
                .assert_body(|body| assert!(body.contains("\"score\":0.0")))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("my submissions", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/exercises/{}/submissions", id_of(ctx, "exercise")))
                .assert_body(|body| {
                    let submissions: Vec<Value> = serde_json::from_str(body).unwrap();
                    assert_eq!(submissions.len(), 2);
                }),
        )
        .step(
            Action::new("me", "GET", "/api/v1/account/me").assert_body(|body| {
                let profile: Value = serde_json::from_str(body).unwrap();
                // 8 from grading, 10 each for first_enrollment and first_exercise,
                // nothing for the blank attempt
                assert_eq!(profile["total_points"], 28);
            }),
        )
        .step(
            Action::new("achievements", "GET", "/api/v1/achievements/mine")
                .assert_body(|body| assert!(body.contains("first_exercise"))),
        )
        .step(
            Action::new("course progress", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/enrollments/{}/progress", id_of(ctx, "course")))
                .assert_body(|body| {
                    let progress: Value = serde_json::from_str(body).unwrap();
                    let exercises = progress["exercise_progress"].as_array().unwrap();
                    assert_eq!(exercises.len(), 1);
                    assert_eq!(exercises[0]["best_score"], 85.0);
                    assert_eq!(exercises[0]["attempts_count"], 2);
                }),
        )
        .step(
            Action::new("leaderboard", "GET", "/api/v1/progress/leaderboard")
                .with_param("limit", "5")
                .assert_body(|body| {
                    let board: Vec<Value> = serde_json::from_str(body).unwrap();
                    assert_eq!(board[0]["username"], "coder");
                    assert_eq!(board[0]["rank"], 1);
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_achievement_catalog_test() {
    let pool = setup_test_db().await;
    common::create_admin(&pool, "root", "Adm1n!pass").await;
    let mut server = setup_server(&pool).await;

    let badge = json!({
        "code": "night_owl",
        "name": "Night owl",
        "description": "Studied after midnight",
        "points": 5,
        "icon": null,
    });

    Flow::new()
        .step(register_action("learner", STUDENT_PASSWORD, "student"))
        .step(
            Action::new("student creates", "POST", "/api/v1/achievements")
                .with_body(badge.clone())
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(common::login_action("root", "Adm1n!pass").with_clear_cookies(true))
        .step(
            Action::new("admin creates", "POST", "/api/v1/achievements")
                .with_body(badge.clone())
                .with_expect(StatusCode::CREATED)
                .with_save_as("badge"),
        )
        .step(
            Action::new("duplicate code", "POST", "/api/v1/achievements")
                .with_body(badge)
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("catalog", "GET", "/api/v1/achievements")
                // four seeded plus the new one
                .assert_body(|body| assert!(body.contains("\"total\":5"))),
        )
        .step(
            Action::new("get one", "GET", "")
                .with_dyn_path(|ctx| format!("/api/v1/achievements/{}", id_of(ctx, "badge")))
                .assert_body(|body| assert!(body.contains("night_owl"))),
        )
        .run(&mut server, pool)
        .await;
}

async fn register_token(server: &TestServer, name: &str, password: &str, role: &str) -> String {
    let resp = server
        .post("/api/v1/account/register")
        .json(&json!({
            "username": name,
            "email": format!("{name}@forge.test"),
            "password": password,
            "role": role,
        }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    resp.json::<Value>()["token"].as_str().unwrap().to_string()
}

async fn published_course(server: &TestServer, token: &str, title: &str) -> String {
    let resp = server
        .post("/api/v1/courses")
        .authorization_bearer(token)
        .json(&json!({ "title": title, "description": "Free course" }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    let id = resp.json::<Value>()["id"].as_str().unwrap().to_string();

    server
        .put(&format!("/api/v1/courses/{id}/publish"))
        .authorization_bearer(token)
        .json(&json!({ "published": true }))
        .await
        .assert_status_ok();
    id
}

#[tokio::test]
async fn route_concurrent_enrollment_test() {
    let pool = setup_test_db().await;
    let server = setup_server(&pool).await;

    let author = register_token(&server, "tutor", INSTRUCTOR_PASSWORD, "instructor").await;
    let rust = published_course(&server, &author, "Rust Basics").await;
    let sql = published_course(&server, &author, "SQL Basics").await;
    let learner = register_token(&server, "racer", STUDENT_PASSWORD, "student").await;

    let enroll = |course: &str| {
        server
            .post("/api/v1/enrollments")
            .authorization_bearer(&learner)
            .json(&json!({ "course_id": course }))
            .into_future()
    };

    // same course twice at once: the unique pair lets exactly one through
    let (first, second) = tokio::join!(enroll(&rust), enroll(&rust));
    let mut statuses = [first.status_code(), second.status_code()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let other = register_token(&server, "racer2", STUDENT_PASSWORD, "student").await;
    let enroll_other = |course: &str| {
        server
            .post("/api/v1/enrollments")
            .authorization_bearer(&other)
            .json(&json!({ "course_id": course }))
            .into_future()
    };

    // two different courses at once still earn the first enrollment badge
    let (a, b) = tokio::join!(enroll_other(&rust), enroll_other(&sql));
    a.assert_status(StatusCode::CREATED);
    b.assert_status(StatusCode::CREATED);

    for token in [&learner, &other] {
        let earned = server
            .get("/api/v1/achievements/mine")
            .authorization_bearer(token)
            .await
            .json::<Vec<Value>>();
        let badges = earned
            .iter()
            .filter(|a| a["code"] == "first_enrollment")
            .count();
        assert_eq!(badges, 1);
    }

    drop(pool);
}
