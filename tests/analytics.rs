mod common;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, INSTRUCTOR_PASSWORD, STUDENT_PASSWORD, authored_course_flow, id_of,
    login_action, register_action, setup_server, setup_test_db,
};

fn enroll_action() -> Action {
    Action::new("enroll", "POST", "/api/v1/enrollments")
        .with_dyn_body(|ctx| json!({ "course_id": id_of(ctx, "course") }))
}

fn course_analytics_action() -> Action {
    Action::new("course analytics", "GET", "")
        .with_dyn_path(|ctx| format!("/api/v1/analytics/courses/{}", id_of(ctx, "course")))
}

#[tokio::test]
async fn route_analytics_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    authored_course_flow(Flow::new(), 0, true)
        .step(register_action("learner", STUDENT_PASSWORD, "student"))
        .step(course_analytics_action().with_expect(StatusCode::FORBIDDEN))
        .step(
            Action::new("empty dashboard", "GET", "/api/v1/analytics/dashboard").assert_body(|body| {
                let dashboard: Value = serde_json::from_str(body).unwrap();
                assert_eq!(dashboard["user_info"]["username"], "learner");
                assert_eq!(dashboard["overview"]["total_courses_enrolled"], 0);
                assert_eq!(dashboard["overview"]["completion_rate"], 0.0);
                assert!(dashboard["course_performance"].as_array().unwrap().is_empty());
            }),
        )
        .step(enroll_action().with_expect(StatusCode::CREATED))
        .step(
            Action::new("finish first lesson", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/progress", id_of(ctx, "lesson1")))
                .with_body(json!({ "progress_percentage": 100.0, "time_spent_seconds": 120 })),
        )
        .step(
            Action::new("submit", "POST", "")
                .with_dyn_path(|ctx| format!("/api/v1/exercises/{}/submit", id_of(ctx, "exercise")))
                .with_body(json!({ "code": "def add(a, b):\n    return a + b" }))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("dashboard", "GET", "/api/v1/analytics/dashboard").assert_body(|body| {
                let dashboard: Value = serde_json::from_str(body).unwrap();
                let overview = &dashboard["overview"];
                assert_eq!(overview["total_courses_enrolled"], 1);
                assert_eq!(overview["completed_courses"], 0);
                assert_eq!(overview["total_lessons_completed"], 1);
                assert_eq!(overview["total_exercises_submitted"], 1);
                assert_eq!(overview["total_study_time_minutes"], 2);

                let courses = dashboard["course_performance"].as_array().unwrap();
                assert_eq!(courses.len(), 1);
                assert_eq!(courses[0]["title"], "Python Fundamentals");
                assert_eq!(courses[0]["progress"], 50.0);
                assert_eq!(courses[0]["lessons_completed"], 1);
                assert_eq!(courses[0]["exercises_completed"], 1);
                assert_eq!(courses[0]["points_earned"], 8);
            }),
        )
        .step(
            Action::new("weekly trend", "GET", "/api/v1/analytics/progress-trend")
                .with_param("days", "7")
                .assert_body(|body| {
                    let trend: Value = serde_json::from_str(body).unwrap();
                    let days = trend["trend"].as_array().unwrap();
                    assert_eq!(trend["days"], 7);
                    assert_eq!(days.len(), 7);
                    // idle days are reported with zero counts
                    assert!(days[..6].iter().all(|d| d["exercises_submitted"] == 0));

                    let today = &days[6];
                    assert_eq!(today["lessons_completed"], 1);
                    assert_eq!(today["exercises_submitted"], 1);
                    assert_eq!(today["points_earned"], 8);
                }),
        )
        .step(
            Action::new("trend is clamped", "GET", "/api/v1/analytics/progress-trend")
                .with_param("days", "0")
                .assert_body(|body| {
                    let trend: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(trend["days"], 1);
                }),
        )
        .step(course_analytics_action().assert_body(|body| {
            let analytics: Value = serde_json::from_str(body).unwrap();
            assert_eq!(analytics["course_info"]["title"], "Python Fundamentals");

            let summary = &analytics["progress_summary"];
            assert_eq!(summary["overall_progress"], 50.0);
            assert_eq!(summary["lessons_completed"], 1);
            assert_eq!(summary["total_lessons"], 2);
            assert_eq!(summary["exercises_attempted"], 1);
            assert_eq!(summary["total_exercises"], 1);
            assert_eq!(summary["total_points_earned"], 8);
            assert_eq!(summary["total_time_spent_minutes"], 2);
            assert_eq!(summary["average_score"], 85.0);

            let lessons = analytics["lesson_progress"].as_array().unwrap();
            assert_eq!(lessons.len(), 2);
            assert_eq!(lessons[0]["title"], "Hello world");
            assert!(lessons[1]["completed_at"].is_null());
            assert_eq!(lessons[1]["progress_percentage"], 0.0);

            let exercises = analytics["exercise_performance"].as_array().unwrap();
            assert_eq!(exercises[0]["attempts_count"], 1);
            assert_eq!(exercises[0]["best_score"], 85.0);
        }))
        .step(
            Action::new("analytics of a missing course", "GET", "/api/v1/analytics/courses/00000000-0000-0000-0000-000000000000")
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("dashboard without session", "GET", "/api/v1/analytics/dashboard")
                .with_clear_cookies(true)
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_practice_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    authored_course_flow(Flow::new(), 0, true)
        .step(register_action("learner", STUDENT_PASSWORD, "student"))
        .step(enroll_action().with_expect(StatusCode::CREATED))
        // the authored exercise is a beginner one
        .step(
            Action::new("no daily challenge yet", "GET", "/api/v1/practice/daily-challenge")
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("random advanced exercise", "GET", "/api/v1/practice/exercises/random")
                .with_param("difficulty", "advanced")
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("unknown difficulty", "GET", "/api/v1/practice/exercises")
                .with_param("difficulty", "expert")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(login_action("tutor", INSTRUCTOR_PASSWORD).with_clear_cookies(true))
        .step(
            Action::new("create intermediate exercise", "POST", "")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/exercises", id_of(ctx, "lesson2")))
                .with_body(json!({
                    "title": "Reverse a list",
                    "language": "python",
                    "difficulty": "intermediate",
                    "points": 20,
                }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("hard_exercise"),
        )
        .step(login_action("learner", STUDENT_PASSWORD).with_clear_cookies(true))
        .step(
            Action::new("daily challenge", "GET", "/api/v1/practice/daily-challenge")
                .assert_body(|body| {
                    let challenge: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(challenge["title"], "Daily Challenge: Reverse a list");
                    assert_eq!(challenge["difficulty"], "intermediate");
                    assert_eq!(challenge["points"], 40);
                    assert_eq!(challenge["completed"], false);
                    assert_eq!(challenge["date"].as_str().unwrap().len(), 10);
                })
                .with_save_as("challenge"),
        )
        .step(
            Action::new("solve the challenge", "POST", "")
                .with_dyn_path(|ctx| {
                    let id = ctx.get("challenge")["challenge_id"].as_str().unwrap().to_string();
                    assert_eq!(id, id_of(ctx, "hard_exercise"));
                    format!("/api/v1/exercises/{id}/submit")
                })
                .with_body(json!({ "code": "def rev(xs):\n    return xs[::-1]" }))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("daily challenge is completed", "GET", "/api/v1/practice/daily-challenge")
                .assert_body(|body| assert!(body.contains("\"completed\":true"))),
        )
        .step(
            Action::new("intermediate exercises", "GET", "/api/v1/practice/exercises")
                .with_param("difficulty", "Intermediate")
                .assert_body(|body| {
                    let exercises: Vec<Value> = serde_json::from_str(body).unwrap();
                    assert_eq!(exercises.len(), 1);
                    assert_eq!(exercises[0]["attempts_count"], 1);
                    assert_eq!(exercises[0]["best_score"], 85.0);
                }),
        )
        .step(
            Action::new("all exercises", "GET", "/api/v1/practice/exercises")
                .with_param("category", "general")
                .assert_body(|body| {
                    let exercises: Vec<Value> = serde_json::from_str(body).unwrap();
                    assert_eq!(exercises.len(), 2);
                    assert!(exercises.iter().all(|x| x["course_title"] == "Python Fundamentals"));
                }),
        )
        .step(
            Action::new("random beginner exercise", "GET", "/api/v1/practice/exercises/random")
                .with_param("difficulty", "beginner")
                .assert_body(|body| assert!(body.contains("Add two numbers"))),
        )
        .step(
            Action::new("practice stats", "GET", "/api/v1/practice/stats").assert_body(|body| {
                let stats: Value = serde_json::from_str(body).unwrap();
                assert_eq!(stats["total_submissions"], 1);
                assert_eq!(stats["exercises_attempted"], 1);
                assert_eq!(stats["total_points_earned"], 8);
                assert_eq!(stats["average_score"], 85.0);
                assert_eq!(stats["preferred_language"], "python");
                assert_eq!(stats["strength_areas"].as_array().unwrap().len(), 2);
                assert!(stats["improvement_areas"].as_array().unwrap().is_empty());
            }),
        )
        .run(&mut server, pool)
        .await;
}
