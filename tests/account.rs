mod common;
use forge::model::entity::Profile;
use forge::web::middlewares::AUTH_TOKEN;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tower_cookies::cookie::SameSite;

use crate::common::{
    Action, Flow, STUDENT_PASSWORD, create_admin, login_action, register_action,
    setup_server, setup_test_db,
};

#[tokio::test]
async fn route_register_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            register_action("foobar", STUDENT_PASSWORD, "student")
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
                    assert_eq!(cookie.path(), Some("/"));
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_body(|body| {
                    let body: Value = serde_json::from_str(body).expect("Invalid body format");
                    assert_eq!(body["token_type"], "Bearer");
                    assert!(!body["token"].as_str().unwrap().is_empty());
                    let profile: Profile = serde_json::from_value(body["profile"].clone())
                        .expect("Invalid profile format");
                    assert_eq!(profile.username(), "foobar");
                    assert_eq!(profile.total_points(), 0);
                })
                .with_expect(StatusCode::CREATED),
        )
        // try to register twice
        .step(register_action("foobar", STUDENT_PASSWORD, "student").with_expect(StatusCode::CONFLICT))
        // admins are not self-service
        .step(
            register_action("sneaky", STUDENT_PASSWORD, "admin")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_register_validation_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            register_action("weak", "password", "student")
                .assert_body(|body| {
                    assert!(body.contains("Validation error"));
                    assert!(body.contains("uppercase"));
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("bad email", "POST", "/api/v1/account/register")
                .with_body(json!({
                    "username": "mailer",
                    "email": "mailer@@forge",
                    "password": STUDENT_PASSWORD,
                }))
                .assert_body(|body| assert!(body.contains("Email address is invalid")))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            register_action("x!", STUDENT_PASSWORD, "student")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_login_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("logintest", STUDENT_PASSWORD, "student").with_save_cookies(false))
        .step(
            login_action("logintest", STUDENT_PASSWORD)
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .with_clear_cookies(true),
        )
        // e-mail works as login too
        .step(login_action("LoginTest@forge.test", STUDENT_PASSWORD).with_clear_cookies(true))
        // wrong credentials
        .step(
            login_action("logintest", "Wr0ng!password")
                .with_save_cookies(false)
                .with_clear_cookies(true)
                .assert_body(|body| assert!(body.contains("Authentication error")))
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // non-existing account
        .step(
            login_action("nonexisting", STUDENT_PASSWORD)
                .assert_body(|body| assert!(body.contains("Authentication error")))
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_me_and_logout_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(Action::new("anonymous me", "GET", "/api/v1/account/me").with_expect(StatusCode::UNAUTHORIZED))
        .step(register_action("meuser", STUDENT_PASSWORD, "student").with_expect(StatusCode::CREATED))
        .step(
            Action::new("me", "GET", "/api/v1/account/me")
                .assert_body(|body| assert!(body.contains("meuser"))),
        )
        .step(Action::new("logout", "POST", "/api/v1/account/logout").with_expect(StatusCode::NO_CONTENT))
        .step(Action::new("me after logout", "GET", "/api/v1/account/me").with_expect(StatusCode::UNAUTHORIZED))
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_invalid_token_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            Action::new("garbage bearer", "GET", "/api/v1/account/me")
                .with_header("authorization", "Bearer not-a-jwt")
                .assert_body(|body| assert!(body.contains("token invalid")))
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_profile_update_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("other", STUDENT_PASSWORD, "student").with_save_as("other"))
        .step(register_action("owner", STUDENT_PASSWORD, "student").with_save_as("owner"))
        .step(
            Action::new("update own", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/account/{}", ctx.get("owner")["profile"]["id"].as_str().unwrap()))
                .with_body(json!({ "full_name": "  Owner Name " }))
                .assert_body(|body| {
                    let profile: Profile = serde_json::from_str(body).unwrap();
                    assert_eq!(profile.full_name(), "Owner Name");
                    assert_eq!(profile.username(), "owner");
                }),
        )
        .step(
            Action::new("update someone else", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/account/{}", ctx.get("other")["profile"]["id"].as_str().unwrap()))
                .with_body(json!({ "full_name": "Hijacked" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("take a used username", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/account/{}", ctx.get("owner")["profile"]["id"].as_str().unwrap()))
                .with_body(json!({ "username": "other" }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("change password", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/account/{}", ctx.get("owner")["profile"]["id"].as_str().unwrap()))
                .with_body(json!({ "password": "N3w!password" })),
        )
        .step(login_action("owner", STUDENT_PASSWORD).with_clear_cookies(true).with_expect(StatusCode::UNAUTHORIZED))
        .step(login_action("owner", "N3w!password"))
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_admin_test() {
    let pool = setup_test_db().await;
    create_admin(&pool, "root", "Adm1n!pass").await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("learner", STUDENT_PASSWORD, "student").with_save_as("learner"))
        .step(Action::new("list as student", "GET", "/api/v1/account/page").with_expect(StatusCode::FORBIDDEN))
        .step(login_action("root", "Adm1n!pass").with_clear_cookies(true))
        .step(
            Action::new("list as admin", "GET", "/api/v1/account/page")
                .with_param("limit", "10")
                .assert_body(|body| {
                    let page: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(page["total"], 2);
                    assert_eq!(page["limit"], 10);
                }),
        )
        .step(
            Action::new("promote learner", "PUT", "")
                .with_dyn_path(|ctx| format!("/api/v1/account/{}/role", ctx.get("learner")["profile"]["id"].as_str().unwrap()))
                .with_body(json!({ "role": "instructor" }))
                .assert_body(|body| assert!(body.contains("\"role\":\"instructor\""))),
        )
        .step(
            Action::new("admin deletes learner", "DELETE", "")
                .with_dyn_path(|ctx| format!("/api/v1/account/{}", ctx.get("learner")["profile"]["id"].as_str().unwrap())),
        )
        .step(
            login_action("learner", STUDENT_PASSWORD)
                .with_clear_cookies(true)
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}
