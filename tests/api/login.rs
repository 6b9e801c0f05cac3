use chirp::domain::AccessLevel;
use secrecy::Secret;

use crate::helpers::{assert_is_redirect_to, spawn_app};

#[tokio::test]
async fn an_error_is_returned_on_wrong_password() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_login(&serde_json::json!({
            "log": &app.test_user.nick,
            "password": "not-the-password",
        }))
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 401);
    assert!(response.headers().get("Set-Cookie").is_none());
}

#[tokio::test]
async fn unknown_logins_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .post_login(&serde_json::json!({
            "log": "nobody",
            "password": "whatever",
        }))
        .await;

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn root_cannot_log_in() {
    let app = spawn_app().await;

    let response = app
        .post_login(&serde_json::json!({
            "log": "root",
            "password": "",
        }))
        .await;

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn login_sets_both_cookies_and_redirects_to_the_overview() {
    // Act
    let app = spawn_app().await;
    let response = app.login_test_user().await;

    // Assert
    assert_is_redirect_to(&response, "/user/popular/overview");
    let cookies: Vec<_> = response.cookies().collect();
    let user = cookies.iter().find(|c| c.name() == "user").unwrap();
    assert_eq!(user.value(), "popular@example.com");
    assert_eq!(user.path(), Some("/"));
    assert!(user.domain().is_none());
    assert!(user.max_age().is_none());
    let password = cookies.iter().find(|c| c.name() == "password").unwrap();
    assert_eq!(password.value().len(), 32);
    assert_eq!(app.sessions.len(), 1);
}

#[tokio::test]
async fn remembered_logins_persist_for_two_weeks() {
    let app = spawn_app().await;

    let response = app
        .post_login(&serde_json::json!({
            "log": &app.test_user.nick,
            "password": &app.test_user.password,
            "remember": "on",
        }))
        .await;

    assert_is_redirect_to(&response, "/user/popular/overview");
    for cookie in response.cookies() {
        assert_eq!(
            cookie.max_age(),
            Some(std::time::Duration::from_secs(14 * 24 * 60 * 60)),
            "{} cookie",
            cookie.name()
        );
        assert!(cookie.expires().is_some());
    }
}

#[tokio::test]
async fn the_overview_greets_a_logged_in_user() {
    // Arrange
    let app = spawn_app().await;
    let nick = app.test_user.qualified(&app.api);
    let me = app.principal(&nick, AccessLevel::Delete);
    app.api
        .post(&me, &nick, "first post", Default::default())
        .unwrap();

    // Act - Part 1 - Login
    let response = app.login_test_user().await;
    assert_is_redirect_to(&response, "/user/popular/overview");

    // Act - Part 2 - Follow the redirect
    let response = app.get_overview("popular").await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["greeting"],
        "Hi popular! Here's the latest from your contacts"
    );
    assert_eq!(body["entries"][0]["title"], "first post");
}

#[tokio::test]
async fn anonymous_users_are_sent_to_login() {
    let app = spawn_app().await;

    let response = app.get_overview("popular").await;

    assert_is_redirect_to(&response, "/login");
}

#[tokio::test]
async fn logout_clears_the_session() {
    // Arrange
    let app = spawn_app().await;
    app.login_test_user().await;
    assert_eq!(app.get_overview("popular").await.status().as_u16(), 200);

    // Act
    let response = app.post_logout().await;

    // Assert
    assert_is_redirect_to(&response, "/");
    assert!(app.sessions.is_empty());
    let response = app.get_overview("popular").await;
    assert_is_redirect_to(&response, "/login");
}

#[tokio::test]
async fn changing_the_password_invalidates_existing_sessions() {
    // Arrange
    let app = spawn_app().await;
    app.login_test_user().await;
    let nick = app.test_user.qualified(&app.api);

    // Act
    app.api
        .settings_change_password(
            &app.principal(&nick, AccessLevel::Delete),
            &nick,
            Secret::new("a-brand-new-password".into()),
        )
        .unwrap();

    // Assert
    let response = app.get_overview("popular").await;
    assert_is_redirect_to(&response, "/login");
}

#[tokio::test]
async fn cookie_sessions_drive_the_json_api() {
    let app = spawn_app().await;
    app.login_test_user().await;

    let response = app
        .get_api_json(&[("method", "actor_get"), ("nick", "popular")])
        .await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn a_confirmed_email_works_as_login() {
    // Arrange
    let app = spawn_app().await;
    let root = app.api.root();
    let activation = app
        .api
        .activation_create_email(&root, "popular", "popular@example.org")
        .unwrap();
    app.api
        .activation_activate_email(&root, "popular", &activation.code)
        .unwrap();

    // Act
    let response = app
        .post_login(&serde_json::json!({
            "log": "popular@example.org",
            "password": &app.test_user.password,
        }))
        .await;

    // Assert
    assert_is_redirect_to(&response, "/user/popular/overview");
}

#[tokio::test]
async fn an_email_in_the_site_domain_works_as_login() {
    // Arrange
    let app = spawn_app().await;
    let root = app.api.root();
    let activation = app
        .api
        .activation_create_email(&root, "popular", "pop@example.com")
        .unwrap();
    app.api
        .activation_activate_email(&root, "popular", &activation.code)
        .unwrap();

    // Act
    let response = app
        .post_login(&serde_json::json!({
            "log": "pop@example.com",
            "password": &app.test_user.password,
        }))
        .await;

    // Assert
    assert_is_redirect_to(&response, "/user/popular/overview");
}

#[tokio::test]
async fn a_wrong_password_for_an_email_login_is_rejected() {
    let app = spawn_app().await;
    let root = app.api.root();
    let activation = app
        .api
        .activation_create_email(&root, "popular", "pop@example.com")
        .unwrap();
    app.api
        .activation_activate_email(&root, "popular", &activation.code)
        .unwrap();

    let response = app
        .post_login(&serde_json::json!({
            "log": "pop@example.com",
            "password": "not-the-password",
        }))
        .await;

    assert_eq!(response.status().as_u16(), 401);
}
