use chirp::domain::AccessLevel;
use secrecy::Secret;

use crate::helpers::{assert_api_error, spawn_app, spawn_app_with};

#[tokio::test]
async fn a_personal_key_authenticates_its_actor() {
    // Arrange
    let app = spawn_app().await;
    let nick = app.test_user.qualified(&app.api);
    let key = app.personal_key(&nick);

    // Act
    let response = app
        .get_api_json(&[
            ("method", "post"),
            ("nick", "popular"),
            ("message", "from an old client"),
            ("user", "popular"),
            ("personal_key", key.as_str()),
        ])
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["rv"]["entry"]["title"], "from an old client");
}

#[tokio::test]
async fn a_wrong_personal_key_is_anonymous() {
    let app = spawn_app().await;

    let response = app
        .get_api_json(&[
            ("method", "actor_get"),
            ("nick", "popular"),
            ("user", "popular"),
            ("personal_key", "00112233445566778899"),
        ])
        .await;

    assert_api_error(response, 403, 0x04).await;
}

#[tokio::test]
async fn personal_keys_are_ignored_when_legacy_auth_is_off() {
    let app = spawn_app_with(|c| c.auth.allow_legacy_auth = false).await;
    let key = app.personal_key(&app.test_user.qualified(&app.api));

    let response = app
        .get_api_json(&[
            ("method", "actor_get"),
            ("nick", "popular"),
            ("user", "popular"),
            ("personal_key", key.as_str()),
        ])
        .await;

    assert_api_error(response, 403, 0x04).await;
}

#[tokio::test]
async fn a_password_change_revokes_the_personal_key() {
    // Arrange
    let app = spawn_app().await;
    let nick = app.test_user.qualified(&app.api);
    let key = app.personal_key(&nick);
    app.api
        .settings_change_password(
            &app.principal(&nick, AccessLevel::Delete),
            &nick,
            Secret::new("rotated-password".into()),
        )
        .unwrap();

    // Act
    let response = app
        .get_api_json(&[
            ("method", "actor_get"),
            ("nick", "popular"),
            ("user", "popular"),
            ("personal_key", key.as_str()),
        ])
        .await;

    // Assert
    assert_api_error(response, 403, 0x04).await;
}

#[tokio::test]
async fn the_cookie_session_wins_over_a_personal_key() {
    // Arrange
    let app = spawn_app().await;
    let other = app.create_user("unpopular", chirp::domain::Privacy::Public);
    let other_key = app.personal_key(&other);
    app.login_test_user().await;

    // Act
    let response = app
        .get_api_json(&[
            ("method", "post"),
            ("nick", "unpopular"),
            ("message", "impersonation"),
            ("user", "unpopular"),
            ("personal_key", other_key.as_str()),
        ])
        .await;

    // Assert
    assert_api_error(response, 403, 0x05).await;
}
