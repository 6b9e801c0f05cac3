use chirp::authentication::SignatureMethod;
use chirp::domain::AccessLevel;
use chirp::utils::parse_timestamp;

use crate::helpers::{assert_api_error, spawn_app, spawn_app_with};

#[tokio::test]
async fn anonymous_calls_are_rejected() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .get_api_json(&[("method", "actor_get"), ("nick", "popular")])
        .await;

    // Assert
    assert_api_error(response, 403, 0x04).await;
}

#[tokio::test]
async fn a_call_without_method_is_no_method() {
    let app = spawn_app().await;

    let response = app.get_api_json(&[("nick", "popular")]).await;

    assert_api_error(response, 400, 0x00).await;
}

#[tokio::test]
async fn unknown_methods_are_invalid_even_for_root() {
    let app = spawn_app_with(|c| c.api.disable_verification = true).await;

    let response = app.get_api_json(&[("method", "actor_explode")]).await;

    assert_api_error(response, 400, 0x01).await;
}

#[tokio::test]
async fn missing_arguments_are_reported() {
    let app = spawn_app_with(|c| c.api.disable_verification = true).await;

    let response = app.get_api_json(&[("method", "actor_get")]).await;

    assert_api_error(response, 400, 0x02).await;
}

#[tokio::test]
async fn successful_calls_are_wrapped_with_servertime() {
    // Arrange
    let app = spawn_app_with(|c| c.api.disable_verification = true).await;

    // Act
    let response = app
        .get_api_json(&[("method", "actor_get"), ("nick", "popular")])
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rv"]["actor"]["nick"], "popular@example.com");
    assert_eq!(body["rv"]["actor"]["privacy"], "contacts");
    assert!(body["rv"]["actor"].get("password_hash").is_none());
    let servertime = body["servertime"].as_str().unwrap();
    let parsed = parse_timestamp(servertime).expect("servertime is a timestamp");
    assert_eq!(parsed.timestamp(), app.api.now().timestamp());
}

#[tokio::test]
async fn json_params_are_merged_over_plain_params() {
    let app = spawn_app_with(|c| c.api.disable_verification = true).await;

    let response = app
        .post_api_json(&[
            ("method", "actor_get"),
            ("nick", "nobody"),
            ("json_params", r#"{"nick": "popular"}"#),
        ])
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["rv"]["actor"]["nick"], "popular@example.com");
}

#[tokio::test]
async fn malformed_json_params_are_invalid_arguments() {
    let app = spawn_app_with(|c| c.api.disable_verification = true).await;

    let response = app
        .post_api_json(&[("method", "actor_get"), ("json_params", "{nick")])
        .await;

    assert_api_error(response, 400, 0x02).await;
}

#[tokio::test]
async fn unknown_actors_are_not_found() {
    let app = spawn_app_with(|c| c.api.disable_verification = true).await;

    let response = app
        .get_api_json(&[("method", "actor_get"), ("nick", "ghost")])
        .await;

    assert_api_error(response, 404, 0x07).await;
}

#[tokio::test]
async fn write_calls_need_write_access() {
    // Arrange
    let app = spawn_app().await;
    let nick = app.test_user.qualified(&app.api);
    let params = [
        ("method", "post"),
        ("nick", nick.as_str()),
        ("message", "hello world"),
    ];

    for level in AccessLevel::ALL {
        let client = app.oauth_client(&nick, level);

        // Act
        let response = app
            .signed_api_json(&client, &params, SignatureMethod::HmacSha1)
            .await;

        // Assert
        if level.allows(AccessLevel::Write) {
            assert_eq!(response.status().as_u16(), 200, "{} may post", level);
        } else {
            assert_api_error(response, 403, 0x04).await;
        }
    }
}
