use chirp::domain::{AccessLevel, Privacy};
use chirp::error::ApiError;
use chirp::models::{inbox_key, Stream, StreamKind, SubscriptionState};
use claim::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::spawn_app;

fn presence_of(nick: &str) -> String {
    Stream::key_for(nick, StreamKind::Presence)
}

#[tokio::test]
async fn subscription_state_follows_the_topic_owner_privacy() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let loud = app.create_user("loud", Privacy::Public);
    let hermit = app.create_user("hermit", Privacy::Contacts);
    let fan = app.create_user("fan", Privacy::Public);
    let caller = app.principal(&fan, AccessLevel::Write);
    app.api
        .actor_add_contact(&app.principal(&hermit, AccessLevel::Write), &hermit, &fan)
        .unwrap();
    let inbox = inbox_key(&fan);

    // Act
    let public = assert_ok!(app.api.subscription_request(&caller, &presence_of(&loud), &inbox));
    let private =
        assert_ok!(app.api.subscription_request(&caller, &presence_of(&popular), &inbox));
    let contact =
        assert_ok!(app.api.subscription_request(&caller, &presence_of(&hermit), &inbox));

    // Assert
    assert_eq!(public.state, SubscriptionState::Subscribed);
    assert_eq!(private.state, SubscriptionState::Pending);
    assert_eq!(contact.state, SubscriptionState::Subscribed);
    assert_eq!(public.subscriber, fan);
    let root = app.api.root();
    assert!(app
        .api
        .subscription_exists(&root, &presence_of(&popular), &inbox)
        .unwrap());
    assert!(!app
        .api
        .subscription_is_active(&root, &presence_of(&popular), &inbox)
        .unwrap());
}

#[tokio::test]
async fn subscribing_someone_elses_inbox_is_rejected() {
    let app = spawn_app().await;
    let loud = app.create_user("loud", Privacy::Public);
    let fan = app.create_user("fan", Privacy::Public);
    let caller = app.principal(&fan, AccessLevel::Write);

    let outcome = app
        .api
        .subscription_request(&caller, &presence_of(&loud), &inbox_key(&loud));

    assert!(matches!(assert_err!(outcome), ApiError::OwnerRequired(_)));
}

#[tokio::test]
async fn subscription_requests_need_a_known_topic_and_an_inbox() {
    let app = spawn_app().await;
    let fan = app.create_user("fan", Privacy::Public);
    let caller = app.principal(&fan, AccessLevel::Write);

    let unknown = app.api.subscription_request(
        &caller,
        "stream/ghost@example.com/presence",
        &inbox_key(&fan),
    );
    let not_an_inbox = app
        .api
        .subscription_request(&caller, &presence_of(&fan), "fan@example.com");

    assert!(matches!(assert_err!(unknown), ApiError::NotFound(_)));
    assert!(matches!(assert_err!(not_an_inbox), ApiError::InvalidArguments(_)));
}

#[tokio::test]
async fn private_and_missing_streams_are_left_out() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let loud = app.create_user("loud", Privacy::Public);
    let fan = app.create_user("fan", Privacy::Public);
    let reader = app.principal(&fan, AccessLevel::Read);
    let keys = [
        presence_of(&loud),
        presence_of(&popular),
        "stream/ghost@example.com/presence".to_string(),
    ];
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();

    // Act - Part 1 - a stranger
    let streams = assert_ok!(app.api.stream_get_streams(&reader, &keys));

    // Assert
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[&presence_of(&loud)].owner, loud);

    // Act - Part 2 - a contact
    app.api
        .actor_add_contact(&app.principal(&popular, AccessLevel::Write), &popular, &fan)
        .unwrap();
    let streams = assert_ok!(app.api.stream_get_streams(&reader, &keys));

    // Assert
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[&presence_of(&popular)].privacy, Privacy::Contacts);
}

#[tokio::test]
async fn actor_get_actors_skips_unknown_nicks() {
    let app = spawn_app().await;
    let loud = app.create_user("loud", Privacy::Public);
    let root = app.api.root();

    let actors = assert_ok!(app.api.actor_get_actors(&root, &["popular", "loud", "nobody"]));

    let nicks: Vec<_> = actors.iter().map(|a| a.nick.as_str()).collect();
    assert_eq!(nicks, vec!["popular@example.com", loud.as_str()]);
    assert_err!(app.api.actor_get_actors(&root, &["popular", "!!"]));
}

#[tokio::test]
async fn invites_are_mailed_in_the_name_of_the_inviter() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    assert_ok!(
        app.api
            .invite_request_email(&caller, &popular, "friend@example.org")
            .await
    );

    // Assert
    let requests = app.email_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["To"], "friend@example.org");
    assert_eq!(body["Subject"], "Popular User invited you to Chirp");
    assert!(body["TextBody"].as_str().unwrap().contains("(popular)"));
}

#[tokio::test]
async fn inviting_on_behalf_of_someone_else_is_rejected() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let fan = app.create_user("fan", Privacy::Public);
    let caller = app.principal(&fan, AccessLevel::Write);

    let outcome = app
        .api
        .invite_request_email(&caller, &popular, "friend@example.org")
        .await;

    assert!(matches!(assert_err!(outcome), ApiError::OwnerRequired(_)));
}
