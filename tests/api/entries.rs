use chirp::api::NewPost;
use chirp::domain::{AccessLevel, Privacy};
use chirp::error::ApiError;
use claim::{assert_err, assert_ok};

use crate::helpers::spawn_app;

#[tokio::test]
async fn posting_delivers_to_the_poster_and_public_followers() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let as_popular = app.principal(&popular, AccessLevel::Delete);
    app.api
        .settings_change_privacy(&as_popular, &popular, Privacy::Public)
        .unwrap();
    let fan = app.create_user("fan", Privacy::Public);
    let as_fan = app.principal(&fan, AccessLevel::Write);
    app.api.actor_add_contact(&as_fan, &fan, &popular).unwrap();

    // Act
    let entry = assert_ok!(app.api.post(
        &as_popular,
        &popular,
        "hello followers",
        Default::default()
    ));

    // Assert
    assert_eq!(entry.stream, "stream/popular@example.com/presence");
    assert_eq!(entry.title.as_deref(), Some("hello followers"));
    let root = app.api.root();
    for nick in [&popular, &fan] {
        let inbox = app.api.inbox_get_actor_overview(&root, nick, None).unwrap();
        assert_eq!(inbox, vec![entry.key.clone()], "inbox of {}", nick);
    }
}

#[tokio::test]
async fn blank_posts_are_rejected() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);

    let outcome = app.api.post(&caller, &popular, "   ", Default::default());

    assert!(matches!(assert_err!(outcome), ApiError::Validation(_)));
}

#[tokio::test]
async fn a_uuid_can_only_be_posted_once() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);
    let extra = || NewPost {
        uuid: Some("client-generated".into()),
        ..Default::default()
    };

    let entry = app.api.post(&caller, &popular, "once", extra()).unwrap();
    let again = app.api.post(&caller, &popular, "twice", extra());

    assert!(matches!(assert_err!(again), ApiError::AlreadyExists(_)));
    assert_eq!(
        app.api.entry_get_uuid(&caller, "client-generated").unwrap().key,
        entry.key
    );
}

#[tokio::test]
async fn the_location_defaults_to_the_current_presence() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);
    app.api
        .presence_set(
            &caller,
            &popular,
            chirp::api::PresenceUpdate {
                location: Some("Helsinki".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let entry = app
        .api
        .post(&caller, &popular, "where am i", Default::default())
        .unwrap();

    assert_eq!(entry.location.as_deref(), Some("Helsinki"));
}

#[tokio::test]
async fn comments_notify_the_entry_owner_and_count_up() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let as_popular = app.principal(&popular, AccessLevel::Delete);
    let fan = app.create_user("fan", Privacy::Public);
    let as_fan = app.principal(&fan, AccessLevel::Delete);
    app.api.actor_add_contact(&as_popular, &popular, &fan).unwrap();
    let entry = app
        .api
        .post(&as_popular, &popular, "discuss", Default::default())
        .unwrap();

    // Act
    let comment = assert_ok!(app.api.entry_add_comment(
        &as_fan,
        &entry.stream,
        &entry.key,
        &fan,
        "first!"
    ));

    // Assert
    assert_eq!(comment.owner, popular);
    assert_eq!(comment.actor, fan);
    assert_eq!(comment.entry.as_deref(), Some(entry.key.as_str()));
    assert_eq!(comment.stream, "stream/fan@example.com/comments");
    let root = app.api.root();
    let inbox = app.api.inbox_get_actor_overview(&root, &popular, None).unwrap();
    assert_eq!(inbox.first(), Some(&comment.key));
    assert_eq!(app.api.entry_get(&root, &entry.key).unwrap().comment_count, 1);

    let thread = app
        .api
        .entry_get_comments_with_entry_uuid(&as_fan, &entry.uuid)
        .unwrap();
    assert_eq!(thread.entry.key, entry.key);
    assert_eq!(thread.comments, vec![comment]);
}

#[tokio::test]
async fn comments_on_comments_are_rejected() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Delete);
    let entry = app
        .api
        .post(&caller, &popular, "thread", Default::default())
        .unwrap();
    let comment = app
        .api
        .entry_add_comment_with_entry_uuid(&caller, &entry.uuid, &popular, "reply")
        .unwrap();

    let nested = app.api.entry_add_comment_with_entry_uuid(
        &caller,
        &comment.uuid,
        &popular,
        "reply to reply",
    );

    assert!(matches!(assert_err!(nested), ApiError::Rejected(_)));
}

#[tokio::test]
async fn empty_comments_are_rejected() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Delete);
    let entry = app
        .api
        .post(&caller, &popular, "thread", Default::default())
        .unwrap();

    let outcome =
        app.api
            .entry_add_comment(&caller, &entry.stream, &entry.key, &popular, " ");

    assert!(matches!(assert_err!(outcome), ApiError::Validation(_)));
}

#[tokio::test]
async fn removing_an_entry_removes_its_comments() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Delete);
    let entry = app
        .api
        .post(&caller, &popular, "regrettable", Default::default())
        .unwrap();
    let comment = app
        .api
        .entry_add_comment_with_entry_uuid(&caller, &entry.uuid, &popular, "indeed")
        .unwrap();

    // Act
    assert_ok!(app.api.entry_remove(&caller, &entry.key));

    // Assert
    assert!(matches!(
        assert_err!(app.api.entry_get(&caller, &entry.key)),
        ApiError::NotFound(_)
    ));
    assert!(app.api.entry_get_safe(&caller, &comment.key).is_none());
    let keys = [entry.key.as_str(), comment.key.as_str()];
    assert!(app.api.entry_get_entries(&caller, &keys).unwrap().is_empty());
}

#[tokio::test]
async fn removing_a_comment_decrements_the_count() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Delete);
    let entry = app
        .api
        .post(&caller, &popular, "counted", Default::default())
        .unwrap();
    let comment = app
        .api
        .entry_add_comment_with_entry_uuid(&caller, &entry.uuid, &popular, "one")
        .unwrap();

    app.api.entry_remove_comment(&caller, &comment.key).unwrap();

    assert_eq!(app.api.entry_get(&caller, &entry.key).unwrap().comment_count, 0);
    assert!(app.api.entry_get_comments(&caller, &entry.key).unwrap().is_empty());
}

#[tokio::test]
async fn strangers_cannot_remove_entries() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let as_popular = app.principal(&popular, AccessLevel::Delete);
    let stranger = app.create_user("stranger", Privacy::Public);
    let as_stranger = app.principal(&stranger, AccessLevel::Delete);
    app.api
        .settings_change_privacy(&as_popular, &popular, Privacy::Public)
        .unwrap();
    let entry = app
        .api
        .post(&as_popular, &popular, "mine", Default::default())
        .unwrap();

    let outcome = app.api.entry_remove(&as_stranger, &entry.key);

    assert!(matches!(assert_err!(outcome), ApiError::OwnerRequired(_)));
}

#[tokio::test]
async fn entries_dict_is_keyed_by_entry_key() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);
    let first = app.api.post(&caller, &popular, "one", Default::default()).unwrap();
    let second = app.api.post(&caller, &popular, "two", Default::default()).unwrap();

    let dict = app
        .api
        .entry_get_entries_dict(&caller, &[second.key.as_str(), first.key.as_str(), "stream/nope/presence/0"])
        .unwrap();

    assert_eq!(dict.len(), 2);
    assert_eq!(dict[&first.key].title.as_deref(), Some("one"));
}
