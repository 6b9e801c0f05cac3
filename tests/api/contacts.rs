use chirp::clock::Clock;
use chirp::domain::{AccessLevel, Privacy};
use chirp::error::ApiError;
use chirp::models::inbox_key;
use claim::{assert_err, assert_ok};

use crate::helpers::spawn_app;

#[tokio::test]
async fn adding_a_contact_updates_both_counts() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let fan = app.create_user("fan", Privacy::Public);
    let caller = app.principal(&fan, AccessLevel::Write);

    // Act
    let target = assert_ok!(app.api.actor_add_contact(&caller, &fan, &popular));

    // Assert
    assert_eq!(target.follower_count, 1);
    let root = app.api.root();
    assert_eq!(app.api.actor_get(&root, &fan).unwrap().contact_count, 1);
    assert!(app.api.actor_has_contact(&root, &fan, &popular).unwrap());
    assert!(!app.api.actor_has_contact(&root, &popular, &fan).unwrap());
}

#[tokio::test]
async fn adding_the_same_contact_twice_is_idempotent() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let fan = app.create_user("fan", Privacy::Public);
    let caller = app.principal(&fan, AccessLevel::Write);

    app.api.actor_add_contact(&caller, &fan, &popular).unwrap();
    let target = app.api.actor_add_contact(&caller, &fan, &popular).unwrap();

    assert_eq!(target.follower_count, 1);
}

#[tokio::test]
async fn nobody_is_their_own_contact() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);

    let outcome = app.api.actor_add_contact(&caller, &popular, &popular);

    assert!(matches!(assert_err!(outcome), ApiError::Rejected(_)));
}

#[tokio::test]
async fn only_owners_add_contacts() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let fan = app.create_user("fan", Privacy::Public);
    let caller = app.principal(&fan, AccessLevel::Delete);

    let outcome = app.api.actor_add_contact(&caller, &popular, &fan);

    assert!(matches!(assert_err!(outcome), ApiError::OwnerRequired(_)));
}

#[tokio::test]
async fn private_posts_reach_followers_once_the_contact_is_mutual() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let fan = app.create_user("fan", Privacy::Public);
    let as_popular = app.principal(&popular, AccessLevel::Delete);
    let as_fan = app.principal(&fan, AccessLevel::Delete);
    let root = app.api.root();

    // Act - Part 1 - one-sided contact on a private actor stays pending
    app.api.actor_add_contact(&as_fan, &fan, &popular).unwrap();
    let hidden = app
        .api
        .post(&as_popular, &popular, "contacts only", Default::default())
        .unwrap();

    // Assert - Part 1
    let inbox = app.api.inbox_get_actor_overview(&root, &fan, None).unwrap();
    assert!(!inbox.contains(&hidden.key));
    assert!(!app
        .api
        .subscription_is_active(&root, &hidden.stream, &inbox_key(&fan))
        .unwrap());

    // Act - Part 2 - popular adds the fan back
    app.api.actor_add_contact(&as_popular, &popular, &fan).unwrap();
    let shared = app
        .api
        .post(&as_popular, &popular, "now you can see", Default::default())
        .unwrap();

    // Assert - Part 2
    let inbox = app.api.inbox_get_actor_overview(&root, &fan, None).unwrap();
    assert_eq!(inbox.first(), Some(&shared.key));
    assert!(app.api.entry_get(&as_fan, &shared.key).is_ok());
}

#[tokio::test]
async fn removing_a_contact_unsubscribes_and_hides_private_streams() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let fan = app.create_user("fan", Privacy::Public);
    let as_popular = app.principal(&popular, AccessLevel::Delete);
    let as_fan = app.principal(&fan, AccessLevel::Delete);
    app.api.actor_add_contact(&as_fan, &fan, &popular).unwrap();
    app.api.actor_add_contact(&as_popular, &popular, &fan).unwrap();

    // Act
    assert_ok!(app.api.actor_remove_contact(&as_popular, &popular, &fan));

    // Assert
    let entry = app
        .api
        .post(&as_popular, &popular, "after the breakup", Default::default())
        .unwrap();
    let root = app.api.root();
    let inbox = app.api.inbox_get_actor_overview(&root, &fan, None).unwrap();
    assert!(!inbox.contains(&entry.key));
    assert!(matches!(
        assert_err!(app.api.entry_get(&as_fan, &entry.key)),
        ApiError::Privacy(_)
    ));
    assert!(matches!(
        assert_err!(app.api.actor_remove_contact(&as_popular, &popular, &fan)),
        ApiError::Rejected(_)
    ));
}

#[tokio::test]
async fn removing_contacts_needs_delete_access() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let fan = app.create_user("fan", Privacy::Public);
    let as_popular = app.principal(&popular, AccessLevel::Write);
    app.api.actor_add_contact(&as_popular, &popular, &fan).unwrap();

    let outcome = app.api.actor_remove_contact(&as_popular, &popular, &fan);

    assert!(matches!(assert_err!(outcome), ApiError::PermissionDenied(_)));
}

#[tokio::test]
async fn contact_avatars_since_only_lists_recent_changes() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let fan = app.create_user("fan", Privacy::Public);
    let as_popular = app.principal(&popular, AccessLevel::Delete);
    let as_fan = app.principal(&fan, AccessLevel::Delete);
    app.api.actor_add_contact(&as_popular, &popular, &fan).unwrap();
    let before = app.clock.now();
    app.clock.advance(chrono::Duration::minutes(1));

    // Act
    app.api
        .settings_update_avatar(&as_fan, &fan, "avatar/fan")
        .unwrap();
    let changed = app
        .api
        .actor_get_contacts_avatars_since(&as_popular, &popular, None, Some(before))
        .unwrap();

    // Assert
    let nicks: Vec<_> = changed.iter().map(|a| a.nick.as_str()).collect();
    assert_eq!(nicks, vec![fan.as_str()]);
}
