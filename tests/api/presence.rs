use chirp::api::PresenceUpdate;
use chirp::clock::Clock;
use chirp::domain::{AccessLevel, Privacy};
use chirp::error::ApiError;
use chrono::Duration;
use claim::{assert_err, assert_none, assert_ok};

use crate::helpers::spawn_app;

fn status(status: &str) -> PresenceUpdate {
    PresenceUpdate {
        status: Some(status.into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn presence_updates_keep_unset_fields() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);
    app.api
        .presence_set(
            &caller,
            &popular,
            PresenceUpdate {
                location: Some("Helsinki".into()),
                ..Default::default()
            },
        )
        .unwrap();

    // Act
    let presence = assert_ok!(app.api.presence_set(&caller, &popular, status("coding")));

    // Assert
    assert_eq!(presence.extra.status.as_deref(), Some("coding"));
    assert_eq!(presence.extra.location.as_deref(), Some("Helsinki"));
    assert_eq!(presence.extra.given_name.as_deref(), Some("Popular"));
    assert_eq!(presence.updated_at, app.clock.now());
}

#[tokio::test]
async fn presence_can_be_read_back_in_time() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);
    let start = app.clock.now();
    app.api.presence_set(&caller, &popular, status("early")).unwrap();
    app.clock.advance(Duration::hours(1));
    app.api.presence_set(&caller, &popular, status("late")).unwrap();

    let now = app.api.presence_get(&caller, &popular, None).unwrap().unwrap();
    let then = app
        .api
        .presence_get(&caller, &popular, Some(start + Duration::minutes(30)))
        .unwrap()
        .unwrap();
    let before = app
        .api
        .presence_get(&caller, &popular, Some(start - Duration::minutes(1)))
        .unwrap();

    assert_eq!(now.extra.status.as_deref(), Some("late"));
    assert_eq!(then.extra.status.as_deref(), Some("early"));
    assert_none!(before);
}

#[tokio::test]
async fn private_presence_is_hidden_from_strangers() {
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let caller = app.principal(&popular, AccessLevel::Write);
    app.api.presence_set(&caller, &popular, status("secret")).unwrap();
    let stranger = app.create_user("stranger", Privacy::Public);
    let as_stranger = app.principal(&stranger, AccessLevel::Read);

    let outcome = app.api.presence_get(&as_stranger, &popular, None);

    assert!(matches!(assert_err!(outcome), ApiError::Privacy(_)));
}

#[tokio::test]
async fn contacts_presence_is_newest_first_and_filtered_by_since() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    let as_popular = app.principal(&popular, AccessLevel::Write);
    let fan = app.create_user("fan", Privacy::Public);
    let quiet = app.create_user("quiet", Privacy::Public);
    let as_fan = app.principal(&fan, AccessLevel::Write);
    let as_quiet = app.principal(&quiet, AccessLevel::Write);
    app.api.actor_add_contact(&as_popular, &popular, &fan).unwrap();
    app.api.actor_add_contact(&as_popular, &popular, &quiet).unwrap();

    app.api.presence_set(&as_quiet, &quiet, status("old news")).unwrap();
    let since = app.clock.now();
    app.clock.advance(Duration::minutes(1));
    app.api.presence_set(&as_popular, &popular, status("here")).unwrap();
    app.clock.advance(Duration::minutes(1));
    app.api.presence_set(&as_fan, &fan, status("also here")).unwrap();

    // Act
    let presences = app
        .api
        .presence_get_contacts(&as_popular, &popular, Some(since))
        .unwrap();

    // Assert
    let actors: Vec<_> = presences.iter().map(|p| p.actor.as_str()).collect();
    assert_eq!(actors, vec![fan.as_str(), popular.as_str()]);
}
