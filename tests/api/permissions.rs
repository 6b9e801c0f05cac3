use chirp::api::Api;
use chirp::domain::{AccessLevel, Privacy};
use chirp::error::ApiError;
use chirp::models::Principal;

use crate::helpers::spawn_app;

type Operation = fn(&Api, &Principal) -> Result<(), ApiError>;

/// Runs every operation at every access level and checks that exactly the
/// levels at or above `required` get past the permission check.
fn assert_gated(app: &crate::helpers::TestApp, nick: &str, required: AccessLevel, op: Operation) {
    for level in AccessLevel::ALL {
        let caller = app.principal(nick, level);
        let outcome = op(&app.api, &caller);
        let denied = matches!(outcome, Err(ApiError::PermissionDenied(_)));
        assert_eq!(
            denied,
            !level.allows(required),
            "{} calling with {}: {:?}",
            nick,
            level,
            outcome.err()
        );
    }
}

fn actor_get(api: &Api, caller: &Principal) -> Result<(), ApiError> {
    api.actor_get(caller, "popular").map(|_| ())
}

fn stream_get_actor(api: &Api, caller: &Principal) -> Result<(), ApiError> {
    api.stream_get_actor(caller, caller.nick()).map(|_| ())
}

fn keyvalue_get(api: &Api, caller: &Principal) -> Result<(), ApiError> {
    api.keyvalue_get(caller, caller.nick(), "any").map(|_| ())
}

fn keyvalue_put(api: &Api, caller: &Principal) -> Result<(), ApiError> {
    api.keyvalue_put(caller, caller.nick(), "k", "v").map(|_| ())
}

fn add_contact(api: &Api, caller: &Principal) -> Result<(), ApiError> {
    api.actor_add_contact(caller, caller.nick(), "fan").map(|_| ())
}

fn remove_contact(api: &Api, caller: &Principal) -> Result<(), ApiError> {
    api.actor_remove_contact(caller, caller.nick(), "fan")
}

fn create_consumer(api: &Api, caller: &Principal) -> Result<(), ApiError> {
    api.oauth_consumer_create(caller, "fan").map(|_| ())
}

fn read_sms_outbox(api: &Api, caller: &Principal) -> Result<(), ApiError> {
    api.sms_outbox(caller).map(|_| ())
}

#[tokio::test]
async fn operations_are_gated_by_access_level() {
    // Arrange
    let app = spawn_app().await;
    let popular = app.test_user.qualified(&app.api);
    app.create_user("fan", Privacy::Public);

    let cases: [(AccessLevel, Operation); 8] = [
        (AccessLevel::NoAccess, actor_get),
        (AccessLevel::Read, stream_get_actor),
        (AccessLevel::Read, keyvalue_get),
        (AccessLevel::Write, keyvalue_put),
        (AccessLevel::Write, add_contact),
        (AccessLevel::Delete, remove_contact),
        (AccessLevel::Admin, create_consumer),
        (AccessLevel::Admin, read_sms_outbox),
    ];

    // Act & Assert
    for (required, op) in cases {
        assert_gated(&app, &popular, required, op);
    }
}
