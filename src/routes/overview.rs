use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::api::Api;
use crate::authentication::{AuthResolver, RequestCredentials};
use crate::domain::AccessLevel;
use crate::error::ApiError;
use crate::utils::see_other;

const OVERVIEW_LIMIT: usize = 20;

#[tracing::instrument(name = "User overview", skip_all, fields(nick = %path))]
pub async fn user_overview(
    request: HttpRequest,
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    api: web::Data<Api>,
    resolver: web::Data<AuthResolver>,
) -> Result<HttpResponse, ApiError> {
    let credentials = RequestCredentials::from_request(&request, query.into_inner());
    let caller = match resolver.get_user_from_request(&credentials)? {
        Some(caller) => caller,
        None => return Ok(see_other("/login")),
    };

    let actor = api.actor_get(&caller, &path)?;
    if actor.nick != caller.nick() && !caller.access_level.allows(AccessLevel::Admin) {
        return Err(ApiError::PermissionDenied(format!(
            "{} cannot read the overview of {}",
            caller.nick(),
            actor.nick
        )));
    }

    let keys = api.inbox_get_actor_overview(&caller, &actor.nick, Some(OVERVIEW_LIMIT))?;
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    let entries = api.entry_get_entries(&caller, &keys)?;
    Ok(HttpResponse::Ok().json(json!({
        "greeting": format!(
            "Hi {}! Here's the latest from your contacts",
            actor.display_nick()
        ),
        "actor": actor,
        "entries": entries,
    })))
}
