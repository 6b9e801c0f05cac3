mod params;

use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};

pub use params::ApiParams;

use crate::api::{Api, NewPost, PresenceUpdate};
use crate::authentication::{AuthResolver, RequestCredentials};
use crate::configuration::ApiSettings;
use crate::error::ApiError;
use crate::models::Principal;
use crate::utils::format_timestamp;

fn rv<T: serde::Serialize>(name: &str, value: T) -> Result<Value, ApiError> {
    let value = serde_json::to_value(value)
        .map_err(|e| ApiError::UnexpectedError(e.into()))?;
    let mut rv = serde_json::Map::new();
    rv.insert(name.to_string(), value);
    Ok(Value::Object(rv))
}

#[tracing::instrument(
    name = "Json api call",
    skip_all,
    fields(method = tracing::field::Empty, caller = tracing::field::Empty)
)]
pub async fn api_json(
    request: HttpRequest,
    query: web::Query<HashMap<String, String>>,
    form: Option<web::Form<HashMap<String, String>>>,
    api: web::Data<Api>,
    resolver: web::Data<AuthResolver>,
    settings: web::Data<ApiSettings>,
) -> Result<HttpResponse, ApiError> {
    let mut raw = query.into_inner();
    if let Some(form) = form {
        raw.extend(form.into_inner());
    }
    // signatures cover the parameters as sent
    let credentials = RequestCredentials::from_request(&request, raw.clone());
    let params = ApiParams::parse(raw)?;
    let method = params.method()?;
    tracing::Span::current().record("method", &method);

    let caller = if settings.disable_verification {
        api.root()
    } else {
        resolver
            .get_user_from_request(&credentials)?
            .ok_or_else(|| ApiError::PermissionDenied("authentication required".into()))?
    };
    tracing::Span::current().record("caller", &caller.nick());

    let rv = call(&api, &caller, method, &params)?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "rv": rv,
        "servertime": format_timestamp(api.now()),
    })))
}

fn call(
    api: &Api,
    caller: &Principal,
    method: &str,
    params: &ApiParams,
) -> Result<Value, ApiError> {
    match method {
        "actor_get" => rv("actor", api.actor_get(caller, params.required("nick")?)?),
        "actor_has_contact" => rv(
            "contact",
            api.actor_has_contact(
                caller,
                params.required("owner")?,
                params.required("target")?,
            )?,
        ),
        "actor_add_contact" => rv(
            "actor",
            api.actor_add_contact(
                caller,
                params.required("owner")?,
                params.required("target")?,
            )?,
        ),
        "actor_remove_contact" => {
            api.actor_remove_contact(
                caller,
                params.required("owner")?,
                params.required("target")?,
            )?;
            rv("removed", true)
        }
        "post" => {
            let extra = NewPost {
                uuid: params.optional("uuid").map(str::to_string),
                location: params.optional("location").map(str::to_string),
                thumbnail_url: params.optional("thumbnail_url").map(str::to_string),
            };
            rv(
                "entry",
                api.post(
                    caller,
                    params.required("nick")?,
                    params.required("message")?,
                    extra,
                )?,
            )
        }
        "entry_get" => rv("entry", api.entry_get(caller, params.required("entry")?)?),
        "entry_add_comment" => rv(
            "comment",
            api.entry_add_comment(
                caller,
                params.required("stream")?,
                params.required("entry")?,
                params.required("nick")?,
                params.required("content")?,
            )?,
        ),
        "entry_get_comments" => rv(
            "comments",
            api.entry_get_comments(caller, params.required("entry")?)?,
        ),
        "entry_remove" => {
            api.entry_remove(caller, params.required("entry")?)?;
            rv("removed", true)
        }
        "entry_mark_as_spam" => rv(
            "abuse",
            api.entry_mark_as_spam(caller, params.required("entry")?)?,
        ),
        "presence_set" => {
            let update = PresenceUpdate {
                senders_timestamp: params.timestamp("senders_timestamp")?,
                status: params.optional("status").map(str::to_string),
                location: params.optional("location").map(str::to_string),
            };
            rv(
                "presence",
                api.presence_set(caller, params.required("nick")?, update)?,
            )
        }
        "presence_get" => rv(
            "presence",
            api.presence_get(
                caller,
                params.required("nick")?,
                params.timestamp("at_time")?,
            )?,
        ),
        "presence_get_contacts" => rv(
            "contacts",
            api.presence_get_contacts(
                caller,
                params.required("nick")?,
                params.timestamp("since_time")?,
            )?,
        ),
        "channel_get" => rv(
            "channel",
            api.channel_get(caller, params.required("channel")?)?,
        ),
        "channel_create" => rv(
            "channel",
            api.channel_create(
                caller,
                params.required("channel")?,
                params.required("nick")?,
            )?,
        ),
        "channel_join" => rv(
            "channel",
            api.channel_join(
                caller,
                params.required("nick")?,
                params.required("channel")?,
            )?,
        ),
        "channel_part" => {
            api.channel_part(
                caller,
                params.required("nick")?,
                params.required("channel")?,
            )?;
            rv("parted", true)
        }
        "channel_get_members" => rv(
            "members",
            api.channel_get_members(
                caller,
                params.required("channel")?,
                params.parsed("limit")?,
                params.optional("offset"),
            )?,
        ),
        "keyvalue_put" => rv(
            "keyvalue",
            api.keyvalue_put(
                caller,
                params.required("nick")?,
                params.required("keyname")?,
                params.optional("value").unwrap_or_default(),
            )?,
        ),
        "keyvalue_get" => rv(
            "keyvalue",
            api.keyvalue_get(
                caller,
                params.required("nick")?,
                params.required("keyname")?,
            )?,
        ),
        "stream_get_actor" => rv(
            "streams",
            api.stream_get_actor(caller, params.required("nick")?)?,
        ),
        "inbox_get_actor_overview" => rv(
            "entries",
            api.inbox_get_actor_overview(
                caller,
                params.required("nick")?,
                params.parsed("limit")?,
            )?,
        ),
        other => Err(ApiError::InvalidMethod(other.to_string())),
    }
}
