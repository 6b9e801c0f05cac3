use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::Cookie;
use actix_web::HttpResponse;
use chrono::{DateTime, Utc};

use super::SessionStore;
use crate::configuration::AuthSettings;
use crate::models::Actor;

fn build_cookie(
    settings: &AuthSettings,
    name: &str,
    value: String,
    expires: Option<OffsetDateTime>,
) -> Cookie<'static> {
    let mut builder = Cookie::build(name.to_string(), value)
        .path(settings.cookie_path.clone());
    if let Some(domain) = settings.cookie_domain() {
        builder = builder.domain(domain.to_string());
    }
    if let Some(expires) = expires {
        builder = builder
            .expires(expires)
            .max_age(CookieDuration::days(settings.remember_days));
    }
    builder.finish()
}

/// Issues a session for `actor` and writes the user and password cookies.
///
/// Remembered logins persist for `remember_days` through both `Expires`
/// and `Max-Age`; otherwise both are browser session cookies.
pub fn set_user_cookie(
    response: &mut HttpResponse,
    sessions: &SessionStore,
    settings: &AuthSettings,
    actor: &Actor,
    remember: bool,
    now: DateTime<Utc>,
) -> Result<String, actix_web::http::Error> {
    let token = sessions.generate_user_auth_token(
        &actor.password_hash,
        settings.session_ttl(),
        now,
    );
    let expires = if remember {
        match OffsetDateTime::from_unix_timestamp(now.timestamp()) {
            Ok(now) => Some(now + CookieDuration::days(settings.remember_days)),
            Err(e) => {
                tracing::warn!(error.message = %e, "Cannot express the cookie expiry");
                None
            }
        }
    } else {
        None
    };

    response.add_cookie(&build_cookie(
        settings,
        &settings.user_cookie,
        actor.nick.clone(),
        expires,
    ))?;
    response.add_cookie(&build_cookie(
        settings,
        &settings.password_cookie,
        token.clone(),
        expires,
    ))?;
    Ok(token)
}

/// Overwrites both cookies with expired, empty ones.
pub fn clear_user_cookie(
    response: &mut HttpResponse,
    settings: &AuthSettings,
) -> Result<(), actix_web::http::Error> {
    for name in [&settings.user_cookie, &settings.password_cookie] {
        let mut cookie = build_cookie(settings, name, String::new(), None);
        cookie.make_removal();
        response.add_cookie(&cookie)?;
    }
    Ok(())
}
