use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use secrecy::Secret;

use crate::authentication::{set_user_cookie, Authenticator};
use crate::error::error_chain_fmt;
use crate::telemetry::spawn_blocking_with_tracing;
use crate::utils::see_other;

#[derive(serde::Deserialize)]
pub struct FormData {
    log: String,
    password: Secret<String>,
    remember: Option<String>,
}

#[derive(thiserror::Error)]
pub enum LoginError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for LoginError {
    fn status_code(&self) -> StatusCode {
        match self {
            LoginError::AuthError(_) => StatusCode::UNAUTHORIZED,
            LoginError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[tracing::instrument(
    skip(form, authenticator),
    fields(login = tracing::field::Empty)
)]
pub async fn login(
    form: web::Form<FormData>,
    authenticator: web::Data<Authenticator>,
) -> Result<HttpResponse, LoginError> {
    let FormData {
        log,
        password,
        remember,
    } = form.into_inner();
    tracing::Span::current().record("login", &tracing::field::display(&log));

    let lookup = authenticator.clone();
    let principal = spawn_blocking_with_tracing(move || {
        lookup.lookup_user_by_login(&log, &password)
    })
    .await
    .context("Failed to spawn blocking task.")?
    .ok_or_else(|| {
        LoginError::AuthError(anyhow::anyhow!("Unknown login or wrong password"))
    })?;

    let mut response = see_other(&format!(
        "/user/{}/overview",
        principal.actor.display_nick()
    ));
    set_user_cookie(
        &mut response,
        authenticator.sessions(),
        authenticator.settings(),
        &principal.actor,
        remember.is_some(),
        authenticator.api().now(),
    )
    .map_err(|e| {
        LoginError::UnexpectedError(anyhow::anyhow!("Failed to set the login cookies: {}", e))
    })?;
    Ok(response)
}
