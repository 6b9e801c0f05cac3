use actix_web::{web, HttpRequest, HttpResponse};

use crate::authentication::{clear_user_cookie, Authenticator};
use crate::utils::{e500, see_other};

pub async fn log_out(
    request: HttpRequest,
    authenticator: web::Data<Authenticator>,
) -> Result<HttpResponse, actix_web::Error> {
    let settings = authenticator.settings();
    if let Some(token) = request.cookie(&settings.password_cookie) {
        authenticator.sessions().revoke(token.value());
    }
    let mut response = see_other("/");
    clear_user_cookie(&mut response, settings).map_err(e500)?;
    Ok(response)
}
