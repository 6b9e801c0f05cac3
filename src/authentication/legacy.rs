//! Personal keys handed out before OAuth existed.
//!
//! A key is a truncated HMAC over the actor's nick and current password
//! hash, so changing the password revokes every key issued before.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

use crate::api::Api;
use crate::domain::{AccessLevel, Nick};
use crate::models::{Actor, Principal};

type HmacSha256 = Hmac<Sha256>;

const PERSONAL_KEY_BYTES: usize = 10;

fn personal_key_mac(
    hmac_secret: &Secret<String>,
    actor: &Actor,
) -> Result<HmacSha256, anyhow::Error> {
    let mut mac =
        HmacSha256::new_from_slice(hmac_secret.expose_secret().as_bytes())?;
    mac.update(actor.nick.as_bytes());
    mac.update(b":");
    mac.update(actor.password_hash.expose_secret().as_bytes());
    Ok(mac)
}

pub fn generate_personal_key(
    hmac_secret: &Secret<String>,
    actor: &Actor,
) -> Result<String, anyhow::Error> {
    let tag = personal_key_mac(hmac_secret, actor)?.finalize().into_bytes();
    Ok(hex::encode(&tag[..PERSONAL_KEY_BYTES]))
}

/// Resolves `nick` with `Delete` access when `personal_key` is its key.
#[tracing::instrument(name = "Authenticate personal key", skip(api, hmac_secret, personal_key))]
pub fn authenticate_user_personal_key(
    api: &Api,
    hmac_secret: &Secret<String>,
    nick: &str,
    personal_key: &str,
) -> Option<Principal> {
    let nick = Nick::parse_user(nick, api.ns_domain()).ok()?;
    let actor = api.actor_for_auth(nick.as_str())?;
    let tag = hex::decode(personal_key.trim()).ok()?;
    if tag.len() != PERSONAL_KEY_BYTES {
        return None;
    }
    let verified = personal_key_mac(hmac_secret, &actor)
        .ok()?
        .verify_truncated_left(&tag)
        .is_ok();
    if !verified {
        tracing::info!("Personal key did not match");
        return None;
    }
    let mut principal = Principal::new(actor, AccessLevel::Delete);
    principal.legacy = true;
    Some(principal)
}
