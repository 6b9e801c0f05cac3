use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use secrecy::Secret;

const TOKEN_LENGTH: usize = 32;

struct Session {
    password_hash: Secret<String>,
    expires_at: DateTime<Utc>,
}

/// Server side half of the password cookie.
///
/// The cookie carries an opaque token; the session keyed by it holds the
/// password hash the actor had at login. A session is valid while it has
/// not expired and its hash still matches the actor's.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

fn generate_session_token() -> String {
    let mut rng = thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(TOKEN_LENGTH)
        .collect()
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate_user_auth_token(
        &self,
        password_hash: &Secret<String>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> String {
        let token = generate_session_token();
        self.sessions.insert(
            token.clone(),
            Session {
                password_hash: password_hash.clone(),
                expires_at: now + ttl,
            },
        );
        token
    }

    /// The password hash stored under `token`. Expired sessions are
    /// dropped on sight.
    pub fn lookup_user_auth_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Option<Secret<String>> {
        let expired = match self.sessions.get(token) {
            None => return None,
            Some(session) if session.expires_at > now => {
                return Some(session.password_hash.clone())
            }
            Some(_) => true,
        };
        if expired {
            self.sessions.remove(token);
        }
        None
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.remove(token);
    }

    /// Removes every expired session and returns how many went.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
