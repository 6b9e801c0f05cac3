mod cookie;
mod legacy;
mod login;
mod oauth;
mod password;
mod resolver;
mod session;

pub use cookie::{clear_user_cookie, set_user_cookie};
pub use legacy::generate_personal_key;
pub use login::Authenticator;
pub use oauth::{
    normalize_url, parse_authorization_header, signature_base_string,
    OAuthClient, OAuthVerifier, SignatureMethod,
};
pub use password::{
    compute_password_hash, generate_password, hash_generic,
    hash_password_intermediate, verify_password_hash,
};
pub use resolver::{AuthResolver, AuthStrategy, Outcome, RequestCredentials};
pub use session::SessionStore;
