//! src/configuration.rs

use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::ActorEmail;

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub api: ApiSettings,
    pub email_client: EmailClientSettings,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub authorization_token: Secret<String>,
    pub timeout_milliseconds: u64,
    // Outside of production only addresses in this domain receive mail.
    #[serde(default)]
    pub limit_domain: Option<String>,
}

impl EmailClientSettings {
    pub fn sender(&self) -> Result<ActorEmail, String> {
        ActorEmail::parse(self.sender_email.clone()).map_err(|e| e.to_string())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub base_url: String,
    pub hmac_secret: Secret<String>,
}

/// Cookie and session parameters of the login flow.
#[derive(serde::Deserialize, Debug, Clone)]
pub struct AuthSettings {
    pub user_cookie: String,
    pub password_cookie: String,
    pub cookie_path: String,
    // "localhost" means the Domain attribute is left out
    pub cookie_domain: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub session_ttl_seconds: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub remember_days: i64,
    pub allow_legacy_auth: bool,
    pub debug_password_login: bool,
}

impl AuthSettings {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_seconds)
    }

    pub fn cookie_domain(&self) -> Option<&str> {
        match self.cookie_domain.as_str() {
            "localhost" | "" => None,
            domain => Some(domain),
        }
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct ApiSettings {
    pub ns_domain: String,
    pub site_name: String,
    // Every /api/json call runs as root when set. Never enable outside tests.
    pub disable_verification: bool,
    pub allow_plaintext: bool,
    pub allow_root_plaintext: bool,
    pub allow_root_hmac_sha1: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub oauth_timestamp_window_seconds: i64,
    pub root_consumer_key: String,
    pub root_consumer_secret: Secret<String>,
    pub root_token_key: String,
    pub root_token_secret: Secret<String>,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let mut settings = config::Config::default();
    let base_path = std::env::current_dir()
        .expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");
    settings.merge(
        config::File::from(configuration_directory.join("base")).required(true),
    )?;
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT");
    settings.merge(
        config::File::from(configuration_directory.join(environment.as_str()))
            .required(true),
    )?;

    // Add in settings from environment variables (with a prefix of APP and '__' as separator)
    // E.g. `APP_APPLICATION__PORT=5001 would set `Settings.application.port`
    settings.merge(config::Environment::with_prefix("app").separator("__"))?;

    settings.try_into()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(a: String) -> Result<Self, Self::Error> {
        match a.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!("{} is not supported environment. Use either 'Local' or 'Production'.", other)),
        }
    }
}
