use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer};
use tracing_actix_web::TracingLogger;

use crate::api::Api;
use crate::authentication::{
    AuthResolver, Authenticator, OAuthVerifier, SessionStore,
};
use crate::clock::{Clock, SystemClock};
use crate::configuration::{ApiSettings, Settings};
use crate::email_client::EmailClient;
use crate::routes::{api_json, health_check, log_out, login, user_overview};
use crate::store::Datastore;

pub struct Application {
    port: u16,
    server: Server,
    api: Api,
    sessions: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, std::io::Error> {
        Self::build_with_clock(configuration, Arc::new(SystemClock)).await
    }

    /// Like `build`, with every timestamp taken from `clock`.
    pub async fn build_with_clock(
        configuration: Settings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, std::io::Error> {
        let sender_email = configuration
            .email_client
            .sender()
            .expect("invalid sender email address");
        let timeout = configuration.email_client.timeout();
        let email_client = EmailClient::new(
            configuration.email_client.base_url,
            sender_email,
            configuration.email_client.authorization_token,
            timeout,
            configuration.email_client.limit_domain,
        );

        let api = Api::new(
            Arc::new(Datastore::new()),
            clock.clone(),
            email_client,
            configuration.api.ns_domain.clone(),
            configuration.api.site_name.clone(),
            configuration.application.base_url,
        );
        let sessions = Arc::new(SessionStore::new());
        let authenticator = Authenticator::new(
            api.clone(),
            sessions.clone(),
            configuration.auth,
            configuration.application.hmac_secret,
        );
        let verifier =
            Arc::new(OAuthVerifier::new(api.clone(), configuration.api.clone()));
        let resolver = AuthResolver::new(authenticator.clone(), verifier);

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        tracing::info!("app started at: {}", &address);
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            api.clone(),
            authenticator,
            resolver,
            configuration.api,
        )?;
        Ok(Self {
            port,
            server,
            api,
            sessions,
            clock,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn api(&self) -> Api {
        self.api.clone()
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        self.sessions.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    // A more expressive name that makes it clear that
    // this function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    api: Api,
    authenticator: Authenticator,
    resolver: AuthResolver,
    api_settings: ApiSettings,
) -> Result<Server, std::io::Error> {
    let api = Data::new(api);
    let authenticator = Data::new(authenticator);
    let resolver = Data::new(resolver);
    let api_settings = Data::new(api_settings);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/api/json", web::get().to(api_json))
            .route("/api/json", web::post().to(api_json))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(log_out))
            .route("/user/{nick}/overview", web::get().to(user_overview))
            .app_data(api.clone())
            .app_data(authenticator.clone())
            .app_data(resolver.clone())
            .app_data(api_settings.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
