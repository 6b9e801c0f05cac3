use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

use crate::domain::ActorEmail;

#[derive(Clone)]
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: ActorEmail,
    authorization_token: Secret<String>,
    limit_domain: Option<String>,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: ActorEmail,
        authorization_token: Secret<String>,
        timeout: std::time::Duration,
        limit_domain: Option<String>,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build the email http client");
        Self {
            http_client,
            base_url,
            sender,
            authorization_token,
            limit_domain,
        }
    }

    #[tracing::instrument(name = "Send email", skip(self, html_content, text_content))]
    pub async fn send_email(
        &self,
        recipient: &ActorEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), reqwest::Error> {
        if let Some(limit_domain) = &self.limit_domain {
            if recipient.domain() != limit_domain {
                tracing::info!(
                    recipient = %recipient,
                    "Skipping email outside of the allowed domain"
                );
                return Ok(());
            }
        }

        let url = format!("{}/email", self.base_url);
        let request_body = SendEmailRequest {
            from: self.sender.as_ref(),
            to: recipient.as_ref(),
            subject,
            html_body: html_content,
            text_body: text_content,
        };
        self.http_client
            .post(&url)
            .header(
                "X-Postmark-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}
