use anyhow::Context;
use axum::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::MailConfig;

pub const ACTIVATION_SUBJECT: &str = "Account activation";

/// Plain-text body of the activation e-mail.
pub fn activation_body(token: &str, activation_url: &str) -> String {
    format!(
        "Welcome!\n\n\
         Please activate your account by opening the link below:\n\n\
         {activation_url}\n\n\
         Activation token: {token}\n"
    )
}

/// Outbound mail transport. The registration flow only ever sends the
/// activation message, so the trait stays that narrow.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_activation(&self, to: &str, token: &str, activation_url: &str)
        -> anyhow::Result<()>;
}

/// Sends mail through an HTTP mail-provider API.
#[derive(Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    sender: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .context("MAIL_BASE_URL is required for the HTTP mailer")?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .context("build mail http client")?;
        Ok(Self {
            http,
            base_url,
            api_token: config.api_token.clone(),
            sender: config.sender.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_activation(
        &self,
        to: &str,
        token: &str,
        activation_url: &str,
    ) -> anyhow::Result<()> {
        let body = activation_body(token, activation_url);
        let mut request = self
            .http
            .post(format!("{}/email", self.base_url))
            .json(&SendEmailRequest {
                from: &self.sender,
                to,
                subject: ACTIVATION_SUBJECT,
                text: &body,
            });
        if let Some(api_token) = &self.api_token {
            request = request.bearer_auth(api_token);
        }
        let response = request.send().await.context("send activation e-mail")?;
        response
            .error_for_status()
            .context("mail provider rejected the message")?;
        info!(%to, "activation e-mail sent");
        Ok(())
    }
}

/// Development fallback used when no mail provider is configured: the
/// e-mail is logged and delivery is reported as successful.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_activation(
        &self,
        to: &str,
        token: &str,
        activation_url: &str,
    ) -> anyhow::Result<()> {
        info!(
            %to,
            subject = ACTIVATION_SUBJECT,
            "mail provider not configured; logging activation e-mail\n{}",
            activation_body(token, activation_url)
        );
        Ok(())
    }
}
