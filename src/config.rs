use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Base URL of the HTTP mail provider. When unset the app logs
    /// activation e-mails instead of sending them.
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub sender: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public origin used to build activation links in e-mails.
    pub public_base_url: String,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let mail = MailConfig {
            base_url: std::env::var("MAIL_BASE_URL").ok(),
            api_token: std::env::var("MAIL_API_TOKEN").ok(),
            sender: std::env::var("MAIL_SENDER").unwrap_or_else(|_| "noreply@enlist.local".into()),
            timeout_ms: std::env::var("MAIL_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10_000),
        };
        Ok(Self {
            database_url,
            public_base_url,
            mail,
        })
    }
}
