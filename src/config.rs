use serde::{Deserialize, Deserializer};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};

pub const DEFAULT_SUBJECT: &str = "Helpdesk Report";
pub const DEFAULT_BODY: &str = "Please find attached the daily Helpdesk report.";
pub const DEFAULT_SMTP_PORT: u16 = 465;

pub const ENV_SMTP_SERVER: &str = "HELPDESK_SMTP_SERVER";
pub const ENV_SMTP_PORT: &str = "HELPDESK_SMTP_PORT";
pub const ENV_SMTP_SECURITY: &str = "HELPDESK_SMTP_SECURITY";
pub const ENV_EMAIL_FROM: &str = "HELPDESK_EMAIL_FROM";
pub const ENV_EMAIL_TO: &str = "HELPDESK_EMAIL_TO";
pub const ENV_EMAIL_PASSWORD: &str = "HELPDESK_EMAIL_PASSWORD";
pub const ENV_EMAIL_SUBJECT: &str = "HELPDESK_EMAIL_SUBJECT";
pub const ENV_EMAIL_BODY: &str = "HELPDESK_EMAIL_BODY";

/// How the SMTP session is encrypted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// TLS from the first byte (SMTPS, usually port 465).
    #[default]
    #[serde(alias = "ssl", alias = "smtps")]
    Tls,
    /// Plain connection upgraded with STARTTLS (usually port 587).
    StartTls,
}

impl SmtpSecurity {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tls" | "ssl" | "smtps" => Ok(SmtpSecurity::Tls),
            "starttls" => Ok(SmtpSecurity::StartTls),
            other => Err(Error::Config(format!(
                "{} must be 'tls' or 'starttls', got '{}'",
                ENV_SMTP_SECURITY, other
            ))),
        }
    }
}

/// Outbound mail settings, resolved once at the process boundary.
#[derive(Clone, Deserialize)]
pub struct EmailConfig {
    pub from: String,
    #[serde(deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    pub smtp_server: String,
    #[serde(default = "default_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub security: SmtpSecurity,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_SMTP_PORT
}

/// Accepts `"a@x"`, `"a@x, b@y"` or `["a@x", "b@y"]`.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => split_addresses(&s),
        OneOrMany::Many(v) => v
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

fn split_addresses(s: &str) -> Vec<String> {
    s.split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

impl EmailConfig {
    /// Reads the `HELPDESK_*` variables. `Ok(None)` when no SMTP server is set.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| Error::Config(format!("{} must be set", key)));

        let Some(smtp_server) = get(ENV_SMTP_SERVER) else {
            return Ok(None);
        };

        let smtp_port = match get(ENV_SMTP_PORT) {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("Invalid {}: {}", ENV_SMTP_PORT, e)))?,
            None => DEFAULT_SMTP_PORT,
        };

        let security = match get(ENV_SMTP_SECURITY) {
            Some(s) => SmtpSecurity::parse(&s)?,
            None => SmtpSecurity::default(),
        };

        let config = EmailConfig {
            from: require(ENV_EMAIL_FROM)?,
            to: split_addresses(&require(ENV_EMAIL_TO)?),
            smtp_server: smtp_server.trim().to_string(),
            smtp_port,
            security,
            password: require(ENV_EMAIL_PASSWORD)?,
            subject: get(ENV_EMAIL_SUBJECT),
            body: get(ENV_EMAIL_BODY),
        };
        config.validate()?;

        info!(
            "Email delivery configured from environment ({}:{})",
            config.smtp_server, config.smtp_port
        );
        Ok(Some(config))
    }

    /// Loads a JSON settings file; a missing `password` falls back to
    /// `HELPDESK_EMAIL_PASSWORD`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let password = env::var(ENV_EMAIL_PASSWORD).ok();
        let config = Self::from_json_str(&text, password)?;

        info!("Email delivery configured from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str, fallback_password: Option<String>) -> Result<Self> {
        let mut config: EmailConfig = serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("Invalid email settings: {}", e)))?;

        if config.password.is_empty() {
            config.password = fallback_password.unwrap_or_default();
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.from.trim().is_empty() {
            missing.push("from");
        }
        if self.to.is_empty() {
            missing.push("to");
        }
        if self.smtp_server.trim().is_empty() {
            missing.push("smtp_server");
        }
        if self.password.is_empty() {
            missing.push("password");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Missing email settings: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or(DEFAULT_SUBJECT)
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or(DEFAULT_BODY)
    }

    /// Bare address of the sender, used as the SMTP login.
    pub fn from_address(&self) -> &str {
        let from = self.from.trim();
        match (from.rfind('<'), from.rfind('>')) {
            (Some(start), Some(end)) if start < end => from[start + 1..end].trim(),
            _ => from,
        }
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("security", &self.security)
            .field("password", &"<redacted>")
            .field("subject", &self.subject())
            .field("body", &self.body())
            .finish()
    }
}
