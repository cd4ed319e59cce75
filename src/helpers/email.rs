use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::config::{EmailConfig, SmtpSecurity};
use crate::error::{Error, Result};

/// SMTP reply codes meaning the server refused our credentials.
const AUTH_REJECTED: &[&str] = &["530", "534", "535"];

/// Builds the report email: text body plus one octet-stream part per file,
/// named after the file's base name.
pub fn build_message<P: AsRef<Path>>(attachments: &[P], config: &EmailConfig) -> Result<Message> {
    let from: Mailbox = config
        .from
        .parse()
        .map_err(|e| Error::Config(format!("Invalid sender address '{}': {}", config.from, e)))?;

    let mut builder = Message::builder().from(from).subject(config.subject());
    for to in &config.to {
        let mailbox: Mailbox = to
            .parse()
            .map_err(|e| Error::Config(format!("Invalid recipient address '{}': {}", to, e)))?;
        builder = builder.to(mailbox);
    }

    let octet_stream = ContentType::parse("application/octet-stream")
        .map_err(|e| Error::Format(e.to_string()))?;

    let mut body = MultiPart::mixed().singlepart(SinglePart::plain(config.body().to_string()));
    for path in attachments {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let content = fs::read(path)
            .inspect_err(|e| error!("Failed to read attachment {}: {}", path.display(), e))?;
        info!("Attaching {} ({} bytes)", filename, content.len());

        body = body.singlepart(Attachment::new(filename).body(content, octet_stream.clone()));
    }

    builder
        .multipart(body)
        .map_err(|e| Error::Format(format!("Failed to build email: {}", e)))
}

fn transport(config: &EmailConfig) -> Result<SmtpTransport> {
    let builder = match config.security {
        SmtpSecurity::Tls => SmtpTransport::relay(&config.smtp_server),
        SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&config.smtp_server),
    }
    .map_err(|e| Error::Transport(format!("Cannot set up TLS for {}: {}", config.smtp_server, e)))?;

    Ok(builder
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.from_address().to_string(),
            config.password.clone(),
        ))
        .build())
}

fn is_auth_rejection(code: &str) -> bool {
    AUTH_REJECTED.contains(&code)
}

fn classify(e: lettre::transport::smtp::Error) -> Error {
    match e.status() {
        Some(code) if is_auth_rejection(&code.to_string()) => Error::Auth(e.to_string()),
        _ => Error::Transport(e.to_string()),
    }
}

/// Sends the exported files in one attempt over an encrypted SMTP session.
pub fn send_report<P: AsRef<Path>>(attachments: &[P], config: &EmailConfig) -> Result<()> {
    info!(
        "Preparing report email with {} attachment(s) for {}",
        attachments.len(),
        config.to.join(", ")
    );

    let message = build_message(attachments, config)?;
    let mailer = transport(config)?;

    info!(
        "Sending via {}:{} ({:?})",
        config.smtp_server, config.smtp_port, config.security
    );
    match mailer.send(&message) {
        Ok(response) => {
            info!("Email accepted by server: {:?}", response.code());
            Ok(())
        }
        Err(e) => {
            error!("Failed to send report email: {}", e);
            Err(classify(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config() -> EmailConfig {
        EmailConfig {
            from: "Helpdesk <helpdesk@example.com>".to_string(),
            to: vec!["manager@example.com".to_string()],
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 465,
            security: SmtpSecurity::Tls,
            password: "secret".to_string(),
            subject: None,
            body: None,
        }
    }

    #[test]
    fn message_carries_attachments_by_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helpdesk_report.pdf");
        fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.5 test")
            .unwrap();

        let message = build_message(&[&path], &config()).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(raw.contains("Subject: Helpdesk Report"));
        assert!(raw.contains("filename=\"helpdesk_report.pdf\""));
        assert!(raw.contains("application/octet-stream"));
        assert!(raw.contains("Please find attached the daily Helpdesk report."));
    }

    #[test]
    fn invalid_recipient_is_a_config_error() {
        let mut cfg = config();
        cfg.to = vec!["not an address".to_string()];
        let attachments: [&Path; 0] = [];

        assert!(matches!(
            build_message(&attachments, &cfg),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn missing_attachment_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.xlsx");

        assert!(matches!(
            build_message(&[&path], &config()),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn login_rejection_codes() {
        assert!(is_auth_rejection("535"));
        assert!(is_auth_rejection("530"));
        assert!(!is_auth_rejection("421"));
        assert!(!is_auth_rejection("550"));
    }

    #[test]
    fn unreachable_server_is_a_transport_error() {
        let mut cfg = config();
        cfg.smtp_server = "127.0.0.1".to_string();
        cfg.smtp_port = 1;
        let attachments: [&Path; 0] = [];

        assert!(matches!(
            send_report(&attachments, &cfg),
            Err(Error::Transport(_))
        ));
    }
}
