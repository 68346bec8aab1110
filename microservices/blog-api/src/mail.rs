//! Outbound email
//!
//! Contact notifications go to the site administrator, welcome emails to new
//! newsletter subscribers. Without SMTP credentials every send is skipped.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tracing::info;

use crate::config::MailConfig;
use crate::model::ContactRecord;

const SITE_NAME: &str = "Sentinela de Dados";
const SITE_URL: &str = "https://sentineladedados.com";

/// Emails the service knows how to send
#[derive(Debug, Clone, PartialEq)]
pub enum EmailTemplate {
    /// Notify the administrator of a contact-form submission
    ContactNotification(ContactRecord),
    /// Greet a new newsletter subscriber
    NewsletterWelcome { email: String },
}

impl EmailTemplate {
    pub fn kind(&self) -> &'static str {
        match self {
            EmailTemplate::ContactNotification(_) => "contact_notification",
            EmailTemplate::NewsletterWelcome { .. } => "newsletter_welcome",
        }
    }
}

/// Outcome of a send that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Mail is not configured
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Email sender abstraction
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, template: EmailTemplate) -> Result<Delivery, MailError>;
}

/// A template resolved into headers and bodies
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    /// Present for multipart/alternative emails
    pub html: Option<String>,
}

pub fn render(template: &EmailTemplate, config: &MailConfig) -> RenderedEmail {
    match template {
        EmailTemplate::ContactNotification(contact) => RenderedEmail {
            from: config.username.clone(),
            to: config.admin_email.clone(),
            subject: format!("[{}] New contact: {}", SITE_NAME, contact.subject),
            text: format!(
                "New contact received on the {site} website:\n\n\
                Name: {name}\n\
                Email: {email}\n\
                Subject: {subject}\n\
                Date: {date}\n\n\
                Message:\n\
                {message}\n\n\
                ---\n\
                IP: {ip}\n\
                User Agent: {user_agent}\n",
                site = SITE_NAME,
                name = contact.name,
                email = contact.email,
                subject = contact.subject,
                date = contact.timestamp.to_rfc3339(),
                message = contact.message,
                ip = contact.ip.as_deref().unwrap_or("unknown"),
                user_agent = contact.user_agent,
            ),
            html: None,
        },
        EmailTemplate::NewsletterWelcome { email } => RenderedEmail {
            from: format!("{} <{}>", SITE_NAME, config.username),
            to: email.clone(),
            subject: format!("Welcome to the {} newsletter!", SITE_NAME),
            text: welcome_text(),
            html: Some(welcome_html()),
        },
    }
}

fn welcome_text() -> String {
    format!(
        "Hello!\n\n\
        Thank you for subscribing to the {site} newsletter!\n\n\
        You will receive exclusive analysis on:\n\
        - Artificial Intelligence\n\
        - Big Data\n\
        - Cybersecurity\n\
        - Technology law\n\
        - And much more!\n\n\
        Keep an eye on your inbox so you don't miss anything.\n\n\
        If you did not subscribe or want to cancel your subscription,\n\
        visit: {url}/unsubscribe\n\n\
        Best regards,\n\
        The {site} Team\n",
        site = SITE_NAME,
        url = SITE_URL,
    )
}

fn welcome_html() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background: linear-gradient(135deg, #1e3a8a 0%, #065f46 100%); color: white; padding: 30px; text-align: center; }}
        .content {{ padding: 30px; background: #f9fafb; }}
        .footer {{ padding: 20px; text-align: center; color: #666; font-size: 12px; }}
        .button {{ display: inline-block; background: #1e3a8a; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; margin: 20px 0; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Welcome to {site}!</h1>
        </div>
        <div class="content">
            <h2>Thank you for subscribing!</h2>
            <p>You are now part of our community and will receive exclusive analysis on:</p>
            <ul>
                <li><strong>Artificial Intelligence</strong> - impacts and ethical debates</li>
                <li><strong>Big Data</strong> - privacy and data use</li>
                <li><strong>Cybersecurity</strong> - digital protection</li>
                <li><strong>Legislation</strong> - LGPD, PL 2338/2023 and more</li>
                <li><strong>Humor</strong> - the fun side of technology</li>
            </ul>
            <p>Keep an eye on your inbox so you don't miss anything!</p>
            <a href="{url}" class="button">Visit our website</a>
        </div>
        <div class="footer">
            <p>If you did not subscribe or want to cancel your subscription,
            <a href="{url}/unsubscribe">click here</a>.</p>
        </div>
    </div>
</body>
</html>
"#,
        site = SITE_NAME,
        url = SITE_URL,
    )
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e| MailError::Address {
        address: address.to_string(),
        reason: format!("{}", e),
    })
}

/// Build the MIME message for a rendered email
pub fn build_message(email: &RenderedEmail) -> Result<Message, MailError> {
    let builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.clone());

    let message = match &email.html {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.text.clone()),
    };

    message.map_err(|e| MailError::Build(e.to_string()))
}

/// SMTP sender using a STARTTLS relay
pub struct SmtpMailer {
    config: MailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let transport = if config.is_configured() {
            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                .map_err(|e| MailError::Smtp(format!("SMTP relay error: {}", e)))?
                .port(config.port)
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .timeout(Some(Duration::from_secs(config.timeout_secs)))
                .build();
            Some(transport)
        } else {
            info!("SMTP credentials not set, outbound email disabled");
            None
        };

        Ok(Self { config, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, template: EmailTemplate) -> Result<Delivery, MailError> {
        let Some(transport) = &self.transport else {
            info!(kind = template.kind(), "Email skipped, SMTP not configured");
            return Ok(Delivery::Skipped);
        };

        let email = render(&template, &self.config);
        let message = build_message(&email)?;

        transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        info!(kind = template.kind(), to = %email.to, "Email sent");
        Ok(Delivery::Sent)
    }
}
