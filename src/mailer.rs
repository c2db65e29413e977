use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::config::MailConfig;
use crate::models::User;

/// OutboundMail
///
/// A single plain-text message ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected the message with status {0}")]
    Rejected(u16),
    #[error("simulated mail failure")]
    Simulated,
}

// 1. Mailer Contract
/// Mailer
///
/// Abstract contract for outbound mail. Handlers only ever see `MailerState`, so
/// the Mailgun client, the disabled sink and the test mock are interchangeable.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError>;
}

// 2. The Real Implementation (Mailgun HTTP API)
/// MailgunMailer
///
/// Posts form-encoded messages to `{base_url}/v3/{domain}/messages` with the
/// `api` basic-auth user.
#[derive(Clone)]
pub struct MailgunMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl MailgunMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v3/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            self.config.domain
        )
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        let form = [
            ("from", self.config.from.as_str()),
            ("to", mail.to.as_str()),
            ("subject", mail.subject.as_str()),
            ("text", mail.text.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint())
            .basic_auth("api", Some(&self.config.api_key))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// DisabledMailer
///
/// Used when no mail provider is configured. Drops every message.
#[derive(Clone, Default)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        tracing::debug!(to = %mail.to, "mail disabled, message dropped");
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockMailer
///
/// Records every message it is asked to send. With `should_fail` set it reports
/// a failure instead, after recording.
#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<OutboundMail>>>,
    pub should_fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        if self.should_fail {
            return Err(MailError::Simulated);
        }
        Ok(())
    }
}

/// MailerState
///
/// The shared handle to the configured mailer inside `AppState`.
pub type MailerState = Arc<dyn Mailer>;

/// Picks the Mailgun client when mail is configured, otherwise the disabled sink.
pub fn from_config(config: Option<&MailConfig>) -> MailerState {
    match config {
        Some(mail) => Arc::new(MailgunMailer::new(mail.clone())),
        None => Arc::new(DisabledMailer),
    }
}

/// Builds the greeting sent to a newly created account, or `None` when the
/// account has no email address.
pub fn welcome_message(user: &User) -> Option<OutboundMail> {
    let to = user.email.as_deref()?.trim();
    if to.is_empty() {
        return None;
    }

    Some(OutboundMail {
        to: to.to_string(),
        subject: "Bienvenido al sistema de expedientes".to_string(),
        text: format!(
            "Hola {},\n\nSu cuenta fue creada con el rol {}. \
             Puede ingresar con su DNI ({}) y la contraseña asignada.",
            user.username, user.role, user.dni
        ),
    })
}

/// dispatch_welcome
///
/// Fire-and-forget delivery of the welcome message. The creation that triggered
/// it has already committed; a delivery failure is only logged.
pub fn dispatch_welcome(mailer: &MailerState, user: &User) {
    let Some(mail) = welcome_message(user) else {
        return;
    };

    let mailer = mailer.clone();
    let user_id = user.id;
    tokio::spawn(async move {
        match mailer.send(&mail).await {
            Ok(()) => tracing::debug!(%user_id, "welcome mail sent"),
            Err(e) => tracing::warn!(%user_id, "welcome mail failed: {}", e),
        }
    });
}
