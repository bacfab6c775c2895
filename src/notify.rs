use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay rejected the message (status={status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("mail delivery timed out")]
    Timeout,
}

/// Outbound mail to players.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Serialize)]
struct MailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailBody<'a> {
    sender: &'a MailAddress,
    to: Vec<MailAddress>,
    subject: &'a str,
    html_content: &'a str,
}

/// Posts messages to a transactional-mail HTTP API.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender: MailAddress,
}

impl HttpMailer {
    pub fn new(
        endpoint: String,
        api_key: String,
        from_email: String,
        from_name: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            sender: MailAddress {
                email: from_email,
                name: from_name.filter(|n| !n.trim().is_empty()),
            },
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        let body = SendMailBody {
            sender: &self.sender,
            to: vec![MailAddress {
                email: to.to_string(),
                name: None,
            }],
            subject,
            html_content: html_body,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Used when no mail API is configured: the message only reaches the log.
pub struct LogMailer;

#[async_trait]
impl Notifier for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        tracing::info!(to, subject, "Mail relay not configured, dropping message:\n{html_body}");
        Ok(())
    }
}

// ─── Templates ───

pub const CONFIRM_SUBJECT: &str = "Confirmare cont";
pub const RESET_SUBJECT: &str = "Resetare parola";
pub const ACCEPTED_SUBJECT: &str = "Caracter acceptat";
pub const REJECTED_SUBJECT: &str = "Caracter respins";

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn confirm_account_body(username: &str, link: &str) -> String {
    format!(
        "<p>Salut {},</p>\
         <p>Confirma adresa de email pentru a activa contul:</p>\
         <p><a href=\"{}\">Activeaza contul</a></p>\
         <p>Link-ul expira in 15 minute.</p>",
        escape(username),
        escape(link)
    )
}

pub fn reset_password_body(link: &str) -> String {
    format!(
        "<p>A fost ceruta resetarea parolei pentru contul tau.</p>\
         <p><a href=\"{}\">Seteaza o parola noua</a></p>\
         <p>Link-ul expira in 15 minute. Daca nu ai cerut resetarea, ignora acest mesaj.</p>",
        escape(link)
    )
}

pub fn character_accepted_body(owner: &str, character: &str, when: &str) -> String {
    format!(
        "<p>Salut {},</p>\
         <p>Caracterul <b>{}</b> a fost acceptat la {}.</p>\
         <p>Te asteptam pe server!</p>",
        escape(owner),
        escape(character),
        escape(when)
    )
}

pub fn character_rejected_body(
    owner: &str,
    character: &str,
    when: &str,
    reason: &str,
    reviewer: &str,
) -> String {
    format!(
        "<p>Salut {},</p>\
         <p>Caracterul <b>{}</b> a fost respins la {} de {}.</p>\
         <p>Motiv: {}</p>",
        escape(owner),
        escape(character),
        escape(when),
        escape(reviewer),
        escape(reason)
    )
}
