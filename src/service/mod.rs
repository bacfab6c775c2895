pub mod accounts;
pub mod characters;
pub mod moderation;
pub mod reports;

pub use accounts::AccountService;
pub use characters::CharacterService;
pub use moderation::ModerationService;
pub use reports::ReportService;

use std::sync::Arc;

use tracing::Span;

use crate::clock::Clock;
use crate::error::UcpError;
use crate::notify::Notifier;
use crate::repository::{RepoError, Repository};

/// Ports every service is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub repo: Arc<dyn Repository>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Wraps an engine failure, logging who was doing what.
pub(crate) fn storage_failure(
    span: &Span,
    actor: &str,
    op: &'static str,
    source: RepoError,
) -> UcpError {
    tracing::error!(parent: span, actor, action = op, "Storage failure: {source}");
    UcpError::Storage { op, source }
}

/// Mails a player in the background; failures are only logged.
pub(crate) fn notify_player(
    collab: &Collaborators,
    span: &Span,
    username: String,
    subject: &'static str,
    body: String,
) {
    let repo = collab.repo.clone();
    let notifier = collab.notifier.clone();
    let span = span.clone();
    tokio::spawn(async move {
        let address = match repo.account_email(&username).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                tracing::warn!(parent: &span, username = %username, subject, "No email on file, notification dropped");
                return;
            }
            Err(e) => {
                tracing::error!(parent: &span, username = %username, subject, "Failed to look up email: {e}");
                return;
            }
        };
        if let Err(e) = notifier.send(&address, subject, &body).await {
            tracing::warn!(parent: &span, username = %username, subject, "Failed to deliver notification: {e}");
        }
    });
}
