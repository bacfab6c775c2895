use tracing::Span;

use super::{storage_failure, Collaborators};
use crate::error::{Invalid, Subject, UcpError, UcpResult};
use crate::models::{AjailRequest, BanEntry, CharacterRef, LogCategory, LogRecord};
use crate::repository::RepoError;
use crate::validation;

const LOG_PAGE: u64 = 100;

/// Admin tooling beyond bans: lookups, jail, logs, housekeeping.
pub struct ModerationService {
    collab: Collaborators,
    span: Span,
}

impl ModerationService {
    pub fn new(collab: Collaborators, span: Span) -> Self {
        Self { collab, span }
    }

    fn storage(&self, actor: &str, op: &'static str, e: RepoError) -> UcpError {
        storage_failure(&self.span, actor, op, e)
    }

    pub async fn fetch_character(&self, admin: &str, name: &str) -> UcpResult<CharacterRef> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Invalid::MissingCharacterName.into());
        }
        self.collab
            .repo
            .find_character(name)
            .await
            .map_err(|e| self.storage(admin, "find_character", e))?
            .ok_or(UcpError::NotFound(Subject::Character))
    }

    pub async fn ban_list(&self, admin: &str) -> UcpResult<Vec<BanEntry>> {
        self.collab
            .repo
            .active_bans(self.collab.clock.now())
            .await
            .map_err(|e| self.storage(admin, "active_bans", e))
    }

    pub async fn ajail(&self, admin: &str, req: AjailRequest) -> UcpResult<()> {
        let name = req.character.trim();
        validation::required(&[name, req.reason.as_str()])?;
        if req.time <= 0 {
            return Err(Invalid::MissingField.into());
        }
        let seconds = req
            .time
            .checked_mul(60)
            .ok_or(UcpError::Validation(Invalid::MissingField))?;

        match self.collab.repo.jail_character(name, seconds).await {
            Ok(()) => {
                tracing::info!(parent: &self.span, admin, character = name, minutes = req.time, reason = %req.reason, "Character jailed");
                Ok(())
            }
            Err(RepoError::NoRows) => Err(UcpError::NotFound(Subject::Character)),
            Err(e) => Err(self.storage(admin, "jail_character", e)),
        }
    }

    pub async fn logs(&self, actor: &str, category: &str) -> UcpResult<Vec<LogRecord>> {
        let category: LogCategory = category.parse()?;
        self.collab
            .repo
            .recent_logs(category, LOG_PAGE)
            .await
            .map_err(|e| self.storage(actor, "recent_logs", e))
    }

    pub async fn purge_expired_characters(&self) -> UcpResult<u64> {
        let purged = self
            .collab
            .repo
            .purge_expired_characters()
            .await
            .map_err(|e| self.storage("maintenance", "purge_expired_characters", e))?;
        if purged > 0 {
            tracing::info!(parent: &self.span, purged, "Expired characters removed");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::character;
    use crate::test_support::{harness, seed_character};

    #[tokio::test]
    async fn fetch_character_finds_owner() {
        let h = harness().await;
        seed_character(&h.db, "alice", "John_Smith", character::ACCEPTED).await;

        let found = h.moderation.fetch_character("admin", "John_Smith").await.unwrap();
        assert_eq!(found.username, "alice");
        assert!(matches!(
            h.moderation.fetch_character("admin", "Nobody_Here").await,
            Err(UcpError::NotFound(Subject::Character))
        ));
    }

    #[tokio::test]
    async fn ajail_requires_every_field() {
        let h = harness().await;
        seed_character(&h.db, "alice", "John_Smith", character::ACCEPTED).await;
        let req = |time, reason: &str| AjailRequest {
            character: "John_Smith".into(),
            time,
            reason: reason.into(),
        };

        assert!(matches!(
            h.moderation.ajail("admin", req(0, "dm")).await,
            Err(UcpError::Validation(Invalid::MissingField))
        ));
        assert!(matches!(
            h.moderation.ajail("admin", req(10, "")).await,
            Err(UcpError::Validation(Invalid::MissingField))
        ));
        h.moderation.ajail("admin", req(10, "dm")).await.unwrap();
    }

    #[tokio::test]
    async fn logs_reject_unknown_categories() {
        let h = harness().await;
        assert!(matches!(
            h.moderation.logs("mod", "accounts").await,
            Err(UcpError::Validation(Invalid::LogCategory))
        ));
        assert!(h.moderation.logs("mod", "logs_warn").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_counts_removed_rows() {
        let h = harness().await;
        seed_character(&h.db, "alice", "Old_Smith", character::EXPIRED).await;
        seed_character(&h.db, "alice", "John_Smith", character::ACCEPTED).await;
        assert_eq!(h.moderation.purge_expired_characters().await.unwrap(), 1);
        assert_eq!(h.moderation.purge_expired_characters().await.unwrap(), 0);
    }
}
