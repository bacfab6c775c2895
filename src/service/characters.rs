use tracing::Span;

use super::{notify_player, storage_failure, Collaborators};
use crate::clock::format_timestamp;
use crate::error::{Invalid, Subject, UcpError, UcpResult};
use crate::models::{CharacterData, CharacterRef, RejectCharacterRequest, MAX_CHARACTERS};
use crate::notify;
use crate::repository::{NewCharacter, RepoError};
use crate::validation;

const FEMALE: i32 = 1;
const FEMALE_SKIN: i32 = 98;
const MALE_SKIN: i32 = 93;

pub fn skin_for(gender: i32) -> i32 {
    if gender == FEMALE {
        FEMALE_SKIN
    } else {
        MALE_SKIN
    }
}

/// Character proposals and their review by staff.
pub struct CharacterService {
    collab: Collaborators,
    span: Span,
}

impl CharacterService {
    pub fn new(collab: Collaborators, span: Span) -> Self {
        Self { collab, span }
    }

    fn storage(&self, actor: &str, op: &'static str, e: RepoError) -> UcpError {
        storage_failure(&self.span, actor, op, e)
    }

    pub async fn propose(&self, owner: &str, req: CharacterData) -> UcpResult<()> {
        let name = req.character_name.trim();
        validation::character(name, &req.character_origin, req.character_age)?;

        let repo = &self.collab.repo;
        let live = repo
            .character_count(owner)
            .await
            .map_err(|e| self.storage(owner, "character_count", e))?;
        if live >= MAX_CHARACTERS as u64 {
            return Err(UcpError::QuotaExceeded);
        }

        let taken = repo
            .character_name_taken(name)
            .await
            .map_err(|e| self.storage(owner, "character_name_taken", e))?;
        if taken {
            return Err(UcpError::DuplicateCharacterName);
        }

        match repo
            .create_character(NewCharacter {
                owner: owner.to_string(),
                name: name.to_string(),
                age: req.character_age,
                gender: req.character_gender,
                origin: req.character_origin.trim().to_string(),
                skin: skin_for(req.character_gender),
            })
            .await
        {
            Ok(()) => {
                tracing::info!(parent: &self.span, owner, character = name, "Character proposed");
                Ok(())
            }
            Err(RepoError::Duplicate) => Err(UcpError::DuplicateCharacterName),
            Err(e) => Err(self.storage(owner, "create_character", e)),
        }
    }

    pub async fn list_waiting(&self) -> UcpResult<Vec<CharacterData>> {
        self.collab
            .repo
            .proposed_characters()
            .await
            .map_err(|e| self.storage("-", "proposed_characters", e))
    }

    pub async fn accept(&self, reviewer: &str, req: CharacterRef) -> UcpResult<()> {
        let owner = req.username.trim();
        let name = req.character_name.trim();
        if name.is_empty() {
            return Err(Invalid::MissingCharacterName.into());
        }

        match self.collab.repo.accept_character(owner, name, reviewer).await {
            Ok(()) => {}
            Err(RepoError::NoRows) => {
                tracing::info!(parent: &self.span, reviewer, owner, character = name, "Nothing to accept");
                return Err(UcpError::NotFound(Subject::Character));
            }
            Err(e) => return Err(self.storage(reviewer, "accept_character", e)),
        }
        tracing::info!(parent: &self.span, reviewer, owner, character = name, "Character accepted");

        let when = format_timestamp(self.collab.clock.now());
        notify_player(
            &self.collab,
            &self.span,
            owner.to_string(),
            notify::ACCEPTED_SUBJECT,
            notify::character_accepted_body(owner, name, &when),
        );
        Ok(())
    }

    pub async fn reject(&self, reviewer: &str, req: RejectCharacterRequest) -> UcpResult<()> {
        let owner = req.username.trim();
        let name = req.character_name.trim();
        if name.is_empty() {
            return Err(Invalid::MissingCharacterName.into());
        }

        match self.collab.repo.delete_proposed_character(owner, name).await {
            Ok(()) => {}
            Err(RepoError::NoRows) => return Err(UcpError::NotFound(Subject::Character)),
            Err(e) => return Err(self.storage(reviewer, "delete_proposed_character", e)),
        }
        tracing::info!(parent: &self.span, reviewer, owner, character = name, "Character rejected");

        let when = format_timestamp(self.collab.clock.now());
        notify_player(
            &self.collab,
            &self.span,
            owner.to_string(),
            notify::REJECTED_SUBJECT,
            notify::character_rejected_body(owner, name, &when, &req.reason, reviewer),
        );
        Ok(())
    }
}
