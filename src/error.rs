use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::BaseResponse;
use crate::notify::NotifyError;
use crate::repository::RepoError;

const INTERNAL_MESSAGE: &str = "A aparut o eroare interna.";

/// Coarse classification used for status codes and log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Unauthorized,
    NotFound,
    Internal,
}

/// Reasons a request body or query failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Invalid {
    #[error("required field is empty")]
    MissingField,
    #[error("username can only contain letters and digits")]
    Username,
    #[error("invalid email address")]
    Email,
    #[error("password does not meet the strength rules")]
    WeakPassword,
    #[error("character name cannot be empty")]
    MissingCharacterName,
    #[error("invalid character name")]
    CharacterName,
    #[error("origin cannot be empty")]
    MissingOrigin,
    #[error("origin contains wrong characters")]
    OriginCharacters,
    #[error("invalid length for character origin")]
    OriginLength,
    #[error("age must be between 13 and 79")]
    Age,
    #[error("ban duration must be between 1 and 29 days")]
    InvalidExpiry,
    #[error("token parameters are missing")]
    MissingTokenParams,
    #[error("unknown log category")]
    LogCategory,
}

impl Invalid {
    pub fn message(self) -> &'static str {
        match self {
            Invalid::MissingField => "Unul sau mai multe campuri nu sunt completate.",
            Invalid::Username => "Numele contului nu poate contine spatii si caractere speciale.",
            Invalid::Email => "Adresa de email folosita este invalida.",
            Invalid::WeakPassword => {
                "Parola trebuie sa aiba minim 8 caractere (litere, cifre si caractere speciale)."
            }
            Invalid::MissingCharacterName => "Numele caracterului trebuie completat.",
            Invalid::CharacterName => "Numele caracterului trebuie sa fie de forma Prenume_Nume.",
            Invalid::MissingOrigin => "Originea caracterului trebuie completata.",
            Invalid::OriginCharacters => "Originea caracterului trebuie sa contina doar litere.",
            Invalid::OriginLength => "Originea caracterului trebuie sa aiba minim 4 caractere.",
            Invalid::Age => "Varsta caracterului trebuie sa fie intre 13 si 79 de ani.",
            Invalid::InvalidExpiry => "Durata banului trebuie sa fie intre 1 si 29 de zile.",
            Invalid::MissingTokenParams => "Parametrii trebuie completati.",
            Invalid::LogCategory => "Tipul de log este invalid.",
        }
    }
}

/// What an admin action or lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Account,
    Character,
    Ban,
    /// The account has no last-known IP on file.
    AccountAddress,
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Subject::Account => "account",
            Subject::Character => "character",
            Subject::Ban => "ban",
            Subject::AccountAddress => "account address",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum UcpError {
    #[error("invalid input: {0}")]
    Validation(#[from] Invalid),
    #[error("account already exists")]
    DuplicateAccount,
    #[error("character name already taken")]
    DuplicateCharacterName,
    #[error("character quota exceeded")]
    QuotaExceeded,
    #[error("a session is already active")]
    AlreadyLoggedIn,
    #[error("token signature mismatch")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("account is banned")]
    Banned,
    #[error("unknown account")]
    UnknownAccount,
    #[error("account not activated")]
    NotActivated,
    #[error("bad credentials")]
    BadCredentials,
    #[error("not logged in")]
    Unauthenticated,
    #[error("insufficient privileges")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(Subject),
    #[error("mail delivery failed: {0}")]
    DeliveryFailed(#[source] NotifyError),
    #[error("storage failure in {op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: RepoError,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

pub type UcpResult<T> = Result<T, UcpError>;

impl UcpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UcpError::Validation(_) => ErrorKind::Validation,
            UcpError::DuplicateAccount
            | UcpError::DuplicateCharacterName
            | UcpError::QuotaExceeded
            | UcpError::AlreadyLoggedIn => ErrorKind::Conflict,
            UcpError::InvalidToken
            | UcpError::TokenExpired
            | UcpError::Banned
            | UcpError::UnknownAccount
            | UcpError::NotActivated
            | UcpError::BadCredentials
            | UcpError::Unauthenticated
            | UcpError::Forbidden => ErrorKind::Unauthorized,
            UcpError::NotFound(_) => ErrorKind::NotFound,
            UcpError::DeliveryFailed(_) | UcpError::Storage { .. } | UcpError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Stable end-user text; never includes storage or transport detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            UcpError::Validation(reason) => reason.message(),
            UcpError::DuplicateAccount => {
                "Exista deja un cont cu acest nume sau aceasta adresa de mail."
            }
            UcpError::DuplicateCharacterName => "Un caracter a fost deja creat cu acest nume.",
            UcpError::QuotaExceeded => "Ai atins numarul maxim de caractere.",
            UcpError::AlreadyLoggedIn => "Esti deja autentificat.",
            UcpError::InvalidToken => "Token-ul este incorect.",
            UcpError::TokenExpired => "Token-ul a expirat.",
            UcpError::Banned => "Contul este banat.",
            UcpError::UnknownAccount | UcpError::BadCredentials => {
                "Numele sau parola sunt gresite."
            }
            UcpError::NotActivated => "Contul nu este activat. Verifica adresa de email.",
            UcpError::Unauthenticated => {
                "Trebuie sa fii autentificat pentru a accesa aceasta resursa."
            }
            UcpError::Forbidden => "Nu ai privilegiile necesare pentru a accesa aceasta resursa.",
            UcpError::NotFound(Subject::Account) => "Contul nu a fost gasit.",
            UcpError::NotFound(Subject::Character) => "Caracterul nu a putut fi gasit.",
            UcpError::NotFound(Subject::Ban) => "Jucatorul nu are niciun ban inregistrat.",
            UcpError::NotFound(Subject::AccountAddress) => "Jucatorul nu a fost gasit.",
            UcpError::DeliveryFailed(_) => "Nu a putut fi trimis mailul catre adresa oferita.",
            UcpError::Storage { .. } | UcpError::Internal(_) => INTERNAL_MESSAGE,
        }
    }

    pub fn status(&self) -> StatusCode {
        match (self, self.kind()) {
            (UcpError::Forbidden, _) => StatusCode::FORBIDDEN,
            (_, ErrorKind::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorKind::Conflict) => StatusCode::CONFLICT,
            (_, ErrorKind::Unauthorized) => StatusCode::UNAUTHORIZED,
            (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UcpError {
    fn into_response(self) -> Response {
        (self.status(), Json(BaseResponse::failure(self.user_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_keep_distinct_messages() {
        assert_eq!(UcpError::InvalidToken.kind(), ErrorKind::Unauthorized);
        assert_eq!(UcpError::TokenExpired.kind(), ErrorKind::Unauthorized);
        assert_ne!(
            UcpError::InvalidToken.user_message(),
            UcpError::TokenExpired.user_message()
        );
    }

    #[test]
    fn unknown_account_reads_like_bad_credentials() {
        assert_eq!(
            UcpError::UnknownAccount.user_message(),
            UcpError::BadCredentials.user_message()
        );
    }

    #[test]
    fn storage_errors_hide_detail() {
        let err = UcpError::Storage {
            op: "create_account",
            source: RepoError::Db(sea_orm::DbErr::Custom("duplicate key 'Email'".into())),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), INTERNAL_MESSAGE);
    }

    #[test]
    fn forbidden_maps_to_403() {
        assert_eq!(UcpError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(UcpError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            UcpError::from(Invalid::InvalidExpiry).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
