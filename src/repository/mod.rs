mod sql;

pub use sql::SqlRepository;

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

use crate::models::{
    AccountStats, BanEntry, CharacterData, CharacterRef, LogCategory, LogRecord, ServerStats,
};

#[derive(Debug, Error)]
pub enum RepoError {
    /// The statement ran but matched nothing.
    #[error("no matching row")]
    NoRows,
    #[error("unique constraint violated")]
    Duplicate,
    #[error(transparent)]
    Db(#[from] DbErr),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub register_date: String,
}

#[derive(Debug, Clone)]
pub struct NewCharacter {
    pub owner: String,
    pub name: String,
    pub age: i32,
    pub gender: i32,
    pub origin: String,
    pub skin: i32,
}

#[derive(Debug, Clone)]
pub struct NewBan {
    pub username: String,
    pub ip: String,
    pub banned_by: String,
    pub reason: String,
    pub date: String,
    /// Unix seconds.
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffRow {
    pub username: String,
    pub admin: i32,
    pub tester: i32,
}

/// Persistence boundary for everything the panel reads or writes.
///
/// Mutations that match no row report `RepoError::NoRows` so callers can
/// tell a missing subject apart from an engine failure.
#[async_trait]
pub trait Repository: Send + Sync {
    // ─── Accounts ───
    async fn account_exists(&self, username: &str, email: &str) -> RepoResult<bool>;
    async fn create_account(&self, account: NewAccount) -> RepoResult<()>;
    /// Removes an account that was never confirmed.
    async fn discard_pending_account(&self, username: &str) -> RepoResult<()>;
    /// Moves an unconfirmed account to confirmed.
    async fn set_activation(&self, email: &str) -> RepoResult<()>;
    async fn activation(&self, username: &str) -> RepoResult<Option<i32>>;
    async fn activation_by_email(&self, email: &str) -> RepoResult<Option<i32>>;
    async fn password_digest(&self, username: &str) -> RepoResult<Option<String>>;
    async fn update_password(&self, email: &str, digest: &str) -> RepoResult<()>;
    /// `(admin level, tester level)`.
    async fn role_flags(&self, username: &str) -> RepoResult<(i32, i32)>;
    async fn account_email(&self, username: &str) -> RepoResult<Option<String>>;
    async fn account_ip(&self, username: &str) -> RepoResult<Option<String>>;

    // ─── Characters ───
    /// Characters that still count against the quota (proposed or accepted).
    async fn character_count(&self, owner: &str) -> RepoResult<u64>;
    async fn character_name_taken(&self, name: &str) -> RepoResult<bool>;
    async fn create_character(&self, character: NewCharacter) -> RepoResult<()>;
    async fn proposed_characters(&self) -> RepoResult<Vec<CharacterData>>;
    /// Accepts a proposed character and bumps the owner's count in one transaction.
    async fn accept_character(&self, owner: &str, name: &str, reviewer: &str) -> RepoResult<()>;
    async fn delete_proposed_character(&self, owner: &str, name: &str) -> RepoResult<()>;
    async fn find_character(&self, name: &str) -> RepoResult<Option<CharacterRef>>;
    /// Sets jail time in seconds and clears the prisoned flag.
    async fn jail_character(&self, name: &str, seconds: i32) -> RepoResult<()>;
    /// Deletes characters the game server marked expired; returns the count.
    async fn purge_expired_characters(&self) -> RepoResult<u64>;

    // ─── Bans ───
    async fn is_banned(&self, username: &str, now: i64) -> RepoResult<bool>;
    async fn insert_ban(&self, ban: NewBan) -> RepoResult<()>;
    /// Lifts every active ban row of `username`: expiry moves to `now - 1` and
    /// the permanent flag is cleared. Expired rows are left untouched.
    async fn deactivate_ban(&self, username: &str, now: i64) -> RepoResult<()>;
    async fn active_bans(&self, now: i64) -> RepoResult<Vec<BanEntry>>;

    // ─── Reporting ───
    async fn account_stats(&self, username: &str) -> RepoResult<Option<AccountStats>>;
    async fn staff(&self) -> RepoResult<Vec<StaffRow>>;
    async fn server_stats(&self, now: i64) -> RepoResult<ServerStats>;
    async fn recent_logs(&self, category: LogCategory, limit: u64) -> RepoResult<Vec<LogRecord>>;
}
