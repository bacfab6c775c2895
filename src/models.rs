use std::str::FromStr;

use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::error::Invalid;

/// Most characters an account may hold, proposed ones included.
pub const MAX_CHARACTERS: i32 = 5;

// ─── Envelope ───

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaseResponse {
    pub error: bool,
    pub message: String,
}

impl BaseResponse {
    pub fn ok() -> Self {
        Self {
            error: false,
            message: String::new(),
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            error: true,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            base: BaseResponse::ok(),
            data,
        }
    }
}

// ─── Roles ───

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RoleFlags: u8 {
        const ADMIN  = 1 << 0;
        const TESTER = 1 << 1;
    }
}

impl RoleFlags {
    /// Levels are stored as integers by the game server; any positive level grants the role.
    pub fn from_levels(admin: i32, tester: i32) -> Self {
        let mut flags = RoleFlags::empty();
        flags.set(RoleFlags::ADMIN, admin > 0);
        flags.set(RoleFlags::TESTER, tester > 0);
        flags
    }
}

/// An authenticated account together with its role flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub roles: RoleFlags,
}

impl Identity {
    pub fn new(username: impl Into<String>, roles: RoleFlags) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(RoleFlags::ADMIN)
    }

    pub fn is_tester(&self) -> bool {
        self.roles.contains(RoleFlags::TESTER)
    }

    /// Reviewers: admins and testers.
    pub fn is_staff(&self) -> bool {
        self.roles.intersects(RoleFlags::ADMIN | RoleFlags::TESTER)
    }
}

// ─── Accounts ───

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub token: String,
    pub user: String,
    pub is_admin: bool,
    pub is_tester: bool,
}

/// Query string carried by confirmation and reset links. Every field is
/// optional here so a missing one surfaces as a validation error.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub email: Option<String>,
    pub token: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParts {
    pub email: String,
    pub token: String,
    pub issued_at: i64,
}

impl TokenQuery {
    pub fn into_parts(self) -> Result<TokenParts, Invalid> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (
            non_empty(self.email),
            non_empty(self.token),
            non_empty(self.timestamp),
        ) {
            (Some(email), Some(token), Some(timestamp)) => Ok(TokenParts {
                email,
                token,
                issued_at: timestamp
                    .trim()
                    .parse()
                    .map_err(|_| Invalid::MissingTokenParams)?,
            }),
            _ => Err(Invalid::MissingTokenParams),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequestQuery {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePasswordRequest {
    pub email: String,
    pub token: String,
    pub timestamp: i64,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterStats {
    pub character_name: String,
    pub character_status: i32,
    pub character_level: i32,
    pub playing_hours: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountStats {
    pub username: String,
    pub admin: i32,
    pub tester: i32,
    pub donate_rank: i32,
    pub characters: i32,
    pub last_login: i64,
    pub character_list: Vec<CharacterStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffMember {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerStats {
    pub players_online: u64,
    pub total_bans: u64,
    pub total_houses: u64,
    pub total_staff: u64,
    pub total_accounts: u64,
    pub total_characters: u64,
}

// ─── Characters ───

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterData {
    #[serde(default)]
    pub username: String,
    pub character_name: String,
    pub character_age: i32,
    pub character_gender: i32,
    pub character_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterRef {
    #[serde(default)]
    pub username: String,
    pub character_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectCharacterRequest {
    pub username: String,
    pub character_name: String,
    #[serde(default)]
    pub reason: String,
}

// ─── Moderation ───

#[derive(Debug, Clone, Deserialize)]
pub struct BanRequest {
    pub username: String,
    /// Duration in days.
    pub expire: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnbanRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BanEntry {
    pub username: String,
    pub admin: String,
    pub reason: String,
    pub expire: String,
    pub characters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AjailRequest {
    pub character: String,
    /// Minutes.
    pub time: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsRequest {
    #[serde(rename = "type")]
    pub category: String,
}

/// Event logs written by the game server, one table per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Ajail,
    Ban,
    Warn,
    Kick,
    Unban,
    Charity,
    Hit,
    Ck,
    Transfer,
    GiveCash,
    GiveDrug,
    GiveGun,
    Pay,
    Ask,
    Report,
    NameChanges,
}

impl LogCategory {
    pub const ALL: [LogCategory; 16] = [
        LogCategory::Ajail,
        LogCategory::Ban,
        LogCategory::Warn,
        LogCategory::Kick,
        LogCategory::Unban,
        LogCategory::Charity,
        LogCategory::Hit,
        LogCategory::Ck,
        LogCategory::Transfer,
        LogCategory::GiveCash,
        LogCategory::GiveDrug,
        LogCategory::GiveGun,
        LogCategory::Pay,
        LogCategory::Ask,
        LogCategory::Report,
        LogCategory::NameChanges,
    ];

    pub fn table(self) -> &'static str {
        match self {
            LogCategory::Ajail => "logs_ajail",
            LogCategory::Ban => "logs_ban",
            LogCategory::Warn => "logs_warn",
            LogCategory::Kick => "logs_kick",
            LogCategory::Unban => "logs_unban",
            LogCategory::Charity => "logs_charity",
            LogCategory::Hit => "hit_logs",
            LogCategory::Ck => "logs_ck",
            LogCategory::Transfer => "logs_transfer",
            LogCategory::GiveCash => "logs_givecash",
            LogCategory::GiveDrug => "logs_givedrug",
            LogCategory::GiveGun => "logs_givegun",
            LogCategory::Pay => "logs_pay",
            LogCategory::Ask => "logs_ask",
            LogCategory::Report => "logs_report",
            LogCategory::NameChanges => "namechanges",
        }
    }
}

impl FromStr for LogCategory {
    type Err = Invalid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LogCategory::ALL
            .into_iter()
            .find(|c| c.table().eq_ignore_ascii_case(wanted))
            .ok_or(Invalid::LogCategory)
    }
}

/// One log line. The IP column of the log tables is never selected.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, FromQueryResult)]
pub struct LogRecord {
    pub id: i32,
    pub text: String,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub logs: Vec<LogRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_flags_follow_levels() {
        let id = Identity::new("alice", RoleFlags::from_levels(0, 0));
        assert!(!id.is_admin() && !id.is_tester() && !id.is_staff());

        let tester = Identity::new("bob", RoleFlags::from_levels(0, 2));
        assert!(tester.is_tester() && tester.is_staff() && !tester.is_admin());

        let admin = Identity::new("carol", RoleFlags::from_levels(5, 0));
        assert!(admin.is_admin() && admin.is_staff());
    }

    #[test]
    fn token_query_requires_all_parameters() {
        let full = TokenQuery {
            email: Some("alice@x.com".into()),
            token: Some("abc".into()),
            timestamp: Some("1700000000".into()),
        };
        assert_eq!(
            full.into_parts().unwrap(),
            TokenParts {
                email: "alice@x.com".into(),
                token: "abc".into(),
                issued_at: 1_700_000_000,
            }
        );

        let missing = TokenQuery {
            email: Some("alice@x.com".into()),
            token: None,
            timestamp: Some("1700000000".into()),
        };
        assert_eq!(missing.into_parts(), Err(Invalid::MissingTokenParams));

        let garbled = TokenQuery {
            email: Some("alice@x.com".into()),
            token: Some("abc".into()),
            timestamp: Some("soon".into()),
        };
        assert_eq!(garbled.into_parts(), Err(Invalid::MissingTokenParams));
    }

    #[test]
    fn log_category_is_a_closed_set() {
        assert_eq!("LOGS_BAN".parse::<LogCategory>(), Ok(LogCategory::Ban));
        assert_eq!("namechanges".parse::<LogCategory>(), Ok(LogCategory::NameChanges));
        assert_eq!(
            "accounts; DROP TABLE accounts".parse::<LogCategory>(),
            Err(Invalid::LogCategory)
        );
    }

    #[test]
    fn failure_envelope() {
        let body = serde_json::to_value(BaseResponse::failure("nope")).unwrap();
        assert_eq!(body, serde_json::json!({ "error": true, "message": "nope" }));
    }
}
