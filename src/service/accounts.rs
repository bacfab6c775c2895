use std::time::Duration;

use tracing::Span;

use super::{storage_failure, Collaborators};
use crate::clock::format_timestamp;
use crate::entities::account;
use crate::error::{Invalid, Subject, UcpError, UcpResult};
use crate::models::{BanRequest, Identity, RegisterRequest, RoleFlags, UpdatePasswordRequest};
use crate::notify::{self, NotifyError};
use crate::password::Passwords;
use crate::repository::{NewAccount, NewBan, RepoError};
use crate::token::{ActionLinks, TokenAuthority};
use crate::validation;

const SECONDS_PER_DAY: i64 = 86_400;

/// Registration, confirmation, login, password reset, bans.
pub struct AccountService {
    collab: Collaborators,
    tokens: TokenAuthority,
    passwords: Passwords,
    links: ActionLinks,
    notify_timeout: Duration,
    span: Span,
}

impl AccountService {
    pub fn new(
        collab: Collaborators,
        tokens: TokenAuthority,
        passwords: Passwords,
        links: ActionLinks,
        notify_timeout: Duration,
        span: Span,
    ) -> Self {
        Self {
            collab,
            tokens,
            passwords,
            links,
            notify_timeout,
            span,
        }
    }

    fn storage(&self, actor: &str, op: &'static str, e: RepoError) -> UcpError {
        storage_failure(&self.span, actor, op, e)
    }

    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        match tokio::time::timeout(self.notify_timeout, self.collab.notifier.send(to, subject, body))
            .await
        {
            Ok(res) => res,
            Err(_) => Err(NotifyError::Timeout),
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> UcpResult<()> {
        let username = req.username.trim();
        let email = req.email.trim();
        validation::registration(username, email, &req.password)?;

        let repo = &self.collab.repo;
        let exists = repo
            .account_exists(username, email)
            .await
            .map_err(|e| self.storage(username, "account_exists", e))?;
        if exists {
            tracing::info!(parent: &self.span, username, "Registration refused, account exists");
            return Err(UcpError::DuplicateAccount);
        }

        let digest = self
            .passwords
            .digest(&req.password)
            .map_err(|e| UcpError::Internal(format!("password digest: {e}")))?;
        let now = self.collab.clock.now();

        match repo
            .create_account(NewAccount {
                username: username.to_string(),
                email: email.to_string(),
                password_digest: digest,
                register_date: format_timestamp(now),
            })
            .await
        {
            Ok(()) => {}
            Err(RepoError::Duplicate) => return Err(UcpError::DuplicateAccount),
            Err(e) => return Err(self.storage(username, "create_account", e)),
        }

        let token = self.tokens.issue(email, now);
        let link = self.links.confirm_account(email, &token, now);
        let body = notify::confirm_account_body(username, link.as_str());

        if let Err(e) = self.deliver(email, notify::CONFIRM_SUBJECT, &body).await {
            tracing::warn!(parent: &self.span, username, "Confirmation mail failed, discarding account: {e}");
            if let Err(e) = repo.discard_pending_account(username).await {
                tracing::error!(parent: &self.span, username, "Failed to discard pending account: {e}");
            }
            return Err(UcpError::DeliveryFailed(e));
        }

        tracing::info!(parent: &self.span, username, "Account registered");
        Ok(())
    }

    pub async fn confirm(&self, email: &str, token: &str, issued_at: i64) -> UcpResult<()> {
        self.tokens
            .verify(email, token, issued_at, self.collab.clock.now())?;

        let repo = &self.collab.repo;
        match repo.set_activation(email).await {
            Ok(()) => {
                tracing::info!(parent: &self.span, email, "Account confirmed");
                Ok(())
            }
            Err(RepoError::NoRows) => match repo.activation_by_email(email).await {
                Ok(Some(account::ACTIVATED)) => Ok(()),
                Ok(_) => Err(UcpError::NotFound(Subject::Account)),
                Err(e) => Err(self.storage(email, "activation_by_email", e)),
            },
            Err(e) => Err(self.storage(email, "set_activation", e)),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> UcpResult<Identity> {
        let username = username.trim();
        validation::required(&[username, password])?;
        validation::username(username)?;

        if self.is_banned(username).await? {
            return Err(UcpError::Banned);
        }

        let repo = &self.collab.repo;

        let activation = repo
            .activation(username)
            .await
            .map_err(|e| self.storage(username, "activation", e))?
            .ok_or(UcpError::UnknownAccount)?;
        if activation != account::ACTIVATED {
            return Err(UcpError::NotActivated);
        }

        let digest = repo
            .password_digest(username)
            .await
            .map_err(|e| self.storage(username, "password_digest", e))?
            .ok_or(UcpError::UnknownAccount)?;
        if !self.passwords.verify(password, &digest) {
            tracing::info!(parent: &self.span, username, "Login refused, bad password");
            return Err(UcpError::BadCredentials);
        }

        let (admin, tester) = repo
            .role_flags(username)
            .await
            .map_err(|e| self.storage(username, "role_flags", e))?;
        Ok(Identity::new(username, RoleFlags::from_levels(admin, tester)))
    }

    /// Mails a reset link. Whether the address belongs to an account is not revealed.
    pub async fn request_password_reset(&self, email: &str) -> UcpResult<()> {
        let email = email.trim();
        validation::required(&[email])?;
        validation::email(email)?;

        let now = self.collab.clock.now();
        let token = self.tokens.issue(email, now);
        let link = self.links.confirm_reset(email, &token, now);
        let body = notify::reset_password_body(link.as_str());

        self.deliver(email, notify::RESET_SUBJECT, &body)
            .await
            .map_err(|e| {
                tracing::warn!(parent: &self.span, email, "Reset mail failed: {e}");
                UcpError::DeliveryFailed(e)
            })
    }

    pub fn check_reset_token(&self, email: &str, token: &str, issued_at: i64) -> UcpResult<()> {
        self.tokens
            .verify(email, token, issued_at, self.collab.clock.now())
    }

    pub async fn reset_password(&self, req: UpdatePasswordRequest) -> UcpResult<()> {
        let email = req.email.trim();
        validation::required(&[email, req.token.as_str(), req.new_password.as_str()])?;
        self.tokens
            .verify(email, &req.token, req.timestamp, self.collab.clock.now())?;
        validation::password(&req.new_password)?;

        let digest = self
            .passwords
            .digest(&req.new_password)
            .map_err(|e| UcpError::Internal(format!("password digest: {e}")))?;
        match self.collab.repo.update_password(email, &digest).await {
            Ok(()) => {
                tracing::info!(parent: &self.span, email, "Password reset");
                Ok(())
            }
            Err(RepoError::NoRows) => Err(UcpError::NotFound(Subject::Account)),
            Err(e) => Err(self.storage(email, "update_password", e)),
        }
    }

    pub async fn is_banned(&self, username: &str) -> UcpResult<bool> {
        self.collab
            .repo
            .is_banned(username, self.collab.clock.now())
            .await
            .map_err(|e| self.storage(username, "is_banned", e))
    }

    pub async fn ban(&self, admin: &str, req: BanRequest) -> UcpResult<()> {
        let username = req.username.trim();
        validation::required(&[admin, username, req.reason.as_str()])?;
        if !(1..30).contains(&req.expire) {
            return Err(Invalid::InvalidExpiry.into());
        }

        let repo = &self.collab.repo;
        let ip = repo
            .account_ip(username)
            .await
            .map_err(|e| self.storage(admin, "account_ip", e))?
            .ok_or(UcpError::NotFound(Subject::AccountAddress))?;

        let now = self.collab.clock.now();
        repo.insert_ban(NewBan {
            username: username.to_string(),
            ip,
            banned_by: admin.to_string(),
            reason: req.reason.clone(),
            date: format_timestamp(now),
            expires_at: now + req.expire * SECONDS_PER_DAY,
        })
        .await
        .map_err(|e| self.storage(admin, "insert_ban", e))?;

        tracing::info!(parent: &self.span, admin, username, days = req.expire, "Account banned");
        Ok(())
    }

    pub async fn unban(&self, admin: &str, username: &str) -> UcpResult<()> {
        let username = username.trim();
        validation::required(&[username])?;

        match self
            .collab
            .repo
            .deactivate_ban(username, self.collab.clock.now())
            .await
        {
            Ok(()) => {
                tracing::info!(parent: &self.span, admin, username, "Account unbanned");
                Ok(())
            }
            Err(RepoError::NoRows) => Err(UcpError::NotFound(Subject::Ban)),
            Err(e) => Err(self.storage(admin, "deactivate_ban", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::repository::Repository;
    use crate::test_support::{harness, seed_account, SeedAccount};

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "Secret1!".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_reads_the_same() {
        let h = harness().await;
        h.accounts
            .register(register_req("alice", "alice@x.com"))
            .await
            .unwrap();

        let by_name = h
            .accounts
            .register(register_req("alice", "other@x.com"))
            .await
            .unwrap_err();
        let by_email = h
            .accounts
            .register(register_req("bob", "alice@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(by_name, UcpError::DuplicateAccount));
        assert!(matches!(by_email, UcpError::DuplicateAccount));
        assert_eq!(by_name.user_message(), by_email.user_message());
    }

    #[tokio::test]
    async fn registration_mails_a_working_link() {
        let h = harness().await;
        h.accounts
            .register(register_req("alice", "alice@x.com"))
            .await
            .unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@x.com");
        assert_eq!(sent[0].subject, notify::CONFIRM_SUBJECT);
        let token = h.tokens.issue("alice@x.com", h.clock.now());
        assert!(sent[0].body.contains(&token));
    }

    #[tokio::test]
    async fn failed_confirmation_mail_discards_the_account() {
        let h = harness().await;
        h.notifier.fail(true);

        let err = h
            .accounts
            .register(register_req("alice", "alice@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UcpError::DeliveryFailed(_)));
        assert_eq!(h.repo.activation("alice").await.unwrap(), None);

        h.notifier.fail(false);
        h.accounts
            .register(register_req("alice", "alice@x.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn confirm_window_edges() {
        let h = harness().await;
        h.accounts
            .register(register_req("alice", "alice@x.com"))
            .await
            .unwrap();
        let issued = h.clock.now();
        let token = h.tokens.issue("alice@x.com", issued);

        h.clock.set(issued + 901);
        assert!(matches!(
            h.accounts.confirm("alice@x.com", &token, issued).await,
            Err(UcpError::TokenExpired)
        ));
        assert!(matches!(
            h.accounts.confirm("alice@x.com", &token, issued + 1).await,
            Err(UcpError::InvalidToken)
        ));

        h.clock.set(issued + 899);
        h.accounts.confirm("alice@x.com", &token, issued).await.unwrap();
        assert_eq!(
            h.repo.activation("alice").await.unwrap(),
            Some(account::ACTIVATED)
        );
        // Repeating a confirmation is harmless.
        h.accounts.confirm("alice@x.com", &token, issued).await.unwrap();
    }

    #[tokio::test]
    async fn confirm_for_unknown_email_is_not_found() {
        let h = harness().await;
        let now = h.clock.now();
        let token = h.tokens.issue("ghost@x.com", now);
        assert!(matches!(
            h.accounts.confirm("ghost@x.com", &token, now).await,
            Err(UcpError::NotFound(Subject::Account))
        ));
    }

    #[tokio::test]
    async fn login_checks_in_order() {
        let h = harness().await;
        seed_account(&h.db, SeedAccount::pending("bob", "bob@x.com")).await;
        seed_account(
            &h.db,
            SeedAccount {
                password: h.passwords.digest("Secret1!").unwrap(),
                ..SeedAccount::active("alice", "alice@x.com")
            },
        )
        .await;

        assert!(matches!(
            h.accounts.login("nobody", "Secret1!").await,
            Err(UcpError::UnknownAccount)
        ));
        assert!(matches!(
            h.accounts.login("bob", "Secret1!").await,
            Err(UcpError::NotActivated)
        ));
        assert!(matches!(
            h.accounts.login("alice", "Wrong1!!").await,
            Err(UcpError::BadCredentials)
        ));

        let identity = h.accounts.login("alice", "Secret1!").await.unwrap();
        assert_eq!(identity.username, "alice");
        assert!(!identity.is_admin() && !identity.is_tester());

        h.accounts
            .ban(
                "admin",
                BanRequest {
                    username: "alice".into(),
                    expire: 3,
                    reason: "spam".into(),
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            h.accounts.login("alice", "Secret1!").await,
            Err(UcpError::Banned)
        ));
    }

    #[tokio::test]
    async fn login_carries_role_flags() {
        let h = harness().await;
        seed_account(
            &h.db,
            SeedAccount {
                password: h.passwords.digest("Secret1!").unwrap(),
                admin: 3,
                tester: 1,
                ..SeedAccount::active("mod", "mod@x.com")
            },
        )
        .await;
        let identity = h.accounts.login("mod", "Secret1!").await.unwrap();
        assert!(identity.is_admin() && identity.is_tester());
    }

    #[tokio::test]
    async fn password_reset_flow() {
        let h = harness().await;
        seed_account(
            &h.db,
            SeedAccount {
                password: h.passwords.digest("Secret1!").unwrap(),
                ..SeedAccount::active("alice", "alice@x.com")
            },
        )
        .await;

        h.accounts.request_password_reset("alice@x.com").await.unwrap();
        assert_eq!(h.notifier.sent()[0].subject, notify::RESET_SUBJECT);

        let issued = h.clock.now();
        let token = h.tokens.issue("alice@x.com", issued);
        h.clock.set(issued + 899);
        h.accounts
            .check_reset_token("alice@x.com", &token, issued)
            .unwrap();

        let weak = UpdatePasswordRequest {
            email: "alice@x.com".into(),
            token: token.clone(),
            timestamp: issued,
            new_password: "short".into(),
        };
        assert!(matches!(
            h.accounts.reset_password(weak).await,
            Err(UcpError::Validation(Invalid::WeakPassword))
        ));

        let req = UpdatePasswordRequest {
            email: "alice@x.com".into(),
            token: token.clone(),
            timestamp: issued,
            new_password: "Better2@".into(),
        };
        h.accounts.reset_password(req.clone()).await.unwrap();
        h.accounts.login("alice", "Better2@").await.unwrap();

        h.clock.set(issued + 901);
        assert!(matches!(
            h.accounts.reset_password(req).await,
            Err(UcpError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn reset_request_does_not_reveal_accounts() {
        let h = harness().await;
        h.accounts.request_password_reset("ghost@x.com").await.unwrap();
        assert!(matches!(
            h.accounts.request_password_reset("ghost").await,
            Err(UcpError::Validation(Invalid::Email))
        ));
    }

    #[tokio::test]
    async fn ban_duration_bounds_and_unban() {
        let h = harness().await;
        seed_account(&h.db, SeedAccount::active("alice", "alice@x.com")).await;
        let ban = |days| BanRequest {
            username: "alice".into(),
            expire: days,
            reason: "spam".into(),
        };

        for days in [0, 30] {
            assert!(matches!(
                h.accounts.ban("admin", ban(days)).await,
                Err(UcpError::Validation(Invalid::InvalidExpiry))
            ));
        }
        assert!(!h.accounts.is_banned("alice").await.unwrap());

        h.accounts.ban("admin", ban(29)).await.unwrap();
        assert!(h.accounts.is_banned("alice").await.unwrap());

        h.accounts.unban("admin", "alice").await.unwrap();
        assert!(!h.accounts.is_banned("alice").await.unwrap());
        assert!(matches!(
            h.accounts.unban("admin", "alice").await,
            Err(UcpError::NotFound(Subject::Ban))
        ));
    }

    #[tokio::test]
    async fn ban_requires_fields_and_a_known_address() {
        let h = harness().await;
        seed_account(
            &h.db,
            SeedAccount {
                ip: String::new(),
                ..SeedAccount::active("fresh", "fresh@x.com")
            },
        )
        .await;

        let missing_reason = BanRequest {
            username: "fresh".into(),
            expire: 2,
            reason: " ".into(),
        };
        assert!(matches!(
            h.accounts.ban("admin", missing_reason).await,
            Err(UcpError::Validation(Invalid::MissingField))
        ));

        let no_ip = BanRequest {
            username: "fresh".into(),
            expire: 2,
            reason: "spam".into(),
        };
        assert!(matches!(
            h.accounts.ban("admin", no_ip).await,
            Err(UcpError::NotFound(Subject::AccountAddress))
        ));

        assert!(matches!(
            h.accounts.unban("admin", "fresh").await,
            Err(UcpError::NotFound(Subject::Ban))
        ));
        assert!(matches!(
            h.accounts.unban("admin", "").await,
            Err(UcpError::Validation(Invalid::MissingField))
        ));
    }
}
