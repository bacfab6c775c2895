use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use tracing::Span;

use crate::clock::Clock;
use crate::db;
use crate::entities::{account, character};
use crate::notify::{Notifier, NotifyError};
use crate::password::Passwords;
use crate::repository::SqlRepository;
use crate::service::{
    AccountService, CharacterService, Collaborators, ModerationService, ReportService,
};
use crate::session::SessionGate;
use crate::state::{AppState, RateLimiter};
use crate::token::{ActionLinks, TokenAuthority};

pub const START: i64 = 1_700_000_000;

pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Polls until `count` messages arrived; background sends are spawned.
    pub async fn wait_for(&self, count: usize) -> Vec<SentMail> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} mails, got {:?}", self.sent());
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected {
                status: 503,
                body: "relay down".into(),
            });
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.into(),
            subject: subject.into(),
            body: html_body.into(),
        });
        Ok(())
    }
}

pub async fn memory_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    db::bootstrap_schema(&db).await.unwrap();
    db
}

pub struct SeedAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub ip: String,
    pub activated: i32,
    pub admin: i32,
    pub tester: i32,
    pub donate_rank: i32,
    pub characters: i32,
}

impl SeedAccount {
    pub fn active(username: &str, email: &str) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: String::new(),
            ip: "10.0.0.1".into(),
            activated: account::ACTIVATED,
            admin: 0,
            tester: 0,
            donate_rank: 0,
            characters: 0,
        }
    }

    pub fn pending(username: &str, email: &str) -> Self {
        Self {
            activated: account::PENDING,
            ..Self::active(username, email)
        }
    }
}

pub async fn seed_account(db: &DatabaseConnection, seed: SeedAccount) {
    account::ActiveModel {
        username: Set(seed.username),
        email: Set(seed.email),
        password: Set(seed.password),
        register_date: Set("2023-01-01 00:00:00".into()),
        login_date: Set(START - 3_600),
        ip: Set(seed.ip),
        activated: Set(seed.activated),
        admin: Set(seed.admin),
        tester: Set(seed.tester),
        donate_rank: Set(seed.donate_rank),
        characters: Set(seed.characters),
        accepted_by: Set(String::new()),
        accepted: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_character(db: &DatabaseConnection, owner: &str, name: &str, created: i32) {
    character::ActiveModel {
        username: Set(owner.into()),
        character: Set(name.into()),
        level: Set(1),
        created: Set(created),
        age: Set(30),
        gender: Set(0),
        origin: Set("Los Santos".into()),
        skin: Set(93),
        status: Set(0),
        accepted_by: Set(String::new()),
        online: Set(0),
        playing_hours: Set(0),
        jail_time: Set(0),
        prisoned: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub struct Harness {
    pub db: DatabaseConnection,
    pub repo: Arc<SqlRepository>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub tokens: TokenAuthority,
    pub passwords: Passwords,
    pub links: ActionLinks,
    pub accounts: Arc<AccountService>,
    pub characters: Arc<CharacterService>,
    pub moderation: Arc<ModerationService>,
    pub reports: Arc<ReportService>,
}

impl Harness {
    pub fn state(&self) -> AppState {
        AppState {
            accounts: self.accounts.clone(),
            characters: self.characters.clone(),
            moderation: self.moderation.clone(),
            reports: self.reports.clone(),
            sessions: SessionGate::new("test-session-secret"),
            links: self.links.clone(),
            rate_limiter: Arc::new(RateLimiter::new(1_000, Duration::from_secs(60))),
        }
    }
}

pub async fn harness() -> Harness {
    let db = memory_db().await;
    let repo = Arc::new(SqlRepository::new(db.clone()));
    let clock = Arc::new(FixedClock::new(START));
    let notifier = Arc::new(RecordingNotifier::default());
    let tokens = TokenAuthority::new(b"test-token-secret").unwrap();
    let passwords = Passwords::fast();
    let links = ActionLinks::new("https://ucp.test").unwrap();

    let collab = Collaborators {
        repo: repo.clone(),
        notifier: notifier.clone(),
        clock: clock.clone(),
    };

    Harness {
        accounts: Arc::new(AccountService::new(
            collab.clone(),
            tokens.clone(),
            passwords.clone(),
            links.clone(),
            Duration::from_secs(2),
            Span::none(),
        )),
        characters: Arc::new(CharacterService::new(collab.clone(), Span::none())),
        moderation: Arc::new(ModerationService::new(collab.clone(), Span::none())),
        reports: Arc::new(ReportService::new(collab, Span::none())),
        db,
        repo,
        clock,
        notifier,
        tokens,
        passwords,
        links,
    }
}
