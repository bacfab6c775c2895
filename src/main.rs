mod clock;
mod db;
mod entities;
mod error;
mod models;
mod notify;
mod password;
mod repository;
mod routes;
mod service;
mod session;
mod state;
#[cfg(test)]
mod test_support;
mod token;
mod validation;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

use clock::SystemClock;
use notify::{HttpMailer, LogMailer, Notifier};
use password::Passwords;
use repository::SqlRepository;
use service::{AccountService, CharacterService, Collaborators, ModerationService, ReportService};
use session::SessionGate;
use state::{AppState, RateLimiter};
use token::{ActionLinks, TokenAuthority};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Game database connection string (mysql://, postgres:// or sqlite://)
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://ucp.db?mode=rwc")]
    database_url: String,

    /// Public base URL of the panel, used in mailed links
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:3000")]
    public_url: String,

    /// Built frontend to serve next to the API
    #[arg(long, env = "FRONTEND_PATH")]
    frontend_path: Option<String>,

    /// Single origin allowed by CORS; permissive when unset
    #[arg(long, env = "ALLOWED_ORIGIN")]
    allowed_origin: Option<String>,

    /// Transactional mail endpoint; mail is only logged when unset
    #[arg(long, env = "MAIL_API_URL")]
    mail_api_url: Option<String>,

    #[arg(long, env = "MAIL_API_KEY")]
    mail_api_key: Option<String>,

    #[arg(long, env = "MAIL_FROM", default_value = "no-reply@localhost")]
    mail_from: String,

    #[arg(long, env = "MAIL_FROM_NAME")]
    mail_from_name: Option<String>,

    /// How long register and reset wait for the mail relay
    #[arg(long, env = "NOTIFY_TIMEOUT_SECS", default_value_t = 10)]
    notify_timeout_secs: u64,

    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 120)]
    rate_limit_max: u32,

    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    rate_limit_window_secs: u64,

    /// Create missing tables on startup (development databases)
    #[arg(long, env = "BOOTSTRAP_SCHEMA", default_value_t = false)]
    bootstrap_schema: bool,
}

/// Secret from env, from `key_file`, or generated and saved to `key_file`.
fn load_secret(var: &str, key_file: &str) -> String {
    if let Ok(secret) = std::env::var(var) {
        if !secret.trim().is_empty() {
            return secret;
        }
    }
    let path = Path::new(key_file);
    if let Ok(saved) = std::fs::read_to_string(path) {
        let saved = saved.trim().to_string();
        if !saved.is_empty() {
            tracing::info!("Loaded {var} from {key_file}");
            return saved;
        }
    }

    use rand::Rng;
    let secret: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Err(e) = std::fs::write(path, &secret) {
        tracing::warn!("Could not save {var} to {key_file}: {e}");
    } else {
        tracing::info!("Generated and saved {var} to {key_file}");
    }
    secret
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    match allowed_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Some(Err(e)) => {
            tracing::warn!("Ignoring invalid ALLOWED_ORIGIN: {e}");
            CorsLayer::permissive()
        }
        None => CorsLayer::permissive(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let token_secret = load_secret("TOKEN_SECRET", "token_secret.key");
    let jwt_secret = load_secret("JWT_SECRET", "jwt_secret.key");

    let db = db::connect(&args.database_url)
        .await
        .expect("Failed to connect to database");
    if args.bootstrap_schema {
        db::bootstrap_schema(&db)
            .await
            .expect("Failed to create schema");
        tracing::info!("Schema bootstrap complete");
    }

    let notifier: Arc<dyn Notifier> = match (args.mail_api_url, args.mail_api_key) {
        (Some(url), Some(key)) => {
            tracing::info!("Sending mail through {url}");
            Arc::new(HttpMailer::new(url, key, args.mail_from, args.mail_from_name))
        }
        _ => {
            tracing::warn!("MAIL_API_URL/MAIL_API_KEY not set, mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let collab = Collaborators {
        repo: Arc::new(SqlRepository::new(db)),
        notifier,
        clock: Arc::new(SystemClock),
    };
    let tokens = TokenAuthority::new(token_secret.as_bytes()).expect("Invalid token secret");
    let links = ActionLinks::new(&args.public_url).expect("Invalid PUBLIC_URL");

    let state = AppState {
        accounts: Arc::new(AccountService::new(
            collab.clone(),
            tokens,
            Passwords::default(),
            links.clone(),
            Duration::from_secs(args.notify_timeout_secs),
            tracing::info_span!("accounts"),
        )),
        characters: Arc::new(CharacterService::new(
            collab.clone(),
            tracing::info_span!("characters"),
        )),
        moderation: Arc::new(ModerationService::new(
            collab.clone(),
            tracing::info_span!("moderation"),
        )),
        reports: Arc::new(ReportService::new(collab, tracing::info_span!("reports"))),
        sessions: SessionGate::new(&jwt_secret),
        links,
        rate_limiter: Arc::new(RateLimiter::new(
            args.rate_limit_max,
            Duration::from_secs(args.rate_limit_window_secs),
        )),
    };
    state.spawn_maintenance();

    let mut app = routes::app(state).layer(cors_layer(args.allowed_origin.as_deref()));
    if let Some(frontend) = args.frontend_path {
        tracing::info!("Serving frontend from {frontend}");
        let index = Path::new(&frontend).join("index.html");
        app = app.fallback_service(ServeDir::new(&frontend).fallback(ServeFile::new(index)));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}
