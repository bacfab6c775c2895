pub mod account;
pub mod auth;
pub mod characters;
pub mod moderation;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::error::{UcpError, UcpResult};
use crate::models::BaseResponse;
use crate::session::{self, Session};
use crate::state::AppState;

pub const API_PREFIX: &str = "/internal-ucp-api/v1";

const RATE_LIMITED: &str = "Ai atins limita de cereri. Incearca din nou mai tarziu.";

/// 302 with a `Location` header.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub(crate) fn require_admin(session: &Session) -> UcpResult<()> {
    if session.identity.is_admin() {
        Ok(())
    } else {
        tracing::warn!(username = %session.identity.username, "Admin route refused");
        Err(UcpError::Forbidden)
    }
}

/// `X-Real-IP` from the fronting proxy, else the peer address. Requests with
/// neither share one budget.
fn client_ip(req: &Request) -> IpAddr {
    req.headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let client = client_ip(&req);
    if let Err(wait) = state.rate_limiter.admit(client) {
        let retry_after = wait.as_secs().max(1);
        tracing::warn!(client = %client, retry_after, "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(BaseResponse::failure(RATE_LIMITED)),
        )
            .into_response();
    }
    next.run(req).await
}

/// The API surface, mounted under [`API_PREFIX`].
pub fn app(state: AppState) -> Router {
    let logged_out = Router::new()
        .route("/register", post(auth::register))
        .route("/confirm", get(auth::confirm))
        .route("/reset-request", get(auth::reset_request))
        .route("/confirm-reset", get(auth::confirm_reset))
        .route("/update-password", post(auth::update_password))
        .route("/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::ensure_logged_out,
        ));

    let members = Router::new()
        .route("/logout", post(auth::logout))
        .route("/check-auth", get(auth::check_auth))
        .route("/get-data", get(account::get_data))
        .route("/get-staff", get(account::get_staff))
        .route("/server-stats", get(account::server_stats))
        .route("/create-character", post(account::create_character))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::ensure_authenticated,
        ));

    let restricted = Router::new()
        .route("/check", get(characters::check))
        .route("/waiting-list", get(characters::waiting_list))
        .route("/accept-character", post(characters::accept_character))
        .route("/reject-character", post(characters::reject_character))
        .route("/fetch-character", post(moderation::fetch_character))
        .route("/ban-list", get(moderation::ban_list))
        .route("/ban", post(moderation::ban))
        .route("/unban", post(moderation::unban))
        .route("/ajail", post(moderation::ajail))
        .route("/logs", post(moderation::logs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::ensure_privileged,
        ));

    let api = Router::new()
        .merge(logged_out)
        .merge(members)
        .nest("/restricted", restricted)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new().nest(API_PREFIX, api).with_state(state)
}
