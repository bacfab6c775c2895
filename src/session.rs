use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{UcpError, UcpResult};
use crate::models::{Identity, RoleFlags};
use crate::state::AppState;

const SESSION_HOURS: i64 = 24;

// ─── JWT Claims ───

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // username
    pub is_admin: bool,
    pub is_tester: bool,
    pub exp: usize,
    pub jti: String,
}

/// A verified bearer session, placed in request extensions by the gates.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub claims: Claims,
}

/// Issues and checks bearer sessions. Logout revokes by token id until expiry.
#[derive(Clone)]
pub struct SessionGate {
    secret: Arc<str>,
    revoked: Arc<DashMap<String, usize>>,
}

impl SessionGate {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
            revoked: Arc::new(DashMap::new()),
        }
    }

    pub fn issue(&self, identity: &Identity) -> UcpResult<String> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(SESSION_HOURS)).timestamp() as usize;
        let claims = Claims {
            sub: identity.username.clone(),
            is_admin: identity.is_admin(),
            is_tester: identity.is_tester(),
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| UcpError::Internal(format!("JWT error: {e}")))
    }

    /// The caller's session, if the bearer token is valid and not revoked.
    pub fn identify(&self, headers: &HeaderMap) -> Option<Session> {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())?
            .strip_prefix("Bearer ")?;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()?
        .claims;

        if self.revoked.contains_key(&claims.jti) {
            return None;
        }
        let mut roles = RoleFlags::empty();
        roles.set(RoleFlags::ADMIN, claims.is_admin);
        roles.set(RoleFlags::TESTER, claims.is_tester);
        Some(Session {
            identity: Identity::new(claims.sub.clone(), roles),
            claims,
        })
    }

    pub fn revoke(&self, claims: &Claims) {
        self.revoked.insert(claims.jti.clone(), claims.exp);
    }

    /// Forget revocations whose token would have expired anyway.
    pub fn purge_revoked(&self) {
        let now = chrono::Utc::now().timestamp() as usize;
        self.revoked.retain(|_, exp| *exp > now);
    }

    #[cfg(test)]
    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }
}

// ─── Gates ───

pub async fn ensure_logged_out(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.sessions.identify(req.headers()).is_some() {
        return UcpError::AlreadyLoggedIn.into_response();
    }
    next.run(req).await
}

pub async fn ensure_authenticated(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(session) = state.sessions.identify(req.headers()) else {
        return UcpError::Unauthenticated.into_response();
    };
    req.extensions_mut().insert(session);
    next.run(req).await
}

/// Admins and testers only.
pub async fn ensure_privileged(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(session) = state.sessions.identify(req.headers()) else {
        return UcpError::Unauthenticated.into_response();
    };
    if !session.identity.is_staff() {
        tracing::warn!(
            username = %session.identity.username,
            path = %req.uri().path(),
            "Restricted route refused"
        );
        return UcpError::Forbidden.into_response();
    }
    req.extensions_mut().insert(session);
    next.run(req).await
}
