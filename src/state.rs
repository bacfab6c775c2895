use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::service::{AccountService, CharacterService, ModerationService, ReportService};
use crate::session::SessionGate;
use crate::token::ActionLinks;

/// Fixed-window request budget per client address.
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    budget: u32,
    window: Duration,
}

struct Window {
    opened: Instant,
    used: u32,
}

impl RateLimiter {
    pub fn new(budget: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            budget,
            window,
        }
    }

    /// Spends one request of `client`'s budget. When the budget is gone,
    /// returns how long until the window reopens.
    pub fn admit(&self, client: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let mut slot = self.windows.entry(client).or_insert(Window {
            opened: now,
            used: 0,
        });
        let elapsed = now.duration_since(slot.opened);
        if elapsed >= self.window {
            *slot = Window {
                opened: now,
                used: 0,
            };
        } else if slot.used >= self.budget {
            return Err(self.window - elapsed);
        }
        slot.used += 1;
        Ok(())
    }

    /// Drops windows that have closed.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.duration_since(w.opened) < self.window);
    }

    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub characters: Arc<CharacterService>,
    pub moderation: Arc<ModerationService>,
    pub reports: Arc<ReportService>,
    pub sessions: SessionGate,
    pub links: ActionLinks,
    pub rate_limiter: Arc<RateLimiter>,
}

const SWEEP_EVERY: Duration = Duration::from_secs(60 * 60);
const PURGE_EVERY: Duration = Duration::from_secs(24 * 60 * 60);

impl AppState {
    /// Hourly sweep of limiter and revocation entries, daily purge of expired characters.
    pub fn spawn_maintenance(&self) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(SWEEP_EVERY);
            let mut purge = tokio::time::interval(PURGE_EVERY);
            loop {
                tokio::select! {
                    _ = sweep.tick() => {
                        state.rate_limiter.sweep();
                        state.sessions.purge_revoked();
                    }
                    _ = purge.tick() => {
                        if let Err(e) = state.moderation.purge_expired_characters().await {
                            tracing::error!("Expired character purge failed: {e}");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_blocks_after_budget() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let first: IpAddr = "10.0.0.1".parse().unwrap();
        let second: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.admit(first).is_ok());
        assert!(limiter.admit(first).is_ok());
        let wait = limiter.admit(first).unwrap_err();
        assert!(wait > Duration::ZERO && wait <= Duration::from_secs(60));
        assert!(limiter.admit(second).is_ok());
    }

    #[test]
    fn closed_windows_reopen_and_are_swept() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        let client: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(limiter.admit(client).is_ok());
        assert!(limiter.admit(client).is_ok());
        assert_eq!(limiter.tracked(), 1);
        limiter.sweep();
        assert_eq!(limiter.tracked(), 0);
    }
}
