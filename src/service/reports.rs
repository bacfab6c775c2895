use std::cmp::Ordering;

use tracing::Span;

use super::{storage_failure, Collaborators};
use crate::error::{Subject, UcpError, UcpResult};
use crate::models::{AccountStats, ServerStats, StaffMember};
use crate::repository::{RepoError, StaffRow};

/// Read-only views for the dashboard.
pub struct ReportService {
    collab: Collaborators,
    span: Span,
}

/// Testers first (lowest level first), then admins by descending level, then name.
fn staff_order(a: &StaffRow, b: &StaffRow) -> Ordering {
    a.tester
        .cmp(&b.tester)
        .then_with(|| b.admin.cmp(&a.admin))
        .then_with(|| a.username.cmp(&b.username))
}

impl ReportService {
    pub fn new(collab: Collaborators, span: Span) -> Self {
        Self { collab, span }
    }

    fn storage(&self, actor: &str, op: &'static str, e: RepoError) -> UcpError {
        storage_failure(&self.span, actor, op, e)
    }

    pub async fn account_stats(&self, username: &str) -> UcpResult<AccountStats> {
        self.collab
            .repo
            .account_stats(username)
            .await
            .map_err(|e| self.storage(username, "account_stats", e))?
            .ok_or(UcpError::NotFound(Subject::Account))
    }

    pub async fn staff(&self) -> UcpResult<Vec<StaffMember>> {
        let mut rows = self
            .collab
            .repo
            .staff()
            .await
            .map_err(|e| self.storage("-", "staff", e))?;
        rows.sort_by(staff_order);
        Ok(rows
            .into_iter()
            .map(|r| StaffMember {
                role: if r.admin > 0 { "Admin" } else { "Tester" }.to_string(),
                username: r.username,
            })
            .collect())
    }

    pub async fn server_stats(&self) -> UcpResult<ServerStats> {
        self.collab
            .repo
            .server_stats(self.collab.clock.now())
            .await
            .map_err(|e| self.storage("-", "server_stats", e))
    }
}
