use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Issue, IssuePayload};

/// A remote issue-tracking service.
///
/// Errors distinguish an unreachable remote (`EztkError::Transport`) from a
/// remote that refused the request (`EztkError::Api`). Callers above the
/// refresh coordinator never see either: see the helpers below.
#[async_trait]
pub trait IssueTracker: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;
    fn repo_url(&self, repo: &str) -> String;

    /// Open issues of `repo`, in the order the remote returned them.
    async fn fetch_repo(&self, repo: &str) -> Result<Vec<Issue>>;
    /// Returns the number the remote assigned.
    async fn create_issue(&self, repo: &str, payload: &IssuePayload) -> Result<u64>;
    async fn update_issue(&self, repo: &str, number: u64, payload: &IssuePayload) -> Result<()>;
}

/// True iff the remote accepted the new issue.
pub async fn create_issue(tracker: &dyn IssueTracker, repo: &str, issue: &Issue) -> bool {
    match tracker.create_issue(repo, &issue.payload()).await {
        Ok(number) => {
            tracing::info!(repo, number, "issue created");
            true
        }
        Err(e) => {
            tracing::warn!(repo, kind = e.kind(), "create issue failed: {}", e);
            false
        }
    }
}

/// True iff the remote accepted the update.
pub async fn update_issue(tracker: &dyn IssueTracker, repo: &str, issue: &Issue) -> bool {
    match tracker
        .update_issue(repo, issue.number, &issue.payload())
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                repo,
                number = issue.number,
                kind = e.kind(),
                "update issue failed: {}",
                e
            );
            false
        }
    }
}

/// Marks `issue` closed locally, then pushes it. The local state stays closed
/// even when the remote refuses.
pub async fn close_issue(tracker: &dyn IssueTracker, repo: &str, issue: &mut Issue) -> bool {
    issue.close();
    update_issue(tracker, repo, issue).await
}
