use futures::future::join_all;

use crate::config::RepoConfig;
use crate::error::Result;
use crate::tracker::IssueTracker;
use crate::types::Repository;

/// Fetch one repository's open issues as a fresh snapshot.
pub async fn fetch_snapshot(tracker: &dyn IssueTracker, repo: &RepoConfig) -> Result<Repository> {
    let issues = tracker.fetch_repo(&repo.name).await?;
    Ok(Repository::new(
        repo.name.as_str(),
        repo.path.as_str(),
        tracker.repo_url(&repo.name),
        issues,
    ))
}

/// One refresh cycle: fetch every configured repository concurrently and
/// return once all of them have completed or failed, in configuration order.
///
/// A failed fetch yields an empty repository; it never affects the others.
pub async fn refresh_cycle(tracker: &dyn IssueTracker, repos: &[RepoConfig]) -> Vec<Repository> {
    let fetches = repos.iter().map(|repo| async move {
        match fetch_snapshot(tracker, repo).await {
            Ok(snapshot) => {
                tracing::debug!(repo = %repo.name, issues = snapshot.len(), "fetched");
                snapshot
            }
            Err(e) => {
                tracing::warn!(
                    repo = %repo.name,
                    kind = e.kind(),
                    "fetch failed, showing no issues: {}",
                    e
                );
                Repository::empty(
                    repo.name.as_str(),
                    repo.path.as_str(),
                    tracker.repo_url(&repo.name),
                )
            }
        }
    });

    join_all(fetches).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Cursor};
    use crate::tracker::fake::FakeTracker;
    use crate::types::issue;

    fn configs(names: &[&str]) -> Vec<RepoConfig> {
        names
            .iter()
            .map(|n| RepoConfig {
                name: n.to_string(),
                path: format!("/src/{}", n),
            })
            .collect()
    }

    #[tokio::test]
    async fn cycle_keeps_configuration_order() {
        let tracker = FakeTracker::with(vec![
            ("b", vec![issue("b", 1, "x")]),
            ("a", vec![issue("a", 2, "y"), issue("a", 3, "z")]),
        ]);

        let repos = refresh_cycle(&tracker, &configs(&["a", "b"])).await;

        assert_eq!(repos[0].name(), "a");
        assert_eq!(repos[0].len(), 2);
        assert_eq!(repos[0].path().to_str(), Some("/src/a"));
        assert_eq!(repos[0].url(), "https://example.test/me/a");
        assert_eq!(repos[1].name(), "b");
        assert_eq!(repos[1].len(), 1);
    }

    #[tokio::test]
    async fn unreachable_repo_becomes_empty_without_touching_siblings() {
        let tracker = FakeTracker::with(vec![("b", vec![issue("b", 5, "fine")])]);

        let repos = refresh_cycle(&tracker, &configs(&["a", "b"])).await;

        assert!(repos[0].is_empty());
        assert_eq!(repos[0].name(), "a");
        assert_eq!(repos[1].len(), 1);
        assert_eq!(repos[1][0].title, "fine");
    }

    #[tokio::test]
    async fn refused_repo_becomes_empty() {
        let tracker = FakeTracker::with(vec![("a", vec![issue("a", 1, "x")])]);
        tracker.refuse("a", 401);

        let repos = refresh_cycle(&tracker, &configs(&["a"])).await;

        assert!(repos[0].is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_drops_stale_issues_on_board() {
        let tracker = FakeTracker::with(vec![
            ("r1", vec![issue("r1", 1, "a"), issue("r1", 2, "b")]),
            ("r2", vec![issue("r2", 7, "c")]),
        ]);
        let repos = configs(&["r1", "r2"]);
        let mut board = Board::new(refresh_cycle(&tracker, &repos).await).unwrap();
        board.select(0, 1);

        tracker.unreachable("r1");
        board.apply_snapshots(refresh_cycle(&tracker, &repos).await);

        assert!(board.repos()[0].is_empty());
        assert_eq!(board.repos()[1][0].number, 7);
        assert_eq!(board.cursor(), Cursor { repo: 0, issue: 0 });
    }

    #[tokio::test]
    async fn startup_then_refresh_scenario() {
        let tracker = FakeTracker::with(vec![
            ("r1", vec![issue("r1", 1, "a"), issue("r1", 2, "b"), issue("r1", 3, "c")]),
            ("r2", vec![]),
        ]);
        let repos = configs(&["r1", "r2"]);
        let mut board = Board::new(
            repos
                .iter()
                .map(|r| Repository::empty(r.name.as_str(), r.path.as_str(), ""))
                .collect(),
        )
        .unwrap();

        board.apply_snapshots(refresh_cycle(&tracker, &repos).await);
        board.select(0, 2);

        tracker.set("r1", vec![issue("r1", 1, "a")]);
        board.apply_snapshots(refresh_cycle(&tracker, &repos).await);

        assert_eq!(board.cursor(), Cursor { repo: 0, issue: 0 });
        assert_eq!(board.selected_issue().map(|i| i.number), Some(1));
    }
}
