use std::collections::HashSet;

use crate::error::{EztkError, Result};
use crate::types::{Issue, IssueKey, Repository};

/// Position of the selection: a repository, and an issue inside it.
///
/// `issue` is only meaningful when the selected repository has issues; it is
/// `0` otherwise and must not be dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub repo: usize,
    pub issue: usize,
}

/// The configured repositories, the cursor into them and the issues whose
/// detail is unfolded.
///
/// The number of repositories is fixed at construction. Every operation
/// leaves the cursor pointing at an existing repository and, when that
/// repository has issues, at an existing issue.
#[derive(Debug)]
pub struct Board {
    repos: Vec<Repository>,
    cursor: Cursor,
    expanded: HashSet<IssueKey>,
}

impl Board {
    /// Fails on an empty repository list; a board always has a selection.
    pub fn new(repos: Vec<Repository>) -> Result<Self> {
        if repos.is_empty() {
            return Err(EztkError::Config(
                "a board needs at least one repository".to_string(),
            ));
        }
        Ok(Self {
            repos,
            cursor: Cursor::default(),
            expanded: HashSet::new(),
        })
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn repos(&self) -> &[Repository] {
        &self.repos
    }

    pub fn repo_count(&self) -> usize {
        self.repos.len()
    }

    pub fn selected_repo(&self) -> &Repository {
        &self.repos[self.cursor.repo]
    }

    pub fn selected_issue(&self) -> Option<&Issue> {
        self.selected_repo().get(self.cursor.issue)
    }

    /// Whether the row at `(repo, issue)` is the selected one.
    pub fn is_selected(&self, repo: usize, issue: usize) -> bool {
        self.cursor.repo == repo
            && self.cursor.issue == issue
            && issue < self.repos[repo].len()
    }

    pub fn is_expanded(&self, issue: &Issue) -> bool {
        self.expanded.contains(&issue.key())
    }

    pub fn next_repo(&mut self) {
        self.cursor.repo = (self.cursor.repo + 1) % self.repo_count();
        self.cursor.issue = 0;
    }

    pub fn prev_repo(&mut self) {
        let count = self.repo_count();
        self.cursor.repo = (self.cursor.repo + count - 1) % count;
        self.cursor.issue = 0;
    }

    pub fn next_issue(&mut self) {
        let count = self.selected_repo().len();
        if count > 0 {
            self.cursor.issue = (self.cursor.issue + 1) % count;
        }
    }

    pub fn prev_issue(&mut self) {
        let count = self.selected_repo().len();
        if count > 0 {
            self.cursor.issue = (self.cursor.issue + count - 1) % count;
        }
    }

    /// Jump to `(repo, issue)`, clamping both into range.
    pub fn select(&mut self, repo: usize, issue: usize) {
        let repo = repo.min(self.repo_count() - 1);
        let len = self.repos[repo].len();
        self.cursor = Cursor {
            repo,
            issue: if len == 0 { 0 } else { issue.min(len - 1) },
        };
    }

    /// Fold or unfold the detail of the selected issue.
    pub fn toggle_detail(&mut self) {
        if let Some(key) = self.selected_issue().map(Issue::key) {
            if !self.expanded.remove(&key) {
                self.expanded.insert(key);
            }
        }
    }

    /// Fold or unfold the detail of a given issue, without moving the cursor.
    pub fn toggle_detail_at(&mut self, repo: usize, issue: usize) {
        let Some(key) = self.repos.get(repo).and_then(|r| r.get(issue)).map(Issue::key) else {
            return;
        };
        if !self.expanded.remove(&key) {
            self.expanded.insert(key);
        }
    }

    /// Mark the selected issue closed and hand back a copy for the remote write.
    pub fn close_selected(&mut self) -> Option<Issue> {
        let index = self.cursor.issue;
        let issue = self.repos[self.cursor.repo].get_mut(index)?;
        issue.close();
        Some(issue.clone())
    }

    /// Replace every repository with its fresh snapshot, then reconcile the
    /// cursor and the unfolded details.
    ///
    /// `snapshots` is positional; entries beyond the configured count are
    /// ignored and missing ones leave the old repository in place.
    pub fn apply_snapshots(&mut self, snapshots: Vec<Repository>) {
        let before = self.selected_repo().len();
        let followed = self.selected_issue().map(|i| i.number);

        for (slot, snapshot) in self.repos.iter_mut().zip(snapshots) {
            *slot = snapshot;
        }

        self.reconcile(before, followed);
        self.prune_expanded();
    }

    /// Re-validate the issue index after the selected repository changed
    /// underneath it. Follows the previously selected issue by number when it
    /// survived; otherwise a shrunk list sends the cursor back to the top.
    fn reconcile(&mut self, before: usize, followed: Option<u64>) {
        let current = &self.repos[self.cursor.repo];
        let after = current.len();

        if let Some(index) = followed.and_then(|n| current.position(n)) {
            self.cursor.issue = index;
        } else if after < before || self.cursor.issue >= after {
            self.cursor.issue = 0;
        }
    }

    fn prune_expanded(&mut self) {
        let alive: HashSet<IssueKey> = self
            .repos
            .iter()
            .flat_map(|r| r.iter().map(Issue::key))
            .collect();
        self.expanded.retain(|k| alive.contains(k));
    }
}
