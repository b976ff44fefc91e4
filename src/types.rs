use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueState::Open => write!(f, "Open"),
            IssueState::Closed => write!(f, "Closed"),
        }
    }
}

/// Identity of an issue across snapshots: repository name + issue number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueKey {
    pub repo: String,
    pub number: u64,
}

/// Body sent to the remote when creating or updating an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub state: IssueState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub state: IssueState,
    pub url: String,
}

impl Issue {
    /// A not-yet-created issue. The remote assigns the number.
    pub fn draft(repo: &str, title: &str, body: &str) -> Self {
        Self {
            repo: repo.to_string(),
            number: 0,
            title: title.to_string(),
            body: body.to_string(),
            labels: Vec::new(),
            state: IssueState::Open,
            url: String::new(),
        }
    }

    pub fn key(&self) -> IssueKey {
        IssueKey {
            repo: self.repo.clone(),
            number: self.number,
        }
    }

    pub fn close(&mut self) {
        self.state = IssueState::Closed;
    }

    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }

    pub fn labels_str(&self) -> String {
        self.labels.join(" ")
    }

    /// "a b  c" -> ["a", "b", "c"]
    pub fn set_labels_from_str(&mut self, labels: &str) {
        self.labels = labels.split_whitespace().map(str::to_string).collect();
    }

    pub fn payload(&self) -> IssuePayload {
        IssuePayload {
            title: self.title.clone(),
            body: self.body.clone(),
            labels: self.labels.clone(),
            state: self.state,
        }
    }
}

/// The open issues of one configured repository, as of one fetch.
///
/// Behaves like a read-only sequence of issues. Mutation is reserved to the
/// board so that the cursor can never be invalidated behind its back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    name: String,
    path: PathBuf,
    url: String,
    issues: Vec<Issue>,
}

impl Repository {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        url: impl Into<String>,
        issues: Vec<Issue>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            url: url.into(),
            issues,
        }
    }

    pub fn empty(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        url: impl Into<String>,
    ) -> Self {
        Self::new(name, path, url, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Issue> {
        self.issues.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Issue> {
        self.issues.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.issues.iter()
    }

    /// Index of the issue with this number, if still present.
    pub fn position(&self, number: u64) -> Option<usize> {
        self.issues.iter().position(|i| i.number == number)
    }
}

impl Index<usize> for Repository {
    type Output = Issue;

    fn index(&self, index: usize) -> &Issue {
        &self.issues[index]
    }
}

impl<'a> IntoIterator for &'a Repository {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

#[cfg(test)]
pub(crate) fn issue(repo: &str, number: u64, title: &str) -> Issue {
    Issue {
        repo: repo.to_string(),
        number,
        title: title.to_string(),
        body: String::new(),
        labels: Vec::new(),
        state: IssueState::Open,
        url: format!("https://github.com/me/{}/issues/{}", repo, number),
    }
}
