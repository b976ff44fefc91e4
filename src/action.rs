use crossterm::event::MouseButton;

use crate::error::EztkError;
use crate::types::Repository;

/// What a pointer event landed on, in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The title row of a repository panel.
    RepoTitle(usize),
    /// The one-line title row of an issue.
    IssueTitle { repo: usize, issue: usize },
    /// The unfolded detail rows below an issue title.
    IssueDetail { repo: usize, issue: usize },
    /// Anywhere else inside a repository panel.
    RepoBody(usize),
}

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    ToggleHelp,
    ToggleDarkMode,

    // Cursor
    NextRepo,
    PrevRepo,
    NextIssue,
    PrevIssue,
    ToggleDetail,
    Pointer { target: Target, button: MouseButton },

    // Local side effects
    OpenIssueInBrowser,
    OpenRepoInBrowser,
    OpenRepoLocally,
    OpenIssueInEditor,
    YankUrl,

    // Closing an issue
    AskCloseIssue,
    ConfirmYes,
    ConfirmNo,
    CloseSynced {
        repo: String,
        number: u64,
        accepted: bool,
    },

    // Refresh cycle
    Refresh,
    RefreshCompleted {
        repos: Vec<Repository>,
        cycle: u64,
    },

    Error(String),
    None,
}

impl From<EztkError> for Action {
    fn from(err: EztkError) -> Self {
        Action::Error(err.to_string())
    }
}
