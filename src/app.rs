use std::sync::Arc;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::action::{Action, Target};
use crate::board::Board;
use crate::config::Config;
use crate::error::{EztkError, Result};
use crate::event::Event;
use crate::launcher::Launcher;
use crate::refresh;
use crate::tracker::{self, IssueTracker};
use crate::types::{Issue, Repository};
use crate::ui;

pub struct App {
    pub board: Board,
    pub show_help: bool,
    pub dark_mode: bool,
    pub refreshing: bool,
    pub last_refresh: Option<DateTime<Local>>,
    /// Issue waiting for a y/n answer before being closed.
    pub confirm_close: Option<Issue>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub should_quit: bool,
    pub config: Arc<Config>,
    viewport: Rect,
    refresh_cycle: u64,
    tracker: Arc<dyn IssueTracker>,
    launcher: Arc<dyn Launcher>,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    pub fn new(
        config: Arc<Config>,
        tracker: Arc<dyn IssueTracker>,
        launcher: Arc<dyn Launcher>,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Result<Self> {
        let repos = config
            .repos
            .iter()
            .map(|r| Repository::empty(r.name.as_str(), r.path.as_str(), tracker.repo_url(&r.name)))
            .collect();

        Ok(Self {
            board: Board::new(repos)?,
            show_help: false,
            dark_mode: true,
            refreshing: false,
            last_refresh: None,
            confirm_close: None,
            status: None,
            error: None,
            should_quit: false,
            config,
            viewport: Rect::default(),
            refresh_cycle: 0,
            tracker,
            launcher,
            action_tx,
        })
    }

    /// Area of the last drawn frame, used to resolve pointer events.
    pub fn set_viewport(&mut self, area: Rect) {
        self.viewport = area;
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Init | Event::Refresh => Action::Refresh,
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Render => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        if self.confirm_close.is_some() {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Action::ConfirmYes,
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => Action::ConfirmNo,
                _ => Action::None,
            };
        }

        if self.show_help {
            return match key.code {
                KeyCode::Char('q') => Action::Quit,
                KeyCode::Char('p') | KeyCode::Char('?') | KeyCode::Esc => Action::ToggleHelp,
                _ => Action::None,
            };
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('p') | KeyCode::Char('?') => Action::ToggleHelp,
            KeyCode::Char('d') => Action::ToggleDarkMode,

            KeyCode::Char('h') | KeyCode::Left => Action::PrevRepo,
            KeyCode::Char('l') | KeyCode::Right => Action::NextRepo,
            KeyCode::Char('k') | KeyCode::Up => Action::PrevIssue,
            KeyCode::Char('j') | KeyCode::Down => Action::NextIssue,
            KeyCode::Enter | KeyCode::Char(' ') => Action::ToggleDetail,

            KeyCode::F(1) | KeyCode::Char('B') => Action::OpenRepoInBrowser,
            KeyCode::F(2) | KeyCode::Char('b') => Action::OpenIssueInBrowser,
            KeyCode::F(3) | KeyCode::Char('f') => Action::OpenRepoLocally,
            KeyCode::F(4) | KeyCode::Char('e') => Action::OpenIssueInEditor,

            KeyCode::Char('x') => Action::AskCloseIssue,
            KeyCode::Char('y') => Action::YankUrl,
            KeyCode::Char('r') => Action::Refresh,
            _ => Action::None,
        }
    }

    fn handle_mouse(&self, mouse: MouseEvent) -> Action {
        if self.confirm_close.is_some() || self.show_help {
            return Action::None;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => Action::NextIssue,
            MouseEventKind::ScrollUp => Action::PrevIssue,
            MouseEventKind::Down(button @ (MouseButton::Left | MouseButton::Right)) => {
                match ui::hit_test(&self.board, self.viewport, mouse.column, mouse.row) {
                    Some(target) => Action::Pointer { target, button },
                    None => Action::None,
                }
            }
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) {
        if !matches!(action, Action::None | Action::RefreshCompleted { .. } | Action::CloseSynced { .. }) {
            self.error = None;
            self.status = None;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
            }
            Action::ToggleDarkMode => {
                self.dark_mode = !self.dark_mode;
            }

            Action::NextRepo => self.board.next_repo(),
            Action::PrevRepo => self.board.prev_repo(),
            Action::NextIssue => self.board.next_issue(),
            Action::PrevIssue => self.board.prev_issue(),
            Action::ToggleDetail => self.board.toggle_detail(),
            Action::Pointer { target, button } => self.pointer(target, button),

            Action::OpenIssueInBrowser => self.open_issue_in_browser(),
            Action::OpenRepoInBrowser => {
                self.launcher.open_url(self.board.selected_repo().url());
            }
            Action::OpenRepoLocally => {
                self.launcher.open_path(self.board.selected_repo().path());
            }
            Action::OpenIssueInEditor => self.open_issue_in_editor(),
            Action::YankUrl => self.yank_url(),

            Action::AskCloseIssue => {
                self.confirm_close = self.board.selected_issue().filter(|i| i.is_open()).cloned();
            }
            Action::ConfirmYes => self.close_confirmed(),
            Action::ConfirmNo => {
                self.confirm_close = None;
            }
            Action::CloseSynced {
                repo,
                number,
                accepted,
            } => {
                if accepted {
                    tracing::info!(repo, number, "issue closed");
                } else {
                    tracing::warn!(repo, number, "remote did not close the issue; shown closed until next refresh");
                }
            }

            Action::Refresh => {
                self.refreshing = true;
                self.refresh_cycle += 1;
                self.spawn_refresh(self.refresh_cycle);
            }
            Action::RefreshCompleted { repos, cycle } => {
                if cycle != self.refresh_cycle {
                    tracing::debug!(cycle, latest = self.refresh_cycle, "dropping superseded refresh");
                    return;
                }
                self.board.apply_snapshots(repos);
                self.refreshing = false;
                self.last_refresh = Some(Local::now());

                let still_selected = match (&self.confirm_close, self.board.selected_issue()) {
                    (Some(pending), Some(selected)) => pending.key() == selected.key(),
                    _ => false,
                };
                if !still_selected {
                    self.confirm_close = None;
                }
            }

            Action::Error(msg) => {
                self.error = Some(msg);
            }
            Action::None => {}
        }
    }

    /// Left click selects or opens in the browser; right click opens locally.
    fn pointer(&mut self, target: Target, button: MouseButton) {
        let right = button == MouseButton::Right;
        match target {
            Target::RepoTitle(repo) => {
                self.focus_repo(repo);
                if right {
                    self.launcher.open_path(self.board.selected_repo().path());
                } else {
                    self.launcher.open_url(self.board.selected_repo().url());
                }
            }
            Target::IssueTitle { repo, issue } => {
                self.board.select(repo, issue);
                if right {
                    self.open_issue_in_editor();
                }
            }
            Target::IssueDetail { repo, issue } => {
                if right {
                    self.board.select(repo, issue);
                    self.open_issue_in_editor();
                } else {
                    self.board.toggle_detail_at(repo, issue);
                }
            }
            Target::RepoBody(repo) => {
                self.focus_repo(repo);
                if right {
                    self.open_issue_in_editor();
                } else {
                    self.open_issue_in_browser();
                }
            }
        }
    }

    /// Select `repo` unless it already is, keeping the issue cursor otherwise.
    fn focus_repo(&mut self, repo: usize) {
        if self.board.cursor().repo != repo {
            self.board.select(repo, 0);
        }
    }

    fn open_issue_in_browser(&self) {
        if let Some(issue) = self.board.selected_issue() {
            self.launcher.open_url(&issue.url);
        }
    }

    fn open_issue_in_editor(&self) {
        if let Some(issue) = self.board.selected_issue() {
            self.launcher
                .open_in_editor(self.board.selected_repo().path(), issue.number);
        }
    }

    fn yank_url(&mut self) {
        let Some(url) = self.board.selected_issue().map(|i| i.url.clone()) else {
            return;
        };
        let copied = arboard::Clipboard::new().and_then(|mut c| c.set_text(url.clone()));
        match copied {
            Ok(()) => self.status = Some(format!("Copied {}", url)),
            Err(e) => self.update(EztkError::Clipboard(e.to_string()).into()),
        }
    }

    fn close_confirmed(&mut self) {
        let Some(pending) = self.confirm_close.take() else {
            return;
        };
        if self.board.selected_issue().map(Issue::key) != Some(pending.key()) {
            return;
        }
        if let Some(issue) = self.board.close_selected() {
            self.spawn_close(issue);
        }
    }

    fn spawn_close(&self, mut issue: Issue) {
        let tx = self.action_tx.clone();
        let tracker = Arc::clone(&self.tracker);
        tokio::spawn(async move {
            let repo = issue.repo.clone();
            let accepted = tracker::close_issue(tracker.as_ref(), &repo, &mut issue).await;
            tx.send(Action::CloseSynced {
                repo,
                number: issue.number,
                accepted,
            })
            .ok();
        });
    }

    fn spawn_refresh(&self, cycle: u64) {
        let tx = self.action_tx.clone();
        let tracker = Arc::clone(&self.tracker);
        let config = Arc::clone(&self.config);
        tokio::spawn(async move {
            let repos = refresh::refresh_cycle(tracker.as_ref(), &config.repos).await;
            tx.send(Action::RefreshCompleted { repos, cycle }).ok();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cursor;
    use crate::launcher::fake::{Launched, RecordingLauncher};
    use crate::tracker::fake::FakeTracker;
    use crate::types::{issue, IssueState};
    use crossterm::event::KeyModifiers;
    use std::path::PathBuf;

    struct Harness {
        app: App,
        rx: mpsc::UnboundedReceiver<Action>,
        tracker: Arc<FakeTracker>,
        launcher: Arc<RecordingLauncher>,
    }

    fn harness(tracker: FakeTracker) -> Harness {
        let config = Config::from_toml(
            r#"
owner = "me"

[[repos]]
name = "r1"
path = "/src/r1"

[[repos]]
name = "r2"
path = "/src/r2"
"#,
        )
        .unwrap();
        let tracker = Arc::new(tracker);
        let launcher = Arc::new(RecordingLauncher::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(
            Arc::new(config),
            tracker.clone(),
            launcher.clone(),
            tx,
        )
        .unwrap();
        Harness {
            app,
            rx,
            tracker,
            launcher,
        }
    }

    fn two_issue_tracker() -> FakeTracker {
        FakeTracker::with(vec![
            ("r1", vec![issue("r1", 1, "a"), issue("r1", 2, "b")]),
            ("r2", vec![]),
        ])
    }

    /// Run one refresh to completion through the action channel.
    async fn refresh(h: &mut Harness) {
        h.app.update(Action::Refresh);
        loop {
            let action = h.rx.recv().await.unwrap();
            let done = matches!(action, Action::RefreshCompleted { .. });
            h.app.update(action);
            if done {
                break;
            }
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[tokio::test]
    async fn startup_navigation_scenario() {
        let mut h = harness(two_issue_tracker());
        assert!(matches!(h.app.handle_event(Event::Init), Action::Refresh));

        refresh(&mut h).await;
        assert!(!h.app.refreshing);
        assert!(h.app.last_refresh.is_some());
        assert_eq!(h.app.board.cursor(), Cursor { repo: 0, issue: 0 });

        h.app.update(h.app.handle_event(key(KeyCode::Char('j'))));
        assert_eq!(h.app.board.cursor(), Cursor { repo: 0, issue: 1 });

        h.app.update(h.app.handle_event(key(KeyCode::Right)));
        assert_eq!(h.app.board.cursor(), Cursor { repo: 1, issue: 0 });

        h.app.update(h.app.handle_event(key(KeyCode::Down)));
        assert_eq!(h.app.board.cursor(), Cursor { repo: 1, issue: 0 });
    }

    #[tokio::test]
    async fn superseded_refresh_is_dropped() {
        let mut h = harness(two_issue_tracker());
        h.app.update(Action::Refresh);
        h.app.update(Action::Refresh);

        let stale = vec![
            Repository::empty("r1", "/src/r1", ""),
            Repository::empty("r2", "/src/r2", ""),
        ];
        h.app.update(Action::RefreshCompleted {
            repos: stale,
            cycle: 1,
        });
        assert!(h.app.refreshing);

        // Drain both spawned cycles; only cycle 2 applies.
        let mut applied = 0;
        while applied < 2 {
            let action = h.rx.recv().await.unwrap();
            if let Action::RefreshCompleted { cycle, .. } = &action {
                applied += 1;
                if *cycle == 2 {
                    h.app.update(action);
                }
            }
        }
        assert!(!h.app.refreshing);
        assert_eq!(h.app.board.repos()[0].len(), 2);
    }

    #[tokio::test]
    async fn close_is_optimistic_and_confirmed() {
        let mut h = harness(FakeTracker {
            reject_writes: true,
            ..two_issue_tracker()
        });
        refresh(&mut h).await;
        h.app.update(Action::NextIssue);

        h.app.update(h.app.handle_event(key(KeyCode::Char('x'))));
        assert_eq!(h.app.confirm_close.as_ref().map(|i| i.number), Some(2));
        // Navigation keys are swallowed while the popup is open.
        assert!(matches!(h.app.handle_event(key(KeyCode::Char('j'))), Action::None));

        h.app.update(h.app.handle_event(key(KeyCode::Char('y'))));
        assert!(h.app.confirm_close.is_none());
        assert_eq!(h.app.board.repos()[0][1].state, IssueState::Closed);

        match h.rx.recv().await.unwrap() {
            Action::CloseSynced {
                repo,
                number,
                accepted,
            } => {
                assert_eq!(repo, "r1");
                assert_eq!(number, 2);
                assert!(!accepted);
            }
            other => panic!("unexpected action {:?}", other),
        }
        // Remote refusal does not revert the local state.
        assert_eq!(h.app.board.repos()[0][1].state, IssueState::Closed);
    }

    #[tokio::test]
    async fn close_sends_update_to_remote() {
        let mut h = harness(two_issue_tracker());
        refresh(&mut h).await;

        h.app.update(Action::AskCloseIssue);
        h.app.update(Action::ConfirmYes);
        let synced = h.rx.recv().await.unwrap();
        assert!(matches!(synced, Action::CloseSynced { accepted: true, .. }));

        let updates = h.tracker.updates.lock().unwrap();
        assert_eq!(updates[0].1, 1);
        assert_eq!(updates[0].2.state, IssueState::Closed);
    }

    #[tokio::test]
    async fn declining_close_leaves_issue_open() {
        let mut h = harness(two_issue_tracker());
        refresh(&mut h).await;

        h.app.update(Action::AskCloseIssue);
        h.app.update(h.app.handle_event(key(KeyCode::Char('n'))));

        assert!(h.app.confirm_close.is_none());
        assert!(h.app.board.repos()[0][0].is_open());
    }

    #[tokio::test]
    async fn issue_intents_are_noops_without_issues() {
        let mut h = harness(two_issue_tracker());
        refresh(&mut h).await;
        h.app.update(Action::NextRepo);

        h.app.update(Action::OpenIssueInBrowser);
        h.app.update(Action::OpenIssueInEditor);
        h.app.update(Action::ToggleDetail);
        h.app.update(Action::AskCloseIssue);
        h.app.update(Action::YankUrl);

        assert!(h.launcher.take().is_empty());
        assert!(h.app.confirm_close.is_none());
        assert!(h.app.error.is_none());
    }

    #[tokio::test]
    async fn open_intents_reach_the_launcher() {
        let mut h = harness(two_issue_tracker());
        refresh(&mut h).await;
        h.app.update(Action::NextIssue);

        h.app.update(h.app.handle_event(key(KeyCode::F(2))));
        h.app.update(h.app.handle_event(key(KeyCode::F(1))));
        h.app.update(h.app.handle_event(key(KeyCode::F(3))));
        h.app.update(h.app.handle_event(key(KeyCode::F(4))));

        assert_eq!(
            h.launcher.take(),
            vec![
                Launched::Url("https://github.com/me/r1/issues/2".to_string()),
                Launched::Url("https://example.test/me/r1".to_string()),
                Launched::Path(PathBuf::from("/src/r1")),
                Launched::Editor(PathBuf::from("/src/r1"), 2),
            ]
        );
        assert_eq!(h.app.board.cursor(), Cursor { repo: 0, issue: 1 });
    }

    #[tokio::test]
    async fn pointer_targets_select_and_toggle() {
        let mut h = harness(two_issue_tracker());
        refresh(&mut h).await;

        h.app.update(Action::Pointer {
            target: Target::IssueTitle { repo: 0, issue: 1 },
            button: MouseButton::Left,
        });
        assert_eq!(h.app.board.cursor(), Cursor { repo: 0, issue: 1 });
        assert!(h.launcher.take().is_empty());

        h.app.update(Action::Pointer {
            target: Target::IssueDetail { repo: 0, issue: 0 },
            button: MouseButton::Left,
        });
        assert!(h.app.board.is_expanded(&h.app.board.repos()[0][0]));
        assert_eq!(h.app.board.cursor(), Cursor { repo: 0, issue: 1 });

        h.app.update(Action::Pointer {
            target: Target::RepoTitle(1),
            button: MouseButton::Right,
        });
        assert_eq!(h.app.board.cursor(), Cursor { repo: 1, issue: 0 });
        assert_eq!(
            h.launcher.take(),
            vec![Launched::Path(PathBuf::from("/src/r2"))]
        );

        h.app.update(Action::Pointer {
            target: Target::IssueTitle { repo: 0, issue: 0 },
            button: MouseButton::Right,
        });
        assert_eq!(
            h.launcher.take(),
            vec![Launched::Editor(PathBuf::from("/src/r1"), 1)]
        );
    }

    #[tokio::test]
    async fn help_swallows_navigation() {
        let mut h = harness(two_issue_tracker());
        h.app.update(h.app.handle_event(key(KeyCode::Char('p'))));
        assert!(h.app.show_help);
        assert!(matches!(h.app.handle_event(key(KeyCode::Char('j'))), Action::None));
        h.app.update(h.app.handle_event(key(KeyCode::Esc)));
        assert!(!h.app.show_help);
        assert!(matches!(h.app.handle_event(key(KeyCode::Esc)), Action::Quit));
    }

    #[tokio::test]
    async fn refresh_drops_pending_close_of_vanished_issue() {
        let mut h = harness(two_issue_tracker());
        refresh(&mut h).await;
        h.app.update(Action::AskCloseIssue);
        assert!(h.app.confirm_close.is_some());

        h.tracker.set("r1", vec![issue("r1", 2, "b")]);
        refresh(&mut h).await;

        assert!(h.app.confirm_close.is_none());
    }
}
