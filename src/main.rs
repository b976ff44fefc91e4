mod action;
mod app;
mod auth;
mod board;
mod cli;
mod config;
mod error;
mod event;
mod github;
mod launcher;
mod logging;
mod refresh;
mod tracker;
mod tui;
mod types;
mod ui;

use std::panic;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::app::App;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::event::Event;
use crate::github::GitHub;
use crate::launcher::{Launcher, SystemLauncher};
use crate::tracker::IssueTracker;
use crate::tui::EventHandler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_path = logging::init(cli.log_file.clone())?;
    tracing::info!(log = %log_path.display(), "eztk {} starting", env!("CARGO_PKG_VERSION"));

    // Everything that can fail on bad setup happens before the terminal is taken.
    let config = Arc::new(Config::load(cli.config.as_deref())?);
    let token = auth::load_token(&config)?;
    let tracker: Arc<dyn IssueTracker> = Arc::new(GitHub::new(&config, &token)?);

    if let Some(Command::New {
        repo,
        title,
        body,
        labels,
    }) = cli.command
    {
        cli::new_issue(tracker.as_ref(), &config, &repo, &title, &body, &labels).await?;
        println!("Created issue in {}/{}", config.owner, repo);
        return Ok(());
    }

    let launcher: Arc<dyn Launcher> = Arc::new(SystemLauncher::new(config.launch.clone()));

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let result = run(config, tracker, launcher).await;

    tui::restore()?;

    result
}

async fn run(
    config: Arc<Config>,
    tracker: Arc<dyn IssueTracker>,
    launcher: Arc<dyn Launcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let refresh_rate = config.refresh_interval();
    let mut app = App::new(config, tracker, launcher, action_tx.clone())?;

    let mut terminal = tui::init()?;

    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(render_rate, refresh_rate);

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break;
                }

                match event {
                    Event::Render => {
                        let frame = terminal.draw(|frame| ui::render(frame, &app))?;
                        app.set_viewport(frame.area);
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    tracing::info!("eztk exiting");
    Ok(())
}
