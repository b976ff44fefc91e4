use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::{EztkError, Result};
use crate::tracker::{self, IssueTracker};
use crate::types::Issue;

#[derive(Debug, Parser)]
#[command(name = "eztk", version, about = "Dashboard for the open issues of your GitHub repositories")]
pub struct Cli {
    /// Configuration file (default: <config dir>/eztk/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log file (default: <cache dir>/eztk/eztk.log)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an issue in one of the configured repositories
    New {
        repo: String,

        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        body: String,

        /// Whitespace-separated label names
        #[arg(short, long, default_value = "")]
        labels: String,
    },
}

/// Create an issue in a configured repository.
pub async fn new_issue(
    tracker: &dyn IssueTracker,
    config: &Config,
    repo: &str,
    title: &str,
    body: &str,
    labels: &str,
) -> Result<()> {
    if config.repo(repo).is_none() {
        return Err(EztkError::Config(format!(
            "'{}' is not a configured repository",
            repo
        )));
    }
    if title.trim().is_empty() {
        return Err(EztkError::Config("an issue needs a title".to_string()));
    }

    let mut issue = Issue::draft(repo, title, body);
    issue.set_labels_from_str(labels);

    if tracker::create_issue(tracker, repo, &issue).await {
        Ok(())
    } else {
        Err(EztkError::Api {
            status: 0,
            message: format!("{} did not accept the issue, see the log", tracker.name()),
        })
    }
}
