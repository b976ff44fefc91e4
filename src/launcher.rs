use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::LaunchConfig;

/// Local side effects triggered from the dashboard. Every call returns
/// immediately; failures are logged, never reported back.
pub trait Launcher: Send + Sync + std::fmt::Debug {
    fn open_url(&self, url: &str);
    fn open_path(&self, path: &Path);
    fn open_in_editor(&self, path: &Path, number: u64);
}

#[derive(Debug, Clone)]
pub struct SystemLauncher {
    config: LaunchConfig,
}

impl SystemLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    /// `terminal -e ranger <path>`
    fn file_manager_command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.terminal);
        cmd.arg("-e").arg(&self.config.file_manager).arg(path);
        cmd
    }

    /// `terminal -e nvim "+Octo issue edit 12"`, started inside the repository
    fn editor_command(&self, path: &Path, number: u64) -> Command {
        let startup = self
            .config
            .editor_command
            .replace("{number}", &number.to_string());
        let mut cmd = Command::new(&self.config.terminal);
        cmd.arg("-e")
            .arg(&self.config.editor)
            .arg(format!("+{}", startup))
            .current_dir(path);
        cmd
    }
}

impl Launcher for SystemLauncher {
    fn open_url(&self, url: &str) {
        match &self.config.browser {
            Some(browser) => {
                let mut cmd = Command::new(browser);
                cmd.arg(url);
                spawn_detached(cmd);
            }
            None => {
                if let Err(e) = open::that_detached(url) {
                    tracing::warn!(url, "could not open browser: {}", e);
                }
            }
        }
    }

    fn open_path(&self, path: &Path) {
        spawn_detached(self.file_manager_command(path));
    }

    fn open_in_editor(&self, path: &Path, number: u64) {
        spawn_detached(self.editor_command(path, number));
    }
}

/// Start `cmd` with no stdio, outside our process group so it outlives us,
/// and reap it on a background thread.
fn spawn_detached(mut cmd: Command) {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let program = cmd.get_program().to_string_lossy().into_owned();
    match cmd.spawn() {
        Ok(mut child) => {
            tracing::debug!(program, pid = child.id(), "launched");
            std::thread::spawn(move || {
                let _ = child.wait();
            });
        }
        Err(e) => tracing::warn!(program, "could not launch: {}", e),
    }
}
