//! Building and running the simulation command line.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;

use crate::model::{LaunchCommand, LaunchMode, LaunchOutcome, RunConfig};

/// Command-line flag handed to the executable.
fn mode_flag(mode: LaunchMode, debug: bool) -> Option<&'static str> {
    match (mode, debug) {
        (LaunchMode::FreshStart, true) => Some("-d"),
        (LaunchMode::FreshStart, false) => None,
        (LaunchMode::Restart, true) => Some("-dr"),
        (LaunchMode::Restart, false) => Some("-r"),
    }
}

/// `<launcher...> <executable> <flag> <source>`, run from the working directory.
pub(crate) fn build_command(cfg: &RunConfig, mode: LaunchMode, source: &Path) -> LaunchCommand {
    let mut words: Vec<String> = cfg.launcher.clone();
    words.push(cfg.executable.display().to_string());
    if let Some(flag) = mode_flag(mode, cfg.debug_flag) {
        words.push(flag.to_string());
    }
    words.push(source.display().to_string());

    let program = words.remove(0);
    LaunchCommand {
        program,
        args: words,
        current_dir: cfg.workdir.clone(),
    }
}

/// Latches the first Ctrl-C for the rest of the process.
///
/// Once installed, SIGINT no longer terminates fraggle; the loop polls
/// [`Interrupt::is_set`] between passes and launchers race [`Interrupt::wait`]
/// against the child.
#[derive(Debug, Clone)]
pub(crate) struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// Start listening for Ctrl-C. Must be called inside the runtime.
    pub fn install() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(true);
            }
        });
        Self { rx }
    }

    /// An interrupt driven by the returned sender instead of a signal.
    pub fn manual() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the interrupt is set; never, if it no longer can be.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|set| *set).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Runs one command to completion.
pub(crate) trait Launcher {
    async fn launch(&self, cmd: &LaunchCommand, timeout: Option<Duration>) -> Result<LaunchOutcome>;
}

/// Spawns the command as a child process and waits for it.
///
/// The child inherits stdio. A timeout or Ctrl-C kills it.
pub(crate) struct ProcessLauncher {
    interrupt: Interrupt,
}

impl ProcessLauncher {
    pub fn new(interrupt: Interrupt) -> Self {
        Self { interrupt }
    }
}

impl Launcher for ProcessLauncher {
    async fn launch(&self, cmd: &LaunchCommand, timeout: Option<Duration>) -> Result<LaunchOutcome> {
        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .current_dir(&cmd.current_dir)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch {}", cmd.program))?;

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        let mut interrupt = self.interrupt.clone();

        tokio::select! {
            status = child.wait() => {
                let status = status.context("failed to wait for simulation process")?;
                Ok(LaunchOutcome {
                    exit_code: status.code(),
                    ..Default::default()
                })
            }
            _ = deadline => {
                tracing::warn!(
                    "simulation exceeded {}, killing it",
                    humantime::format_duration(timeout.unwrap_or_default())
                );
                child.kill().await.context("failed to kill timed out simulation")?;
                Ok(LaunchOutcome {
                    timed_out: true,
                    ..Default::default()
                })
            }
            _ = interrupt.wait() => {
                tracing::warn!("interrupted, stopping simulation");
                child.kill().await.context("failed to kill interrupted simulation")?;
                Ok(LaunchOutcome {
                    interrupted: true,
                    ..Default::default()
                })
            }
        }
    }
}

/// Logs the command instead of running it.
pub(crate) struct DryRunLauncher;

impl Launcher for DryRunLauncher {
    async fn launch(&self, cmd: &LaunchCommand, _timeout: Option<Duration>) -> Result<LaunchOutcome> {
        tracing::info!("dry run, not executing: {}", cmd.render());
        Ok(LaunchOutcome {
            exit_code: Some(0),
            ..Default::default()
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording launcher for loop tests.

    use super::*;
    use std::sync::Mutex;

    type Hook = Box<dyn Fn(usize, &LaunchCommand)>;

    /// Records every command. The optional hook runs inside each launch, standing
    /// in for whatever the simulation would have written to disk.
    pub(crate) struct MockLauncher {
        launched: Mutex<Vec<LaunchCommand>>,
        hook: Option<Hook>,
        outcome: LaunchOutcome,
    }

    impl MockLauncher {
        pub fn new() -> Self {
            Self {
                launched: Mutex::new(Vec::new()),
                hook: None,
                outcome: LaunchOutcome {
                    exit_code: Some(0),
                    ..Default::default()
                },
            }
        }

        pub fn with_hook(mut self, hook: impl Fn(usize, &LaunchCommand) + 'static) -> Self {
            self.hook = Some(Box::new(hook));
            self
        }

        pub fn with_outcome(mut self, outcome: LaunchOutcome) -> Self {
            self.outcome = outcome;
            self
        }

        pub fn launched(&self) -> Vec<LaunchCommand> {
            self.launched.lock().expect("MockLauncher mutex poisoned").clone()
        }
    }

    impl Launcher for MockLauncher {
        async fn launch(&self, cmd: &LaunchCommand, _timeout: Option<Duration>) -> Result<LaunchOutcome> {
            let index = {
                let mut launched = self.launched.lock().expect("MockLauncher mutex poisoned");
                launched.push(cmd.clone());
                launched.len() - 1
            };
            if let Some(hook) = &self.hook {
                hook(index, cmd);
            }
            Ok(self.outcome)
        }
    }
}
