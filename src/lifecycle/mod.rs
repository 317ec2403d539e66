//! Process lifecycle: PID file, daemonization and the signal-driven run flag.

mod daemon;
mod pidfile;

pub use pidfile::PidFile;

use crate::config::Config;
use anyhow::{Context, Result};
use nix::sys::signal::{self, SigHandler, Signal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide "keep mirroring" flag.
///
/// Starts set and can only ever be cleared.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag. Returns whether this call was the one that cleared it.
    pub fn stop(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears `running` on SIGINT or SIGTERM.
///
/// ctrlc spawns a handler thread, so this must run after daemonizing.
pub fn install_signal_handlers(running: &RunFlag) -> Result<()> {
    let running = running.clone();
    ctrlc::set_handler(move || {
        running.stop();
    })
    .context("installing SIGINT/SIGTERM signal handlers")?;

    // ctrlc's termination set includes SIGHUP, which keeps its default action.
    // SAFETY: SIG_DFL runs no code in signal context.
    unsafe { signal::signal(Signal::SIGHUP, SigHandler::SigDfl) }
        .context("restoring default SIGHUP action")?;
    Ok(())
}

/// Resources held for the life of the process.
pub struct Lifecycle {
    pidfile: Option<PidFile>,
    daemonized: bool,
}

impl Lifecycle {
    /// Stays in the foreground with nothing to release.
    pub fn foreground() -> Self {
        Self {
            pidfile: None,
            daemonized: false,
        }
    }

    /// Locks the PID file (daemon mode only) and detaches.
    ///
    /// Contention is detected before detaching so the caller still has a
    /// terminal to report it on. The PID is recorded later by
    /// [`Lifecycle::write_pid`], once syslog can report a failure.
    pub fn start(config: &Config) -> Result<Self> {
        if !config.daemon {
            return Ok(Self::foreground());
        }

        let mut lifecycle = Self::foreground();
        if let Some(path) = &config.pidfile {
            lifecycle.pidfile = Some(PidFile::open(path)?);
        }

        daemon::detach()?;
        lifecycle.daemonized = true;
        Ok(lifecycle)
    }

    /// Writes our PID into the held PID file, if any.
    pub fn write_pid(&mut self) -> Result<()> {
        if let Some(pidfile) = self.pidfile.as_mut() {
            pidfile.write()?;
            log::debug!("Wrote PID file {}", pidfile.path().display());
        }
        Ok(())
    }

    pub fn is_daemon(&self) -> bool {
        self.daemonized
    }

    /// Removes and unlocks the PID file if one is held. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(pidfile) = self.pidfile.take() {
            log::debug!("Releasing PID file {}", pidfile.path().display());
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.release();
    }
}
