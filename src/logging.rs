//! Log sink selection: env_logger on the console, or syslog once daemonized.

use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use nix::libc;
use std::ffi::CString;
use std::os::raw::c_int;

/// Closes the syslog connection, if one was opened, when dropped.
#[must_use]
pub struct LogGuard {
    syslog: bool,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if self.syslog {
            log::logger().flush();
            // SAFETY: closelog takes no arguments; the ident it held outlives us.
            unsafe { libc::closelog() };
        }
    }
}

pub fn init(program: &str, daemon: bool, level: LevelFilter) -> Result<LogGuard> {
    if daemon {
        let logger = SyslogLogger::open(program, level);
        log::set_boxed_logger(Box::new(logger)).context("installing syslog logger")?;
        log::set_max_level(level);
        Ok(LogGuard { syslog: true })
    } else {
        env_logger::Builder::new()
            .filter_level(level)
            .try_init()
            .context("installing console logger")?;
        Ok(LogGuard { syslog: false })
    }
}

/// Writes records through `syslog(3)` with facility `LOG_USER`.
struct SyslogLogger {
    // openlog keeps this pointer, so it lives as long as the logger.
    #[allow(dead_code)]
    ident: CString,
    level: LevelFilter,
}

impl SyslogLogger {
    fn open(program: &str, level: LevelFilter) -> Self {
        let ident = CString::new(program.replace('\0', ""))
            .unwrap_or_else(|_| CString::from(c"raspi2raspi"));
        // SAFETY: `ident` is NUL-terminated and is stored in the returned
        // logger, which is installed for the rest of the process.
        unsafe { libc::openlog(ident.as_ptr(), libc::LOG_PID, libc::LOG_USER) };
        Self { ident, level }
    }
}

impl Log for SyslogLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = sanitize(&record.args().to_string());
        // SAFETY: both pointers are NUL-terminated, and the "%s" format
        // consumes exactly the one argument passed.
        unsafe {
            libc::syslog(
                priority(record.level()),
                c"%s".as_ptr(),
                message.as_ptr(),
            )
        };
    }

    fn flush(&self) {}
}

fn priority(level: Level) -> c_int {
    match level {
        Level::Error => libc::LOG_ERR,
        Level::Warn => libc::LOG_WARNING,
        Level::Info => libc::LOG_INFO,
        Level::Debug | Level::Trace => libc::LOG_DEBUG,
    }
}

fn sanitize(message: &str) -> CString {
    CString::new(message.replace('\0', "\\0")).unwrap_or_default()
}
