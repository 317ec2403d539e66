use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("DispmanX is not available (built without libbcm_host)")]
    Unavailable,

    /// A DispmanX call returned the zero handle.
    #[error("DispmanX {op} returned an invalid handle")]
    InvalidHandle { op: &'static str },

    #[error("unable to allocate image buffer of {len} bytes")]
    Allocation { len: usize },

    #[error("image buffer holds {len} bytes but {needed} are required")]
    BufferTooSmall { len: usize, needed: usize },

    /// A DispmanX call returned a non-zero status.
    #[error("DispmanX {op} failed ({status})")]
    Vendor { op: &'static str, status: i32 },

    #[error("already running{}", pid_suffix(.pid))]
    AlreadyRunning { pid: Option<u32> },

    #[error("PID file {}", path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("daemonize failed")]
    Daemonize(#[source] nix::Error),
}

fn pid_suffix(pid: &Option<u32>) -> String {
    pid.map(|pid| format!(" {}", pid)).unwrap_or_default()
}

/// Maps a DispmanX status code (zero on success) to a `Result`.
pub fn check(op: &'static str, status: i32) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(Error::Vendor { op, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check("snapshot", 0).is_ok());
        let err = check("snapshot", -1).unwrap_err();
        assert_eq!(err.to_string(), "DispmanX snapshot failed (-1)");
    }

    #[test]
    fn test_already_running_names_pid() {
        let err = Error::AlreadyRunning { pid: Some(4242) };
        assert_eq!(err.to_string(), "already running 4242");
        assert_eq!(
            Error::AlreadyRunning { pid: None }.to_string(),
            "already running"
        );
    }
}
