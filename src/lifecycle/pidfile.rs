use crate::error::{Error, Result};
use nix::errno::Errno;
use nix::fcntl::{flock, FlockArg};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// An exclusively locked PID file.
///
/// The lock is an advisory `flock` held for as long as the file stays open,
/// which survives the fork in `daemon(3)`. Dropping removes the file.
pub struct PidFile {
    file: File,
    path: PathBuf,
}

impl PidFile {
    /// Creates (or reuses) `path` and takes the lock without writing a PID.
    ///
    /// Relative paths are resolved against the current directory now, since
    /// `daemon(3)` moves to `/` before the file is removed.
    /// Fails with [`Error::AlreadyRunning`] when another process holds it.
    pub fn open(path: &Path) -> Result<Self> {
        let io_error = |source| Error::PidFile {
            path: path.to_path_buf(),
            source,
        };
        let path = std::path::absolute(path).map_err(io_error)?;
        let path = path.as_path();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o600)
            .open(path)
            .map_err(io_error)?;

        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => {}
            Err(Errno::EAGAIN) => {
                return Err(Error::AlreadyRunning {
                    pid: read_other_pid(&mut file),
                })
            }
            Err(errno) => return Err(io_error(errno.into())),
        }

        file.set_len(0).map_err(io_error)?;
        log::debug!("Locked PID file {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Records the calling process's ID. Call after daemonizing.
    pub fn write(&mut self) -> Result<()> {
        let pid = std::process::id();
        let mut write = || -> std::io::Result<()> {
            self.file.set_len(0)?;
            self.file.seek(SeekFrom::Start(0))?;
            writeln!(self.file, "{}", pid)?;
            self.file.sync_all()
        };
        write().map_err(|source| Error::PidFile {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Removing PID file {}: {}", self.path.display(), e);
        }
    }
}

/// The lock holder may not have written its PID yet, so retry briefly.
fn read_other_pid(file: &mut File) -> Option<u32> {
    for _ in 0..5 {
        let mut contents = String::new();
        if file.seek(SeekFrom::Start(0)).is_ok() && file.read_to_string(&mut contents).is_ok() {
            if let Ok(pid) = contents.trim().parse() {
                return Some(pid);
            }
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_records_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raspi2raspi.pid");

        let mut pidfile = PidFile::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        pidfile.write().unwrap();
        pidfile.write().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{}\n", std::process::id())
        );
        assert_eq!(pidfile.path(), path.as_path());
    }

    #[test]
    fn test_second_open_names_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.pid");

        let mut holder = PidFile::open(&path).unwrap();
        holder.write().unwrap();

        match PidFile::open(&path) {
            Err(Error::AlreadyRunning { pid }) => assert_eq!(pid, Some(std::process::id())),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("second lock succeeded"),
        }

        // The failed attempt must not have removed or truncated the holder's file.
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{}\n", std::process::id())
        );
    }

    #[test]
    fn test_contention_before_pid_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.pid");

        let _holder = PidFile::open(&path).unwrap();
        assert!(matches!(
            PidFile::open(&path),
            Err(Error::AlreadyRunning { pid: None })
        ));
    }

    #[test]
    fn test_drop_removes_and_unlocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.pid");

        drop(PidFile::open(&path).unwrap());
        assert!(!path.exists());
        assert!(PidFile::open(&path).is_ok());
    }

    #[test]
    fn test_relative_path_removed_after_chdir() {
        let dir = tempfile::tempdir().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let pidfile = PidFile::open(Path::new("relative.pid"));
        // daemon(3) changes to the root directory before we exit.
        std::env::set_current_dir("/").unwrap();
        let pidfile = pidfile.unwrap();
        assert!(pidfile.path().is_absolute());

        drop(pidfile);
        let left_behind = dir.path().join("relative.pid").exists();
        std::env::set_current_dir(previous).unwrap();
        assert!(!left_behind, "PID file left behind after clean exit");
    }

    #[test]
    fn test_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.pid");
        assert!(matches!(PidFile::open(&path), Err(Error::PidFile { .. })));
    }
}
