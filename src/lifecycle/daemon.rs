use crate::error::{Error, Result};
use nix::unistd;

/// Detaches from the controlling terminal with `daemon(0, 0)`: new session,
/// working directory `/`, standard streams on `/dev/null`.
///
/// Only the child returns; the parent exits inside the call without running
/// destructors, so guards it shared with the child are left intact.
pub fn detach() -> Result<()> {
    unistd::daemon(false, false).map_err(Error::Daemonize)?;
    log::debug!("Detached as process {}", std::process::id());
    Ok(())
}
