//! Hand created files back to the user who invoked `sudo`.

use std::path::Path;

use tracing::{debug, warn};

/// Who should own files the process creates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Ownership {
    /// Leave ownership as created.
    #[default]
    Unchanged,
    /// Reassign to the invoking user.
    Invoker { user: String, uid: u32, gid: u32 },
}

impl Ownership {
    /// Read `SUDO_USER`, `SUDO_UID` and `SUDO_GID`. Any missing or malformed variable
    /// means there is nobody to hand files back to.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("SUDO_USER").ok(),
            std::env::var("SUDO_UID").ok(),
            std::env::var("SUDO_GID").ok(),
        )
    }

    pub fn from_vars(user: Option<String>, uid: Option<String>, gid: Option<String>) -> Self {
        let (Some(user), Some(uid), Some(gid)) = (user, uid, gid) else {
            return Self::Unchanged;
        };
        match (uid.trim().parse(), gid.trim().parse()) {
            (Ok(uid), Ok(gid)) if !user.is_empty() => Self::Invoker { user, uid, gid },
            _ => Self::Unchanged,
        }
    }

    /// Change the owner of `path`. Failures are logged, never returned.
    ///
    /// Returns whether ownership was reassigned.
    pub fn apply(&self, path: &Path) -> bool {
        let Self::Invoker { user, uid, gid } = self else {
            return false;
        };
        match chown(path, *uid, *gid) {
            Ok(()) => {
                debug!(path = %path.display(), user = %user, "Ownership reassigned");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), user = %user, error = %e, "Failed to reassign ownership");
                false
            }
        }
    }
}

#[cfg(unix)]
fn chown(path: &Path, uid: u32, gid: u32) -> std::io::Result<()> {
    std::os::unix::fs::chown(path, Some(uid), Some(gid))
}

#[cfg(not(unix))]
fn chown(_path: &Path, _uid: u32, _gid: u32) -> std::io::Result<()> {
    Ok(())
}
