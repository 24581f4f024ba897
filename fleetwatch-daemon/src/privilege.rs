//! Scoped effective-identity switch.
//!
//! [`PrivilegeGuard::acquire`] moves the process's effective gid and uid to a
//! named account; dropping the guard moves them back. Only the *effective*
//! ids change, so a process started as root keeps its saved set-user-ID and
//! can always return.

use nix::unistd::{getegid, geteuid, setegid, seteuid, Gid, Uid, User};

use crate::error::DaemonError;

/// Restores the original effective uid/gid when dropped.
#[derive(Debug)]
#[must_use = "privileges are restored as soon as the guard is dropped"]
pub struct PrivilegeGuard {
    user: String,
    original_uid: Uid,
    original_gid: Gid,
    switched: bool,
}

impl PrivilegeGuard {
    /// Switch the effective identity to `user`.
    ///
    /// Gid is switched before uid (a non-root euid may no longer change its
    /// gid). If the uid switch fails the gid is put back before returning.
    pub fn acquire(user: &str) -> Result<Self, DaemonError> {
        let target = User::from_name(user)
            .map_err(|e| DaemonError::UserLookup {
                user: user.to_string(),
                source: e,
            })?
            .ok_or_else(|| DaemonError::UnknownUser(user.to_string()))?;

        let original_uid = geteuid();
        let original_gid = getegid();
        if target.uid == original_uid && target.gid == original_gid {
            return Ok(Self {
                user: user.to_string(),
                original_uid,
                original_gid,
                switched: false,
            });
        }

        setegid(target.gid).map_err(|e| DaemonError::Privilege {
            action: format!("set effective gid to {} ({user})", target.gid),
            source: e,
        })?;
        if let Err(e) = seteuid(target.uid) {
            if let Err(restore) = setegid(original_gid) {
                tracing::error!("could not restore effective gid {original_gid}: {restore}");
            }
            return Err(DaemonError::Privilege {
                action: format!("set effective uid to {} ({user})", target.uid),
                source: e,
            });
        }
        tracing::debug!("effective identity switched to {user}");

        Ok(Self {
            user: user.to_string(),
            original_uid,
            original_gid,
            switched: true,
        })
    }

    /// Whether acquiring actually changed the effective identity.
    pub fn switched(&self) -> bool {
        self.switched
    }
}

impl Drop for PrivilegeGuard {
    fn drop(&mut self) {
        if !self.switched {
            return;
        }
        if let Err(e) = seteuid(self.original_uid) {
            tracing::error!(
                "could not restore effective uid {} after acting as {}: {e}",
                self.original_uid,
                self.user
            );
        }
        if let Err(e) = setegid(self.original_gid) {
            tracing::error!(
                "could not restore effective gid {} after acting as {}: {e}",
                self.original_gid,
                self.user
            );
        }
        tracing::debug!("effective identity restored after acting as {}", self.user);
    }
}
