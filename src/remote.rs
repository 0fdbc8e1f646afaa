//! Port to the source-hosting provider a repository lives on.

use crate::error::{Error, Result};
use crate::types::{Key, Repo, User};

/// Access a user holds on a repository at the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemotePermission {
    pub pull: bool,
    pub push: bool,
    pub admin: bool,
}

/// Remote control contract used during provisioning and removal.
///
/// Adapter failures are reported as [`Error::ExternalAdapter`].
pub trait Remote: Send + Sync {
    /// Reports the user's permission on `owner/name` at the provider.
    fn permission(&self, user: &User, owner: &str, name: &str) -> Result<RemotePermission>;

    /// Installs the deploy key and the webhook pointing at `link`.
    fn activate(&self, user: &User, repo: &Repo, key: &Key, link: &str) -> Result<()>;

    /// Removes what [`Remote::activate`] installed.
    fn deactivate(&self, user: &User, repo: &Repo, link: &str) -> Result<()>;
}

/// Adapter for a ledger that is not connected to any provider.
///
/// Every user is treated as a repository admin. Activation is refused, so
/// provisioning through it must run with activation disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl Remote for Detached {
    fn permission(&self, _user: &User, _owner: &str, _name: &str) -> Result<RemotePermission> {
        Ok(RemotePermission {
            pull: true,
            push: true,
            admin: true,
        })
    }

    fn activate(&self, _user: &User, repo: &Repo, _key: &Key, _link: &str) -> Result<()> {
        Err(Error::ExternalAdapter(format!(
            "no remote configured to activate {}",
            repo.full_name
        )))
    }

    fn deactivate(&self, _user: &User, _repo: &Repo, _link: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_grants_admin() {
        let perm = Detached
            .permission(&User::default(), "octocat", "hello-world")
            .unwrap();
        assert!(perm.admin && perm.push && perm.pull);
    }

    #[test]
    fn test_detached_refuses_activation() {
        let repo = Repo::new("octocat", "hello-world");
        let result = Detached.activate(&User::default(), &repo, &Key::default(), "http://x/hook");
        assert!(matches!(result, Err(Error::ExternalAdapter(_))));
        assert!(Detached.deactivate(&User::default(), &repo, "http://x/hook").is_ok());
    }
}
