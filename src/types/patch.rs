use serde::{Deserialize, Serialize};

use super::{Repo, User};
use crate::error::{Error, Result};

/// Partial repository update. Only fields that are `Some` are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoPatch {
    #[serde(rename = "trusted", skip_serializing_if = "Option::is_none")]
    pub is_trusted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(rename = "allow_pr", skip_serializing_if = "Option::is_none")]
    pub allow_pull: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_push: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_deploy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_tag: Option<bool>,
}

impl RepoPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_trusted.is_none()
            && self.timeout.is_none()
            && self.allow_pull.is_none()
            && self.allow_push.is_none()
            && self.allow_deploy.is_none()
            && self.allow_tag.is_none()
    }

    fn touches_event_flags(&self) -> bool {
        self.allow_pull.is_some()
            || self.allow_push.is_some()
            || self.allow_deploy.is_some()
            || self.allow_tag.is_some()
    }

    /// Applies the patch on behalf of `actor`.
    ///
    /// Trust and timeout require a system administrator; the event flags
    /// require the repository owner or an administrator. Nothing is applied
    /// when any requested field is not permitted.
    pub fn apply(&self, repo: &mut Repo, actor: &User) -> Result<()> {
        if (self.is_trusted.is_some() || self.timeout.is_some()) && !actor.admin {
            return Err(Error::PermissionDenied(
                "only administrators may change trust or timeout".to_string(),
            ));
        }
        if self.touches_event_flags() && !actor.admin && actor.id != repo.user_id {
            return Err(Error::PermissionDenied(format!(
                "{} is not the owner of {}",
                actor.login, repo.full_name
            )));
        }
        if let Some(timeout) = self.timeout {
            if timeout <= 0 {
                return Err(Error::InvalidFormat(
                    "timeout must be a positive number of minutes".to_string(),
                ));
            }
            repo.timeout = timeout;
        }

        if let Some(v) = self.is_trusted {
            repo.is_trusted = v;
        }
        if let Some(v) = self.allow_pull {
            repo.allow_pull = v;
        }
        if let Some(v) = self.allow_push {
            repo.allow_push = v;
        }
        if let Some(v) = self.allow_deploy {
            repo.allow_deploy = v;
        }
        if let Some(v) = self.allow_tag {
            repo.allow_tag = v;
        }
        Ok(())
    }
}

/// Partial user update. Login and signing hash are not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
}

impl UserPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.avatar.is_none() && self.admin.is_none()
    }

    /// Applies the patch to `user` on behalf of `actor`. Only administrators
    /// may change users, and never their own account.
    pub fn apply(&self, user: &mut User, actor: &User) -> Result<()> {
        if !actor.admin {
            return Err(Error::PermissionDenied(
                "only administrators may change users".to_string(),
            ));
        }
        if actor.id == user.id {
            return Err(Error::PermissionDenied(format!(
                "{} cannot modify their own account",
                actor.login
            )));
        }

        if let Some(v) = &self.email {
            user.email.clone_from(v);
        }
        if let Some(v) = &self.avatar {
            user.avatar.clone_from(v);
        }
        if let Some(v) = self.admin {
            user.admin = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> User {
        User {
            id: 1,
            login: "octocat".to_string(),
            ..User::default()
        }
    }

    fn repo() -> Repo {
        Repo {
            user_id: 1,
            timeout: 60,
            allow_push: true,
            allow_pull: true,
            ..Repo::new("octocat", "hello-world")
        }
    }

    #[test]
    fn test_owner_may_set_event_flags() {
        let mut repo = repo();
        let patch = RepoPatch {
            allow_deploy: Some(true),
            allow_pull: Some(false),
            ..RepoPatch::default()
        };
        patch.apply(&mut repo, &owner()).unwrap();
        assert!(repo.allow_deploy);
        assert!(!repo.allow_pull);
    }

    #[test]
    fn test_trust_requires_admin() {
        let mut repo = repo();
        let patch = RepoPatch {
            is_trusted: Some(true),
            allow_tag: Some(true),
            ..RepoPatch::default()
        };
        let result = patch.apply(&mut repo, &owner());
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert!(!repo.is_trusted);
        assert!(!repo.allow_tag);
    }

    #[test]
    fn test_admin_may_set_timeout() {
        let mut repo = repo();
        let admin = User {
            id: 9,
            admin: true,
            ..User::default()
        };
        let patch = RepoPatch {
            timeout: Some(90),
            ..RepoPatch::default()
        };
        patch.apply(&mut repo, &admin).unwrap();
        assert_eq!(repo.timeout, 90);
    }

    #[test]
    fn test_stranger_cannot_set_flags() {
        let mut repo = repo();
        let stranger = User {
            id: 2,
            login: "mallory".to_string(),
            ..User::default()
        };
        let patch = RepoPatch {
            allow_push: Some(false),
            ..RepoPatch::default()
        };
        assert!(patch.apply(&mut repo, &stranger).is_err());
        assert!(repo.allow_push);
    }

    #[test]
    fn test_user_patch_by_admin() {
        let admin = User {
            id: 9,
            admin: true,
            ..User::default()
        };
        let mut user = owner();
        let patch = UserPatch {
            admin: Some(true),
            email: Some("octocat@example.com".to_string()),
            ..UserPatch::default()
        };
        patch.apply(&mut user, &admin).unwrap();
        assert!(user.admin);
        assert_eq!(user.email, "octocat@example.com");
        assert_eq!(user.login, "octocat");
    }

    #[test]
    fn test_user_patch_rejects_self_and_non_admin() {
        let patch = UserPatch {
            admin: Some(false),
            ..UserPatch::default()
        };

        let admin = User {
            admin: true,
            ..owner()
        };
        let mut same = admin.clone();
        let result = patch.apply(&mut same, &admin);
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert!(same.admin);

        let mut target = User {
            id: 2,
            admin: true,
            ..User::default()
        };
        let result = patch.apply(&mut target, &owner());
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert!(target.admin);
    }

    #[test]
    fn test_deserialize_wire_names() {
        let patch: RepoPatch =
            serde_json::from_str(r#"{"trusted": true, "allow_pr": false}"#).unwrap();
        assert_eq!(patch.is_trusted, Some(true));
        assert_eq!(patch.allow_pull, Some(false));
        assert!(patch.timeout.is_none());
        assert!(!patch.is_empty());
    }
}
