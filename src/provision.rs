//! Repository provisioning and removal.
//!
//! Provisioning runs a single forward path: validate, prepare, activate
//! (optional) and persist. Nothing is written locally until the remote side
//! has accepted the activation, and nothing is rolled back remotely if the
//! local write fails afterwards.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::crypto::{self, Token, TokenKind};
use crate::error::{Error, Result};
use crate::remote::Remote;
use crate::store::Store;
use crate::types::validation::split_full_name;
use crate::types::{Key, Repo, RepoPatch, User};

/// Outcome of a successful provisioning run.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub repo: Repo,
    /// Token the remote provider presents on webhook delivery.
    pub hook_token: String,
    /// Callback link handed to the remote provider.
    pub link: String,
}

pub struct Provisioner {
    store: Arc<dyn Store>,
    remote: Arc<dyn Remote>,
    config: Config,
}

impl Provisioner {
    pub fn new(store: Arc<dyn Store>, remote: Arc<dyn Remote>, config: Config) -> Self {
        Self {
            store,
            remote,
            config,
        }
    }

    /// Registers `full_name` on behalf of `user`.
    ///
    /// With `activate` set, the webhook and deploy key are installed at the
    /// remote before anything is persisted. An activation failure aborts the
    /// run with no local state written.
    pub fn provision(&self, user: &User, full_name: &str, activate: bool) -> Result<Provisioned> {
        // Validate
        let (owner, name) = split_full_name(full_name)?;

        let perm = self.remote.permission(user, owner, name)?;
        if !perm.admin {
            return Err(Error::PermissionDenied(format!(
                "{} is not an administrator of {full_name}",
                user.login
            )));
        }

        match self.store.get_repo_name(full_name) {
            Ok(_) => {
                return Err(Error::Conflict(format!(
                    "repository '{full_name}' already exists"
                )));
            }
            Err(Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        // Prepare
        let mut repo = Repo {
            user_id: user.id,
            hash: crypto::random_secret()?,
            timeout: self.config.default_timeout,
            allow_push: true,
            allow_pull: true,
            ..Repo::new(owner, name)
        };
        let hook_token = crypto::sign_token(TokenKind::Hook, &repo.full_name, &repo.hash)?;
        let link = self.config.hook_url(&hook_token);

        let pair = crypto::generate_key_pair()?;
        let mut key = Key {
            repo_id: 0,
            public: pair.public,
            private: pair.private,
        };

        // Activate
        if activate {
            self.remote.activate(user, &repo, &key, &link)?;
        }

        // Persist
        if let Err(e) = self.store.create_repo(&mut repo, &mut key) {
            if activate {
                error!(
                    repo = %repo.full_name,
                    error = %e,
                    "repository activated at the remote but not persisted; webhook and deploy key need manual cleanup"
                );
            }
            return Err(e);
        }

        info!(repo = %repo.full_name, user = %user.login, activated = activate, "provisioned repository");

        Ok(Provisioned {
            repo,
            hook_token,
            link,
        })
    }

    /// Deletes the repository locally, then asks the remote to remove the
    /// webhook. A failed deactivation is logged and otherwise ignored.
    pub fn delete(&self, user: &User, full_name: &str) -> Result<()> {
        let repo = self.store.get_repo_name(full_name)?;
        if !user.admin && user.id != repo.user_id {
            return Err(Error::PermissionDenied(format!(
                "{} is not the owner of {full_name}",
                user.login
            )));
        }

        self.store.delete_repo(repo.id)?;
        info!(repo = %repo.full_name, user = %user.login, "deleted repository");

        if let Err(e) = self
            .remote
            .deactivate(user, &repo, &self.config.public_base_url)
        {
            warn!(repo = %repo.full_name, error = %e, "failed to deactivate repository at the remote");
        }
        Ok(())
    }

    /// Applies `patch` as `user` and persists the result.
    pub fn patch(&self, user: &User, full_name: &str, patch: &RepoPatch) -> Result<Repo> {
        let mut repo = self.store.get_repo_name(full_name)?;
        if patch.is_empty() {
            return Ok(repo);
        }
        patch.apply(&mut repo, user)?;
        self.store.update_repo(&repo)?;
        Ok(repo)
    }

    /// Re-derives the hook token of an existing repository. Administrators only.
    pub fn hook_token(&self, user: &User, full_name: &str) -> Result<String> {
        if !user.admin {
            return Err(Error::PermissionDenied(
                "only administrators may read hook tokens".to_string(),
            ));
        }
        let repo = self.store.get_repo_name(full_name)?;
        crypto::sign_token(TokenKind::Hook, &repo.full_name, &repo.hash)
    }

    /// Public half of the repository deploy key.
    pub fn public_key(&self, full_name: &str) -> Result<String> {
        let repo = self.store.get_repo_name(full_name)?;
        Ok(self.store.get_key(repo.id)?.public)
    }
}

/// Resolves the repository a hook token was issued for.
///
/// An unknown repository and a bad signature are indistinguishable to the
/// caller: both fail with [`Error::InvalidSignature`].
pub fn verify_hook_token(store: &dyn Store, raw: &str) -> Result<Repo> {
    let mut found = None;
    Token::parse(raw, TokenKind::Hook, |claims| match store.get_repo_name(&claims.subject) {
        Ok(repo) => {
            let hash = repo.hash.clone();
            found = Some(repo);
            Ok(hash)
        }
        Err(Error::NotFound { .. }) => Err(Error::InvalidSignature),
        Err(e) => Err(e),
    })?;
    found.ok_or(Error::InvalidSignature)
}
