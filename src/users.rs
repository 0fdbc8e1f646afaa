//! User administration and user API tokens.

use crate::crypto::{Token, TokenKind, sign_token};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{User, UserPatch};

/// Signs a user API token, keyed by the user's own hash.
pub fn user_token(user: &User) -> Result<String> {
    sign_token(TokenKind::User, &user.login, &user.hash)
}

/// Issues the token of `login` to `actor`. Users may read their own token,
/// administrators anyone's.
pub fn issue_user_token(store: &dyn Store, actor: &User, login: &str) -> Result<String> {
    if !actor.admin && actor.login != login {
        return Err(Error::PermissionDenied(format!(
            "{} may not read the token of {login}",
            actor.login
        )));
    }
    let user = store.get_user_login(login)?;
    user_token(&user)
}

/// Resolves the user a token was issued for.
///
/// An unknown login and a bad signature both fail with
/// [`Error::InvalidSignature`].
pub fn verify_user_token(store: &dyn Store, raw: &str) -> Result<User> {
    let mut found = None;
    Token::parse(raw, TokenKind::User, |claims| match store.get_user_login(&claims.subject) {
        Ok(user) => {
            let hash = user.hash.clone();
            found = Some(user);
            Ok(hash)
        }
        Err(Error::NotFound { .. }) => Err(Error::InvalidSignature),
        Err(e) => Err(e),
    })?;
    found.ok_or(Error::InvalidSignature)
}

pub fn update_user(
    store: &dyn Store,
    actor: &User,
    login: &str,
    patch: &UserPatch,
) -> Result<User> {
    let mut user = store.get_user_login(login)?;
    if patch.is_empty() {
        return Ok(user);
    }
    patch.apply(&mut user, actor)?;
    store.update_user(&user)?;

    tracing::info!(user = %user.login, actor = %actor.login, admin = user.admin, "updated user");
    Ok(user)
}

/// Deletes `login`. Requires an administrator other than the user itself;
/// a user who still owns repositories is a `Conflict`.
pub fn delete_user(store: &dyn Store, actor: &User, login: &str) -> Result<()> {
    if !actor.admin {
        return Err(Error::PermissionDenied(
            "only administrators may delete users".to_string(),
        ));
    }
    let user = store.get_user_login(login)?;
    if user.id == actor.id {
        return Err(Error::PermissionDenied(format!(
            "{} cannot delete their own account",
            actor.login
        )));
    }
    store.delete_user(user.id)?;

    tracing::info!(user = %user.login, actor = %actor.login, "deleted user");
    Ok(())
}
