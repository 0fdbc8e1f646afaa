use crate::error::{Error, Result};

const MAX_OWNER_LEN: usize = 64;
const MAX_REPO_NAME_LEN: usize = 100;

fn is_valid_name_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_name(name: &str, entity: &str, max_len: usize, allow_period: bool) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidFormat(format!("{entity} name cannot be empty")));
    }
    if name.len() > max_len {
        return Err(Error::InvalidFormat(format!(
            "{entity} name cannot exceed {max_len} characters"
        )));
    }
    if !name.chars().all(|c| is_valid_name_char(c, allow_period)) {
        return Err(Error::InvalidFormat(format!(
            "{entity} name contains invalid characters"
        )));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Err(Error::InvalidFormat(format!(
            "{entity} name cannot start with a period or hyphen"
        )));
    }
    Ok(())
}

pub fn validate_owner(owner: &str) -> Result<()> {
    validate_name(owner, "Owner", MAX_OWNER_LEN, true)
}

pub fn validate_repo_name(name: &str) -> Result<()> {
    validate_name(name, "Repository", MAX_REPO_NAME_LEN, true)
}

/// Splits an `owner/name` full name, validating both halves.
pub fn split_full_name(full_name: &str) -> Result<(&str, &str)> {
    let (owner, name) = full_name.split_once('/').ok_or_else(|| {
        Error::InvalidFormat(format!("'{full_name}' is not of the form owner/name"))
    })?;
    validate_owner(owner)?;
    validate_repo_name(name)?;
    Ok((owner, name))
}
