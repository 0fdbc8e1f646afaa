//! Encryption of repository secret payloads.

use crate::crypto;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::Repo;

const NBSP: char = '\u{a0}';
const NBSP_LATIN1: u8 = 0xA0;

/// Validates and encrypts a secrets document for `repo`.
///
/// The payload must be a YAML mapping. Non-breaking spaces pasted in from a
/// browser are turned into plain spaces first, and the normalized bytes are
/// what gets encrypted, keyed by the repository's private key.
pub fn encrypt_secret(store: &dyn Store, repo: &Repo, raw: &[u8]) -> Result<String> {
    let normalized = normalize(raw);
    validate(&normalized)?;

    let key = store.get_key(repo.id)?;
    let sealed = crypto::encrypt(&normalized, &key.private)?;

    tracing::info!(repo = %repo.full_name, bytes = normalized.len(), "encrypted secrets payload");
    Ok(sealed)
}

/// Replaces every non-breaking space with an ASCII space. Within valid
/// UTF-8 only the U+00A0 character is rewritten; a raw `0xA0` byte is
/// rewritten only where it is not part of a valid sequence.
fn normalize(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        out.extend_from_slice(chunk.valid().replace(NBSP, " ").as_bytes());
        out.extend(
            chunk
                .invalid()
                .iter()
                .map(|&b| if b == NBSP_LATIN1 { b' ' } else { b }),
        );
    }
    out
}

fn validate(payload: &[u8]) -> Result<()> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::InvalidFormat("secrets must be valid UTF-8".to_string()))?;
    if text.trim().is_empty() {
        return Err(Error::InvalidFormat("secrets document is empty".to_string()));
    }

    serde_yaml::from_str::<serde_yaml::Mapping>(text)
        .map_err(|e| Error::InvalidFormat(format!("secrets must be a YAML mapping: {e}")))?;
    Ok(())
}
