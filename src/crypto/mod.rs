//! Key generation, the secret envelope, and kind-scoped signed tokens.

mod envelope;
mod keys;
mod token;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

pub use envelope::{decrypt, encrypt};
pub use keys::{KeyPair, generate_key_pair};
pub use token::{Token, TokenKind, sign_token, verify_token, verify_token_for};

const SECRET_BYTES: usize = 32;

/// Generates a repository or user signing secret: 32 random bytes, hex encoded.
pub fn random_secret() -> Result<String> {
    let mut bytes = [0u8; SECRET_BYTES];
    fill_random(&mut bytes)?;
    Ok(hex::encode(bytes))
}

fn fill_random(dest: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(dest)
        .map_err(|e| Error::Crypto(format!("entropy source failed: {e}")))
}
