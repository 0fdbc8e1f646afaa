use std::fmt;

use rand::rngs::OsRng;
use ssh_key::{Algorithm, LineEnding, PrivateKey};

use crate::error::{Error, Result};

/// An Ed25519 key pair in OpenSSH encoding.
///
/// The public half doubles as the repository deploy key; the private half
/// is the key material behind the secret envelope.
#[derive(Clone)]
pub struct KeyPair {
    pub public: String,
    pub private: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("private", &"<redacted>")
            .finish()
    }
}

pub fn generate_key_pair() -> Result<KeyPair> {
    let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
        .map_err(|e| Error::Crypto(format!("key generation failed: {e}")))?;

    let public = key
        .public_key()
        .to_openssh()
        .map_err(|e| Error::Crypto(format!("failed to encode public key: {e}")))?;
    let private = key
        .to_openssh(LineEnding::LF)
        .map_err(|e| Error::Crypto(format!("failed to encode private key: {e}")))?;

    Ok(KeyPair {
        public,
        private: private.to_string(),
    })
}
