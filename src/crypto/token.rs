use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

/// What a token may be used for. A token minted for one kind never
/// verifies as another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "hook")]
    Hook,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "sess")]
    Session,
    #[serde(rename = "csrf")]
    Csrf,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TokenKind::Hook => "hook",
            TokenKind::User => "user",
            TokenKind::Session => "sess",
            TokenKind::Csrf => "csrf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    #[serde(rename = "text")]
    pub subject: String,
}

impl Token {
    pub fn new(kind: TokenKind, subject: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
        }
    }

    /// Signs the token: `base64url(claims) "." base64url(hmac-sha256)`.
    pub fn sign(&self, secret: &str) -> Result<String> {
        if secret.is_empty() {
            return Err(Error::Crypto(
                "refusing to sign with an empty secret".to_string(),
            ));
        }

        let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?);
        let signature = mac_for(self.kind, &claims, secret)?
            .finalize()
            .into_bytes();

        Ok(format!(
            "{claims}{SEPARATOR}{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Parses and verifies a raw token of the `expected` kind.
    ///
    /// `secret_for` resolves the signing secret from the (not yet trusted)
    /// claims, typically by looking up the repository or user named in the
    /// subject. Its errors are returned unchanged.
    pub fn parse<F>(raw: &str, expected: TokenKind, secret_for: F) -> Result<Token>
    where
        F: FnOnce(&Token) -> Result<String>,
    {
        let (claims, signature) = raw
            .trim()
            .split_once(SEPARATOR)
            .ok_or(Error::InvalidSignature)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::InvalidSignature)?;
        let decoded = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| Error::InvalidSignature)?;
        let token: Token =
            serde_json::from_slice(&decoded).map_err(|_| Error::InvalidSignature)?;

        if token.kind != expected {
            return Err(Error::InvalidSignature);
        }

        let secret = secret_for(&token)?;
        if secret.is_empty() {
            return Err(Error::InvalidSignature);
        }

        // The MAC input is bound to the kind the caller expects, not the
        // kind the claims announce.
        mac_for(expected, claims, &secret)?
            .verify_slice(&signature)
            .map_err(|_| Error::InvalidSignature)?;

        Ok(token)
    }
}

fn mac_for(kind: TokenKind, claims: &str, secret: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Crypto(format!("invalid signing key: {e}")))?;
    mac.update(kind.as_str().as_bytes());
    mac.update(&[b'.']);
    mac.update(claims.as_bytes());
    Ok(mac)
}

pub fn sign_token(kind: TokenKind, subject: &str, secret: &str) -> Result<String> {
    Token::new(kind, subject).sign(secret)
}

/// Verifies `raw` against a known secret and returns its claims.
pub fn verify_token(raw: &str, expected: TokenKind, secret: &str) -> Result<Token> {
    Token::parse(raw, expected, |_| Ok(secret.to_string()))
}

/// Like [`verify_token`], additionally requiring the token to name `subject`.
pub fn verify_token_for(
    raw: &str,
    expected: TokenKind,
    subject: &str,
    secret: &str,
) -> Result<Token> {
    let token = verify_token(raw, expected, secret)?;
    if token.subject != subject {
        return Err(Error::InvalidSignature);
    }
    Ok(token)
}
