use crate::cipher::TokenCipher;
use crate::error::{EkiwiError, Result};
use crate::session::AuthSession;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

/// Shortest secret prefix used as a cipher key
pub const MIN_KEY_LEN: usize = 10;

/// How far ahead of now the embedded expiry timestamp is set
pub const TOKEN_VALIDITY_SECS: i64 = 30;

const NONCE_LEN: usize = 16;
const NONCE_ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

/// Builds the per-request `x-token` header value.
///
/// The key is a random-length prefix of the session secret; its length is
/// spliced into the ciphertext at the session's secret position so the
/// server can recover it. Tokens are never cached.
#[derive(Clone)]
pub struct TokenSigner {
    cipher: Arc<dyn TokenCipher>,
}

impl TokenSigner {
    pub fn new(cipher: Arc<dyn TokenCipher>) -> Self {
        Self { cipher }
    }

    /// Sign `endpoint` with the current time and thread-local randomness
    pub fn sign(&self, session: &AuthSession, endpoint: &str) -> Result<String> {
        self.sign_with(session, endpoint, Utc::now(), &mut rand::thread_rng())
    }

    pub fn sign_with<R: Rng + ?Sized>(
        &self,
        session: &AuthSession,
        endpoint: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<String> {
        let secret = session.secret.as_str();
        if secret.len() < MIN_KEY_LEN + 2 {
            return Err(EkiwiError::auth(format!(
                "Auth secret too short to sign requests ({} chars)",
                secret.len()
            )));
        }

        let key_len = rng.gen_range(MIN_KEY_LEN..=secret.len() - 2);
        let key = secret
            .get(..key_len)
            .ok_or_else(|| EkiwiError::auth("Auth secret is not ASCII"))?;

        let nonce: String = (0..NONCE_LEN)
            .map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char)
            .collect();
        let payload = format!(
            "{}|{}|{}",
            endpoint,
            now.timestamp() + TOKEN_VALIDITY_SECS,
            nonce
        );

        let encrypted = self.cipher.encrypt(payload.as_bytes(), key.as_bytes())?;
        Ok(splice(&encrypted, session.secret_position, &key_len.to_string()))
    }
}

/// Insert `insert` into `text` at `position`, clamped to the text length
fn splice(text: &str, position: usize, insert: &str) -> String {
    let mut at = position.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    let mut out = String::with_capacity(text.len() + insert.len());
    out.push_str(&text[..at]);
    out.push_str(insert);
    out.push_str(&text[at..]);
    out
}
