//! HMAC-signed URLs for the local blob store.
//!
//! A signature covers the method, the object key, the expiry (unix
//! seconds) and, for writes, the content type the uploader must send.
//! Signatures are HMAC-SHA256, base64url encoded without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

use sophub_core::traits::HttpMethod;
use sophub_core::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Characters escaped inside one path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Signs and verifies local blob URLs with a shared secret.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

impl UrlSigner {
    /// Create a signer. The secret must not be empty.
    pub fn new(secret: impl AsRef<[u8]>) -> AppResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AppError::configuration("URL signing secret must not be empty"));
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    fn mac(
        &self,
        method: HttpMethod,
        key: &str,
        expires: i64,
        content_type: &str,
    ) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::internal(format!("Invalid signing key: {e}")))?;
        let method = match method {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
        };
        mac.update(format!("{method}\n{key}\n{expires}\n{content_type}").as_bytes());
        Ok(mac)
    }

    /// Signature for `method` on `key` until `expires`.
    pub fn sign(
        &self,
        method: HttpMethod,
        key: &str,
        expires: i64,
        content_type: &str,
    ) -> AppResult<String> {
        let mac = self.mac(method, key, expires, content_type)?;
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Check a presented signature. Expired or mismatching signatures are
    /// `Forbidden`.
    pub fn verify(
        &self,
        method: HttpMethod,
        key: &str,
        expires: i64,
        content_type: &str,
        signature: &str,
        now: i64,
    ) -> AppResult<()> {
        if expires < now {
            return Err(AppError::forbidden("Signed URL has expired"));
        }
        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AppError::forbidden("Malformed URL signature"))?;
        self.mac(method, key, expires, content_type)?
            .verify_slice(&presented)
            .map_err(|_| AppError::forbidden("URL signature does not match"))
    }
}

/// Percent-encode each segment of a key for use in a URL path.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
