use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{UcpError, UcpResult};

type HmacSha256 = Hmac<Sha256>;

/// How long a confirmation or reset link stays valid, in seconds.
pub const TOKEN_WINDOW_SECS: i64 = 15 * 60;

/// Stateless signer for confirmation and password-reset links.
#[derive(Clone)]
pub struct TokenAuthority {
    mac: HmacSha256,
}

impl TokenAuthority {
    pub fn new(secret: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
        })
    }

    /// Lowercase hex HMAC-SHA256 over `"{subject}:{issued_at}"`.
    pub fn issue(&self, subject: &str, issued_at: i64) -> String {
        let mut mac = self.mac.clone();
        mac.update(format!("{subject}:{issued_at}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Signature check only; the time window is not considered.
    pub fn validate(&self, subject: &str, presented: &str, issued_at: i64) -> bool {
        let expected = self.issue(subject, issued_at);
        expected.as_bytes().ct_eq(presented.as_bytes()).into()
    }

    pub fn verify(&self, subject: &str, presented: &str, issued_at: i64, now: i64) -> UcpResult<()> {
        if !self.validate(subject, presented, issued_at) {
            return Err(UcpError::InvalidToken);
        }
        if now - issued_at > TOKEN_WINDOW_SECS {
            return Err(UcpError::TokenExpired);
        }
        Ok(())
    }
}

/// Builds the absolute links mailed to players.
#[derive(Clone, Debug)]
pub struct ActionLinks {
    base: Url,
}

impl ActionLinks {
    pub fn new(public_url: &str) -> Result<Self, String> {
        let mut base =
            Url::parse(public_url).map_err(|e| format!("invalid public url {public_url}: {e}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    fn signed(&self, path: &str, email: &str, token: &str, issued_at: i64) -> Url {
        let mut url = self.base.join(path).unwrap_or_else(|_| self.base.clone());
        url.query_pairs_mut()
            .append_pair("email", email)
            .append_pair("token", token)
            .append_pair("timestamp", &issued_at.to_string());
        url
    }

    pub fn confirm_account(&self, email: &str, token: &str, issued_at: i64) -> Url {
        self.signed("internal-ucp-api/v1/confirm", email, token, issued_at)
    }

    pub fn confirm_reset(&self, email: &str, token: &str, issued_at: i64) -> Url {
        self.signed("internal-ucp-api/v1/confirm-reset", email, token, issued_at)
    }

    /// Frontend page holding the new-password form.
    pub fn password_form(&self, email: &str, token: &str, issued_at: i64) -> Url {
        self.signed("password-reset", email, token, issued_at)
    }

    pub fn home(&self) -> Url {
        self.base.clone()
    }
}
