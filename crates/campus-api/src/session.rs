//! Signed session cookies.
//!
//! The cookie value is `<uuid>.<hex HMAC-SHA256(uuid)>`. A cookie whose
//! signature does not verify is treated exactly like a missing cookie.

use std::fmt;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use campus_core::config::{SessionConfig, MIN_SESSION_SECRET_LEN};
use campus_core::error::CampusError;
use campus_core::types::SessionId;

type HmacSha256 = Hmac<Sha256>;

/// The session a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: SessionId,
    /// Freshly generated; the response must carry a `Set-Cookie`.
    pub issued: bool,
}

/// Result of clearing the previous session's remote history on reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Complete,
    RemoteCleanupFailed { reason: String },
}

/// Issues and verifies session identifiers.
#[derive(Clone)]
pub struct SessionTracker {
    mac: HmacSha256,
    cookie_name: String,
    secure: bool,
}

impl fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTracker")
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionTracker {
    pub fn new(secret: &str, cookie_name: &str, secure: bool) -> Result<Self, CampusError> {
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(CampusError::Config(format!(
                "session secret must be at least {} bytes",
                MIN_SESSION_SECRET_LEN
            )));
        }
        if cookie_name.is_empty()
            || !cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CampusError::Config(format!(
                "invalid session cookie name '{}'",
                cookie_name
            )));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| CampusError::Config(format!("invalid session secret: {}", e)))?;

        Ok(Self {
            mac,
            cookie_name: cookie_name.to_string(),
            secure,
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, CampusError> {
        let secret = config
            .secret
            .as_deref()
            .ok_or_else(|| CampusError::Config("session secret is not set".to_string()))?;
        Self::new(secret, &config.cookie_name, config.secure_cookie)
    }

    /// The session named by a valid cookie, if any.
    pub fn current(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == self.cookie_name)
            .find_map(|(_, value)| self.verify(value))
    }

    /// The caller's session, or a new one if the request carries none.
    pub fn ensure_session(&self, headers: &HeaderMap) -> SessionHandle {
        match self.current(headers) {
            Some(id) => SessionHandle { id, issued: false },
            None => SessionHandle {
                id: SessionId::generate(),
                issued: true,
            },
        }
    }

    /// A brand-new identifier to replace the caller's session.
    pub fn reset_session(&self) -> SessionId {
        SessionId::generate()
    }

    /// Cookie value for `id`.
    pub fn sign(&self, id: &SessionId) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.to_string().as_bytes());
        format!("{}.{}", id, hex::encode(mac.finalize().into_bytes()))
    }

    /// Parse and authenticate a cookie value.
    pub fn verify(&self, value: &str) -> Option<SessionId> {
        let (id, signature) = value.split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        id.parse().ok()
    }

    /// `Set-Cookie` header carrying `id`.
    pub fn cookie_header(&self, id: &SessionId) -> Result<HeaderValue, CampusError> {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name,
            self.sign(id)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| CampusError::Api(format!("invalid session cookie: {}", e)))
    }

    /// Attach the session cookie to `headers`.
    pub fn set_cookie(&self, headers: &mut HeaderMap, id: &SessionId) -> Result<(), CampusError> {
        headers.append(SET_COOKIE, self.cookie_header(id)?);
        Ok(())
    }
}
