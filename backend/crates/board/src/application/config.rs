//! Application Configuration
//!
//! Configuration for the Board application layer.

use std::time::Duration;

use chrono::TimeDelta;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Board application configuration
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Server-side session lifetime (14 days)
    pub session_ttl: Duration,
    /// How much earlier the session cookie expires than the server-side session
    pub cookie_clock_skew: Duration,
    /// Lifetime of the state and nonce cookies (1 hour)
    pub anti_forgery_ttl: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Whether `X-Forwarded-For` is trusted for the client IP
    pub trust_proxy: bool,
    /// Quiz submissions allowed before the user is locked out
    pub max_quiz_attempts: u16,
    /// How long a submitter may edit their own quote
    pub quote_edit_window: Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "session".to_string(),
            session_ttl: Duration::from_secs(14 * 24 * 3600), // 14 days
            cookie_clock_skew: Duration::from_secs(3600),     // 1 hour
            anti_forgery_ttl: Duration::from_secs(3600),      // 1 hour
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            trust_proxy: false,
            max_quiz_attempts: 5,
            quote_edit_window: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl BoardConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Default::default()
        }
    }

    /// Session lifetime as a chrono delta
    pub fn session_ttl_delta(&self) -> TimeDelta {
        to_delta(self.session_ttl)
    }

    /// Cookie skew allowance as a chrono delta
    pub fn cookie_clock_skew_delta(&self) -> TimeDelta {
        to_delta(self.cookie_clock_skew)
    }

    /// Quote edit window as a chrono delta
    pub fn quote_edit_window_delta(&self) -> TimeDelta {
        to_delta(self.quote_edit_window)
    }

    /// Anti-forgery cookie Max-Age in seconds
    pub fn anti_forgery_ttl_secs(&self) -> i64 {
        i64::try_from(self.anti_forgery_ttl.as_secs()).unwrap_or(i64::MAX)
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

/// Identity provider configuration
///
/// One value configures exactly one provider. `name` must be stable: it is
/// part of the callback URL registered with the provider.
#[derive(Debug, Clone, Default)]
pub struct OidcConfig {
    /// Unique provider name, used to build the callback path
    pub name: String,
    /// Issuer URL used for metadata discovery
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Public base URL of this server, e.g. `https://board.example.com`
    pub base_url: String,
}

impl OidcConfig {
    /// Scopes requested from the provider
    pub const SCOPES: &'static [&'static str] = &["openid", "profile", "email"];

    /// Path of the callback handler for this provider
    pub fn callback_path(&self) -> String {
        format!("/login/{}/callback", self.name)
    }

    /// Absolute redirect URL registered with the provider
    pub fn redirect_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.callback_path())
    }

    /// Names of required fields that are blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("issuer_url", &self.issuer_url),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("base_url", &self.base_url),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}
