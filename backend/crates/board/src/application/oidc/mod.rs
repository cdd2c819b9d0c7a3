//! OIDC Login
//!
//! Authorization code flow against a single identity provider. The service
//! owns the anti-forgery checks; the [`IdentityProvider`] owns everything
//! that talks to the provider.

pub mod provider;

pub use provider::DiscoveredProvider;

use std::sync::Arc;

use kernel::error::kind::ErrorKind;
use platform::crypto::{constant_time_eq, random_token};
use serde::Deserialize;
use thiserror::Error;

use crate::application::config::OidcConfig;

/// Cookie holding the anti-forgery `state` value
pub const STATE_COOKIE: &str = "state";

/// Cookie holding the replay-protection `nonce` value
pub const NONCE_COOKIE: &str = "nonce";

/// Random bytes per state or nonce value
const ANTI_FORGERY_BYTES: usize = 18;

/// OIDC login errors
///
/// State and nonce failures are the client's fault (a forged or replayed
/// callback). Exchange and verification failures are server-side: the
/// provider is unreachable or its answer cannot be trusted.
#[derive(Debug, Error)]
pub enum OidcError {
    #[error("invalid OIDC configuration: {0}")]
    Config(String),

    #[error("could not discover OIDC provider: {0}")]
    Discovery(String),

    #[error("State cookie not found.")]
    StateCookieMissing,

    #[error("State values do not match.")]
    StateMismatch,

    #[error("Failed to exchange token: {0}")]
    Exchange(String),

    #[error("No id_token field in oauth2 token.")]
    MissingIdToken,

    #[error("Failed to verify ID Token: {0}")]
    Verification(String),

    #[error("Nonce cookie not found.")]
    NonceCookieMissing,

    #[error("Nonce values do not match.")]
    NonceMismatch,
}

impl OidcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OidcError::StateCookieMissing
            | OidcError::StateMismatch
            | OidcError::MissingIdToken
            | OidcError::NonceCookieMissing
            | OidcError::NonceMismatch => ErrorKind::BadRequest,
            OidcError::Discovery(_) => ErrorKind::ServiceUnavailable,
            OidcError::Config(_) | OidcError::Exchange(_) | OidcError::Verification(_) => {
                ErrorKind::InternalServerError
            }
        }
    }
}

/// Identity claims of a verified ID token
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    pub exp: u64,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Provider seam: URL building, code exchange and token verification
#[trait_variant::make(IdentityProvider: Send)]
pub trait LocalIdentityProvider {
    /// Authorization URL embedding `state` and `nonce`
    fn authorization_url(&self, state: &str, nonce: &str) -> String;

    /// Exchange an authorization code for a token set
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OidcError>;

    /// Verify signature, issuer, audience and expiry of a raw ID token
    async fn verify_id_token(&self, raw_id_token: &str) -> Result<IdTokenClaims, OidcError>;
}

/// Everything the callback handler read from the provider redirect
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    /// `state` query parameter
    pub state: Option<String>,
    /// `code` query parameter
    pub code: Option<String>,
    /// Value of the state cookie
    pub state_cookie: Option<String>,
    /// Value of the nonce cookie
    pub nonce_cookie: Option<String>,
}

/// A started login: cookies to set and where to send the browser
#[derive(Debug, Clone)]
pub struct LoginChallenge {
    pub state: String,
    pub nonce: String,
    pub redirect_url: String,
}

/// OIDC login service for one provider
pub struct OidcService<P>
where
    P: IdentityProvider + Send + Sync + 'static,
{
    name: String,
    callback_path: String,
    provider: Arc<P>,
}

impl<P> Clone for OidcService<P>
where
    P: IdentityProvider + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            callback_path: self.callback_path.clone(),
            provider: self.provider.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Fail when any required field is blank
pub fn check_config(config: &OidcConfig) -> Result<(), OidcError> {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        return Err(OidcError::Config(format!(
            "required fields are blank: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

impl OidcService<DiscoveredProvider> {
    /// Discover the configured provider and build the service
    pub async fn discover(config: &OidcConfig) -> Result<Self, OidcError> {
        let provider = DiscoveredProvider::discover(config).await?;
        Self::new(config, provider)
    }
}

impl<P> OidcService<P>
where
    P: IdentityProvider + Send + Sync + 'static,
{
    pub fn new(config: &OidcConfig, provider: P) -> Result<Self, OidcError> {
        check_config(config)?;
        Ok(Self {
            name: config.name.clone(),
            callback_path: config.callback_path(),
            provider: Arc::new(provider),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn callback_path(&self) -> &str {
        &self.callback_path
    }

    /// Start a login with fresh, independent state and nonce values
    pub fn begin_login(&self) -> LoginChallenge {
        let state = random_token(ANTI_FORGERY_BYTES);
        let nonce = random_token(ANTI_FORGERY_BYTES);
        let redirect_url = self.provider.authorization_url(&state, &nonce);
        LoginChallenge {
            state,
            nonce,
            redirect_url,
        }
    }

    /// Validate a provider redirect and return the verified identity claims
    ///
    /// The state check runs before any request to the provider is made.
    /// Empty cookies count as missing and empty values never match.
    pub async fn validate_callback(
        &self,
        request: &CallbackRequest,
    ) -> Result<IdTokenClaims, OidcError> {
        let state_cookie = non_empty(request.state_cookie.as_deref())
            .ok_or(OidcError::StateCookieMissing)?;
        let state = non_empty(request.state.as_deref()).ok_or(OidcError::StateMismatch)?;
        if !constant_time_eq(state.as_bytes(), state_cookie.as_bytes()) {
            return Err(OidcError::StateMismatch);
        }

        let code = request.code.as_deref().unwrap_or_default();
        let token = self.provider.exchange_code(code).await?;
        let raw_id_token = token.id_token.ok_or(OidcError::MissingIdToken)?;

        let claims = self.provider.verify_id_token(&raw_id_token).await?;

        let nonce_cookie = non_empty(request.nonce_cookie.as_deref())
            .ok_or(OidcError::NonceCookieMissing)?;
        let nonce = non_empty(claims.nonce.as_deref()).ok_or(OidcError::NonceMismatch)?;
        if !constant_time_eq(nonce.as_bytes(), nonce_cookie.as_bytes()) {
            return Err(OidcError::NonceMismatch);
        }

        tracing::debug!(provider = %self.name, subject = %claims.sub, "Validated login callback");

        Ok(claims)
    }
}
