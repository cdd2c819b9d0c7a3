//! Discovered Identity Provider
//!
//! OpenID Connect discovery, authorization code exchange and RS256 ID token
//! verification against the provider's JWKS.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::application::config::OidcConfig;
use crate::application::oidc::{
    IdTokenClaims, IdentityProvider, OidcError, TokenResponse, check_config,
};

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const CLOCK_SKEW_SECS: u64 = 60;

/// Subset of the provider metadata document this crate uses
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(default)]
    kid: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(rename = "use", default)]
    use_: Option<String>,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

/// Provider configured from its discovery document
pub struct DiscoveredProvider {
    http_client: reqwest::Client,
    metadata: ProviderMetadata,
    authorization_endpoint: Url,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    keys_by_kid: RwLock<HashMap<String, Arc<DecodingKey>>>,
    refresh_lock: Mutex<()>,
}

impl DiscoveredProvider {
    /// Fetch the discovery document of `config.issuer_url`
    ///
    /// Fails on blank configuration, network errors, and a document whose
    /// issuer differs from the configured one.
    pub async fn discover(config: &OidcConfig) -> Result<Self, OidcError> {
        check_config(config)?;

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| OidcError::Discovery(format!("failed building HTTP client: {e}")))?;

        let issuer = config.issuer_url.trim_end_matches('/');
        let discovery_url = format!("{issuer}{DISCOVERY_PATH}");

        let response = http_client
            .get(&discovery_url)
            .send()
            .await
            .map_err(|e| OidcError::Discovery(format!("discovery request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OidcError::Discovery(format!(
                "discovery request returned status {}",
                response.status()
            )));
        }

        let metadata: ProviderMetadata = response
            .json()
            .await
            .map_err(|e| OidcError::Discovery(format!("invalid discovery JSON: {e}")))?;

        if metadata.issuer.trim_end_matches('/') != issuer {
            return Err(OidcError::Discovery(format!(
                "issuer did not match: expected {issuer}, got {}",
                metadata.issuer
            )));
        }

        let provider = Self::from_metadata(config, metadata, http_client)?;

        tracing::info!(
            provider = %config.name,
            issuer = %provider.metadata.issuer,
            "Discovered OIDC provider"
        );

        Ok(provider)
    }

    /// Build from already known metadata (no network access)
    pub fn from_metadata(
        config: &OidcConfig,
        metadata: ProviderMetadata,
        http_client: reqwest::Client,
    ) -> Result<Self, OidcError> {
        let authorization_endpoint = Url::parse(&metadata.authorization_endpoint)
            .map_err(|e| OidcError::Discovery(format!("invalid authorization endpoint: {e}")))?;

        Ok(Self {
            http_client,
            metadata,
            authorization_endpoint,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url(),
            keys_by_kid: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, OidcError> {
        if let Some(key) = self.keys_by_kid.read().await.get(kid).cloned() {
            return Ok(key);
        }

        // Unknown kid: the provider may have rotated its keys
        self.refresh_jwks(kid).await?;

        self.keys_by_kid
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| OidcError::Verification(format!("JWT kid not found in JWKS: {kid}")))
    }

    async fn refresh_jwks(&self, kid: &str) -> Result<(), OidcError> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        if self.keys_by_kid.read().await.contains_key(kid) {
            return Ok(());
        }

        tracing::debug!(jwks_uri = %self.metadata.jwks_uri, "Refreshing JWKS cache");

        let response = self
            .http_client
            .get(&self.metadata.jwks_uri)
            .send()
            .await
            .map_err(|e| OidcError::Verification(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OidcError::Verification(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| OidcError::Verification(format!("invalid JWKS JSON: {e}")))?;

        let keys = usable_keys(jwks);
        if keys.is_empty() {
            return Err(OidcError::Verification(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.keys_by_kid.write().await = keys;
        Ok(())
    }

    #[cfg(test)]
    async fn install_jwks(&self, jwks: Jwks) {
        *self.keys_by_kid.write().await = usable_keys(jwks);
    }
}

/// RS256 signing keys of a JWKS, by kid
fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

impl IdentityProvider for DiscoveredProvider {
    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("scope", &OidcConfig::SCOPES.join(" "))
            .append_pair("state", state)
            .append_pair("nonce", nonce);
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OidcError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.metadata.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| OidcError::Exchange(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OidcError::Exchange(format!(
                "token endpoint returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OidcError::Exchange(format!("invalid token response: {e}")))
    }

    async fn verify_id_token(&self, raw_id_token: &str) -> Result<IdTokenClaims, OidcError> {
        let header = decode_header(raw_id_token)
            .map_err(|e| OidcError::Verification(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(OidcError::Verification(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| OidcError::Verification("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.metadata.issuer.as_str()]);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let token_data = decode::<IdTokenClaims>(raw_id_token, decoding_key.as_ref(), &validation)
            .map_err(|e| OidcError::Verification(format!("JWT validation failed: {e}")))?;

        Ok(token_data.claims)
    }
}
