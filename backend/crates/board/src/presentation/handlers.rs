//! HTTP Handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use platform::client::extract_client_ip;
use platform::cookie::{CookieConfig, extract_cookie};

use crate::application::config::BoardConfig;
use crate::application::oidc::{
    CallbackRequest, IdentityProvider, NONCE_COOKIE, OidcService, STATE_COOKIE,
};
use crate::application::user::UserService;
use crate::domain::entity::user_session::UserSession;
use crate::domain::repository::{UserRepository, UserSessionRepository};
use crate::error::BoardResult;

/// Shared state for board handlers
pub struct BoardAppState<U, S, P>
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
    P: IdentityProvider + Send + Sync + 'static,
{
    pub users: UserService<U, S>,
    pub oidc: OidcService<P>,
    pub config: Arc<BoardConfig>,
}

impl<U, S, P> Clone for BoardAppState<U, S, P>
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
    P: IdentityProvider + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            oidc: self.oidc.clone(),
            config: self.config.clone(),
        }
    }
}

/// Query parameters of the provider redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
}

// ============================================================================
// Login
// ============================================================================

/// GET /login
pub async fn login<U, S, P>(State(state): State<BoardAppState<U, S, P>>) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
    P: IdentityProvider + Send + Sync + 'static,
{
    let challenge = state.oidc.begin_login();
    let config = &state.config;

    let state_cookie = anti_forgery_cookie(config, STATE_COOKIE).build_set_cookie(&challenge.state);
    let nonce_cookie = anti_forgery_cookie(config, NONCE_COOKIE).build_set_cookie(&challenge.nonce);

    (
        AppendHeaders([
            (header::SET_COOKIE, state_cookie),
            (header::SET_COOKIE, nonce_cookie),
        ]),
        Redirect::to(&challenge.redirect_url),
    )
}

// ============================================================================
// Callback
// ============================================================================

/// GET /login/{name}/callback
pub async fn callback<U, S, P>(
    State(state): State<BoardAppState<U, S, P>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<CallbackParams>,
) -> BoardResult<impl IntoResponse>
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
    P: IdentityProvider + Send + Sync + 'static,
{
    let request = CallbackRequest {
        state: params.state,
        code: params.code,
        state_cookie: extract_cookie(&headers, STATE_COOKIE),
        nonce_cookie: extract_cookie(&headers, NONCE_COOKIE),
    };

    let claims = state.oidc.validate_callback(&request).await?;
    let user = state.users.get_user_from_id_token(&claims).await?;

    let client_ip = extract_client_ip(&headers, Some(addr.ip()), state.config.trust_proxy)
        .map(|ip| ip.to_string())
        .unwrap_or_default();
    let session = state.users.create_user_session(&user, &client_ip).await?;

    tracing::info!(user_id = %user.id, provider = %state.oidc.name(), "User signed in");

    let config = &state.config;
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, build_session_cookie(config, &session, Utc::now())),
            (
                header::SET_COOKIE,
                anti_forgery_cookie(config, STATE_COOKIE).build_delete_cookie(),
            ),
            (
                header::SET_COOKIE,
                anti_forgery_cookie(config, NONCE_COOKIE).build_delete_cookie(),
            ),
        ]),
        Redirect::to("/"),
    ))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /logout
///
/// Sessions are not revoked server-side; they expire on their own.
pub async fn logout<U, S, P>(State(state): State<BoardAppState<U, S, P>>) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
    P: IdentityProvider + Send + Sync + 'static,
{
    let cookie = session_cookie(&state.config, 0).build_delete_cookie();
    ([(header::SET_COOKIE, cookie)], Redirect::to("/"))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn anti_forgery_cookie(config: &BoardConfig, name: &str) -> CookieConfig {
    CookieConfig {
        same_site: config.cookie_same_site,
        ..CookieConfig::http_only(name, config.cookie_secure, config.anti_forgery_ttl_secs())
    }
}

fn session_cookie(config: &BoardConfig, max_age_secs: i64) -> CookieConfig {
    CookieConfig {
        same_site: config.cookie_same_site,
        ..CookieConfig::http_only(&config.session_cookie_name, config.cookie_secure, max_age_secs)
    }
}

/// Session cookie expiring one skew interval before the session itself
fn build_session_cookie(config: &BoardConfig, session: &UserSession, now: DateTime<Utc>) -> String {
    let max_age = session
        .expires
        .map(|expires| (expires - config.cookie_clock_skew_delta() - now).num_seconds())
        .unwrap_or(0);

    session_cookie(config, max_age).build_set_cookie(session.id.as_str())
}
