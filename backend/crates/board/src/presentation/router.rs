//! Board Router

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::config::BoardConfig;
use crate::application::oidc::{IdentityProvider, OidcService};
use crate::application::user::UserService;
use crate::domain::repository::{UserRepository, UserSessionRepository};
use crate::presentation::handlers::{self, BoardAppState};

/// Create the login router for any repository and provider implementation
pub fn board_router<U, S, P>(
    users: UserService<U, S>,
    oidc: OidcService<P>,
    config: Arc<BoardConfig>,
) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
    P: IdentityProvider + Send + Sync + 'static,
{
    let callback_path = oidc.callback_path().to_string();
    let state = BoardAppState {
        users,
        oidc,
        config,
    };

    Router::new()
        .route("/login", get(handlers::login::<U, S, P>))
        .route(&callback_path, get(handlers::callback::<U, S, P>))
        .route("/logout", post(handlers::logout::<U, S, P>))
        .with_state(state)
}
