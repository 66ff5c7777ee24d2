pub mod auth;
pub mod cli;
pub mod config;
pub mod countries;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod services;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::database::DatabaseManager;
use crate::services::{OwnershipService, SessionService};

/// Shared per-process state: the pool and the services built on it
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseManager,
    pub ownership: OwnershipService,
    pub sessions: SessionService,
}

impl AppState {
    pub fn new(db: DatabaseManager) -> Self {
        Self {
            ownership: OwnershipService::new(db.clone()),
            sessions: SessionService::new(db.clone()),
            db,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let config = config::config();

    let protected = Router::new()
        .merge(addressbook_routes())
        .merge(auth_routes())
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    let mut router = Router::new()
        // Public
        .route("/", get(handlers::public::meta::root))
        .route("/health", get(handlers::public::meta::health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected)
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes))
        .with_state(state);

    // Global middleware
    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api-token-auth", post(auth::token_post))
        .route("/api-auth/login", post(auth::login_post))
        .route("/auth/register", post(auth::register_post))
}

fn auth_routes() -> Router<AppState> {
    use handlers::protected::auth;

    Router::new()
        .route("/api-auth/logout", post(auth::session_logout))
        .route("/api/v1/auth/whoami", get(auth::session_whoami))
        .route("/api/v1/auth/account", delete(auth::account_delete))
}

fn addressbook_routes() -> Router<AppState> {
    use handlers::protected::addressbook;

    Router::new()
        .route(
            "/api/v1/addressbook",
            get(addressbook::address_list).post(addressbook::address_create),
        )
        // Static segment wins over :id
        .route("/api/v1/addressbook/batch", delete(addressbook::batch_delete))
        .route(
            "/api/v1/addressbook/:id",
            get(addressbook::address_get)
                .patch(addressbook::address_patch)
                .delete(addressbook::address_delete),
        )
}
