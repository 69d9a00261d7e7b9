pub mod health;
pub mod message_handler;

use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::adapter::middleware::auth::{auth_middleware, require_scope};
use crate::usecase::TokenValidator;

/// スコープ制限付きエンドポイントが要求するスコープ。
pub const READ_MESSAGES_SCOPE: &str = "read:messages";

#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<TokenValidator>,
}

impl AppState {
    pub fn new(validator: Arc<TokenValidator>) -> Self {
        Self { validator }
    }
}

pub fn router(state: AppState) -> Router {
    // 認証必須ルート: auth_middleware が Claims を extension に格納し、
    // スコープ制限はその Claims に対して判定する。
    let protected = Router::new()
        .route("/api/private", get(message_handler::private))
        .route(
            "/api/private-scoped",
            get(message_handler::private_scoped)
                .route_layer(from_fn(require_scope(READ_MESSAGES_SCOPE))),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/public", get(message_handler::public))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
