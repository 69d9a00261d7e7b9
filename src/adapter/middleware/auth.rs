//! axum 用の認証ミドルウェア。

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::adapter::handler::message_handler::respond;
use crate::adapter::handler::AppState;
use crate::domain::entity::claims::Claims;
use crate::domain::error::AuthError;
use crate::domain::service::scope::has_scope;

/// ミドルウェアファクトリの戻り値型。
type AuthMiddlewareFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthErrorResponse>> + Send>,
>;

/// auth_middleware は JWT 認証ミドルウェア。
/// Authorization ヘッダーから Bearer トークンを取得し、JWKS 検証を行う。
/// 検証成功時は Claims をリクエストエクステンションに格納する。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthErrorResponse> {
    let path = req.uri().path().to_string();

    let token = extract_bearer_token(&req).map_err(|e| {
        warn!(path = %path, error = %e, "rejected request without usable bearer token");
        AuthErrorResponse::from(e)
    })?;

    let claims = state.validator.validate(&token).await.map_err(|e| {
        warn!(path = %path, error = %e, "token validation failed");
        AuthErrorResponse::from(e)
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// require_scope は指定スコープを必須とするミドルウェアファクトリ。
/// auth_middleware の後に使用すること。
pub fn require_scope(
    scope: &'static str,
) -> impl Fn(Request, Next) -> AuthMiddlewareFuture + Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let claims = req
                .extensions()
                .get::<Claims>()
                .ok_or_else(|| AuthErrorResponse::from(AuthError::MissingToken))?;

            if !has_scope(claims, scope) {
                warn!(
                    path = %req.uri().path(),
                    required_scope = scope,
                    sub = ?claims.sub,
                    "insufficient scope"
                );
                return Err(AuthErrorResponse::from(AuthError::InsufficientScope));
            }

            Ok(next.run(req).await)
        })
    }
}

/// Bearer トークンを Authorization ヘッダーから取得する。
/// スキームは大文字小文字を区別せず、区切りは単一スペースとする。
pub fn extract_bearer_token(req: &Request) -> Result<String, AuthError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token.to_string())
}

/// AuthErrorResponse は認証エラーの HTTP レスポンス。
#[derive(Debug)]
pub struct AuthErrorResponse {
    pub status: StatusCode,
    pub message: String,
}

impl From<AuthError> for AuthErrorResponse {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => {
                Self::unauthorized("Required authorization token not found")
            }
            AuthError::InvalidAuthHeader => {
                Self::unauthorized("Authorization header format must be Bearer {token}")
            }
            AuthError::InsufficientScope => Self {
                status: StatusCode::FORBIDDEN,
                message: "Insufficient scope.".into(),
            },
            AuthError::MalformedToken(_)
            | AuthError::InvalidAudience
            | AuthError::InvalidIssuer
            | AuthError::KeyNotFound(_)
            | AuthError::JwksFetchFailed(_)
            | AuthError::SignatureInvalid
            | AuthError::TokenExpired => Self::unauthorized("Invalid token."),
        }
    }
}

impl AuthErrorResponse {
    fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }
}

impl IntoResponse for AuthErrorResponse {
    fn into_response(self) -> Response {
        respond(self.message, self.status)
    }
}
