use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const PUBLIC_MESSAGE: &str =
    "Hello from a public endpoint! You don't need to be authenticated to see this.";
pub const PRIVATE_MESSAGE: &str =
    "Hello from a private endpoint! You need to be authenticated to see this.";

/// MessageResponse は全 API エンドポイント共通のレスポンスボディ。
/// ステータスコードをボディにも複製する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            message: message.into(),
            status_code: status.as_u16(),
        }
    }
}

/// JSON ボディと同じステータスコードでレスポンスを組み立てる。
pub fn respond(message: impl Into<String>, status: StatusCode) -> Response {
    (status, Json(MessageResponse::new(message, status))).into_response()
}

pub async fn public() -> Response {
    info!(path = "/api/public", status = 200, "GET /api/public 200[OK]");
    respond(PUBLIC_MESSAGE, StatusCode::OK)
}

pub async fn private() -> Response {
    info!(path = "/api/private", status = 200, "GET /api/private 200[OK]");
    respond(PRIVATE_MESSAGE, StatusCode::OK)
}

/// スコープ判定は require_scope ミドルウェアで済んでいる。
pub async fn private_scoped() -> Response {
    info!(
        path = "/api/private-scoped",
        status = 200,
        "GET /api/private-scoped 200[OK]"
    );
    respond(PRIVATE_MESSAGE, StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_serialization() {
        let body = MessageResponse::new("Insufficient scope.", StatusCode::FORBIDDEN);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Insufficient scope.");
        assert_eq!(json["statusCode"], 403);
    }

    #[tokio::test]
    async fn test_public_handler() {
        let resp = public().await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: MessageResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, MessageResponse::new(PUBLIC_MESSAGE, StatusCode::OK));
    }
}
