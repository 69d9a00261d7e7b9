/// AuthError は認証・認可エラーを表す。
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingToken,

    #[error("invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("invalid audience")]
    InvalidAudience,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("unable to find appropriate key: {0}")]
    KeyNotFound(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("insufficient scope")]
    InsufficientScope,
}
