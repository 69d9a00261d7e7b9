//! bearer-gate: JWKS 公開鍵による Bearer トークン検証 + スコープ認可サーバー
//!
//! IdP が公開する JWKS から公開鍵を取得し、JWT の署名・issuer・audience を検証する。
//! 公開・認証必須・スコープ必須の 3 つのエンドポイントを提供する。
//!
//! # 使い方
//!
//! ```ignore
//! use bearer_gate::infrastructure::config::AuthConfig;
//! use bearer_gate::usecase::TokenValidator;
//!
//! let validator = TokenValidator::from_config(&auth_cfg)?;
//! let claims = validator.validate("eyJ...").await?;
//! ```

pub mod adapter;
pub mod domain;
pub mod infrastructure;
pub mod usecase;

pub use domain::entity::claims::Claims;
pub use domain::error::AuthError;
pub use domain::service::scope::has_scope;
pub use infrastructure::jwks::JwksKeyResolver;
pub use usecase::TokenValidator;
