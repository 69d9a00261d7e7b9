use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Header, Validation};
use tracing::debug;

use crate::domain::entity::claims::Claims;
use crate::domain::error::AuthError;
use crate::domain::service::scope::has_scope;
use crate::infrastructure::config::AuthConfig;
use crate::infrastructure::jwks::JwksKeyResolver;

/// 署名アルゴリズムは RS256 に固定する。
const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// TokenValidator は Bearer トークンを検証し、Claims を返す。
pub struct TokenValidator {
    resolver: Arc<JwksKeyResolver>,
    issuer: String,
    audience: String,
}

impl TokenValidator {
    pub fn new(resolver: Arc<JwksKeyResolver>, issuer: String, audience: String) -> Self {
        Self {
            resolver,
            issuer,
            audience,
        }
    }

    /// 設定から HTTP フェッチャー付きの TokenValidator を生成する。
    pub fn from_config(cfg: &AuthConfig) -> anyhow::Result<Self> {
        let resolver = JwksKeyResolver::new(
            &cfg.jwks_url(),
            Duration::from_secs(cfg.jwks_cache_ttl_secs),
            Duration::from_secs(cfg.fetch_timeout_secs),
        )?
        .with_min_refetch_interval(Duration::from_secs(cfg.jwks_min_refetch_interval_secs));
        Ok(Self::new(
            Arc::new(resolver),
            cfg.issuer.clone(),
            cfg.audience(),
        ))
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// トークンを検証し、Claims を返却する。
    ///
    /// audience と issuer は署名検証より先に確認するため、
    /// これらが不一致のトークンでは JWKS を取得しない。
    /// どちらも文字列の完全一致のみを認め、配列や他の型は不一致とする。
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let header = parse_header(token)?;
        let unverified = decode_unverified_payload(token)?;

        // audience の検証
        if claim_str(&unverified, "aud") != Some(self.audience.as_str()) {
            return Err(AuthError::InvalidAudience);
        }

        // issuer の検証
        if claim_str(&unverified, "iss") != Some(self.issuer.as_str()) {
            return Err(AuthError::InvalidIssuer);
        }

        self.verify_signature(token, &header).await
    }

    /// トークンの署名を検証し、指定スコープを持つかを判定する。
    ///
    /// issuer / audience は確認しない。検証に失敗した場合は false を返す。
    pub async fn check_scope(&self, required: &str, token: &str) -> bool {
        let claims = match parse_header(token) {
            Ok(header) => self.verify_signature(token, &header).await,
            Err(e) => Err(e),
        };

        match claims {
            Ok(claims) => has_scope(&claims, required),
            Err(e) => {
                debug!(error = %e, "scope check rejected token");
                false
            }
        }
    }

    /// kid から検証鍵を解決し、署名と有効期限を検証する。
    async fn verify_signature(&self, token: &str, header: &Header) -> Result<Claims, AuthError> {
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::MalformedToken("missing kid in header".into()))?;

        let key = self.resolver.resolve(kid).await?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_aud = false;
        validation.validate_nbf = true;

        let data = decode::<Claims>(token, &key, &validation).map_err(map_jwt_error)?;

        Ok(data.claims)
    }
}

fn parse_header(token: &str) -> Result<Header, AuthError> {
    let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    if header.alg != SIGNING_ALGORITHM {
        return Err(AuthError::MalformedToken(format!(
            "unexpected signing algorithm: {:?}",
            header.alg
        )));
    }

    Ok(header)
}

/// 署名を検証せずにペイロード部分を JSON としてデコードする。
fn decode_unverified_payload(token: &str) -> Result<serde_json::Value, AuthError> {
    let mut segments = token.split('.');
    let payload = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(AuthError::MalformedToken(
                "token must consist of three segments".into(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(e.to_string()))
}

fn claim_str<'a>(payload: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    payload.get(name).and_then(serde_json::Value::as_str)
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::MalformedToken(err.to_string()),
    }
}
