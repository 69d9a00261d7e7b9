//! JWKS 鍵解決: IdP の JWKS エンドポイントから鍵セットを取得し、kid に対応する検証鍵を返す。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;
use x509_parser::oid_registry::OID_PKCS1_RSAENCRYPTION;
use x509_parser::prelude::*;

use crate::domain::error::AuthError;

/// JWKS レスポンスの構造体。
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// 個々の JWK 鍵。未知のフィールドは無視する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    /// X.509 証明書チェーン（標準 base64 の DER）
    #[serde(default)]
    pub x5c: Vec<String>,
}

/// JwksFetcher は JWKS エンドポイントからの鍵取得を抽象化するトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch_keys(&self, jwks_url: &str) -> Result<Vec<Jwk>, AuthError>;
}

/// DefaultJwksFetcher は HTTP 経由で JWKS を取得するデフォルト実装。
pub struct DefaultJwksFetcher {
    client: reqwest::Client,
}

impl DefaultJwksFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JwksFetcher for DefaultJwksFetcher {
    async fn fetch_keys(&self, jwks_url: &str) -> Result<Vec<Jwk>, AuthError> {
        let resp: JwksResponse = self
            .client
            .get(jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        Ok(resp.keys)
    }
}

/// JWKS キャッシュ。
struct CachedJwks {
    keys: Vec<Jwk>,
    fetched_at: Instant,
}

/// JwksKeyResolver は kid から署名検証用の公開鍵を解決する。
/// 取得した鍵セットは cache_ttl の間だけ再利用する。
/// キャッシュ済みの鍵セットに kid が無い場合は、鍵ローテーションとみなして再取得する。
pub struct JwksKeyResolver {
    jwks_url: String,
    cache_ttl: Duration,
    min_refetch_interval: Duration,
    cache: RwLock<Option<CachedJwks>>,
    fetcher: Arc<dyn JwksFetcher>,
}

impl JwksKeyResolver {
    /// HTTP フェッチャーを使う JwksKeyResolver を生成する。
    pub fn new(
        jwks_url: &str,
        cache_ttl: Duration,
        fetch_timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self::with_fetcher(
            jwks_url,
            cache_ttl,
            Arc::new(DefaultJwksFetcher::new(fetch_timeout)?),
        ))
    }

    /// カスタムフェッチャーを使う JwksKeyResolver を生成する（テスト用）。
    pub fn with_fetcher(
        jwks_url: &str,
        cache_ttl: Duration,
        fetcher: Arc<dyn JwksFetcher>,
    ) -> Self {
        Self {
            jwks_url: jwks_url.to_string(),
            cache_ttl,
            min_refetch_interval: Duration::ZERO,
            cache: RwLock::new(None),
            fetcher,
        }
    }

    /// kid 不一致による再取得の最小間隔を設定する。
    #[must_use]
    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// kid に一致する鍵を探し、検証鍵を返す。
    /// 同じ kid を持つ鍵が複数ある場合は最後のものを採用する。
    pub async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let (keys, fetched) = self.get_keys().await?;
        if let Some(jwk) = find_key(&keys, kid) {
            return decoding_key(jwk);
        }

        // 今回取得したばかりの鍵セットに無ければ再取得しても無駄
        if fetched {
            return Err(AuthError::KeyNotFound(kid.to_string()));
        }

        let keys = self.refetch_on_miss(kid).await?;
        let jwk = find_key(&keys, kid).ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))?;
        decoding_key(jwk)
    }

    /// キャッシュから鍵を取得する。TTL を超えている場合は再取得する。
    /// 戻り値の bool はこの呼び出しで取得したかどうか。
    async fn get_keys(&self) -> Result<(Vec<Jwk>, bool), AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref c) = *cache {
                if c.fetched_at.elapsed() < self.cache_ttl {
                    debug!("JWKS cache hit");
                    return Ok((c.keys.clone(), false));
                }
            }
        }

        let mut cache = self.cache.write().await;

        // ダブルチェック
        if let Some(ref c) = *cache {
            if c.fetched_at.elapsed() < self.cache_ttl {
                return Ok((c.keys.clone(), false));
            }
        }

        let keys = self.fetch_into(&mut cache).await?;
        Ok((keys, true))
    }

    /// キャッシュ済みの鍵セットに kid が無い場合の再取得。
    /// 直近の取得から min_refetch_interval 未満ならキャッシュをそのまま返す。
    async fn refetch_on_miss(&self, kid: &str) -> Result<Vec<Jwk>, AuthError> {
        let mut cache = self.cache.write().await;

        if let Some(ref c) = *cache {
            if c.fetched_at.elapsed() < self.min_refetch_interval {
                debug!(kid = %kid, "unknown kid, refetch suppressed");
                return Ok(c.keys.clone());
            }
        }

        debug!(kid = %kid, "unknown kid in cached JWKS, refetching");
        self.fetch_into(&mut cache).await
    }

    async fn fetch_into(&self, cache: &mut Option<CachedJwks>) -> Result<Vec<Jwk>, AuthError> {
        debug!(jwks_url = %self.jwks_url, "fetching JWKS");
        let keys = self.fetcher.fetch_keys(&self.jwks_url).await?;

        *cache = Some(CachedJwks {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }

    /// キャッシュを無効化する。鍵ローテーション時に使用。
    pub async fn invalidate_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

fn find_key<'a>(keys: &'a [Jwk], kid: &str) -> Option<&'a Jwk> {
    keys.iter().rfind(|k| k.kid.as_deref() == Some(kid))
}

/// JWK から検証鍵を生成する。
/// x5c があれば先頭の証明書を、なければ n/e を使う。
pub fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    if let Some(cert) = jwk.x5c.first() {
        return decoding_key_from_certificate(cert);
    }

    match (jwk.n.as_deref(), jwk.e.as_deref()) {
        (Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e)
            .map_err(|e| invalid_key_material(&format!("invalid RSA components: {e}"))),
        _ => Err(invalid_key_material("JWK has neither x5c nor n/e")),
    }
}

/// base64 の DER 証明書を PEM で包み、RSA 公開鍵を取り出す。
fn decoding_key_from_certificate(cert: &str) -> Result<DecodingKey, AuthError> {
    let pem_text = format!("-----BEGIN CERTIFICATE-----\n{cert}\n-----END CERTIFICATE-----");
    let pem = ::pem::parse(pem_text.as_bytes())
        .map_err(|e| invalid_key_material(&format!("failed to parse PEM: {e}")))?;

    let (_, x509) = X509Certificate::from_der(pem.contents())
        .map_err(|e| invalid_key_material(&format!("failed to parse certificate: {e}")))?;

    let spki = x509.public_key();
    if spki.algorithm.algorithm != OID_PKCS1_RSAENCRYPTION {
        return Err(invalid_key_material("certificate does not carry an RSA key"));
    }

    Ok(DecodingKey::from_rsa_der(&spki.subject_public_key.data))
}

fn invalid_key_material(reason: &str) -> AuthError {
    AuthError::JwksFetchFailed(format!("invalid key material: {reason}"))
}
