//! 結合テスト共通ヘルパー: RSA フィクスチャ鍵によるトークン発行と wiremock の JWKS サーバー。
#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bearer_gate::domain::entity::claims::Audience;
use bearer_gate::infrastructure::config::AuthConfig;
use bearer_gate::{Claims, TokenValidator};

pub const IDP_KID: &str = "idp-key-1";
pub const ROGUE_KID: &str = "rogue-key-1";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

const IDP_KEY_PEM: &str = include_str!("../fixtures/idp_key.pem");
const IDP_CERT_PEM: &str = include_str!("../fixtures/idp_cert.pem");
const ROGUE_KEY_PEM: &str = include_str!("../fixtures/rogue_key.pem");
const ROGUE_CERT_PEM: &str = include_str!("../fixtures/rogue_cert.pem");

pub fn idp_encoding_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(IDP_KEY_PEM.as_bytes()).unwrap()
}

pub fn rogue_encoding_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(ROGUE_KEY_PEM.as_bytes()).unwrap()
}

/// PEM から x5c 形式（ヘッダー行なしの base64）を取り出す。
fn x5c_from_pem(pem: &str) -> String {
    pem.lines().filter(|l| !l.starts_with("-----")).collect()
}

/// IdP 鍵の JWK（x5c 付き）。
pub fn idp_jwk() -> serde_json::Value {
    serde_json::json!({
        "kty": "RSA",
        "kid": IDP_KID,
        "use": "sig",
        "x5c": [x5c_from_pem(IDP_CERT_PEM)]
    })
}

/// 後から公開される鍵の JWK（x5c 付き）。鍵ローテーションの再現に使う。
pub fn rotated_jwk() -> serde_json::Value {
    serde_json::json!({
        "kty": "RSA",
        "kid": ROGUE_KID,
        "use": "sig",
        "x5c": [x5c_from_pem(ROGUE_CERT_PEM)]
    })
}

/// IdP 鍵の JWK（x5c なし、n/e のみ）。
pub fn idp_jwk_components_only() -> serde_json::Value {
    let private_key = RsaPrivateKey::from_pkcs8_pem(IDP_KEY_PEM).unwrap();
    let public_key = private_key.to_public_key();

    serde_json::json!({
        "kty": "RSA",
        "kid": IDP_KID,
        "use": "sig",
        "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        "x5c": []
    })
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn issuer_for(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

pub fn audience_for(server: &MockServer) -> String {
    format!("{}/api/v2/", server.uri())
}

/// 指定 IdP 向けの正しい Claims を生成する。
pub fn valid_claims(server: &MockServer, scope: Option<&str>) -> Claims {
    let now = now();
    Claims {
        iss: Some(issuer_for(server)),
        sub: Some("auth0|user-1234".into()),
        aud: Audience::from(audience_for(server).as_str()),
        exp: Some(now + 900),
        iat: Some(now),
        nbf: None,
        jti: Some("token-5678".into()),
        azp: Some("spa-client".into()),
        scope: scope.map(String::from),
    }
}

pub fn sign(claims: &Claims, kid: &str, key: &EncodingKey) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.into());
    encode(&header, claims, key).unwrap()
}

pub fn sign_with_idp(claims: &Claims) -> String {
    sign(claims, IDP_KID, &idp_encoding_key())
}

/// JWKS エンドポイントをモックする。expected_fetches で取得回数を検証する。
pub async fn mount_jwks(server: &MockServer, keys: Vec<serde_json::Value>, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "keys": keys })),
        )
        .expect(expected_fetches)
        .mount(server)
        .await;
}

/// 最初の 1 回だけ before を返し、以降は after を返す JWKS エンドポイント。
pub async fn mount_rotating_jwks(
    server: &MockServer,
    before: Vec<serde_json::Value>,
    after: Vec<serde_json::Value>,
    expected_fetches_after: u64,
) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "keys": before })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(server)
        .await;

    mount_jwks(server, after, expected_fetches_after).await;
}

pub async fn mount_failing_jwks(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(server)
        .await;
}

pub fn auth_config_for(server: &MockServer, cache_ttl_secs: u64) -> AuthConfig {
    let mut cfg = AuthConfig::new(issuer_for(server));
    cfg.jwks_cache_ttl_secs = cache_ttl_secs;
    cfg.fetch_timeout_secs = 2;
    cfg
}

pub fn validator_with_refetch_interval(
    server: &MockServer,
    cache_ttl_secs: u64,
    min_refetch_interval_secs: u64,
) -> TokenValidator {
    let mut cfg = auth_config_for(server, cache_ttl_secs);
    cfg.jwks_min_refetch_interval_secs = min_refetch_interval_secs;
    TokenValidator::from_config(&cfg).unwrap()
}

pub fn validator_for(server: &MockServer, cache_ttl_secs: u64) -> TokenValidator {
    TokenValidator::from_config(&auth_config_for(server, cache_ttl_secs)).unwrap()
}
