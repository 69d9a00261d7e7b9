use serde::Deserialize;

/// Application configuration for bearer-gate.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path, e))?;
        let mut cfg: Config = serde_yaml::from_str(&content)?;
        cfg.auth.apply_issuer_override(std::env::var("AUTH_ISSUER").ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.issuer.trim().is_empty() {
            anyhow::bail!("auth.issuer must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3010
}

/// AuthConfig は JWT 検証の設定を表す。
/// audience と jwks_url は省略時に issuer から導出する。
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub issuer: String,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub jwks_url: Option<String>,
    /// 0 を指定するとキャッシュを無効化し、検証ごとに JWKS を取得する。
    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
    /// キャッシュ済みの鍵セットに kid が無い場合の再取得の最小間隔。0 は毎回再取得する。
    #[serde(default)]
    pub jwks_min_refetch_interval_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_jwks_cache_ttl_secs() -> u64 {
    600
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

impl AuthConfig {
    /// issuer だけを指定した設定を生成する。その他はデフォルト値。
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: None,
            jwks_url: None,
            jwks_cache_ttl_secs: default_jwks_cache_ttl_secs(),
            jwks_min_refetch_interval_secs: 0,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }

    /// 期待する audience を返す。未指定時は `<issuer>/api/v2/`。
    pub fn audience(&self) -> String {
        self.audience
            .clone()
            .unwrap_or_else(|| format!("{}/api/v2/", self.issuer.trim_end_matches('/')))
    }

    /// JWKS エンドポイントの URL を返す。未指定時は `<issuer>/.well-known/jwks.json`。
    pub fn jwks_url(&self) -> String {
        self.jwks_url.clone().unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                self.issuer.trim_end_matches('/')
            )
        })
    }

    pub fn apply_issuer_override(&mut self, issuer: Option<String>) {
        if let Some(issuer) = issuer.filter(|s| !s.trim().is_empty()) {
            self.issuer = issuer;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" の場合はプレーンテキスト、それ以外は JSON。
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
