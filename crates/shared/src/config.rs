use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://assignment-todolist-api.vercel.app/api";
pub const DEFAULT_TENANT_ID: &str = "haqu";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid tenant id: {0:?}")]
    InvalidTenant(String),

    #[error("invalid value for {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// バックエンド接続設定
///
/// クライアント生成時に明示的に渡す。グローバル状態は持たない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// 末尾の `/` を除いたベース URL
    pub base_url: String,
    pub tenant_id: String,
    pub request_timeout: Duration,
    pub page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// 検証済みの設定を作成
    pub fn new(base_url: &str, tenant_id: &str) -> Result<Self, ConfigError> {
        Ok(Config {
            base_url: normalize_base_url(base_url)?,
            tenant_id: validate_tenant(tenant_id)?,
            ..Default::default()
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 環境変数の参照元を差し替え可能にした版（テスト用）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("TODO_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let tenant_id = lookup("TODO_TENANT_ID").unwrap_or_else(|| DEFAULT_TENANT_ID.to_string());

        let timeout_secs = match lookup("TODO_API_TIMEOUT_SECS") {
            Some(raw) => parse_positive("TODO_API_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let page_size = match lookup("TODO_PAGE_SIZE") {
            Some(raw) => parse_positive("TODO_PAGE_SIZE", &raw)?,
            None => u64::from(DEFAULT_PAGE_SIZE),
        };
        let page_size = u32::try_from(page_size).map_err(|_| ConfigError::InvalidNumber {
            name: "TODO_PAGE_SIZE",
            value: page_size.to_string(),
        })?;

        Ok(Self::new(&base_url, &tenant_id)?
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_page_size(page_size))
    }

    /// `{base_url}/{tenant_id}/{path}`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.tenant_id, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty());

    if !has_host {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_tenant(raw: &str) -> Result<String, ConfigError> {
    let tenant = raw.trim();
    if tenant.is_empty() || tenant.contains('/') {
        return Err(ConfigError::InvalidTenant(raw.to_string()));
    }
    Ok(tenant.to_string())
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(
            config.endpoint("items"),
            "https://assignment-todolist-api.vercel.app/api/haqu/items"
        );
    }

    #[test]
    fn overrides_are_validated() {
        let config = Config::from_lookup(lookup(&[
            ("TODO_API_BASE_URL", "http://127.0.0.1:8080/api/"),
            ("TODO_TENANT_ID", "team-a"),
            ("TODO_API_TIMEOUT_SECS", "5"),
            ("TODO_PAGE_SIZE", "25"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:8080/api");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.endpoint("/items/3"), "http://127.0.0.1:8080/api/team-a/items/3");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("TODO_API_BASE_URL", "ftp://example.com")])),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("TODO_TENANT_ID", "a/b")])),
            Err(ConfigError::InvalidTenant(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("TODO_API_TIMEOUT_SECS", "0")])),
            Err(ConfigError::InvalidNumber { name: "TODO_API_TIMEOUT_SECS", .. })
        ));
    }
}
