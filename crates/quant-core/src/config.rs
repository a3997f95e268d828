//! 설정 관리.
//!
//! TOML 파일과 환경 변수(`QUANT__` 접두사)에서 설정을 로드하고,
//! 시작 시점에 필수 키를 검증합니다. 누락된 키는 런타임이 아닌
//! 시작 시점의 치명적 에러입니다.
//!
//! # 키
//!
//! | 키 | 필수 | 설명 |
//! |----|------|------|
//! | `api.key` | O | API 키 (`X-MBX-APIKEY` 헤더) |
//! | `api.secret` | O | 서명용 시크릿 |
//! | `api.base.url` | O | 메인넷 REST 기본 URL |
//! | `api.testnet.base.url` | `api.use_testnet` 시 | 테스트넷 REST 기본 URL |
//! | `api.websocket.base.url` | O | WebSocket 스트림 기본 URL |

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::logging::{LogConfig, LogFormat};

/// 환경 변수 접두사.
pub const ENV_PREFIX: &str = "QUANT";

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 기본 수신 윈도우 (밀리초).
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

/// 기본 HTTP 타임아웃 (초).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// 거래소 클라이언트 설정.
///
/// 시작 시 한 번 생성되어 `Arc`로 각 컴포넌트에 전달됩니다. 생성 후 변경되지 않습니다.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
pub struct ClientConfig {
    /// API 키
    api_key: SecretString,
    /// API 시크릿
    api_secret: SecretString,
    /// 메인넷 REST 기본 URL (시세 조회)
    pub rest_base_url: String,
    /// 테스트넷 REST 기본 URL
    pub testnet_rest_base_url: Option<String>,
    /// WebSocket 스트림 기본 URL
    pub ws_base_url: String,
    /// 주문을 테스트넷으로 보낼지 여부
    pub use_testnet: bool,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
    /// 요청 타임아웃
    pub request_timeout: Duration,
    /// 연결 타임아웃 (HTTP 및 WebSocket 핸드셰이크)
    pub connect_timeout: Duration,
    /// debug 레벨에서 마스킹된 API 키 로깅 허용 (명시적 opt-in)
    pub log_masked_api_key: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"***REDACTED***")
            .field("api_secret", &"***REDACTED***")
            .field("rest_base_url", &self.rest_base_url)
            .field("testnet_rest_base_url", &self.testnet_rest_base_url)
            .field("ws_base_url", &self.ws_base_url)
            .field("use_testnet", &self.use_testnet)
            .field("recv_window", &self.recv_window)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// 새 설정 생성 (메인넷 주문, 기본 타임아웃).
    ///
    /// # Errors
    /// 키, 시크릿 또는 URL이 비어 있으면 `ConfigError::Empty`를 반환합니다.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        rest_base_url: impl Into<String>,
        ws_base_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            api_key: SecretString::from(api_key.into()),
            api_secret: SecretString::from(api_secret.into()),
            rest_base_url: rest_base_url.into(),
            testnet_rest_base_url: None,
            ws_base_url: ws_base_url.into(),
            use_testnet: false,
            recv_window: DEFAULT_RECV_WINDOW_MS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_masked_api_key: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// 테스트넷 주문 URL 설정.
    pub fn with_testnet(mut self, testnet_rest_base_url: impl Into<String>) -> Self {
        self.testnet_rest_base_url = Some(testnet_rest_base_url.into());
        self.use_testnet = true;
        self
    }

    /// 요청 타임아웃 설정.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// 연결 타임아웃 설정.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// 파일과 환경 변수에서 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let source = build_source(path.as_ref())?;
        Self::from_source(&source)
    }

    /// 이미 구성된 설정 소스에서 생성합니다.
    pub fn from_source(source: &config::Config) -> Result<Self, ConfigError> {
        let use_testnet = optional_bool(source, "api.use_testnet")?.unwrap_or(true);

        let testnet_rest_base_url = if use_testnet {
            Some(required_string(source, "api.testnet.base.url")?)
        } else {
            optional_string(source, "api.testnet.base.url")?
        };

        let config = Self {
            api_key: SecretString::from(required_string(source, "api.key")?),
            api_secret: SecretString::from(required_string(source, "api.secret")?),
            rest_base_url: required_string(source, "api.base.url")?,
            testnet_rest_base_url,
            ws_base_url: required_string(source, "api.websocket.base.url")?,
            use_testnet,
            recv_window: optional_u64(source, "api.recv_window")?
                .unwrap_or(DEFAULT_RECV_WINDOW_MS),
            request_timeout: Duration::from_secs(
                optional_u64(source, "http.timeout_secs")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            connect_timeout: Duration::from_secs(
                optional_u64(source, "http.connect_timeout_secs")?
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            log_masked_api_key: optional_bool(source, "logging.log_masked_api_key")?
                .unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Empty("api.key".to_string()));
        }
        if self.api_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Empty("api.secret".to_string()));
        }
        if self.rest_base_url.trim().is_empty() {
            return Err(ConfigError::Empty("api.base.url".to_string()));
        }
        if self.ws_base_url.trim().is_empty() {
            return Err(ConfigError::Empty("api.websocket.base.url".to_string()));
        }
        if self.recv_window == 0 {
            return Err(ConfigError::Invalid {
                key: "api.recv_window".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// API 키 (헤더 전송용).
    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// API 시크릿 (서명 키 생성용).
    pub fn api_secret(&self) -> &SecretString {
        &self.api_secret
    }

    /// 앞뒤 4자만 남긴 API 키.
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.expose_secret();
        if key.len() > 8 && key.is_char_boundary(4) && key.is_char_boundary(key.len() - 4) {
            format!("{}...{}", &key[..4], &key[key.len() - 4..])
        } else {
            "***REDACTED***".to_string()
        }
    }

    /// 주문 엔드포인트의 기본 URL.
    pub fn order_base_url(&self) -> &str {
        match (&self.testnet_rest_base_url, self.use_testnet) {
            (Some(url), true) => url,
            _ => &self.rest_base_url,
        }
    }
}

/// 로깅 설정 섹션.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    /// 설정 소스에서 읽습니다. 누락된 값은 기본값을 사용합니다.
    pub fn from_source(source: &config::Config) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            level: optional_string(source, "logging.level")?.unwrap_or(defaults.level),
            format: optional_string(source, "logging.format")?.unwrap_or(defaults.format),
        })
    }

    /// `LogConfig`로 변환합니다.
    pub fn to_log_config(&self) -> Result<LogConfig, ConfigError> {
        let format: LogFormat = self.format.parse().map_err(|reason| ConfigError::Invalid {
            key: "logging.format".to_string(),
            reason,
        })?;
        Ok(LogConfig::new(self.level.clone()).with_format(format))
    }
}

/// 애플리케이션 설정.
#[derive(Debug)]
pub struct AppConfig {
    /// 거래소 클라이언트 설정
    pub client: ClientConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let source = build_source(path.as_ref())?;
        Ok(Self {
            client: ClientConfig::from_source(&source)?,
            logging: LoggingConfig::from_source(&source)?,
        })
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }
}

fn build_source(path: &Path) -> Result<config::Config, ConfigError> {
    let source = config::Config::builder()
        // 파일에서 로드 (없으면 환경 변수만 사용)
        .add_source(config::File::from(path).required(false))
        // 환경 변수로 오버라이드
        .add_source(environment())
        .build()?;
    Ok(source)
}

/// `QUANT__` 환경 변수 소스.
///
/// 값은 문자열 그대로 유지합니다. 숫자처럼 보이는 시크릿(`00123`)이 변형되면 서명이 깨집니다.
/// 불리언과 정수 키는 조회 시점에 변환됩니다.
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).separator("__")
}

fn optional_string(source: &config::Config, key: &str) -> Result<Option<String>, ConfigError> {
    match source.get_string(key) {
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn required_string(source: &config::Config, key: &str) -> Result<String, ConfigError> {
    let value = optional_string(source, key)?.ok_or_else(|| ConfigError::Missing(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(key.to_string()));
    }
    Ok(value)
}

fn optional_bool(source: &config::Config, key: &str) -> Result<Option<bool>, ConfigError> {
    match source.get_bool(key) {
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn optional_u64(source: &config::Config, key: &str) -> Result<Option<u64>, ConfigError> {
    match source.get_int(key) {
        Ok(value) => u64::try_from(value).map(Some).map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("must be non-negative, got {}", value),
        }),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> config::Config {
        let mut builder = config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    const FULL: &[(&str, &str)] = &[
        ("api.key", "key-1234567890"),
        ("api.secret", "secret"),
        ("api.base.url", "https://api.binance.com"),
        ("api.testnet.base.url", "https://testnet.binance.vision"),
        ("api.websocket.base.url", "wss://stream.binance.com:9443/ws/"),
    ];

    #[test]
    fn test_load_full_source() {
        let config = ClientConfig::from_source(&source(FULL)).unwrap();

        assert!(config.use_testnet);
        assert_eq!(config.order_base_url(), "https://testnet.binance.vision");
        assert_eq!(config.rest_base_url, "https://api.binance.com");
        assert_eq!(config.recv_window, 5000);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        let pairs: Vec<_> = FULL
            .iter()
            .copied()
            .filter(|(k, _)| *k != "api.secret")
            .collect();

        let err = ClientConfig::from_source(&source(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(key) if key == "api.secret"));
    }

    #[test]
    fn test_empty_secret_fails_fast() {
        let err = ClientConfig::new("key", "  ", "http://a", "ws://b").unwrap_err();
        assert!(matches!(err, ConfigError::Empty(key) if key == "api.secret"));
    }

    #[test]
    fn test_testnet_url_optional_when_disabled() {
        let mut pairs: Vec<_> = FULL
            .iter()
            .copied()
            .filter(|(k, _)| *k != "api.testnet.base.url")
            .collect();
        pairs.push(("api.use_testnet", "false"));

        let config = ClientConfig::from_source(&source(&pairs)).unwrap();
        assert!(!config.use_testnet);
        assert_eq!(config.order_base_url(), "https://api.binance.com");
    }

    #[test]
    fn test_testnet_url_required_when_enabled() {
        let pairs: Vec<_> = FULL
            .iter()
            .copied()
            .filter(|(k, _)| *k != "api.testnet.base.url")
            .collect();

        let err = ClientConfig::from_source(&source(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(key) if key == "api.testnet.base.url"));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = ClientConfig::from_source(&source(FULL)).unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("key-1234567890"));
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("REDACTED"));
        assert_eq!(config.masked_api_key(), "key-...7890");
    }

    #[test]
    fn test_env_values_keep_their_text() {
        let vars: config::Map<String, String> = [
            ("QUANT__API__KEY", "0042"),
            ("QUANT__API__SECRET", "00123"),
            ("QUANT__API__BASE__URL", "https://api.binance.com"),
            ("QUANT__API__WEBSOCKET__BASE__URL", "wss://stream.binance.com:9443/ws/"),
            ("QUANT__API__USE_TESTNET", "false"),
            ("QUANT__API__RECV_WINDOW", "7000"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let source = config::Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap();

        let config = ClientConfig::from_source(&source).unwrap();
        assert_eq!(config.api_secret().expose_secret(), "00123");
        assert_eq!(config.api_key().expose_secret(), "0042");
        assert!(!config.use_testnet);
        assert_eq!(config.recv_window, 7000);
    }

    #[test]
    fn test_logging_section_defaults() {
        let logging = LoggingConfig::from_source(&source(FULL)).unwrap();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.to_log_config().unwrap().format, LogFormat::Pretty);

        let bad = LoggingConfig {
            level: "info".to_string(),
            format: "xml".to_string(),
        };
        assert!(bad.to_log_config().is_err());
    }
}
