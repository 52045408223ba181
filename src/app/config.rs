use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::{Host, Url};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_IDENTITY_URL: &str = "https://id.wompi.sv/connect/token";
const DEFAULT_TRANSACTIONS_PATH: &str = "/v1/transactions";
const DEFAULT_APPLICATIONS_PATH: &str = "/Aplicativo";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_TOKEN_ATTEMPTS: u32 = 3;
const DEFAULT_TOKEN_BACKOFF_MS: u64 = 200;
const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} must use https (plain http is only allowed for loopback hosts): {url}")]
    Insecure { key: &'static str, url: String },
    #[error("failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorEnvironment {
    Sandbox,
    Production,
}

impl ProcessorEnvironment {
    pub fn default_api_base(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.wompi.com.sv",
            Self::Production => "https://api.wompi.sv",
        }
    }
}

impl FromStr for ProcessorEnvironment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

/// Name of the minor-unit amount field in the transaction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountField {
    Amount,
    AmountInCents,
}

impl FromStr for AmountField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amount" => Ok(Self::Amount),
            "amount_in_cents" => Ok(Self::AmountInCents),
            _ => Err(()),
        }
    }
}

/// Where the payer's email goes in the transaction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailField {
    Email,
    CustomerData,
}

impl FromStr for EmailField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "customer_data" => Ok(Self::CustomerData),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSettings {
    pub currency: String,
    pub amount_field: AmountField,
    pub email_field: EmailField,
    pub validate_fields: bool,
}

impl Default for PayloadSettings {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            amount_field: AmountField::Amount,
            email_field: EmailField::Email,
            validate_fields: true,
        }
    }
}

/// Optional TOML overlay. Every key may be overridden by its environment variable.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub environment: Option<ProcessorEnvironment>,
    pub identity_url: Option<String>,
    pub api_base_url: Option<String>,
    pub transactions_path: Option<String>,
    pub applications_path: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub token_max_attempts: Option<u32>,
    pub token_retry_backoff_ms: Option<u64>,
    pub currency: Option<String>,
    pub amount_field: Option<AmountField>,
    pub email_field: Option<EmailField>,
    pub validate_fields: Option<bool>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_port: u16,
    pub client_id: String,
    pub client_secret: String,
    pub environment: ProcessorEnvironment,
    pub identity_url: Url,
    pub transactions_url: Url,
    pub applications_url: Url,
    pub request_timeout: Duration,
    pub token_max_attempts: u32,
    pub token_retry_backoff: Duration,
    pub payload: PayloadSettings,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("identity_url", &self.identity_url.as_str())
            .field("transactions_url", &self.transactions_url.as_str())
            .field("applications_url", &self.applications_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("token_max_attempts", &self.token_max_attempts)
            .field("token_retry_backoff", &self.token_retry_backoff)
            .field("payload", &self.payload)
            .finish()
    }
}

impl Config {
    /// Reads the optional TOML file, then applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(file, |key| env::var(key).ok())
    }

    pub fn from_sources(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let client_id = var("WOMPI_CLIENT_ID")
            .or(file.client_id)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("WOMPI_CLIENT_ID"))?;
        let client_secret = var("WOMPI_CLIENT_SECRET")
            .or(file.client_secret)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("WOMPI_CLIENT_SECRET"))?;

        let environment = layered(
            "WOMPI_ENVIRONMENT",
            var("WOMPI_ENVIRONMENT"),
            file.environment,
            ProcessorEnvironment::Sandbox,
        )?;

        let identity_url = parse_url(
            "WOMPI_IDENTITY_URL",
            &var("WOMPI_IDENTITY_URL")
                .or(file.identity_url)
                .unwrap_or_else(|| DEFAULT_IDENTITY_URL.to_string()),
        )?;
        let api_base_url = parse_url(
            "WOMPI_API_URL",
            &var("WOMPI_API_URL")
                .or(file.api_base_url)
                .unwrap_or_else(|| environment.default_api_base().to_string()),
        )?;
        let transactions_url = join_path(
            &api_base_url,
            "WOMPI_TRANSACTIONS_PATH",
            &var("WOMPI_TRANSACTIONS_PATH")
                .or(file.transactions_path)
                .unwrap_or_else(|| DEFAULT_TRANSACTIONS_PATH.to_string()),
        )?;
        let applications_url = join_path(
            &api_base_url,
            "WOMPI_APPLICATIONS_PATH",
            &var("WOMPI_APPLICATIONS_PATH")
                .or(file.applications_path)
                .unwrap_or_else(|| DEFAULT_APPLICATIONS_PATH.to_string()),
        )?;

        let request_timeout_ms = layered(
            "REQUEST_TIMEOUT_MS",
            var("REQUEST_TIMEOUT_MS"),
            file.request_timeout_ms,
            DEFAULT_TIMEOUT_MS,
        )?;
        if request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_MS",
                value: "0".to_string(),
            });
        }

        let token_max_attempts = layered(
            "TOKEN_MAX_ATTEMPTS",
            var("TOKEN_MAX_ATTEMPTS"),
            file.token_max_attempts,
            DEFAULT_TOKEN_ATTEMPTS,
        )?
        .max(1);
        let token_retry_backoff_ms = layered(
            "TOKEN_RETRY_BACKOFF_MS",
            var("TOKEN_RETRY_BACKOFF_MS"),
            file.token_retry_backoff_ms,
            DEFAULT_TOKEN_BACKOFF_MS,
        )?;

        let payload = PayloadSettings {
            currency: var("PAYMENT_CURRENCY")
                .or(file.currency)
                .map(|currency| currency.trim().to_ascii_uppercase())
                .filter(|currency| !currency.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            amount_field: layered(
                "AMOUNT_FIELD",
                var("AMOUNT_FIELD"),
                file.amount_field,
                AmountField::Amount,
            )?,
            email_field: layered(
                "EMAIL_FIELD",
                var("EMAIL_FIELD"),
                file.email_field,
                EmailField::Email,
            )?,
            validate_fields: layered(
                "VALIDATE_PAYMENT_FIELDS",
                var("VALIDATE_PAYMENT_FIELDS"),
                file.validate_fields,
                true,
            )?,
        };

        Ok(Self {
            server_port: layered("PORT", var("PORT"), file.port, DEFAULT_PORT)?,
            client_id,
            client_secret,
            environment,
            identity_url,
            transactions_url,
            applications_url,
            request_timeout: Duration::from_millis(request_timeout_ms),
            token_max_attempts,
            token_retry_backoff: Duration::from_millis(token_retry_backoff_ms),
            payload,
        })
    }

    /// Builds a config from an in-memory variable map, ignoring the process environment.
    #[cfg(test)]
    pub fn from_map(vars: &std::collections::HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_sources(FileConfig::default(), |key| vars.get(key).cloned())
    }
}

/// Environment value wins over the file value, which wins over the default.
fn layered<T: FromStr>(
    key: &'static str,
    env_value: Option<String>,
    file_value: Option<T>,
    default: T,
) -> Result<T, ConfigError> {
    match env_value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(file_value.unwrap_or(default)),
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })?;
    ensure_secure(key, url)
}

/// Appends `path` to the base URL's own path. Absolute and scheme-relative
/// values are refused so an endpoint can never leave the configured host.
fn join_path(base: &Url, key: &'static str, path: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key,
        value: path.to_string(),
    };
    let trimmed = path.trim();
    if trimmed.starts_with("//") || Url::parse(trimmed).is_ok() {
        return Err(invalid());
    }

    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    let joined = base
        .join(trimmed.trim_start_matches('/'))
        .map_err(|_| invalid())?;
    ensure_secure(key, joined)
}

fn ensure_secure(key: &'static str, url: Url) -> Result<Url, ConfigError> {
    let loopback = match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };

    match url.scheme() {
        "https" => Ok(url),
        "http" if loopback => Ok(url),
        _ => Err(ConfigError::Insecure {
            key,
            url: url.to_string(),
        }),
    }
}
