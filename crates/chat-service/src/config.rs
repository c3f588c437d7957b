//! Chat service configuration.
//!
//! Configuration is loaded from environment variables. The upstream API key
//! is held as a `SecretString` and the email allowlist is summarized in
//! Debug output.

use crate::auth::{AllowList, AuthPolicy};
use axum::http::HeaderValue;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default required scope.
pub const DEFAULT_SCOPE: &str = "Chat.chat";

/// Default upstream chat-completions endpoint.
pub const DEFAULT_CHAT_UPSTREAM_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Default sampling temperature.
pub const DEFAULT_CHAT_TEMPERATURE: f64 = 0.2;

/// Maximum sampling temperature accepted by OpenAI-compatible APIs.
pub const MAX_CHAT_TEMPERATURE: f64 = 2.0;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 5;

/// Chat service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Expected token issuer.
    pub issuer: String,

    /// URL of the identity provider's JWKS endpoint.
    pub jwks_url: String,

    /// Expected token audience (the API's application ID).
    pub audience: String,

    /// Required token scope (default: "Chat.chat").
    pub scope: String,

    /// Emails permitted to use the service.
    pub allowed_emails: Vec<String>,

    /// Origins allowed to make cross-origin requests.
    pub cors_origins: Vec<String>,

    /// Development mode: human-readable logs.
    pub development: bool,

    /// JWKS refresh interval; `None` disables background refresh.
    pub jwks_refresh_interval: Option<Duration>,

    /// Upstream chat-completions endpoint.
    pub chat_upstream_url: String,

    /// Model requested from the upstream.
    pub chat_model: String,

    /// Sampling temperature sent to the upstream.
    pub chat_temperature: f64,

    /// Bearer credential for the upstream.
    pub openai_api_key: Option<SecretString>,

    /// Time allowed for in-flight requests after a shutdown signal.
    pub drain_period: Duration,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("issuer", &self.issuer)
            .field("jwks_url", &self.jwks_url)
            .field("audience", &self.audience)
            .field("scope", &self.scope)
            .field("allowed_emails", &format!("[{} entries]", self.allowed_emails.len()))
            .field("cors_origins", &self.cors_origins)
            .field("development", &self.development)
            .field("jwks_refresh_interval", &self.jwks_refresh_interval)
            .field("chat_upstream_url", &self.chat_upstream_url)
            .field("chat_model", &self.chat_model)
            .field("chat_temperature", &self.chat_temperature)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("drain_period", &self.drain_period)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JSON list in {var}: {reason}")]
    InvalidJsonList { var: String, reason: String },

    #[error("Invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),

    #[error("Invalid JWKS refresh interval: {0}")]
    InvalidRefreshInterval(String),

    #[error("Invalid chat temperature: {0}")]
    InvalidTemperature(String),

    #[error("Invalid drain period: {0}")]
    InvalidDrainPeriod(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let tenant = B2cTenant::from_vars(vars);

        let issuer = match vars.get("AUTH_ISSUER") {
            Some(issuer) => issuer.clone(),
            None => tenant
                .as_ref()
                .map(B2cTenant::issuer)
                .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_ISSUER".to_string()))?,
        };

        let jwks_url = match vars.get("AUTH_JWKS_URL") {
            Some(url) => url.clone(),
            None => tenant
                .as_ref()
                .map(B2cTenant::jwks_url)
                .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_JWKS_URL".to_string()))?,
        };

        let audience = vars
            .get("AUTH_AUDIENCE")
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_AUDIENCE".to_string()))?
            .clone();

        let scope = vars
            .get("AUTH_SCOPE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string());

        let allowed_emails = parse_json_list(
            "CA_ALLOWED_EMAILS",
            vars.get("CA_ALLOWED_EMAILS")
                .ok_or_else(|| ConfigError::MissingEnvVar("CA_ALLOWED_EMAILS".to_string()))?,
        )?;

        let cors_origins = match vars.get("CA_CORS_ORIGINS") {
            Some(value) => parse_json_list("CA_CORS_ORIGINS", value)?,
            None => Vec::new(),
        };
        for origin in &cors_origins {
            if origin == "*" {
                return Err(ConfigError::InvalidCorsOrigin(
                    "wildcard origin is not supported; list origins explicitly".to_string(),
                ));
            }
            HeaderValue::from_str(origin).map_err(|e| {
                ConfigError::InvalidCorsOrigin(format!("'{origin}' is not a valid header value: {e}"))
            })?;
        }

        let development = parse_development_flag(vars.get("CA_DEVELOPMENT").map(String::as_str));

        let jwks_refresh_interval = if let Some(value_str) = vars.get("JWKS_REFRESH_INTERVAL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRefreshInterval(format!(
                    "JWKS_REFRESH_INTERVAL_SECONDS must be a valid non-negative integer, got '{value_str}': {e}"
                ))
            })?;

            (value > 0).then(|| Duration::from_secs(value))
        } else {
            None
        };

        let chat_upstream_url = vars
            .get("CHAT_UPSTREAM_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CHAT_UPSTREAM_URL.to_string());

        let chat_model = vars
            .get("CHAT_MODEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());

        let chat_temperature = if let Some(value_str) = vars.get("CHAT_TEMPERATURE") {
            let value: f64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTemperature(format!(
                    "CHAT_TEMPERATURE must be a number, got '{value_str}': {e}"
                ))
            })?;

            if !(0.0..=MAX_CHAT_TEMPERATURE).contains(&value) {
                return Err(ConfigError::InvalidTemperature(format!(
                    "CHAT_TEMPERATURE must be between 0.0 and {MAX_CHAT_TEMPERATURE}, got {value}"
                )));
            }

            value
        } else {
            DEFAULT_CHAT_TEMPERATURE
        };

        let openai_api_key = vars
            .get("OPENAI_API_KEY")
            .filter(|key| !key.is_empty())
            .map(|key| SecretString::from(key.clone()));

        let drain_period = if let Some(value_str) = vars.get("CHAT_DRAIN_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainPeriod(format!(
                    "CHAT_DRAIN_SECONDS must be a valid non-negative integer, got '{value_str}': {e}"
                ))
            })?;
            Duration::from_secs(value)
        } else {
            Duration::from_secs(DEFAULT_DRAIN_SECONDS)
        };

        Ok(Config {
            bind_address,
            issuer,
            jwks_url,
            audience,
            scope,
            allowed_emails,
            cors_origins,
            development,
            jwks_refresh_interval,
            chat_upstream_url,
            chat_model,
            chat_temperature,
            openai_api_key,
            drain_period,
        })
    }

    /// Token policy derived from this configuration.
    pub fn auth_policy(&self) -> AuthPolicy {
        AuthPolicy {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            scope: self.scope.clone(),
            allowed_emails: AllowList::new(self.allowed_emails.iter().cloned()),
        }
    }
}

/// Azure AD B2C tenant coordinates, used to derive issuer and JWKS URL.
struct B2cTenant<'a> {
    name: &'a str,
    id: &'a str,
    user_flow: &'a str,
}

impl<'a> B2cTenant<'a> {
    fn from_vars(vars: &'a HashMap<String, String>) -> Option<Self> {
        Some(Self {
            name: vars.get("B2C_TENANT_NAME")?,
            id: vars.get("B2C_TENANT_ID")?,
            user_flow: vars.get("B2C_USER_FLOW")?,
        })
    }

    fn issuer(&self) -> String {
        format!("https://{}.b2clogin.com/{}/v2.0/", self.name, self.id)
    }

    fn jwks_url(&self) -> String {
        format!(
            "https://{name}.b2clogin.com/{name}.onmicrosoft.com/{flow}/discovery/v2.0/keys",
            name = self.name,
            flow = self.user_flow
        )
    }
}

/// Any non-empty value enables development mode.
pub fn parse_development_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

fn parse_json_list(var: &str, value: &str) -> Result<Vec<String>, ConfigError> {
    serde_json::from_str(value).map_err(|e| ConfigError::InvalidJsonList {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "AUTH_ISSUER".to_string(),
                "https://issuer.example/v2.0/".to_string(),
            ),
            (
                "AUTH_JWKS_URL".to_string(),
                "https://issuer.example/keys".to_string(),
            ),
            ("AUTH_AUDIENCE".to_string(), "api-audience".to_string()),
            (
                "CA_ALLOWED_EMAILS".to_string(),
                r#"["alice@example.com", "bob@example.com"]"#.to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.issuer, "https://issuer.example/v2.0/");
        assert_eq!(config.jwks_url, "https://issuer.example/keys");
        assert_eq!(config.audience, "api-audience");
        assert_eq!(config.scope, "Chat.chat");
        assert_eq!(config.allowed_emails.len(), 2);
        assert!(config.cors_origins.is_empty());
        assert!(!config.development);
        assert!(config.jwks_refresh_interval.is_none());
        assert_eq!(config.chat_upstream_url, DEFAULT_CHAT_UPSTREAM_URL);
        assert_eq!(config.chat_model, "gpt-3.5-turbo");
        assert!((config.chat_temperature - 0.2).abs() < f64::EPSILON);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.drain_period, Duration::from_secs(5));
    }

    #[test]
    fn test_b2c_tenant_derivation() {
        let mut vars = base_vars();
        vars.remove("AUTH_ISSUER");
        vars.remove("AUTH_JWKS_URL");
        vars.insert("B2C_TENANT_NAME".to_string(), "contoso".to_string());
        vars.insert("B2C_TENANT_ID".to_string(), "tenant-guid".to_string());
        vars.insert("B2C_USER_FLOW".to_string(), "B2C_1_signin".to_string());

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.issuer, "https://contoso.b2clogin.com/tenant-guid/v2.0/");
        assert_eq!(
            config.jwks_url,
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin/discovery/v2.0/keys"
        );
    }

    #[test]
    fn test_explicit_issuer_overrides_tenant() {
        let mut vars = base_vars();
        vars.insert("B2C_TENANT_NAME".to_string(), "contoso".to_string());
        vars.insert("B2C_TENANT_ID".to_string(), "tenant-guid".to_string());
        vars.insert("B2C_USER_FLOW".to_string(), "B2C_1_signin".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.issuer, "https://issuer.example/v2.0/");
    }

    #[test]
    fn test_missing_issuer_without_tenant() {
        let mut vars = base_vars();
        vars.remove("AUTH_ISSUER");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AUTH_ISSUER"));
    }

    #[test]
    fn test_missing_audience() {
        let mut vars = base_vars();
        vars.remove("AUTH_AUDIENCE");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AUTH_AUDIENCE"));
    }

    #[test]
    fn test_missing_allowed_emails() {
        let mut vars = base_vars();
        vars.remove("CA_ALLOWED_EMAILS");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "CA_ALLOWED_EMAILS"));
    }

    #[test]
    fn test_allowed_emails_must_be_json_list() {
        let mut vars = base_vars();
        vars.insert("CA_ALLOWED_EMAILS".to_string(), "alice@example.com".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidJsonList { var, .. }) if var == "CA_ALLOWED_EMAILS"));
    }

    #[test]
    fn test_cors_origins() {
        let mut vars = base_vars();
        vars.insert(
            "CA_CORS_ORIGINS".to_string(),
            r#"["http://localhost:3000"]"#.to_string(),
        );

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);

        vars.insert("CA_CORS_ORIGINS".to_string(), r#"["bad\norigin"]"#.to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidCorsOrigin(_))
        ));

        vars.insert("CA_CORS_ORIGINS".to_string(), r#"["*"]"#.to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidCorsOrigin(_))
        ));
    }

    #[test]
    fn test_development_flag() {
        assert!(!parse_development_flag(None));
        assert!(!parse_development_flag(Some("")));
        assert!(parse_development_flag(Some("1")));
        assert!(parse_development_flag(Some("true")));

        let mut vars = base_vars();
        vars.insert("CA_DEVELOPMENT".to_string(), "yes".to_string());
        assert!(Config::from_vars(&vars).unwrap().development);
    }

    #[test]
    fn test_refresh_interval() {
        let mut vars = base_vars();
        vars.insert("JWKS_REFRESH_INTERVAL_SECONDS".to_string(), "0".to_string());
        assert!(Config::from_vars(&vars).unwrap().jwks_refresh_interval.is_none());

        vars.insert("JWKS_REFRESH_INTERVAL_SECONDS".to_string(), "3600".to_string());
        assert_eq!(
            Config::from_vars(&vars).unwrap().jwks_refresh_interval,
            Some(Duration::from_secs(3600))
        );

        vars.insert("JWKS_REFRESH_INTERVAL_SECONDS".to_string(), "-5".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidRefreshInterval(_))
        ));
    }

    #[test]
    fn test_temperature_range() {
        let mut vars = base_vars();
        vars.insert("CHAT_TEMPERATURE".to_string(), "2.0".to_string());
        assert!(Config::from_vars(&vars).is_ok());

        vars.insert("CHAT_TEMPERATURE".to_string(), "2.5".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidTemperature(_))
        ));

        vars.insert("CHAT_TEMPERATURE".to_string(), "warm".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidTemperature(_))
        ));
    }

    #[test]
    fn test_invalid_drain_period() {
        let mut vars = base_vars();
        vars.insert("CHAT_DRAIN_SECONDS".to_string(), "soon".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidDrainPeriod(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut vars = base_vars();
        vars.insert("OPENAI_API_KEY".to_string(), "sk-live-secret".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.openai_api_key.as_ref().unwrap().expose_secret(),
            "sk-live-secret"
        );

        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("sk-live-secret"));
        assert!(!debug_str.contains("alice@example.com"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_auth_policy() {
        let policy = Config::from_vars(&base_vars()).unwrap().auth_policy();

        assert_eq!(policy.issuer, "https://issuer.example/v2.0/");
        assert_eq!(policy.audience, "api-audience");
        assert_eq!(policy.scope, "Chat.chat");
        assert!(policy.allowed_emails.contains("bob@example.com"));
    }
}
