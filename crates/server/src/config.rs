use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Which notification channel receives one-time login codes.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodeDelivery {
    /// Demo behaviour: the code only shows up in the service logs.
    #[default]
    Log,
    /// Send the code by email via the configured SMTP relay.
    Smtp,
}

/// The three response headers the gateway stamps on every response.
#[derive(Clone, Debug, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
    #[serde(default = "default_allow_methods")]
    pub allow_methods: String,
    #[serde(default = "default_allow_headers")]
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_allow_origin(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
        }
    }
}

fn default_allow_origin() -> String {
    "https://safemore.pl".to_string()
}

fn default_allow_methods() -> String {
    "GET, POST, OPTIONS".to_string()
}

fn default_allow_headers() -> String {
    "Content-Type, Authorization".to_string()
}

/// Settings for the demo redirect served on `/`.
#[derive(Clone, Debug, Deserialize)]
pub struct DemoConfig {
    /// Placeholder client id injected into the demo authorize URL. Not a
    /// registered OAuth client; real relying parties bring their own.
    #[serde(default = "default_demo_client_id")]
    pub client_id: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            client_id: default_demo_client_id(),
        }
    }
}

fn default_demo_client_id() -> String {
    "your-client-id".to_string()
}

/// Where the issuer collaborator lives.
#[derive(Clone, Debug, Deserialize)]
pub struct IssuerConfig {
    /// Base URL of the upstream issuer service, e.g. `http://issuer.internal:8788`.
    pub upstream_url: String,
}

/// Branding handed to the issuer integration (login page title, colors,
/// artwork). The defaults mirror the myAuth deployment.
#[derive(Clone, Debug, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_theme_title")]
    pub title: String,
    #[serde(default = "default_theme_primary")]
    pub primary: String,
    #[serde(default = "default_theme_favicon")]
    pub favicon: String,
    #[serde(default = "default_theme_logo_dark")]
    pub logo_dark: String,
    #[serde(default = "default_theme_logo_light")]
    pub logo_light: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            title: default_theme_title(),
            primary: default_theme_primary(),
            favicon: default_theme_favicon(),
            logo_dark: default_theme_logo_dark(),
            logo_light: default_theme_logo_light(),
        }
    }
}

fn default_theme_title() -> String {
    "myAuth".to_string()
}

fn default_theme_primary() -> String {
    "#0051c3".to_string()
}

fn default_theme_favicon() -> String {
    "https://workers.cloudflare.com//favicon.ico".to_string()
}

fn default_theme_logo_dark() -> String {
    "https://imagedelivery.net/wSMYJvS3Xw-n339CbDyDIA/db1e5c92-d3a6-4ea9-3e72-155844211f00/public"
        .to_string()
}

fn default_theme_logo_light() -> String {
    "https://imagedelivery.net/wSMYJvS3Xw-n339CbDyDIA/fa5a3023-7da9-466b-98a7-4ce01ee6c700/public"
        .to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub issuer: IssuerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub code_delivery: CodeDelivery,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub theme: ThemeConfig,
}

/// Post-deserialize validation shared by `load_config` and tests.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = Url::parse(&config.issuer.upstream_url).map_err(|e| {
        ConfigError::Validation(format!(
            "issuer.upstream_url is not a valid URL ({}): {e}",
            config.issuer.upstream_url
        ))
    })?;
    if !matches!(upstream.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "issuer.upstream_url must use http or https, got {}",
            upstream.scheme()
        )));
    }
    if upstream.host_str().is_none() {
        return Err(ConfigError::Validation(
            "issuer.upstream_url is missing a host".into(),
        ));
    }
    if config.cors.allow_origin.is_empty() {
        return Err(ConfigError::Validation(
            "cors.allow_origin must not be empty".into(),
        ));
    }
    if config.code_delivery == CodeDelivery::Smtp {
        match &config.smtp {
            None => {
                return Err(ConfigError::Validation(
                    "smtp section is required when code_delivery = smtp".into(),
                ));
            }
            Some(smtp) if smtp.port == 0 => {
                return Err(ConfigError::Validation("smtp.port must be > 0".into()));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Environment variables matching the key path separated by double
/// underscores (e.g. `ISSUER__UPSTREAM_URL`) override the file value.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    validate(&app)?;

    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
