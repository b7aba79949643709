use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_ADZUNA_BASE_URL: &str = "https://api.adzuna.com/v1/api/jobs";
const DEFAULT_RESULTS_PER_PAGE: u32 = 20;
const MAX_RESULTS_PER_PAGE: u32 = 50;
const DEFAULT_SKILLS_AUTH_URL: &str = "https://auth.emsicloud.com/connect/token";
const DEFAULT_SKILLS_API_BASE_URL: &str = "https://emsiservices.com/titles";
const DEFAULT_SKILLS_SCOPE: &str = "emsi_open";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            providers: ProvidersConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Upstream provider sections. A section is `None` when its credentials are
/// missing, which disables the feature it backs.
#[derive(Debug, Clone, Default)]
pub struct ProvidersConfig {
    pub job_search: Option<JobSearchConfig>,
    pub skills: Option<SkillsConfig>,
    pub narrative: Option<NarrativeConfig>,
}

impl ProvidersConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let job_search = match (non_empty_var("ADZUNA_APP_ID"), non_empty_var("ADZUNA_APP_KEY")) {
            (Some(app_id), Some(app_key)) => {
                let results_per_page = match non_empty_var("ADZUNA_RESULTS_PER_PAGE") {
                    Some(raw) => raw
                        .parse::<u32>()
                        .ok()
                        .filter(|value| (1..=MAX_RESULTS_PER_PAGE).contains(value))
                        .ok_or(ConfigError::InvalidResultsPerPage)?,
                    None => DEFAULT_RESULTS_PER_PAGE,
                };

                Some(JobSearchConfig {
                    app_id,
                    app_key,
                    base_url: non_empty_var("ADZUNA_API_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_ADZUNA_BASE_URL.to_string()),
                    results_per_page,
                })
            }
            _ => None,
        };

        let skills = match (
            non_empty_var("SKILLS_CLIENT_ID"),
            non_empty_var("SKILLS_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(SkillsConfig {
                client_id,
                client_secret,
                auth_url: non_empty_var("SKILLS_AUTH_URL")
                    .unwrap_or_else(|| DEFAULT_SKILLS_AUTH_URL.to_string()),
                api_base_url: non_empty_var("SKILLS_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_SKILLS_API_BASE_URL.to_string()),
                scope: non_empty_var("SKILLS_SCOPE")
                    .unwrap_or_else(|| DEFAULT_SKILLS_SCOPE.to_string()),
            }),
            _ => None,
        };

        let narrative = match (non_empty_var("AZURE_AI_ENDPOINT"), non_empty_var("AZURE_AI_KEY")) {
            (Some(endpoint), Some(api_key)) => Some(NarrativeConfig { endpoint, api_key }),
            _ => None,
        };

        Ok(Self {
            job_search,
            skills,
            narrative,
        })
    }
}

/// Job search and salary histogram provider (app id / app key auth).
#[derive(Clone)]
pub struct JobSearchConfig {
    pub app_id: String,
    pub app_key: String,
    pub base_url: String,
    pub results_per_page: u32,
}

/// Skills taxonomy provider (OAuth2 client credentials).
#[derive(Clone)]
pub struct SkillsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub api_base_url: String,
    pub scope: String,
}

/// Chat completion endpoint used for narrative summaries.
#[derive(Clone)]
pub struct NarrativeConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl fmt::Debug for JobSearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSearchConfig")
            .field("base_url", &self.base_url)
            .field("results_per_page", &self.results_per_page)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for SkillsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillsConfig")
            .field("auth_url", &self.auth_url)
            .field("api_base_url", &self.api_base_url)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for NarrativeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrativeConfig")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidResultsPerPage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidResultsPerPage => write!(
                f,
                "ADZUNA_RESULTS_PER_PAGE must be between 1 and {MAX_RESULTS_PER_PAGE}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidResultsPerPage => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const PROVIDER_VARS: [&str; 11] = [
        "ADZUNA_APP_ID",
        "ADZUNA_APP_KEY",
        "ADZUNA_API_BASE_URL",
        "ADZUNA_RESULTS_PER_PAGE",
        "SKILLS_CLIENT_ID",
        "SKILLS_CLIENT_SECRET",
        "SKILLS_AUTH_URL",
        "SKILLS_API_BASE_URL",
        "SKILLS_SCOPE",
        "AZURE_AI_ENDPOINT",
        "AZURE_AI_KEY",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        for var in PROVIDER_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn providers_are_disabled_without_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ADZUNA_APP_ID", "app-id");
        env::set_var("ADZUNA_APP_KEY", "   ");
        env::set_var("AZURE_AI_ENDPOINT", "https://example.openai.azure.com/chat");

        let providers = ProvidersConfig::from_env().expect("providers load");
        assert!(providers.job_search.is_none());
        assert!(providers.skills.is_none());
        assert!(providers.narrative.is_none());
    }

    #[test]
    fn job_search_section_applies_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ADZUNA_APP_ID", "app-id");
        env::set_var("ADZUNA_APP_KEY", "app-key");

        let providers = ProvidersConfig::from_env().expect("providers load");
        let search = providers.job_search.expect("job search configured");
        assert_eq!(search.base_url, DEFAULT_ADZUNA_BASE_URL);
        assert_eq!(search.results_per_page, 20);
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ADZUNA_APP_ID", "app-id");
        env::set_var("ADZUNA_APP_KEY", "app-key");
        env::set_var("ADZUNA_RESULTS_PER_PAGE", "500");

        match ProvidersConfig::from_env() {
            Err(ConfigError::InvalidResultsPerPage) => {}
            other => panic!("expected page size error, got {other:?}"),
        }
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let config = SkillsConfig {
            client_id: "client".to_string(),
            client_secret: "super-secret".to_string(),
            auth_url: DEFAULT_SKILLS_AUTH_URL.to_string(),
            api_base_url: DEFAULT_SKILLS_API_BASE_URL.to_string(),
            scope: DEFAULT_SKILLS_SCOPE.to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("emsi_open"));
    }
}
