use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::scan::sources::{
    nutritionix, open_food_facts, NutritionSource, NutritionixConfig, NutritionixSource,
    OpenFoodFactsConfig, OpenFoodFactsSource, SourceError,
};

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
    pub providers: ProviderConfig,
    pub seed_dir: Option<PathBuf>,
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

        let timeout_secs = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;
        let timeout = Duration::from_secs(timeout_secs);

        let open_food_facts = OpenFoodFactsConfig {
            base_url: env::var("OFF_BASE_URL")
                .unwrap_or_else(|_| open_food_facts::DEFAULT_BASE_URL.to_string()),
            timeout,
        };

        let nutritionix = match (
            non_empty_var("NUTRITIONIX_APP_ID"),
            non_empty_var("NUTRITIONIX_APP_KEY"),
        ) {
            (Some(app_id), Some(app_key)) => Some(NutritionixConfig {
                base_url: env::var("NUTRITIONIX_BASE_URL")
                    .unwrap_or_else(|_| nutritionix::DEFAULT_BASE_URL.to_string()),
                app_id,
                app_key,
                timeout,
            }),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            providers: ProviderConfig {
                open_food_facts,
                nutritionix,
            },
            seed_dir: non_empty_var("SEED_DIR").map(PathBuf::from),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
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

/// External nutrition providers, in fallback order. Nutritionix is disabled
/// unless both credentials are configured.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub open_food_facts: OpenFoodFactsConfig,
    pub nutritionix: Option<NutritionixConfig>,
}

impl ProviderConfig {
    /// Instantiates the enabled providers in fallback order.
    pub fn sources(&self) -> Result<Vec<Arc<dyn NutritionSource>>, SourceError> {
        let open_food_facts: Arc<dyn NutritionSource> =
            Arc::new(OpenFoodFactsSource::new(self.open_food_facts.clone())?);
        let mut sources = vec![open_food_facts];
        match &self.nutritionix {
            Some(config) => {
                let nutritionix: Arc<dyn NutritionSource> =
                    Arc::new(NutritionixSource::new(config.clone())?);
                sources.push(nutritionix);
            }
            None => tracing::info!("nutritionix disabled: credentials not configured"),
        }
        Ok(sources)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "PROVIDER_TIMEOUT_SECS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidTimeout => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
