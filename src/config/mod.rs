use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub uploads_dir: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Absolute URL for a path relative to the server root.
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_duration_hours: i64,
    pub default_admin_email: String,
    pub default_admin_password: String,
    pub default_admin_name: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.base_url", "http://localhost:5000")?
            .set_default("server.uploads_dir", "uploads")?
            .set_default("server.cors_origins", vec!["http://localhost:5173", "http://localhost:3000"])?
            .set_default("database.url", "sqlite://tripdesk.db")?
            .set_default("database.max_connections", 10)?
            .set_default("database.busy_timeout_secs", 5)?
            .set_default("auth.jwt_secret", "change-me-in-production")?
            .set_default("auth.token_duration_hours", 24 * 7)?
            .set_default("auth.default_admin_email", "admin@tripdesk.local")?
            .set_default("auth.default_admin_password", "admin@123")?
            .set_default("auth.default_admin_name", "Administrator")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with TRIPDESK__ prefix, double underscore separates levels)
            .add_source(
                Environment::with_prefix("TRIPDESK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                base_url: "http://localhost:5000".to_string(),
                uploads_dir: "uploads".to_string(),
                cors_origins: vec![
                    "http://localhost:5173".to_string(),
                    "http://localhost:3000".to_string(),
                ],
            },
            database: DatabaseConfig {
                url: "sqlite://tripdesk.db".to_string(),
                max_connections: 10,
                busy_timeout_secs: 5,
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                token_duration_hours: 24 * 7,
                default_admin_email: "admin@tripdesk.local".to_string(),
                default_admin_password: "admin@123".to_string(),
                default_admin_name: "Administrator".to_string(),
            },
        }
    }
}
