use super::{optional_var, required_var, ConfigError};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_secret: String,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub public_site_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match optional_var("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let cors_allowed_origins = optional_var("CORS_ALLOWED_ORIGINS").map(|raw| {
            raw.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        });

        Ok(Self {
            port,
            database_url: required_var("DATABASE_URL")?,
            admin_secret: required_var("ADMIN_SECRET")?,
            cors_allowed_origins,
            public_site_url: optional_var("PUBLIC_SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
        })
    }
}
