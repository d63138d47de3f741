use anyhow::Result;

#[derive(Debug, Clone)]
pub struct HeatWaveConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub heatwave: HeatWaveConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            heatwave: HeatWaveConfig {
                host: std::env::var("MYSQL_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: std::env::var("MYSQL_PORT")
                    .unwrap_or_else(|_| "3306".to_string())
                    .parse()?,
                user: std::env::var("MYSQL_USER")
                    .unwrap_or_else(|_| "decisioning_agent".to_string()),
                password: std::env::var("MYSQL_PASSWORD").unwrap_or_default(),
                database: std::env::var("MYSQL_DATABASE")
                    .unwrap_or_else(|_| "decisioning_heatwave".to_string()),
                connection_timeout: std::env::var("MYSQL_CONNECTION_TIMEOUT")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
        })
    }
}
