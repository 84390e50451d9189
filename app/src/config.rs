use config::{Config as ConfigBuilder, File};
use serde::Deserialize;

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_LANGUAGE: &str = "fr-FR";
pub const DEFAULT_REGION: &str = "FR";
const DEFAULT_DATABASE_URL: &str = "sqlite://./moviesphere.db";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub language: String,
    pub region: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = ConfigBuilder::builder()
            .add_source(File::with_name("config").required(false))
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("tmdb_base_url", DEFAULT_TMDB_BASE_URL)?
            .set_default("language", DEFAULT_LANGUAGE)?
            .set_default("region", DEFAULT_REGION)?
            .set_default("port", 3000u16)?
            .set_default("request_timeout_secs", 30u64)?
            .build()?;

        let setting = |env_key: &str, key: &str, fallback: &str| {
            std::env::var(env_key).unwrap_or_else(|_| {
                config
                    .get_string(key)
                    .unwrap_or_else(|_| fallback.to_string())
            })
        };

        Ok(Config {
            database_url: setting("DATABASE_URL", "database_url", DEFAULT_DATABASE_URL),
            tmdb_api_key: std::env::var("TMDB_API_KEY")
                .or_else(|_| config.get_string("tmdb_api_key"))
                .map_err(|_| anyhow::anyhow!("TMDB_API_KEY environment variable not set"))?,
            tmdb_base_url: setting("TMDB_BASE_URL", "tmdb_base_url", DEFAULT_TMDB_BASE_URL),
            language: setting("TMDB_LANGUAGE", "language", DEFAULT_LANGUAGE),
            region: setting("TMDB_REGION", "region", DEFAULT_REGION),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| config.get_int("port").unwrap_or(3000) as u16),
            request_timeout_secs: std::env::var("TMDB_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or_else(|| config.get_int("request_timeout_secs").unwrap_or(30) as u64),
        })
    }
}
