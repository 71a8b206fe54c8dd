use config::{Config, ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: String,
    pub property_number_prefix: String,
    pub property_number_width: usize,
    pub db_pool_size: u32,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env file if present
        Config::builder()
            .set_default("port", 8080)?
            .set_default("admin_username", "admin")?
            .set_default("property_number_prefix", "MDP-")?
            .set_default("property_number_width", 4)?
            .set_default("db_pool_size", 10)?
            .add_source(Environment::default())
            .build()?
            .try_deserialize()
    }
}
