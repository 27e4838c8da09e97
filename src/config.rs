use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    pub news: NewsConfig,
    pub users: UserStoreConfig,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewsConfig {
    /// Key for the news search API. May be left empty here and supplied
    /// through the NEWSDATA_API_KEY environment variable instead.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_news_base_url")]
    pub base_url: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Maximum number of articles returned per fetch
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_news_base_url() -> String {
    "https://newsdata.io/api/1/latest".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserStoreConfig {
    /// Base URL of the resource API holding user records
    pub base_url: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
