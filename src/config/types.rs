use serde::{Deserialize, Serialize};

/// Main configuration structure for Listing Harvester
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the listings come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root that search paths are appended to
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Comma-separated list of city names, e.g. "milano, roma"
    pub cities: String,
}

impl SourceConfig {
    /// Splits the configured city list into URL-ready slugs
    ///
    /// Names are trimmed and lowercased, empty entries are dropped and
    /// duplicates keep their first position.
    pub fn city_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for raw in self.cities.split(',') {
            let name = raw.trim().to_lowercase();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of result pages fetched at once for one seed URL
    #[serde(rename = "page-concurrency", default = "default_page_concurrency")]
    pub page_concurrency: u32,

    /// Number of work items pulled per drain iteration
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Upper bound for a single batch commit (seconds)
    #[serde(
        rename = "transaction-timeout-secs",
        default = "default_transaction_timeout_secs"
    )]
    pub transaction_timeout_secs: u64,

    /// Consecutive rolled-back commits tolerated before a drain gives up
    #[serde(rename = "max-commit-failures", default = "default_max_commit_failures")]
    pub max_commit_failures: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_concurrency: default_page_concurrency(),
            batch_size: default_batch_size(),
            transaction_timeout_secs: default_transaction_timeout_secs(),
            max_commit_failures: default_max_commit_failures(),
        }
    }
}

fn default_page_concurrency() -> u32 {
    4
}

fn default_batch_size() -> u32 {
    50
}

fn default_transaction_timeout_secs() -> u64 {
    200
}

fn default_max_commit_failures() -> u32 {
    3
}

/// User agent identification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ListingHarvester".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "ops@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Reporting/trigger HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:4000".to_string()
}
