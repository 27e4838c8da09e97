use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::NewsConfig;
use crate::models::Article;

const GENERIC_FAILURE: &str = "failed to fetch news from the upstream API";

/// Categories the feed can be filtered by. `General` is the unfiltered
/// front page and is never sent upstream as a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    General,
    Business,
    Entertainment,
    Sports,
    Technology,
}

impl Category {
    /// Parse a client-supplied category key. The set is closed; unknown
    /// keys are rejected rather than passed upstream.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "general" => Some(Category::General),
            "business" => Some(Category::Business),
            "entertainment" => Some(Category::Entertainment),
            "sports" => Some(Category::Sports),
            "technology" => Some(Category::Technology),
            _ => None,
        }
    }

    /// The query-parameter value, or `None` for the unfiltered front page.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            Category::General => None,
            Category::Business => Some("business"),
            Category::Entertainment => Some("entertainment"),
            Category::Sports => Some("sports"),
            Category::Technology => Some("technology"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("general"))
    }
}

/// One page of normalized articles plus the upstream's pagination cursor.
#[derive(Debug, Serialize)]
pub struct NewsPage {
    pub articles: Vec<Article>,
    #[serde(rename = "nextPage")]
    pub next_page: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("news API key not configured")]
    MissingApiKey,
    /// Every attempt failed, or the upstream rejected the key outright.
    #[error("{0}")]
    Upstream(String),
}

enum AttemptError {
    /// Worth trying the next, looser parameter set.
    Retryable(String),
    /// No looser parameter set can succeed (e.g. a rejected API key).
    Fatal(String),
}

pub struct NewsFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    country: String,
    language: String,
    page_size: usize,
}

impl NewsFetcher {
    pub fn new(config: &NewsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Newsdeck/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            country: config.country.clone(),
            language: config.language.clone(),
            page_size: config.page_size,
        }
    }

    /// Fetch one page of headlines for `category`.
    ///
    /// Tries up to three query-parameter sets, most specific first, and
    /// stops at the first well-shaped response. Individual attempt
    /// failures are logged and swallowed; only exhausting every attempt
    /// (or a clearly non-retryable rejection) surfaces an error, carrying
    /// the last attempt's message.
    pub async fn fetch(
        &self,
        category: Category,
        page: Option<&str>,
    ) -> Result<NewsPage, NewsError> {
        if self.api_key.trim().is_empty() {
            return Err(NewsError::MissingApiKey);
        }

        info!(category = %category, "Fetching headlines");

        let mut last_error = String::new();
        for (attempt, params) in self.attempt_params(category, page).into_iter().enumerate() {
            match self.try_fetch(&params).await {
                Ok(page) => return Ok(page),
                Err(AttemptError::Fatal(message)) => {
                    warn!(attempt = attempt + 1, error = %message, "Upstream rejected the request; not retrying");
                    return Err(NewsError::Upstream(message));
                }
                Err(AttemptError::Retryable(message)) => {
                    warn!(attempt = attempt + 1, error = %message, "Headline attempt failed");
                    last_error = message;
                }
            }
        }

        if last_error.is_empty() {
            last_error = GENERIC_FAILURE.to_string();
        }
        Err(NewsError::Upstream(last_error))
    }

    /// The fallback sequence, most specific first: country is dropped for
    /// the second attempt, language too for the third. The category rides
    /// along on every attempt unless it is `General`, as does the page
    /// cursor when one was supplied.
    fn attempt_params(
        &self,
        category: Category,
        page: Option<&str>,
    ) -> Vec<Vec<(&'static str, String)>> {
        let apikey = ("apikey", self.api_key.clone());
        let country = ("country", self.country.clone());
        let language = ("language", self.language.clone());

        let mut sets = vec![
            vec![apikey.clone(), country, language.clone()],
            vec![apikey.clone(), language],
            vec![apikey],
        ];

        for params in &mut sets {
            if let Some(key) = category.as_param() {
                params.push(("category", key.to_string()));
            }
            if let Some(cursor) = page {
                params.push(("page", cursor.to_string()));
            }
        }

        sets
    }

    async fn try_fetch(&self, params: &[(&'static str, String)]) -> Result<NewsPage, AttemptError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;

        // A rejected key fails identically on every looser parameter set.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AttemptError::Fatal(extract_message(&body)));
        }
        if !status.is_success() || body["status"] == "error" {
            return Err(AttemptError::Retryable(extract_message(&body)));
        }

        // The result list key has varied across upstream deployments.
        let results = ["results", "news", "docs"]
            .iter()
            .find_map(|key| body.get(*key))
            .ok_or_else(|| AttemptError::Retryable("response carried no result list".to_string()))?;
        let results = results
            .as_array()
            .ok_or_else(|| AttemptError::Retryable("result list was not a list".to_string()))?;

        let articles = results
            .iter()
            .take(self.page_size)
            .enumerate()
            .map(|(index, raw)| normalize_article(index, raw))
            .collect();

        Ok(NewsPage {
            articles,
            next_page: next_page_cursor(&body),
        })
    }
}

/// Map one raw upstream result onto the uniform article shape, preferring
/// link-like fields and falling back field by field.
fn normalize_article(index: usize, raw: &Value) -> Article {
    let str_field = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|key| raw.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string()
    };

    let url = str_field(&["link", "url"]);

    let mut id = str_field(&["link", "url", "guid"]);
    if id.is_empty() {
        id = index.to_string();
    }

    // The title falls back to the first line of the description, not of
    // the longer content field.
    let description = str_field(&["description"]);
    let mut title = str_field(&["title"]);
    if title.is_empty() {
        title = description.lines().next().unwrap_or_default().to_string();
    }
    if title.is_empty() {
        title = "Untitled".to_string();
    }

    let description = if description.is_empty() {
        str_field(&["content"])
    } else {
        description
    };

    Article {
        id,
        title,
        description,
        url,
        image_url: str_field(&["image_url", "image", "thumbnail"]),
        source: str_field(&["source_id", "source", "source_name"]),
    }
}

/// Pull the most human-readable message out of an upstream error body.
/// Error responses usually nest the text under `results.message`.
fn extract_message(body: &Value) -> String {
    body.pointer("/results/message")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

/// Pagination cursors are strings on current upstream deployments and
/// numbers on older ones.
fn next_page_cursor(body: &Value) -> Option<String> {
    match body.get("nextPage") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
