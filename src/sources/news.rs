use super::{fetch_json, join_url};
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Article {
    pub title: Option<String>,
    pub source: ArticleSource,
    pub published_at: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArticleSource {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

/// Client for the NewsAPI `everything` endpoint
#[derive(Clone)]
pub struct NewsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl NewsClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
        }
    }

    /// Most recent English articles matching `query`
    pub async fn everything(&self, query: &str, page_size: usize) -> Result<Vec<Article>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Source("NewsAPI key is not configured".to_string()))?;

        let page_size = page_size.to_string();
        let request = self
            .http
            .get(join_url(&self.base_url, "everything"))
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
            ])
            .header("X-Api-Key", api_key);

        let response: EverythingResponse = fetch_json("NewsAPI", request).await?;
        Ok(response.articles)
    }
}
