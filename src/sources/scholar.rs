use super::{fetch_json, join_url};
use crate::types::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Paper {
    pub title: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

/// Client for the Semantic Scholar paper search API
#[derive(Clone)]
pub struct ScholarClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScholarClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Paper>> {
        let request = self
            .http
            .get(join_url(&self.base_url, "paper/search"))
            .query(&[
                ("query", query.to_string()),
                ("limit", limit.to_string()),
                ("fields", "title,year".to_string()),
            ]);

        let response: SearchResponse = fetch_json("Semantic Scholar", request).await?;
        Ok(response.data)
    }
}
