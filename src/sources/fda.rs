use super::{fetch_json_optional, join_url};
use crate::types::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct NdcResponse {
    #[serde(default)]
    results: Vec<NdcProduct>,
}

#[derive(Debug, Deserialize)]
struct NdcProduct {
    labeler_name: Option<String>,
}

/// Client for the openFDA National Drug Code directory
#[derive(Clone)]
pub struct FdaClient {
    http: reqwest::Client,
    base_url: String,
}

impl FdaClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Distinct labelers marketing a product with `ingredient`, in first-seen order
    pub async fn labelers(&self, ingredient: &str, limit: usize) -> Result<Vec<String>> {
        let request = self
            .http
            .get(join_url(&self.base_url, "drug/ndc.json"))
            .query(&[
                ("search", format!("active_ingredients.name:{}", ingredient)),
                ("limit", limit.to_string()),
            ]);

        // openFDA answers 404 when nothing matches
        let Some(response) = fetch_json_optional::<NdcResponse>("openFDA", request).await? else {
            return Ok(Vec::new());
        };

        let mut labelers: Vec<String> = Vec::new();
        for name in response.results.into_iter().filter_map(|p| p.labeler_name) {
            if !labelers.contains(&name) {
                labelers.push(name);
            }
        }
        Ok(labelers)
    }
}
