//! Remote Data Sources
//!
//! Thin typed clients over the public APIs the workers pull data from. Each
//! client only fetches and deserializes; aggregation lives with the worker
//! that owns the data.
//!
//! All clients share one `reqwest::Client` (connection pool, timeout) and
//! take their base URL from `[sources]` in the configuration so they can be
//! pointed at a mock server.

pub mod clinical_trials;
pub mod comtrade;
pub mod fda;
pub mod news;
pub mod patents;
pub mod scholar;

pub use clinical_trials::{ClinicalTrialsClient, TrialRecord};
pub use comtrade::{ComtradeClient, TradeRecord};
pub use fda::FdaClient;
pub use news::{Article, NewsClient};
pub use patents::{PatentRecord, PatentsClient};
pub use scholar::{Paper, ScholarClient};

use crate::types::{AppError, Result};
use crate::utils::toml_config::SourcesConfig;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Every remote source client, built once from configuration
#[derive(Clone)]
pub struct Sources {
    pub clinical_trials: ClinicalTrialsClient,
    pub fda: FdaClient,
    pub scholar: ScholarClient,
    pub patents: PatentsClient,
    pub comtrade: ComtradeClient,
    pub news: NewsClient,
}

impl Sources {
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("molecule-insight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let news_key = read_key(&config.news_api_key_env);
        let comtrade_key = read_key(&config.comtrade_api_key_env);

        if news_key.is_none() {
            tracing::warn!(
                env = %config.news_api_key_env,
                "News API key not set, web intelligence will report no articles"
            );
        }

        Ok(Self {
            clinical_trials: ClinicalTrialsClient::new(
                http.clone(),
                &config.clinical_trials_url,
            ),
            fda: FdaClient::new(http.clone(), &config.fda_url),
            scholar: ScholarClient::new(http.clone(), &config.scholar_url),
            patents: PatentsClient::new(http.clone(), &config.patents_url),
            comtrade: ComtradeClient::new(http.clone(), &config.comtrade_url, comtrade_key),
            news: NewsClient::new(http, &config.news_url, news_key),
        })
    }
}

fn read_key(env_name: &str) -> Option<String> {
    std::env::var(env_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Send a request and decode a JSON body, mapping HTTP errors to [`AppError::Source`]
pub(crate) async fn fetch_json<T: DeserializeOwned>(source: &str, request: RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::Source(format!("{} request failed: {}", source, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Source(format!("{} returned HTTP {}", source, status)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AppError::Source(format!("{} returned an unexpected body: {}", source, e)))
}

/// Like [`fetch_json`], but an HTTP 404 means "no matches" and yields `None`
pub(crate) async fn fetch_json_optional<T: DeserializeOwned>(
    source: &str,
    request: RequestBuilder,
) -> Result<Option<T>> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::Source(format!("{} request failed: {}", source, e)))?;

    match response.status() {
        StatusCode::NOT_FOUND => Ok(None),
        status if !status.is_success() => Err(AppError::Source(format!(
            "{} returned HTTP {}",
            source, status
        ))),
        _ => response.json::<T>().await.map(Some).map_err(|e| {
            AppError::Source(format!("{} returned an unexpected body: {}", source, e))
        }),
    }
}
