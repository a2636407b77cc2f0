use super::{to_prompt_json, Worker, ANALYST_SYSTEM_PROMPT};
use crate::cache::Params;
use crate::llm::LLMClient;
use crate::sources::{Article, NewsClient};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Article fields worth handing to the LLM
#[derive(Debug, Serialize, PartialEq)]
pub struct Headline<'a> {
    pub title: Option<&'a str>,
    pub source: Option<&'a str>,
    pub published_at: Option<&'a str>,
    pub url: Option<&'a str>,
}

pub fn headlines(articles: &[Article]) -> Vec<Headline<'_>> {
    articles
        .iter()
        .map(|a| Headline {
            title: a.title.as_deref(),
            source: a.source.name.as_deref(),
            published_at: a.published_at.as_deref(),
            url: a.url.as_deref(),
        })
        .collect()
}

pub fn no_articles_report(subject: &str) -> String {
    format!("No news articles found for \"{}\".", subject)
}

pub struct WebIntelWorker {
    llm: Arc<dyn LLMClient>,
    client: NewsClient,
}

impl WebIntelWorker {
    pub fn new(llm: Arc<dyn LLMClient>, client: NewsClient) -> Self {
        Self { llm, client }
    }

    fn prompt(subject: &str, headlines: &[Headline<'_>]) -> String {
        format!(
            "The {count} most recent news items about \"{subject}\":\n\n{data}\n\n\
             Write a Web Intelligence Report with these sections:\n\
             1. Recent News Highlights: 5 items, each a headline and a one-line summary\n\
             2. A 100-150 word summary of what these developments mean\n\
             3. Potential Impacts on market, patents, trials, supply and investor interest",
            count = headlines.len(),
            data = to_prompt_json(&headlines)
        )
    }
}

#[async_trait]
impl Worker for WebIntelWorker {
    fn name(&self) -> &str {
        "web_intel"
    }

    fn display_name(&self) -> &str {
        "Web Intelligence"
    }

    fn description(&self) -> &str {
        "Recent news coverage and its likely impact"
    }

    fn default_args(&self) -> Params {
        Params::from([("page_size".to_string(), DEFAULT_PAGE_SIZE.to_string())])
    }

    async fn invoke(&self, subject: &str, params: &Params) -> Result<Value> {
        let page_size = match params.get("page_size") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid page_size '{}'", raw)))?,
            None => DEFAULT_PAGE_SIZE,
        };

        let articles = match self.client.everything(subject, page_size).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!(worker = self.name(), subject, error = %e, "News search failed, continuing without data");
                Vec::new()
            }
        };

        if articles.is_empty() {
            return Ok(Value::String(no_articles_report(subject)));
        }

        let report = self
            .llm
            .generate_with_system(
                ANALYST_SYSTEM_PROMPT,
                &Self::prompt(subject, &headlines(&articles)),
            )
            .await?;

        Ok(Value::String(report))
    }
}
