use super::exim::DEFAULT_HS_CODE;
use super::{count, to_prompt_json, Worker, ANALYST_SYSTEM_PROMPT};
use crate::cache::Params;
use crate::llm::LLMClient;
use crate::sources::comtrade::TradeFlow;
use crate::sources::{Paper, Sources, TradeRecord, TrialRecord};
use crate::types::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

const MAX_COMPETITORS: usize = 5;
const LABELER_LIMIT: usize = 50;
const PAPER_LIMIT: usize = 100;
const TRADE_YEAR: i32 = 2022;

#[derive(Debug, Serialize, PartialEq)]
pub struct TrendPoint {
    pub year: String,
    pub trials: usize,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct MarketSnapshot {
    pub competitors: Vec<String>,
    pub trial_trend: Vec<TrendPoint>,
    pub export_trade_value: f64,
    pub research_trend: BTreeMap<i32, usize>,
}

pub fn trial_trend(trials: &[TrialRecord]) -> Vec<TrendPoint> {
    let mut years = BTreeMap::new();
    for year in trials.iter().filter_map(TrialRecord::start_year) {
        count(&mut years, year);
    }
    years
        .into_iter()
        .map(|(year, trials)| TrendPoint { year, trials })
        .collect()
}

pub fn research_trend(papers: &[Paper]) -> BTreeMap<i32, usize> {
    let mut years = BTreeMap::new();
    for year in papers.iter().filter_map(|p| p.year) {
        *years.entry(year).or_insert(0) += 1;
    }
    years
}

pub fn total_trade_value(records: &[TradeRecord]) -> f64 {
    records.iter().map(|r| r.trade_value).sum()
}

fn or_empty<T: Default, E: Display>(worker: &str, what: &str, result: std::result::Result<T, E>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(worker, source = what, error = %e, "Market data fetch failed, continuing without it");
        T::default()
    })
}

/// Market insights: competitors, trial momentum, trade volume and research activity
pub struct MarketInsightsWorker {
    llm: Arc<dyn LLMClient>,
    sources: Sources,
}

impl MarketInsightsWorker {
    pub fn new(llm: Arc<dyn LLMClient>, sources: Sources) -> Self {
        Self { llm, sources }
    }

    async fn snapshot(&self, subject: &str) -> MarketSnapshot {
        let (labelers, trials, trade, papers) = tokio::join!(
            self.sources.fda.labelers(subject, LABELER_LIMIT),
            self.sources.clinical_trials.search(subject),
            self.sources
                .comtrade
                .annual(DEFAULT_HS_CODE, TRADE_YEAR, TradeFlow::Exports),
            self.sources.scholar.search(subject, PAPER_LIMIT),
        );

        let mut competitors = or_empty(self.name(), "openFDA", labelers);
        competitors.truncate(MAX_COMPETITORS);

        MarketSnapshot {
            competitors,
            trial_trend: trial_trend(&or_empty(self.name(), "ClinicalTrials.gov", trials)),
            export_trade_value: total_trade_value(&or_empty(self.name(), "UN Comtrade", trade)),
            research_trend: research_trend(&or_empty(self.name(), "Semantic Scholar", papers)),
        }
    }

    fn prompt(subject: &str, snapshot: &MarketSnapshot) -> String {
        format!(
            "Market data collected for **{subject}**:\n\n{data}\n\n\
             `competitors` are labelers marketing the ingredient, `trial_trend` counts trials by \
             start year, `export_trade_value` is the {TRADE_YEAR} global export value in USD of the \
             medicaments commodity class, `research_trend` counts papers by year.\n\n\
             Write a Market Insights Report with these sections:\n\
             1. Top Competitors\n\
             2. Market Drivers and Barriers\n\
             3. Final Summary",
            data = to_prompt_json(snapshot)
        )
    }
}

#[async_trait]
impl Worker for MarketInsightsWorker {
    fn name(&self) -> &str {
        "iqvia"
    }

    fn display_name(&self) -> &str {
        "Market Insights"
    }

    fn description(&self) -> &str {
        "Competitors, trial momentum, trade volume and research activity"
    }

    async fn invoke(&self, subject: &str, _params: &Params) -> Result<Value> {
        let snapshot = self.snapshot(subject).await;
        let report = self
            .llm
            .generate_with_system(ANALYST_SYSTEM_PROMPT, &Self::prompt(subject, &snapshot))
            .await?;

        Ok(Value::String(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_trend_sorted_by_year() {
        let trial = |date: &str| TrialRecord {
            start_date: Some(date.to_string()),
            ..Default::default()
        };
        let trend = trial_trend(&[trial("2021-01"), trial("2019-05"), trial("2021-07")]);

        assert_eq!(
            trend,
            vec![
                TrendPoint { year: "2019".to_string(), trials: 1 },
                TrendPoint { year: "2021".to_string(), trials: 2 },
            ]
        );
    }

    #[test]
    fn test_research_trend_skips_undated() {
        let papers = vec![
            Paper { title: None, year: Some(2020) },
            Paper { title: None, year: None },
            Paper { title: None, year: Some(2020) },
        ];
        assert_eq!(research_trend(&papers), BTreeMap::from([(2020, 2)]));
    }

    #[test]
    fn test_total_trade_value() {
        let records = vec![
            TradeRecord { trade_value: 1.5, ..Default::default() },
            TradeRecord { trade_value: 2.5, ..Default::default() },
        ];
        assert_eq!(total_trade_value(&records), 4.0);
    }
}
