use super::{to_prompt_json, Worker, ANALYST_SYSTEM_PROMPT};
use crate::cache::Params;
use crate::llm::LLMClient;
use crate::sources::comtrade::TradeFlow;
use crate::sources::{ComtradeClient, TradeRecord};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// HS 3004.90: packaged medicaments not elsewhere specified
pub const DEFAULT_HS_CODE: &str = "300490";
pub const DEFAULT_YEARS: &str = "2020,2021,2022,2023";

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq)]
pub struct YearTrade {
    pub import: f64,
    pub export: f64,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct TradeSummary {
    pub yearly_trade: BTreeMap<i32, YearTrade>,
    pub top_exporters: Vec<(String, f64)>,
    pub top_importers: Vec<(String, f64)>,
    pub total_trade_value: f64,
}

fn top_values(values: BTreeMap<String, f64>, n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = values.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

pub fn analyze_trade(records: &[TradeRecord]) -> TradeSummary {
    let mut summary = TradeSummary::default();
    let mut exporters: BTreeMap<String, f64> = BTreeMap::new();
    let mut importers: BTreeMap<String, f64> = BTreeMap::new();

    for record in records {
        let reporter = record.reporter.clone().unwrap_or_else(|| "Unknown".to_string());
        let flow = record.flow.as_deref().map(str::to_lowercase);

        if let Some(year) = record.year {
            let entry = summary.yearly_trade.entry(year).or_default();
            match flow.as_deref() {
                Some("import") => entry.import += record.trade_value,
                Some("export") => entry.export += record.trade_value,
                _ => {}
            }
        }
        match flow.as_deref() {
            Some("import") => *importers.entry(reporter).or_insert(0.0) += record.trade_value,
            Some("export") => *exporters.entry(reporter).or_insert(0.0) += record.trade_value,
            _ => {}
        }
        summary.total_trade_value += record.trade_value;
    }

    summary.top_exporters = top_values(exporters, 10);
    summary.top_importers = top_values(importers, 10);
    summary
}

/// Parse a comma separated year list such as `2020,2021`
pub fn parse_years(raw: &str) -> Result<Vec<i32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid year '{}' in years argument", s)))
        })
        .collect()
}

pub struct EximWorker {
    llm: Arc<dyn LLMClient>,
    client: ComtradeClient,
}

impl EximWorker {
    pub fn new(llm: Arc<dyn LLMClient>, client: ComtradeClient) -> Self {
        Self { llm, client }
    }

    async fn fetch(&self, hs_code: &str, years: &[i32]) -> Vec<TradeRecord> {
        let requests = years
            .iter()
            .map(|year| self.client.annual(hs_code, *year, TradeFlow::Both));
        let results = futures::future::join_all(requests).await;

        let mut records = Vec::new();
        for (year, result) in years.iter().zip(results) {
            match result {
                Ok(mut batch) => records.append(&mut batch),
                Err(e) => {
                    tracing::warn!(worker = self.name(), year, error = %e, "Trade data fetch failed for year");
                }
            }
        }
        records
    }

    fn prompt(subject: &str, hs_code: &str, summary: &TradeSummary) -> String {
        format!(
            "UN Comtrade import/export data (USD) for HS code {hs_code}, \
             the commodity class covering **{subject}**:\n\n{data}\n\n\
             Write an EXIM Trade Report with these sections:\n\
             1. Global demand and supply signals\n\
             2. Top 5 import markets (demand hotspots)\n\
             3. Top 5 exporting countries (supply sources)\n\
             4. Trend: growing, declining or stable\n\
             5. Risk and opportunity flags, such as dependence on a single exporter",
            data = to_prompt_json(summary)
        )
    }
}

#[async_trait]
impl Worker for EximWorker {
    fn name(&self) -> &str {
        "exim"
    }

    fn display_name(&self) -> &str {
        "EXIM Trade"
    }

    fn description(&self) -> &str {
        "Import and export flows for the molecule's commodity class"
    }

    fn default_args(&self) -> Params {
        Params::from([
            ("hs_code".to_string(), DEFAULT_HS_CODE.to_string()),
            ("years".to_string(), DEFAULT_YEARS.to_string()),
        ])
    }

    async fn invoke(&self, subject: &str, params: &Params) -> Result<Value> {
        let hs_code = params
            .get("hs_code")
            .map(String::as_str)
            .unwrap_or(DEFAULT_HS_CODE);
        let years = parse_years(params.get("years").map(String::as_str).unwrap_or(DEFAULT_YEARS))?;

        let records = self.fetch(hs_code, &years).await;
        let summary = analyze_trade(&records);
        let report = self
            .llm
            .generate_with_system(
                ANALYST_SYSTEM_PROMPT,
                &Self::prompt(subject, hs_code, &summary),
            )
            .await?;

        Ok(Value::String(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, flow: &str, reporter: &str, value: f64) -> TradeRecord {
        TradeRecord {
            year: Some(year),
            trade_value: value,
            flow: Some(flow.to_string()),
            reporter: Some(reporter.to_string()),
        }
    }

    #[test]
    fn test_analyze_trade() {
        let records = vec![
            record(2021, "Export", "India", 100.0),
            record(2021, "Import", "USA", 40.0),
            record(2022, "Export", "Germany", 300.0),
            record(2022, "Export", "India", 50.0),
            record(2022, "Re-Export", "Singapore", 5.0),
        ];

        let summary = analyze_trade(&records);
        assert_eq!(summary.yearly_trade[&2021].export, 100.0);
        assert_eq!(summary.yearly_trade[&2021].import, 40.0);
        assert_eq!(summary.yearly_trade[&2022].export, 350.0);
        assert_eq!(summary.top_exporters[0], ("Germany".to_string(), 300.0));
        assert_eq!(summary.top_exporters[1], ("India".to_string(), 150.0));
        assert_eq!(summary.top_importers.len(), 1);
        assert_eq!(summary.total_trade_value, 495.0);
    }

    #[test]
    fn test_parse_years() {
        assert_eq!(parse_years("2020, 2021,").unwrap(), vec![2020, 2021]);
        assert!(parse_years("2020,twenty").is_err());
        assert!(parse_years("").unwrap().is_empty());
    }
}
