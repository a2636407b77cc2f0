use super::{count, to_prompt_json, top_counts, Worker, ANALYST_SYSTEM_PROMPT};
use crate::cache::Params;
use crate::llm::LLMClient;
use crate::sources::{PatentRecord, PatentsClient};
use crate::types::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const SAMPLE_TITLES: usize = 10;

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct PatentSummary {
    pub total_patents: usize,
    pub top_assignees: Vec<(String, usize)>,
    pub country_count: BTreeMap<String, usize>,
    pub cpc_count: BTreeMap<String, usize>,
    pub year_count: BTreeMap<String, usize>,
    pub sample_titles: Vec<String>,
}

pub fn analyze_patents(patents: &[PatentRecord]) -> PatentSummary {
    let mut summary = PatentSummary {
        total_patents: patents.len(),
        ..Default::default()
    };
    let mut assignees = BTreeMap::new();

    for patent in patents {
        if let Some(title) = &patent.patent_title {
            if summary.sample_titles.len() < SAMPLE_TITLES {
                summary.sample_titles.push(title.clone());
            }
        }
        if let Some(year) = patent
            .patent_date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
        {
            count(&mut summary.year_count, year);
        }
        for assignee in &patent.assignees {
            count(
                &mut assignees,
                assignee.assignee_organization.as_deref().unwrap_or("Unknown"),
            );
            count(
                &mut summary.country_count,
                assignee.assignee_country.as_deref().unwrap_or("Unknown"),
            );
        }
        for cpc in &patent.cpcs {
            count(
                &mut summary.cpc_count,
                cpc.cpc_subsection_id.as_deref().unwrap_or("Unknown"),
            );
        }
    }

    summary.top_assignees = top_counts(&assignees, 10);
    summary
}

pub struct PatentWorker {
    llm: Arc<dyn LLMClient>,
    client: PatentsClient,
}

impl PatentWorker {
    pub fn new(llm: Arc<dyn LLMClient>, client: PatentsClient) -> Self {
        Self { llm, client }
    }

    fn prompt(subject: &str, summary: &PatentSummary) -> String {
        format!(
            "Patent data for **{subject}**:\n\n{data}\n\n\
             Write a Patent Intelligence Report with these sections:\n\
             1. Total patent count\n\
             2. Top assignees with a short interpretation\n\
             3. Top 5 assignee countries\n\
             4. Dominant CPC technology classes\n\
             5. A markdown table of year vs. patents granted\n\
             6. Filing trend (rising, falling or flat)\n\
             7. An 80-120 word patent landscape summary",
            data = to_prompt_json(summary)
        )
    }
}

#[async_trait]
impl Worker for PatentWorker {
    fn name(&self) -> &str {
        "patents"
    }

    fn display_name(&self) -> &str {
        "Patent Landscape"
    }

    fn description(&self) -> &str {
        "Assignees, technology classes and filing trend of related patents"
    }

    async fn invoke(&self, subject: &str, _params: &Params) -> Result<Value> {
        let patents = match self.client.search_titles(subject).await {
            Ok(patents) => patents,
            Err(e) => {
                tracing::warn!(worker = self.name(), subject, error = %e, "Patent search failed, continuing without data");
                Vec::new()
            }
        };

        let summary = analyze_patents(&patents);
        let report = self
            .llm
            .generate_with_system(ANALYST_SYSTEM_PROMPT, &Self::prompt(subject, &summary))
            .await?;

        Ok(Value::String(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::patents::{Assignee, Cpc};

    #[test]
    fn test_analyze_patents() {
        let patents: Vec<PatentRecord> = (0..12)
            .map(|i| PatentRecord {
                patent_id: Some(i.to_string()),
                patent_title: Some(format!("Formulation {}", i)),
                patent_date: Some(if i % 2 == 0 { "2020-05-01" } else { "2022-01-09" }.to_string()),
                assignees: vec![Assignee {
                    assignee_organization: Some(if i < 8 { "Acme" } else { "Globex" }.to_string()),
                    assignee_country: None,
                }],
                cpcs: vec![Cpc {
                    cpc_subsection_id: Some("A61".to_string()),
                }],
            })
            .collect();

        let summary = analyze_patents(&patents);
        assert_eq!(summary.total_patents, 12);
        assert_eq!(summary.sample_titles.len(), SAMPLE_TITLES);
        assert_eq!(summary.year_count["2020"], 6);
        assert_eq!(summary.top_assignees[0], ("Acme".to_string(), 8));
        assert_eq!(summary.country_count["Unknown"], 12);
        assert_eq!(summary.cpc_count["A61"], 12);
    }
}
