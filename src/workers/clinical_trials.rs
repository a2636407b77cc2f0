use super::{count, to_prompt_json, top_counts, Worker, ANALYST_SYSTEM_PROMPT};
use crate::cache::Params;
use crate::llm::LLMClient;
use crate::sources::{ClinicalTrialsClient, TrialRecord};
use crate::types::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Aggregated view of the registered trials for a molecule
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct TrialSummary {
    pub total_trials: usize,
    pub phase_count: BTreeMap<String, usize>,
    pub status_count: BTreeMap<String, usize>,
    pub top_sponsors: Vec<(String, usize)>,
    pub year_count: BTreeMap<String, usize>,
    pub top_countries: Vec<(String, usize)>,
    pub enrollment_total: u64,
}

pub fn analyze_trials(trials: &[TrialRecord]) -> TrialSummary {
    let mut summary = TrialSummary {
        total_trials: trials.len(),
        ..Default::default()
    };
    let mut sponsors = BTreeMap::new();
    let mut countries = BTreeMap::new();

    for trial in trials {
        let phase = trial
            .phases
            .first()
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        count(&mut summary.phase_count, phase);
        count(
            &mut summary.status_count,
            trial.overall_status.as_deref().unwrap_or("Unknown"),
        );
        count(&mut sponsors, trial.lead_sponsor.as_deref().unwrap_or("Unknown"));

        if let Some(year) = trial.start_year() {
            count(&mut summary.year_count, year);
        }
        for country in &trial.countries {
            count(&mut countries, country.as_str());
        }
        summary.enrollment_total += trial.enrollment.unwrap_or(0);
    }

    summary.top_sponsors = top_counts(&sponsors, 10);
    summary.top_countries = top_counts(&countries, 10);
    summary
}

pub struct ClinicalTrialsWorker {
    llm: Arc<dyn LLMClient>,
    client: ClinicalTrialsClient,
}

impl ClinicalTrialsWorker {
    pub fn new(llm: Arc<dyn LLMClient>, client: ClinicalTrialsClient) -> Self {
        Self { llm, client }
    }

    fn prompt(subject: &str, summary: &TrialSummary) -> String {
        format!(
            "Clinical trial registry data for **{subject}**:\n\n{data}\n\n\
             Write a Clinical Trials Report with these sections:\n\
             1. Total trials\n\
             2. Phase distribution\n\
             3. Status distribution\n\
             4. Top 5 sponsors and why they matter\n\
             5. A markdown table of year vs. number of trials started\n\
             6. Leading countries\n\
             7. Enrollment analysis\n\
             8. An 80-120 word clinical landscape summary",
            data = to_prompt_json(summary)
        )
    }
}

#[async_trait]
impl Worker for ClinicalTrialsWorker {
    fn name(&self) -> &str {
        "clinical_trials"
    }

    fn display_name(&self) -> &str {
        "Clinical Trials"
    }

    fn description(&self) -> &str {
        "Phase, status, sponsor and geography breakdown of registered trials"
    }

    async fn invoke(&self, subject: &str, _params: &Params) -> Result<Value> {
        let trials = match self.client.search(subject).await {
            Ok(trials) => trials,
            Err(e) => {
                tracing::warn!(worker = self.name(), subject, error = %e, "Trial search failed, continuing without data");
                Vec::new()
            }
        };

        let summary = analyze_trials(&trials);
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

    fn trial(phase: &str, status: &str, sponsor: &str, date: &str, enrollment: u64) -> TrialRecord {
        TrialRecord {
            phases: vec![phase.to_string()],
            overall_status: Some(status.to_string()),
            start_date: Some(date.to_string()),
            lead_sponsor: Some(sponsor.to_string()),
            countries: vec!["India".to_string(), "France".to_string()],
            enrollment: Some(enrollment),
        }
    }

    #[test]
    fn test_analyze_trials() {
        let trials = vec![
            trial("PHASE3", "COMPLETED", "Pfizer", "2019-03", 100),
            trial("PHASE3", "RECRUITING", "Pfizer", "2021-01-15", 50),
            trial("PHASE1", "COMPLETED", "Novartis", "2021-06", 10),
            TrialRecord::default(),
        ];

        let summary = analyze_trials(&trials);
        assert_eq!(summary.total_trials, 4);
        assert_eq!(summary.phase_count["PHASE3"], 2);
        assert_eq!(summary.phase_count["Unknown"], 1);
        assert_eq!(summary.status_count["COMPLETED"], 2);
        assert_eq!(summary.top_sponsors[0], ("Pfizer".to_string(), 2));
        assert_eq!(summary.year_count["2021"], 2);
        assert!(!summary.year_count.contains_key(""));
        assert_eq!(summary.top_countries[0].1, 3);
        assert_eq!(summary.enrollment_total, 160);
    }

    #[test]
    fn test_analyze_no_trials() {
        let summary = analyze_trials(&[]);
        assert_eq!(summary, TrialSummary::default());
    }
}
