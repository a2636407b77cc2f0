use super::{report_text, SynthesisInputs, SynthesisWorker};
use crate::llm::LLMClient;
use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Characters of each report forwarded as context
const EXCERPT_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You are an innovation strategist for a pharmaceutical portfolio team. \
You answer with a JSON array only, no prose and no markdown.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    pub title: String,
    pub description: String,
}

/// Section heading used for each worker's excerpt
fn section_title(worker: &str) -> &str {
    match worker {
        "iqvia" => "Market Insights",
        "clinical_trials" => "Clinical Trials",
        "patents" => "Patent Landscape",
        "exim" => "Trade Data",
        "web_intel" => "Web Intelligence",
        "internal_knowledge" => "Internal Knowledge",
        other => other,
    }
}

/// First `max` characters of `text`, on a char boundary
fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Context block built from whichever reports are present
pub fn build_context(inputs: &SynthesisInputs) -> String {
    let parts: Vec<String> = inputs
        .present()
        .map(|(name, report)| {
            format!(
                "**{}:**\n{}...",
                section_title(name),
                excerpt(&report_text(report), EXCERPT_CHARS)
            )
        })
        .collect();

    if parts.is_empty() {
        "Limited data available".to_string()
    } else {
        parts.join("\n\n")
    }
}

/// Strip a surrounding markdown code fence, if any
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[start + 3..];
    // Skip the info string (`json`) up to the end of the fence line
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open.trim_start_matches("json"),
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parse the model's answer into opportunities. Anything that is not a JSON
/// array of `{title, description}` yields an empty list.
pub fn parse_opportunities(response: &str) -> Vec<Opportunity> {
    match serde_json::from_str::<Vec<Opportunity>>(strip_code_fence(response)) {
        Ok(opportunities) => opportunities,
        Err(e) => {
            tracing::warn!(error = %e, "Synthesis response was not a valid opportunity list");
            Vec::new()
        }
    }
}

/// Synthesizes the independent reports into 4-6 innovation opportunities
pub struct InnovationStrategyWorker {
    llm: Arc<dyn LLMClient>,
}

impl InnovationStrategyWorker {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    fn prompt(subject: &str, context: &str) -> String {
        format!(
            "Intelligence gathered on {subject}:\n\n{context}\n\n\
             Propose 4 to 6 specific, actionable innovation opportunities. Draw on market gaps, \
             clinical trial openings (indications, phases, geographies), patent expiries or white \
             space, geographic expansion suggested by trade data, emerging trends in the news, and \
             strategic positioning.\n\n\
             Answer with a JSON array where each element is \
             {{\"title\": \"4-8 word opportunity name\", \"description\": \"2-3 sentences backed by the data\"}}."
        )
    }
}

#[async_trait]
impl SynthesisWorker for InnovationStrategyWorker {
    fn name(&self) -> &str {
        "innovation_strategy"
    }

    fn slot_name(&self) -> &str {
        "innovation_opportunities"
    }

    fn display_name(&self) -> &str {
        "Innovation Strategy"
    }

    async fn synthesize(&self, subject: &str, inputs: &SynthesisInputs) -> Result<Value> {
        let context = build_context(inputs);
        let response = self
            .llm
            .generate_with_system(SYSTEM_PROMPT, &Self::prompt(subject, &context))
            .await?;

        let opportunities = parse_opportunities(&response);
        tracing::info!(
            subject,
            inputs = inputs.present_count(),
            opportunities = opportunities.len(),
            "Synthesized innovation opportunities"
        );

        Ok(serde_json::to_value(opportunities).unwrap_or_else(|_| Value::Array(Vec::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[2]\n```"), "[2]");
        assert_eq!(strip_code_fence("Here you go:\n```json\n[3]\n```\nEnjoy"), "[3]");
        assert_eq!(strip_code_fence("  [4]  "), "[4]");
    }

    #[test]
    fn test_parse_opportunities() {
        let raw = "```json\n[{\"title\": \"Pediatric formulation\", \"description\": \"Gap.\"}]\n```";
        let parsed = parse_opportunities(raw);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "Pediatric formulation");

        assert!(parse_opportunities("I cannot help with that").is_empty());
        assert!(parse_opportunities("{\"title\": \"not a list\"}").is_empty());
    }

    #[test]
    fn test_context_uses_present_reports_only() {
        let inputs = SynthesisInputs {
            query: "q".to_string(),
            reports: BTreeMap::from([
                ("patents".to_string(), Some(json!("x".repeat(800)))),
                ("exim".to_string(), None),
            ]),
        };

        let context = build_context(&inputs);
        assert!(context.starts_with("**Patent Landscape:**"));
        assert!(!context.contains("Trade Data"));
        assert!(context.contains(&format!("{}...", "x".repeat(EXCERPT_CHARS))));
        assert!(!context.contains(&"x".repeat(EXCERPT_CHARS + 1)));
    }

    #[test]
    fn test_context_without_reports() {
        assert_eq!(build_context(&SynthesisInputs::default()), "Limited data available");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("hi", 10), "hi");
    }
}
