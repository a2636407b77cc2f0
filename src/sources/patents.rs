use super::{fetch_json, join_url};
use crate::types::Result;
use serde::Deserialize;
use serde_json::json;

/// Page size requested from the patent search
pub const PER_PAGE: usize = 200;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatentRecord {
    pub patent_id: Option<String>,
    pub patent_title: Option<String>,
    /// `YYYY-MM-DD`
    pub patent_date: Option<String>,
    pub assignees: Vec<Assignee>,
    pub cpcs: Vec<Cpc>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Assignee {
    pub assignee_organization: Option<String>,
    pub assignee_country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Cpc {
    pub cpc_subsection_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    // PatentsView sends `null` rather than `[]` when nothing matches
    #[serde(default)]
    patents: Option<Vec<PatentRecord>>,
}

/// Client for the PatentsView query API
#[derive(Clone)]
pub struct PatentsClient {
    http: reqwest::Client,
    base_url: String,
}

impl PatentsClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Patents whose title mentions `term`
    pub async fn search_titles(&self, term: &str) -> Result<Vec<PatentRecord>> {
        let body = json!({
            "q": {"_text_any": {"patent_title": term}},
            "f": [
                "patent_id",
                "patent_title",
                "patent_date",
                "cpcs.cpc_subsection_id",
                "assignees.assignee_organization",
                "assignees.assignee_country",
            ],
            "o": {"per_page": PER_PAGE},
        });

        let request = self
            .http
            .post(join_url(&self.base_url, "patents/query"))
            .json(&body);

        let response: QueryResponse = fetch_json("PatentsView", request).await?;
        Ok(response.patents.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_patents_is_empty() {
        let response: QueryResponse =
            serde_json::from_value(json!({"patents": null, "count": 0})).unwrap();
        assert!(response.patents.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_partial_record() {
        let record: PatentRecord = serde_json::from_value(json!({
            "patent_title": "Extended release metformin",
            "assignees": [{"assignee_organization": "Acme"}]
        }))
        .unwrap();
        assert_eq!(record.assignees.len(), 1);
        assert!(record.cpcs.is_empty());
        assert!(record.assignees[0].assignee_country.is_none());
    }
}
