use super::{fetch_json, join_url};
use crate::types::Result;
use serde::Deserialize;

/// Maximum number of studies pulled per subject
pub const MAX_STUDIES: usize = 500;

/// One registered study, flattened from the ClinicalTrials.gov v2 schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialRecord {
    pub phases: Vec<String>,
    pub overall_status: Option<String>,
    /// `YYYY-MM` or `YYYY-MM-DD`
    pub start_date: Option<String>,
    pub lead_sponsor: Option<String>,
    pub countries: Vec<String>,
    pub enrollment: Option<u64>,
}

impl TrialRecord {
    pub fn start_year(&self) -> Option<&str> {
        self.start_date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
    }
}

// Wire format

#[derive(Debug, Deserialize)]
struct StudiesResponse {
    #[serde(default)]
    studies: Vec<Study>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Study {
    #[serde(default)]
    protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProtocolSection {
    status_module: StatusModule,
    sponsor_collaborators_module: SponsorModule,
    design_module: DesignModule,
    contacts_locations_module: LocationsModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatusModule {
    overall_status: Option<String>,
    start_date_struct: Option<DateStruct>,
}

#[derive(Debug, Deserialize)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SponsorModule {
    lead_sponsor: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DesignModule {
    phases: Vec<String>,
    enrollment_info: Option<EnrollmentInfo>,
}

#[derive(Debug, Deserialize)]
struct EnrollmentInfo {
    count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocationsModule {
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    country: Option<String>,
}

impl From<Study> for TrialRecord {
    fn from(study: Study) -> Self {
        let p = study.protocol_section;
        Self {
            phases: p.design_module.phases,
            overall_status: p.status_module.overall_status,
            start_date: p.status_module.start_date_struct.and_then(|d| d.date),
            lead_sponsor: p.sponsor_collaborators_module.lead_sponsor.and_then(|s| s.name),
            countries: p
                .contacts_locations_module
                .locations
                .into_iter()
                .filter_map(|l| l.country)
                .collect(),
            enrollment: p.design_module.enrollment_info.and_then(|e| e.count),
        }
    }
}

/// Client for the ClinicalTrials.gov study search API
#[derive(Clone)]
pub struct ClinicalTrialsClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClinicalTrialsClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Studies mentioning `term`, up to [`MAX_STUDIES`]
    pub async fn search(&self, term: &str) -> Result<Vec<TrialRecord>> {
        let request = self
            .http
            .get(join_url(&self.base_url, "studies"))
            .query(&[
                ("query.term", term.to_string()),
                ("pageSize", MAX_STUDIES.to_string()),
                ("format", "json".to_string()),
            ]);

        let response: StudiesResponse = fetch_json("ClinicalTrials.gov", request).await?;
        tracing::debug!(term, studies = response.studies.len(), "Fetched clinical trials");

        Ok(response.studies.into_iter().map(TrialRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_study() {
        let body = json!({
            "studies": [{
                "protocolSection": {
                    "statusModule": {
                        "overallStatus": "COMPLETED",
                        "startDateStruct": {"date": "2019-03"}
                    },
                    "sponsorCollaboratorsModule": {"leadSponsor": {"name": "Pfizer"}},
                    "designModule": {"phases": ["PHASE3"], "enrollmentInfo": {"count": 120}},
                    "contactsLocationsModule": {
                        "locations": [{"country": "United States"}, {"city": "Nowhere"}]
                    }
                }
            }, {}]
        });

        let response: StudiesResponse = serde_json::from_value(body).unwrap();
        let records: Vec<TrialRecord> = response.studies.into_iter().map(Into::into).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phases, vec!["PHASE3"]);
        assert_eq!(records[0].start_year(), Some("2019"));
        assert_eq!(records[0].lead_sponsor.as_deref(), Some("Pfizer"));
        assert_eq!(records[0].countries, vec!["United States"]);
        assert_eq!(records[0].enrollment, Some(120));
        assert_eq!(records[1], TrialRecord::default());
    }
}
