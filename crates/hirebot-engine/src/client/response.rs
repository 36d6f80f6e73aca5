use hirebot_common::posting::JobPosting;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct JobSearchResponse {
    pub data: Option<SearchData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    pub search_job_cards_by_location: Option<JobCardPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCardPage {
    /// Continuation token; only the first page is ever consulted.
    #[serde(default)]
    pub next_token: Option<String>,
    #[serde(default)]
    pub job_cards: Option<Vec<JobPosting>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
}

impl JobSearchResponse {
    /// Postings of the first page.
    ///
    /// A page without cards is an empty result. A body without the search
    /// field at all is malformed.
    pub fn into_postings(self) -> Result<Vec<JobPosting>, String> {
        let page = self
            .data
            .and_then(|data| data.search_job_cards_by_location)
            .ok_or_else(|| {
                let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
                if messages.is_empty() {
                    "response has no searchJobCardsByLocation field".to_string()
                } else {
                    format!("search failed: {}", messages.join("; "))
                }
            })?;
        Ok(page.job_cards.unwrap_or_default())
    }
}
