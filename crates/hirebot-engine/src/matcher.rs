//! City matching of job postings.
//!
//! Tags and postings are compared after normalization: lower-cased, with
//! every character outside `a-z` removed. A posting matches when its
//! normalized JSON text contains a normalized tag anywhere.

use hirebot_common::posting::JobPosting;
use serde::{Deserialize, Serialize};

/// What an empty tag list matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyTagPolicy {
    /// No tags, no match: polling keeps waiting.
    #[default]
    MatchNothing,
    /// No tags means any city is acceptable.
    MatchEverything,
}

pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CityMatcher {
    policy: EmptyTagPolicy,
}

impl CityMatcher {
    pub fn new(policy: EmptyTagPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EmptyTagPolicy {
        self.policy
    }

    /// First posting, in response order, containing any tag.
    ///
    /// Tags are searched in the posting's JSON text, field names included,
    /// so a tag like "city" or "title" matches every posting.
    pub fn find_match<'a>(
        &self,
        postings: &'a [JobPosting],
        city_tags: &[String],
    ) -> Option<&'a JobPosting> {
        let tags: Vec<String> = city_tags
            .iter()
            .map(|tag| normalize(tag))
            .filter(|tag| !tag.is_empty())
            .collect();

        if tags.is_empty() {
            return match self.policy {
                EmptyTagPolicy::MatchNothing => None,
                EmptyTagPolicy::MatchEverything => postings.first(),
            };
        }

        postings.iter().find(|posting| {
            let text = normalize(&posting_text(posting));
            tags.iter().any(|tag| text.contains(tag.as_str()))
        })
    }
}

fn posting_text(posting: &JobPosting) -> String {
    serde_json::to_string(posting).unwrap_or_else(|_| {
        format!(
            "{} {} {} {}",
            posting.job_id, posting.title, posting.city, posting.distance
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(id: &str, city: &str) -> JobPosting {
        JobPosting {
            job_id: id.to_string(),
            title: "Warehouse Associate".to_string(),
            city: city.to_string(),
            distance: 3.2,
        }
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn normalize_strips_case_digits_and_punctuation() {
        assert_eq!(normalize("Saint-Hubert"), "sainthubert");
        assert_eq!(normalize("SAINT HUBERT"), "sainthubert");
        assert_eq!(normalize("sainthubert123"), "sainthubert");
        assert_eq!(normalize("Montréal"), "montral");
    }

    #[test]
    fn field_names_are_part_of_the_text() {
        let matcher = CityMatcher::default();
        let postings = [posting("1", "Ottawa"), posting("2", "Kanata")];
        assert_eq!(matcher.find_match(&postings, &tags(&["City"])), Some(&postings[0]));
    }

    #[test]
    fn matching_ignores_case_and_punctuation() {
        let matcher = CityMatcher::default();
        let hyphen = tags(&["Saint-Hubert"]);

        let upper = [posting("1", "SAINT HUBERT")];
        assert_eq!(matcher.find_match(&upper, &hyphen), Some(&upper[0]));

        let digits = [posting("2", "sainthubert123")];
        assert_eq!(matcher.find_match(&digits, &hyphen), Some(&digits[0]));
    }

    #[test]
    fn returns_matching_posting_not_first() {
        let matcher = CityMatcher::default();
        let postings = [posting("1", "Toronto"), posting("2", "Ottawa")];
        let found = matcher.find_match(&postings, &tags(&["ottawa"]));
        assert_eq!(found.map(|p| p.job_id.as_str()), Some("2"));
    }

    #[test]
    fn response_order_beats_tag_order() {
        let matcher = CityMatcher::default();
        let postings = [posting("1", "Brampton"), posting("2", "Toronto")];
        let found = matcher.find_match(&postings, &tags(&["Toronto", "Brampton"]));
        assert_eq!(found.map(|p| p.job_id.as_str()), Some("1"));
    }

    #[test]
    fn no_postings_no_match() {
        let matcher = CityMatcher::default();
        assert!(matcher.find_match(&[], &tags(&["Toronto"])).is_none());
    }

    #[test]
    fn empty_tags_match_nothing_by_default() {
        let matcher = CityMatcher::default();
        let postings = [posting("1", "Toronto")];
        assert!(matcher.find_match(&postings, &[]).is_none());
        assert!(matcher.find_match(&postings, &tags(&["--", "42"])).is_none());
    }

    #[test]
    fn empty_tags_can_match_everything() {
        let matcher = CityMatcher::new(EmptyTagPolicy::MatchEverything);
        let postings = [posting("1", "Toronto"), posting("2", "Ottawa")];
        let found = matcher.find_match(&postings, &[]);
        assert_eq!(found.map(|p| p.job_id.as_str()), Some("1"));
        assert!(matcher.find_match(&[], &[]).is_none());
    }
}
