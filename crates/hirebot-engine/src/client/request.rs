use chrono::NaiveDate;
use hirebot_common::settings::{ANY_JOB_TYPE, Settings};
use serde::Serialize;
use thiserror::Error;

use crate::config::ClientConfig;

pub const OPERATION_NAME: &str = "searchJobCardsByLocation";

/// Weekly hours accepted by every search.
const HOURS_PER_WEEK: (u32, u32) = (0, 80);

const SEARCH_QUERY: &str = "query searchJobCardsByLocation($searchJobRequest: SearchJobRequest!) {
  searchJobCardsByLocation(searchJobRequest: $searchJobRequest) {
    nextToken
    jobCards {
      jobId
      jobTitle
      city
      distance
    }
  }
}";

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Coordinates ({lat}, {lng}) are out of range")]
    Coordinates { lat: f64, lng: f64 },
    #[error("Job type filter is empty")]
    EmptyJobType,
    #[error("Page size must be positive")]
    PageSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlQuery {
    pub operation_name: &'static str,
    pub variables: SearchVariables,
    pub query: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchVariables {
    pub search_job_request: SearchJobRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchJobRequest {
    pub locale: String,
    pub country: String,
    pub key_words: String,
    pub equal_filters: Vec<FilterItem>,
    pub contain_filters: Vec<FilterItem>,
    pub range_filters: Vec<RangeFilter>,
    pub or_filters: Vec<FilterItem>,
    pub date_filters: Vec<DateFilter>,
    pub sorters: Vec<Sorter>,
    pub page_size: u32,
    pub geo_query_clause: GeoQuery,
    pub consolidate_schedule: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterItem {
    pub key: String,
    pub val: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeFilter {
    pub key: String,
    pub range: NumericRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericRange {
    pub minimum: u32,
    pub maximum: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateFilter {
    pub key: String,
    pub range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sorter {
    pub field_name: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoQuery {
    pub lat: f64,
    pub lng: f64,
    pub unit: String,
    pub distance: u32,
}

/// Builds the search query from typed settings.
#[derive(Debug, Clone)]
pub struct SearchRequestBuilder {
    locale: String,
    country: String,
    page_size: u32,
    geo_unit: String,
}

impl SearchRequestBuilder {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            country: config.country.clone(),
            page_size: config.page_size,
            geo_unit: config.geo_unit.clone(),
        }
    }

    /// Query for postings starting on or after `today`.
    pub fn build(&self, settings: &Settings, today: NaiveDate) -> Result<GraphQlQuery, RequestError> {
        let coords = settings.coordinates;
        let valid_coords = coords.lat.is_finite()
            && coords.lng.is_finite()
            && (-90.0..=90.0).contains(&coords.lat)
            && (-180.0..=180.0).contains(&coords.lng);
        if !valid_coords {
            return Err(RequestError::Coordinates {
                lat: coords.lat,
                lng: coords.lng,
            });
        }
        if self.page_size == 0 {
            return Err(RequestError::PageSize);
        }

        let job_type = settings.job_type_filter.trim();
        if job_type.is_empty() {
            return Err(RequestError::EmptyJobType);
        }

        let mut contain_filters = vec![FilterItem {
            key: "isPrivateSchedule".to_string(),
            val: vec!["false".to_string()],
        }];
        if !job_type.eq_ignore_ascii_case(ANY_JOB_TYPE) {
            contain_filters.push(FilterItem {
                key: "jobType".to_string(),
                val: vec![job_type.to_string()],
            });
        }

        Ok(GraphQlQuery {
            operation_name: OPERATION_NAME,
            variables: SearchVariables {
                search_job_request: SearchJobRequest {
                    locale: self.locale.clone(),
                    country: self.country.clone(),
                    key_words: String::new(),
                    equal_filters: Vec::new(),
                    contain_filters,
                    range_filters: vec![RangeFilter {
                        key: "hoursPerWeek".to_string(),
                        range: NumericRange {
                            minimum: HOURS_PER_WEEK.0,
                            maximum: HOURS_PER_WEEK.1,
                        },
                    }],
                    or_filters: Vec::new(),
                    date_filters: vec![DateFilter {
                        key: "firstDayOnSite".to_string(),
                        range: DateRange {
                            start_date: today.format("%Y-%m-%d").to_string(),
                        },
                    }],
                    sorters: Vec::new(),
                    page_size: self.page_size,
                    geo_query_clause: GeoQuery {
                        lat: coords.lat,
                        lng: coords.lng,
                        unit: self.geo_unit.clone(),
                        distance: settings.radius(),
                    },
                    consolidate_schedule: true,
                },
            },
            query: SEARCH_QUERY,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hirebot_common::settings::Coordinates;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn builder() -> SearchRequestBuilder {
        SearchRequestBuilder::new(&ClientConfig::default())
    }

    #[test]
    fn any_job_type_omits_type_filter() {
        let query = builder().build(&Settings::default(), today()).unwrap();
        let body = serde_json::to_value(&query).unwrap();
        let request = &body["variables"]["searchJobRequest"];

        assert_eq!(body["operationName"], "searchJobCardsByLocation");
        assert_eq!(
            request["containFilters"],
            json!([{"key": "isPrivateSchedule", "val": ["false"]}])
        );
        assert_eq!(
            request["dateFilters"],
            json!([{"key": "firstDayOnSite", "range": {"startDate": "2026-10-18"}}])
        );
        assert_eq!(
            request["rangeFilters"],
            json!([{"key": "hoursPerWeek", "range": {"minimum": 0, "maximum": 80}}])
        );
        assert_eq!(request["pageSize"], 100);
        assert_eq!(request["geoQueryClause"]["distance"], 5);
        assert_eq!(request["geoQueryClause"]["unit"], "km");
    }

    #[test]
    fn concrete_job_type_is_filtered() {
        let settings = Settings {
            job_type_filter: "Full Time".into(),
            ..Settings::default()
        };
        let query = builder().build(&settings, today()).unwrap();
        let filters = &query.variables.search_job_request.contain_filters;
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1].key, "jobType");
        assert_eq!(filters[1].val, vec!["Full Time".to_string()]);
    }

    #[test]
    fn any_sentinel_is_case_insensitive() {
        let settings = Settings {
            job_type_filter: "any".into(),
            ..Settings::default()
        };
        let query = builder().build(&settings, today()).unwrap();
        assert_eq!(query.variables.search_job_request.contain_filters.len(), 1);
    }

    #[test]
    fn unset_or_non_positive_radius_defaults_to_five() {
        for radius in [None, Some(0.0), Some(-3.0)] {
            let settings = Settings {
                search_radius: radius,
                ..Settings::default()
            };
            let query = builder().build(&settings, today()).unwrap();
            assert_eq!(query.variables.search_job_request.geo_query_clause.distance, 5);
        }

        let settings = Settings {
            search_radius: Some(25.0),
            ..Settings::default()
        };
        let query = builder().build(&settings, today()).unwrap();
        assert_eq!(query.variables.search_job_request.geo_query_clause.distance, 25);
    }

    #[test]
    fn rejects_invalid_input() {
        let settings = Settings {
            coordinates: Coordinates {
                lat: 120.0,
                lng: 0.0,
            },
            ..Settings::default()
        };
        assert!(matches!(
            builder().build(&settings, today()),
            Err(RequestError::Coordinates { .. })
        ));

        let settings = Settings {
            job_type_filter: "  ".into(),
            ..Settings::default()
        };
        assert_eq!(
            builder().build(&settings, today()),
            Err(RequestError::EmptyJobType)
        );
    }
}
