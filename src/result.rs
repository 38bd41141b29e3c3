// Search result assembly
// Shapes extraction output into the JSON the API consumers expect

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::extract::Extraction;

// Hotel filter value meaning "search every hotel"
pub const ALL_HOTELS: &str = "-1";

// One vacancy search: hotel filter plus check-in/check-out calendar dates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub hotel: String,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
}

impl SearchRequest {
    pub fn all_hotels(checkin: NaiveDate, checkout: NaiveDate) -> Self {
        Self::for_hotel(ALL_HOTELS, checkin, checkout)
    }

    pub fn for_hotel(hotel: impl Into<String>, checkin: NaiveDate, checkout: NaiveDate) -> Self {
        Self {
            hotel: hotel.into(),
            checkin,
            checkout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "AVAILABLE")]
    Available,

    #[serde(rename = "NO AVAILABILITY")]
    NoAvailability,
}

// Weekend searches also report failed lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekendStatus {
    #[serde(rename = "AVAILABLE")]
    Available,

    #[serde(rename = "NO AVAILABILITY")]
    NoAvailability,

    #[serde(rename = "ERROR")]
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelGroup {
    pub hotel: String,
    pub vacancies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDetails {
    pub hotel_filter: String,
    pub checkin: String,
    pub checkout: String,
    pub hotels_found: usize,
    pub total_vacancies_found: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub has_availability: bool,
    pub status: Availability,
    pub summary: String,
    pub vacancies: Vec<String>,
    pub hotel_groups: Vec<HotelGroup>,
    pub query_details: QueryDetails,
}

// Builds the outward result: vacancies in page order, grouped per hotel,
// with a one-line summary. hasAvailability tracks the vacancy list.
pub fn assemble(request: &SearchRequest, extraction: &Extraction) -> SearchResult {
    let mut groups: Vec<HotelGroup> = Vec::new();
    let mut vacancies = Vec::new();

    for record in &extraction.records {
        vacancies.push(record.full_text.clone());
        match groups.iter_mut().find(|group| group.hotel == record.hotel) {
            Some(group) => group.vacancies.push(record.description.clone()),
            None => groups.push(HotelGroup {
                hotel: record.hotel.clone(),
                vacancies: vec![record.description.clone()],
            }),
        }
    }

    let has_availability = !vacancies.is_empty();
    let summary = if has_availability {
        let names: Vec<&str> = groups.iter().map(|group| group.hotel.as_str()).collect();
        format!(
            "Found vacancies in {} hotel(s): {}",
            groups.len(),
            names.join(", ")
        )
    } else if extraction.saw_sentinel {
        "No rooms available message detected".to_string()
    } else {
        "No vacancy patterns found".to_string()
    };

    let hotels_found = groups.len();
    let total_vacancies_found = vacancies.len();

    SearchResult {
        has_availability,
        status: if has_availability {
            Availability::Available
        } else {
            Availability::NoAvailability
        },
        summary,
        vacancies,
        hotel_groups: groups,
        query_details: QueryDetails {
            hotel_filter: request.hotel.clone(),
            checkin: request.checkin.to_string(),
            checkout: request.checkout.to_string(),
            hotels_found,
            total_vacancies_found,
        },
    }
}

// One weekend of a batch search; error and result are mutually exclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekendOutcome {
    pub weekend_number: usize,
    pub friday: String,
    pub sunday: String,
    pub dates: String,
    pub status: WeekendStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SearchResult>,
}

impl WeekendOutcome {
    pub fn from_result(
        weekend_number: usize,
        friday: NaiveDate,
        sunday: NaiveDate,
        result: SearchResult,
    ) -> Self {
        Self {
            weekend_number,
            friday: friday.to_string(),
            sunday: sunday.to_string(),
            dates: format!("{} to {}", friday, sunday),
            status: if result.has_availability {
                WeekendStatus::Available
            } else {
                WeekendStatus::NoAvailability
            },
            error: None,
            result: Some(result),
        }
    }

    pub fn from_error(
        weekend_number: usize,
        friday: NaiveDate,
        sunday: NaiveDate,
        error: String,
    ) -> Self {
        Self {
            weekend_number,
            friday: friday.to_string(),
            sunday: sunday.to_string(),
            dates: format!("{} to {}", friday, sunday),
            status: WeekendStatus::Error,
            error: Some(error),
            result: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekendBatch {
    pub weekends: Vec<WeekendOutcome>,
    pub total_searched: usize,
    pub with_vacancies: usize,
}

pub fn assemble_weekends(weekends: Vec<WeekendOutcome>) -> WeekendBatch {
    let with_vacancies = weekends
        .iter()
        .filter(|weekend| weekend.status == WeekendStatus::Available)
        .count();
    WeekendBatch {
        total_searched: weekends.len(),
        with_vacancies,
        weekends,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::VacancyRecord;

    fn request() -> SearchRequest {
        SearchRequest::all_hotels(friday(), sunday())
    }

    fn record(hotel: &str, description: &str) -> VacancyRecord {
        VacancyRecord {
            hotel: hotel.to_string(),
            description: description.to_string(),
            full_text: format!("{}: {}", hotel, description),
        }
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 24).unwrap()
    }

    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 26).unwrap()
    }

    #[test]
    fn test_summary_lists_hotels_in_page_order() {
        let extraction = Extraction {
            records: vec![
                record("Hotel Areado", "Triplo (até 3 pessoas)"),
                record("Hotel Areado", "Duplo (até 2 pessoas)"),
                record("Unidade Perdizes", "Perdizes (até 2 pessoas)"),
            ],
            saw_sentinel: false,
        };

        let result = assemble(&request(), &extraction);
        assert!(result.has_availability);
        assert_eq!(result.status, Availability::Available);
        assert_eq!(
            result.summary,
            "Found vacancies in 2 hotel(s): Hotel Areado, Unidade Perdizes"
        );
        assert_eq!(result.vacancies.len(), 3);
        assert_eq!(result.vacancies[0], "Hotel Areado: Triplo (até 3 pessoas)");
        assert_eq!(result.hotel_groups.len(), 2);
        assert_eq!(result.hotel_groups[0].vacancies.len(), 2);
        assert_eq!(result.query_details.hotels_found, 2);
        assert_eq!(result.query_details.total_vacancies_found, 3);
    }

    #[test]
    fn test_no_rooms_summary_from_sentinel() {
        let extraction = Extraction {
            records: Vec::new(),
            saw_sentinel: true,
        };

        let result = assemble(&request(), &extraction);
        assert!(!result.has_availability);
        assert_eq!(result.status, Availability::NoAvailability);
        assert_eq!(result.summary, "No rooms available message detected");
        assert!(result.hotel_groups.is_empty());
    }

    #[test]
    fn test_no_patterns_summary_without_sentinel() {
        let extraction = Extraction::default();

        let result = assemble(&request(), &extraction);
        assert_eq!(result.summary, "No vacancy patterns found");
        assert_eq!(result.status, Availability::NoAvailability);
    }

    #[test]
    fn test_availability_flag_tracks_vacancy_list() {
        let empty = assemble(&request(), &Extraction::default());
        assert_eq!(empty.has_availability, !empty.vacancies.is_empty());

        let full = assemble(
            &request(),
            &Extraction {
                records: vec![record("Hotel Teste", "Duplo (até 2 pessoas)")],
                saw_sentinel: false,
            },
        );
        assert_eq!(full.has_availability, !full.vacancies.is_empty());
    }

    #[test]
    fn test_query_details_echo_the_request() {
        let request = SearchRequest::for_hotel(
            "12",
            NaiveDate::from_ymd_opt(2025, 12, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 7).unwrap(),
        );

        let result = assemble(&request, &Extraction::default());
        assert_eq!(result.query_details.hotel_filter, "12");
        assert_eq!(result.query_details.checkin, "2025-12-05");
        assert_eq!(result.query_details.checkout, "2025-12-07");
    }

    #[test]
    fn test_search_result_serializes_camel_case() {
        let extraction = Extraction {
            records: vec![record("Hotel Teste", "Duplo (até 2 pessoas)")],
            saw_sentinel: false,
        };

        let value = serde_json::to_value(assemble(&request(), &extraction)).unwrap();
        assert_eq!(value["hasAvailability"], true);
        assert_eq!(value["status"], "AVAILABLE");
        assert_eq!(value["queryDetails"]["hotelFilter"], "-1");
        assert_eq!(value["queryDetails"]["totalVacanciesFound"], 1);
        assert_eq!(value["hotelGroups"][0]["hotel"], "Hotel Teste");
    }

    #[test]
    fn test_successful_outcome_omits_error_field() {
        let extraction = Extraction {
            records: vec![record("Hotel Teste", "Duplo (até 2 pessoas)")],
            saw_sentinel: false,
        };
        let outcome =
            WeekendOutcome::from_result(1, friday(), sunday(), assemble(&request(), &extraction));

        assert_eq!(outcome.status, WeekendStatus::Available);
        assert_eq!(outcome.dates, "2025-10-24 to 2025-10-26");

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["weekendNumber"], 1);
        assert_eq!(value["friday"], "2025-10-24");
        assert_eq!(value["sunday"], "2025-10-26");
        assert!(value.get("error").is_none(), "error key must be absent");
        assert!(value.get("result").is_some());
    }

    #[test]
    fn test_error_outcome_omits_result_field() {
        let outcome =
            WeekendOutcome::from_error(2, friday(), sunday(), "Request timeout after 60000ms".to_string());

        assert_eq!(outcome.status, WeekendStatus::Error);

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "ERROR");
        assert_eq!(value["error"], "Request timeout after 60000ms");
        assert!(value.get("result").is_none(), "result key must be absent");
    }

    #[test]
    fn test_batch_counts_weekends_with_vacancies() {
        let available = WeekendOutcome::from_result(
            1,
            friday(),
            sunday(),
            assemble(
                &request(),
                &Extraction {
                    records: vec![record("Hotel Teste", "Duplo (até 2 pessoas)")],
                    saw_sentinel: false,
                },
            ),
        );
        let empty =
            WeekendOutcome::from_result(2, friday(), sunday(), assemble(&request(), &Extraction::default()));
        let failed = WeekendOutcome::from_error(3, friday(), sunday(), "boom".to_string());

        let batch = assemble_weekends(vec![available, empty, failed]);
        assert_eq!(batch.total_searched, 3);
        assert_eq!(batch.with_vacancies, 1);
        assert_eq!(batch.weekends[1].status, WeekendStatus::NoAvailability);
        assert_eq!(batch.weekends[2].status, WeekendStatus::Error);
    }
}
