// Wire types for the busca_vagas HTTP API
// Payload shapes shared by every endpoint of the remote scraper service

use serde::{Deserialize, Serialize};
use serde_json::Value;

// One entry of the AFPESP hotel dropdown, including the synthetic "Todas" option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    #[serde(rename = "hotelId")]
    pub hotel_id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,
}

// Health endpoint body; the server reports freeform metadata next to the status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,

    pub message: Option<String>,

    pub version: Option<String>,

    pub name: Option<String>,
}

// The data payload of a vacancy search: the raw page capture plus its timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSearchData {
    pub date: Option<String>,

    pub content: String,
}

// Every endpoint wraps its payload as { success, data, error? }.
// Returns the error message when the envelope reports a failure, None otherwise.
// A missing success flag is treated as success; the health endpoint has none.
pub fn envelope_failure(body: &Value) -> Option<String> {
    match body.get("success") {
        Some(Value::Bool(false)) => Some(
            body.get("error")
                .and_then(Value::as_str)
                .unwrap_or("API returned error without message")
                .to_string(),
        ),
        _ => None,
    }
}
