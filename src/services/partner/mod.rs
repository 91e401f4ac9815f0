pub mod http;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::partner::{
    CardChargeRequest, CardChargeResult, CartItemRequest, ConfirmCartRequest, ContactRequest,
    FlightSchedule, OrderRequest, Reservation,
};
use crate::models::{Direction, LegInfo};

#[derive(Debug, thiserror::Error)]
pub enum PartnerError {
    #[error("{endpoint}: request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint}: HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("{endpoint}: rejected with failstatus {failstatus}: {detail}")]
    Rejected {
        endpoint: &'static str,
        failstatus: i64,
        detail: String,
    },

    #[error("{endpoint}: response carried no data")]
    MissingData { endpoint: &'static str },

    #[error("{endpoint}: unexpected response shape: {reason}")]
    Decode { endpoint: &'static str, reason: String },

    #[error("login returned an empty session id")]
    EmptySession,
}

/// The partner reservation and payment API. Every call after `login`
/// needs the session id it returned.
#[async_trait]
pub trait PartnerApi: Send + Sync {
    async fn login(&self) -> Result<String, PartnerError>;

    /// Schedules for the leg's direction, airport and date that carry the
    /// leg's exact flight id.
    async fn get_schedule(
        &self,
        sessionid: &str,
        direction: Direction,
        leg: &LegInfo,
    ) -> Result<Vec<FlightSchedule>, PartnerError>;

    async fn reserve_cart_item(
        &self,
        sessionid: &str,
        request: &CartItemRequest,
    ) -> Result<Reservation, PartnerError>;

    async fn set_contact(&self, sessionid: &str, request: &ContactRequest)
        -> Result<(), PartnerError>;

    async fn get_cart_items(&self, sessionid: &str) -> Result<Value, PartnerError>;

    async fn get_order_id(
        &self,
        sessionid: &str,
        request: &OrderRequest,
        idempotency_key: &str,
    ) -> Result<Value, PartnerError>;

    async fn process_card(
        &self,
        sessionid: &str,
        request: &CardChargeRequest,
        idempotency_key: &str,
    ) -> Result<CardChargeResult, PartnerError>;

    async fn confirm_cart(
        &self,
        sessionid: &str,
        request: &ConfirmCartRequest,
        idempotency_key: &str,
    ) -> Result<Value, PartnerError>;
}

/// Checks HTTP status and `failstatus`, returning the response body.
pub fn check_envelope(endpoint: &'static str, status: u16, body: &[u8]) -> Result<Value, PartnerError> {
    if !(200..300).contains(&status) {
        return Err(PartnerError::Status { endpoint, status });
    }

    let body: Value = serde_json::from_slice(body).map_err(|e| PartnerError::Decode {
        endpoint,
        reason: e.to_string(),
    })?;

    let failstatus = body.get("failstatus").and_then(Value::as_i64).unwrap_or(0);
    if failstatus != 0 {
        let detail = body
            .get("error")
            .or_else(|| body.get("message"))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        return Err(PartnerError::Rejected {
            endpoint,
            failstatus,
            detail,
        });
    }

    Ok(body)
}

/// Decodes the `data` member of a checked response body.
pub fn decode_data<T: DeserializeOwned>(endpoint: &'static str, body: Value) -> Result<T, PartnerError> {
    let data = match body {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    };
    if data.is_null() {
        return Err(PartnerError::MissingData { endpoint });
    }
    serde_json::from_value(data).map_err(|e| PartnerError::Decode {
        endpoint,
        reason: e.to_string(),
    })
}

pub fn matching_flights(schedules: Vec<FlightSchedule>, flight_id: &str) -> Vec<FlightSchedule> {
    let flight_id = flight_id.trim();
    schedules
        .into_iter()
        .filter(|s| s.flight_id == flight_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::partner::{LoginSession, ScheduleList};

    #[test]
    fn test_successful_envelope() {
        let body = br#"{"failstatus":0,"data":{"sessionid":"abc123"}}"#;
        let checked = check_envelope("login", 200, body).unwrap();
        let session: LoginSession = decode_data("login", checked).unwrap();
        assert_eq!(session.sessionid, "abc123");
    }

    #[test]
    fn test_failstatus_is_rejection() {
        let body = br#"{"failstatus":1,"error":{"errorcode":401,"errormessage":"invalid session"}}"#;
        match check_envelope("getschedule", 200, body) {
            Err(PartnerError::Rejected {
                endpoint,
                failstatus,
                detail,
            }) => {
                assert_eq!(endpoint, "getschedule");
                assert_eq!(failstatus, 1);
                assert!(detail.contains("invalid session"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_http_error_status() {
        let result = check_envelope("reservecartitem", 502, b"<html>bad gateway</html>");
        assert!(matches!(result, Err(PartnerError::Status { status: 502, .. })));
    }

    #[test]
    fn test_missing_data() {
        let checked = check_envelope("getorderid", 200, br#"{"failstatus":0}"#).unwrap();
        let result = decode_data::<Value>("getorderid", checked);
        assert!(matches!(result, Err(PartnerError::MissingData { .. })));
    }

    #[test]
    fn test_non_json_body() {
        let result = check_envelope("login", 200, b"not json");
        assert!(matches!(result, Err(PartnerError::Decode { .. })));
    }

    #[test]
    fn test_matching_flights_filters_exactly() {
        let list: ScheduleList = serde_json::from_value(json!({
            "flightschedule": [
                {"scheduleId": 11, "flightId": "AA123", "airline": "AA"},
                {"scheduleId": 12, "flightId": "AA1234"},
                {"scheduleId": 13, "flightId": "BA9"}
            ]
        }))
        .unwrap();

        let matched = matching_flights(list.flightschedule, " AA123 ");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].schedule_id, 11);
        assert_eq!(matched[0].details["airline"], "AA");
    }
}
