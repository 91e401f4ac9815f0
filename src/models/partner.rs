use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::conversation::{ContactInfo, ProductId};

// ── Responses ──

#[derive(Debug, Clone, Deserialize)]
pub struct LoginSession {
    #[serde(default)]
    pub sessionid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleList {
    #[serde(default)]
    pub flightschedule: Vec<FlightSchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightSchedule {
    #[serde(rename = "scheduleId")]
    pub schedule_id: i64,
    #[serde(rename = "flightId", default)]
    pub flight_id: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub cartitemid: i64,
    #[serde(default)]
    pub retail: f64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderAllocation {
    pub orderid: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardChargeResult {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub authorizationnumber: Option<Value>,
}

/// Renders an id the partner may send as a string or a number.
pub fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Requests ──

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub getpaymentgateway: String,
    pub languageid: String,
    pub marketid: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleQuery {
    pub direction: String,
    pub airportid: String,
    pub traveldate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemRequest {
    pub adulttickets: u32,
    pub arrivalscheduleid: i64,
    pub cartitemid: i64,
    pub childtickets: u32,
    pub departurescheduleid: i64,
    pub distributorid: String,
    pub paymenttype: String,
    pub productid: ProductId,
    pub ticketsrequested: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactRequest {
    pub contact: CartContact,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartContact {
    pub cartitemid: i64,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub source: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardChargeRequest {
    pub actiontype: String,
    pub creditcard: EncryptedCreditCard,
    pub orderid: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncryptedCreditCard {
    pub amount: f64,
    pub cardtype: String,
    pub cardnumber: String,
    pub cardholder: String,
    pub expirydate: String,
    pub cvv: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmCartRequest {
    pub affiliateid: String,
    pub cart: Vec<CartLine>,
    pub distributorid: String,
    pub httpreferrer: String,
    pub payment: PaymentSummary,
    pub referrerid: String,
    pub sendconfirmation: SendConfirmation,
    pub subaffiliateid: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub adulttickets: u32,
    pub amount: f64,
    pub arrivalscheduleid: i64,
    pub cartitemid: i64,
    pub childtickets: u32,
    pub departurescheduleid: i64,
    pub groupbooking: String,
    pub groupid: String,
    pub infanttickets: u32,
    pub optional: CartOptional,
    pub passengers: Vec<CartPassenger>,
    pub primarycontact: ContactInfo,
    pub productid: ProductId,
    pub referencenumber: String,
    pub secondarycontact: ContactInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartOptional {
    pub occasioncomment: String,
    pub paddlename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartPassenger {
    pub dob: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub firstname: String,
    pub lastname: String,
    pub passengertype: String,
    pub phone: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub charged: String,
    pub creditcard: CardSummary,
    pub paymenttype: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSummary {
    pub amount: f64,
    pub authorizationnumber: String,
    pub cardholder: String,
    pub cardnumber: String,
    pub cardtype: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendConfirmation {
    pub copyto: String,
    pub sendto: String,
}
