use std::fmt;

use serde::{Deserialize, Serialize};

use super::partner::{ConfirmCartRequest, FlightSchedule, Reservation};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Booking,
    General,
}

/// Named steps of the booking conversation. The serialized names are the
/// `currentNode` values callers echo back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Node {
    #[serde(rename = "classify")]
    Classify,
    #[serde(rename = "general")]
    General,
    #[serde(rename = "startBooking")]
    StartBooking,
    #[serde(rename = "scheduleinfo")]
    ScheduleInfo,
    #[serde(rename = "schedulecall")]
    ScheduleCall,
    #[serde(rename = "reservation")]
    Reservation,
    #[serde(rename = "contactinfo")]
    ContactInfo,
    #[serde(rename = "setcontact")]
    SetContact,
    #[serde(rename = "paymentinfo")]
    PaymentInfo,
    #[serde(rename = "processpayment")]
    ProcessPayment,
    #[serde(rename = "productend")]
    ProductEnd,
}

impl Node {
    pub fn as_str(&self) -> &'static str {
        match self {
            Node::Classify => "classify",
            Node::General => "general",
            Node::StartBooking => "startBooking",
            Node::ScheduleInfo => "scheduleinfo",
            Node::ScheduleCall => "schedulecall",
            Node::Reservation => "reservation",
            Node::ContactInfo => "contactinfo",
            Node::SetContact => "setcontact",
            Node::PaymentInfo => "paymentinfo",
            Node::ProcessPayment => "processpayment",
            Node::ProductEnd => "productend",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductId {
    ArrivalOnly,
    Departure,
    ArrivalBundle,
}

impl ProductId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductId::ArrivalOnly => "ARRIVALONLY",
            ProductId::Departure => "DEPARTURE",
            ProductId::ArrivalBundle => "ARRIVALBUNDLE",
        }
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self, ProductId::ArrivalBundle)
    }

    /// Legs this product needs, arrival first.
    pub fn directions(&self) -> &'static [Direction] {
        match self {
            ProductId::ArrivalOnly => &[Direction::Arrival],
            ProductId::Departure => &[Direction::Departure],
            ProductId::ArrivalBundle => &[Direction::Arrival, Direction::Departure],
        }
    }

    pub fn includes(&self, direction: Direction) -> bool {
        self.directions().contains(&direction)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    #[serde(rename = "A")]
    Arrival,
    #[serde(rename = "D")]
    Departure,
}

impl Direction {
    pub fn code(&self) -> &'static str {
        match self {
            Direction::Arrival => "A",
            Direction::Departure => "D",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Arrival => "ARRIVAL",
            Direction::Departure => "DEPARTURE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tickets {
    #[serde(default)]
    pub adulttickets: u32,
    #[serde(default)]
    pub childtickets: u32,
}

/// Upper bound per passenger type on a single lounge booking.
pub const MAX_TICKETS: u32 = 20;

impl Tickets {
    pub fn total(&self) -> u32 {
        self.adulttickets.saturating_add(self.childtickets)
    }
}

/// Schedule and ticket details collected for one direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegInfo {
    pub airportid: String,
    pub traveldate: String,
    #[serde(rename = "flightId")]
    pub flight_id: String,
    pub tickets: Tickets,
}

impl LegInfo {
    pub fn validate(&self) -> Result<(), String> {
        if self.airportid.trim().is_empty() {
            return Err("missing airport".to_string());
        }
        if self.flight_id.trim().is_empty() {
            return Err("missing flight number".to_string());
        }
        chrono::NaiveDate::parse_from_str(self.traveldate.trim(), "%Y-%m-%d")
            .map_err(|_| format!("travel date {:?} is not YYYY-MM-DD", self.traveldate))?;
        if self.tickets.adulttickets == 0 {
            return Err("at least one adult ticket is required".to_string());
        }
        if self.tickets.adulttickets > MAX_TICKETS || self.tickets.childtickets > MAX_TICKETS {
            return Err(format!(
                "a booking can include at most {MAX_TICKETS} adults and {MAX_TICKETS} children"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Collected {
    #[serde(rename = "A", default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<LegInfo>,
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<LegInfo>,
}

impl Collected {
    pub fn get(&self, direction: Direction) -> Option<&LegInfo> {
        match direction {
            Direction::Arrival => self.arrival.as_ref(),
            Direction::Departure => self.departure.as_ref(),
        }
    }

    pub fn set(&mut self, direction: Direction, leg: Option<LegInfo>) {
        match direction {
            Direction::Arrival => self.arrival = leg,
            Direction::Departure => self.departure = leg,
        }
    }

    pub fn is_complete_for(&self, product: ProductId) -> bool {
        product.directions().iter().all(|d| self.get(*d).is_some())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleData {
    #[serde(rename = "A", default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<Vec<FlightSchedule>>,
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<Vec<FlightSchedule>>,
}

impl ScheduleData {
    pub fn get(&self, direction: Direction) -> Option<&[FlightSchedule]> {
        match direction {
            Direction::Arrival => self.arrival.as_deref(),
            Direction::Departure => self.departure.as_deref(),
        }
    }

    pub fn set(&mut self, direction: Direction, schedules: Vec<FlightSchedule>) {
        match direction {
            Direction::Arrival => self.arrival = Some(schedules),
            Direction::Departure => self.departure = Some(schedules),
        }
    }

    /// Schedule id of the first match for `direction`, 0 when not looked up.
    pub fn schedule_id(&self, direction: Direction) -> i64 {
        self.get(direction)
            .and_then(|s| s.first())
            .map(|s| s.schedule_id)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Passenger {
    #[serde(default)]
    pub title: String,
    pub firstname: String,
    pub lastname: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PassengerDetails {
    #[serde(default)]
    pub adults: Vec<Passenger>,
    #[serde(default)]
    pub children: Vec<Passenger>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    #[serde(default)]
    pub title: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentInformation {
    pub cardnumber: String,
    pub cardholdername: String,
    pub cvv: String,
    pub expirydate: String,
    #[serde(default)]
    pub cardtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardholderemail: Option<String>,
}

impl PaymentInformation {
    pub fn last_four(&self) -> String {
        let digits: Vec<char> = self.cardnumber.chars().filter(|c| c.is_ascii_digit()).collect();
        digits[digits.len().saturating_sub(4)..].iter().collect()
    }
}

// Card data must never reach the logs.
impl fmt::Debug for PaymentInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentInformation")
            .field("cardnumber", &format_args!("****{}", self.last_four()))
            .field("cardholdername", &self.cardholdername)
            .field("cvv", &"***")
            .field("expirydate", &self.expirydate)
            .field("cardtype", &self.cardtype)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
}

/// The whole conversation, round-tripped by the caller on every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<Flow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threadid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessionid: Option<String>,
    pub done: bool,
    #[serde(rename = "currentNode", skip_serializing_if = "Option::is_none")]
    pub current_node: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub productid: Option<ProductId>,
    pub collected: Collected,
    #[serde(rename = "scheduleData")]
    pub schedule_data: ScheduleData,
    #[serde(rename = "passengerDetails", skip_serializing_if = "Option::is_none")]
    pub passenger_details: Option<PassengerDetails>,
    #[serde(rename = "contactInfo", skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
    #[serde(rename = "reseravationData", skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
    #[serde(rename = "paymentInformation", skip_serializing_if = "Option::is_none")]
    pub payment_information: Option<PaymentInformation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderid: Option<serde_json::Value>,
    #[serde(rename = "paymentHtml", skip_serializing_if = "Option::is_none")]
    pub payment_html: Option<String>,
    /// Set once the card is charged; cleared when the cart is confirmed.
    #[serde(rename = "pendingConfirmation", skip_serializing_if = "Option::is_none")]
    pub pending_confirmation: Option<ConfirmCartRequest>,
    pub messages: Vec<ConversationMessage>,
}

impl ConversationState {
    pub fn resume_node(&self) -> Node {
        self.current_node.unwrap_or(Node::Classify)
    }

    pub fn push_message(&mut self, role: &str, content: &str) {
        self.messages.push(ConversationMessage {
            role: role.to_string(),
            content: content.to_string(),
        });
    }

    /// Replaces the current input and the text of the latest user message.
    pub fn redact_latest_input(&mut self, replacement: &str) {
        if self.input.is_some() {
            self.input = Some(replacement.to_string());
        }
        if let Some(message) = self.messages.iter_mut().rev().find(|m| m.role == "user") {
            message.content = replacement.to_string();
        }
    }

    /// Ticket counts of the booking, taken from the arrival leg when present.
    pub fn tickets(&self) -> Option<Tickets> {
        self.collected
            .arrival
            .as_ref()
            .or(self.collected.departure.as_ref())
            .map(|leg| leg.tickets)
    }
}
