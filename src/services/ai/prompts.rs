use crate::models::Direction;

pub const AGENT_INTRO: &str = "You are a friendly concierge for an airport VIP lounge service. \
You help travellers book arrival and departure lounge experiences. Keep replies short and \
ask for one or two things at a time.";

pub const CLASSIFY: &str = r#"Classify the traveller's latest message.
Reply with exactly one word:
- booking: they want to book, reserve or buy a lounge service
- general: anything else (questions about the service, prices, opening hours, small talk)
No punctuation, no explanation."#;

pub const GENERAL: &str = "Answer the traveller's question helpfully and briefly. If they seem \
interested in booking, tell them they can simply say they would like to book a lounge.";

pub const PRODUCT_TYPE: &str = r#"Work out which product the traveller wants:
- ARRIVALONLY: lounge service when landing
- DEPARTURE: lounge service before flying out
- ARRIVALBUNDLE: both arrival and departure

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{"done": true|false, "message": "your reply to the traveller", "collected": {"productid": "ARRIVALONLY|DEPARTURE|ARRIVALBUNDLE"}}

Set done to false and ask a question in message while the product is unclear."#;

const SCHEDULE_FIELDS: &str = r#"For each leg collect:
- airportid: airport code (e.g. SIA, NMIA)
- traveldate: date of travel as YYYY-MM-DD
- flightId: the flight number exactly as the traveller gave it
- tickets: {"adulttickets": number, "childtickets": number}

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{"done": true|false, "message": "your reply", "collected": {"A": {leg} or null, "D": {leg} or null}}
Use "A" for the arrival leg and "D" for the departure leg.
Set done to true only when every field of the requested leg is known."#;

pub fn schedule_instruction(directions: &[Direction]) -> String {
    let legs = directions
        .iter()
        .map(|d| format!("{} ({})", d.label(), d.code()))
        .collect::<Vec<_>>()
        .join(" and ");
    format!("{AGENT_INTRO}\nCollect the flight details for the {legs} leg.\n{SCHEDULE_FIELDS}")
}

pub fn bundle_instruction(direction: Direction) -> String {
    format!(
        "{AGENT_INTRO}\nThe traveller booked an arrival and departure bundle. \
Now collect the {} ({}) leg only; keep any leg already given.\n{SCHEDULE_FIELDS}",
        direction.label(),
        direction.code(),
    )
}

pub fn contact_instruction(adults: u32, children: u32) -> String {
    format!(
        r#"{AGENT_INTRO}
Collect the primary contact and the details of every passenger.
There are {adults} adult(s) and {children} child(ren).
Each passenger needs title, firstname, lastname and dob (YYYY-MM-DD); adults also need an email.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{{"done": true|false, "message": "your reply",
  "contact": {{"title": "", "firstname": "", "lastname": "", "email": "", "phone": ""}},
  "passengerDetails": {{"adults": [passenger, ...], "children": [passenger, ...]}}}}
Set done to true only when the contact and all {total} passengers are complete."#,
        total = adults.saturating_add(children),
    )
}

pub const PAYMENT: &str = r#"Collect the card payment details: cardnumber, cardholdername, cvv,
expirydate (MM/YYYY), cardtype (VISA, MASTERCARD, AMEX) and cardholderemail.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{"done": true|false, "message": "your reply",
 "paymentInformation": {"cardnumber": "", "cardholdername": "", "cvv": "", "expirydate": "", "cardtype": "", "cardholderemail": ""}}
Never repeat the full card number or cvv back in message."#;

/// Stands in for the traveller's message once card details were read from it.
pub const CARD_REDACTED: &str = "[card details provided]";

pub const REPROMPT: &str = "Sorry, I didn't quite catch that. Could you say it another way?";

pub fn with_intro(instruction: &str) -> String {
    format!("{AGENT_INTRO}\n{instruction}")
}
