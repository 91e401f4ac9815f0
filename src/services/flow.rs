//! The booking conversation state machine.
//!
//! Each request resumes at `currentNode` (or `classify`) and runs nodes until
//! one needs more input from the traveller or a terminal node finishes.
//! Collection nodes stay on themselves until the model reports the step
//! done; action nodes call the partner API and advance on success only.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::partner::{CartContact, CartItemRequest, ContactRequest};
use crate::models::{
    Collected, ContactInfo, ConversationState, Direction, Flow, Node, PassengerDetails,
    PaymentInformation, ProductId,
};
use crate::services::ai::extract::{parse_extraction, parse_flow_label, Extraction};
use crate::services::ai::{prompts, Message};
use crate::services::card_crypto::format_expiry;
use crate::services::checkout;
use crate::state::AppState;

pub const MAX_STEPS_PER_TURN: usize = 16;

#[derive(Debug)]
pub enum TurnOutcome {
    Prompt {
        prompt: String,
        state: ConversationState,
    },
    Final {
        message: String,
        state: ConversationState,
    },
}

#[derive(Debug)]
enum Step {
    Advance(Node),
    Suspend { prompt: String, resume: Node },
    Finish(String),
}

enum Gathered<T> {
    Ready { message: String, payload: T },
    NeedsInput(String),
}

pub async fn run_turn(
    app: &AppState,
    mut convo: ConversationState,
    input: &str,
) -> Result<TurnOutcome, AppError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::BadRequest("input must not be empty".to_string()));
    }

    let thread = convo
        .threadid
        .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
        .clone();
    convo.input = Some(input.to_string());
    convo.push_message("user", input);

    let mut node = convo.resume_node();
    for _ in 0..MAX_STEPS_PER_TURN {
        tracing::info!(thread = %thread, node = %node, "running step");
        convo.current_node = Some(node);

        match run_node(app, &mut convo, node).await? {
            Step::Advance(next) => {
                tracing::debug!(thread = %thread, from = %node, to = %next, "advancing");
                node = next;
            }
            Step::Suspend { prompt, resume } => {
                convo.current_node = Some(resume);
                return Ok(TurnOutcome::Prompt {
                    prompt,
                    state: convo,
                });
            }
            Step::Finish(message) => {
                return Ok(TurnOutcome::Final {
                    message,
                    state: convo,
                });
            }
        }
    }

    tracing::error!(thread = %thread, node = %node, "step limit reached");
    Err(AppError::StepLimit(MAX_STEPS_PER_TURN))
}

async fn run_node(app: &AppState, convo: &mut ConversationState, node: Node) -> Result<Step, AppError> {
    match node {
        Node::Classify => classify(app, convo).await,
        Node::General => answer_general(app, convo).await,
        Node::StartBooking => start_booking(app, convo).await,
        Node::ScheduleInfo => collect_schedule(app, convo).await,
        Node::ScheduleCall => lookup_schedules(app, convo).await,
        Node::Reservation => reserve(app, convo).await,
        Node::ContactInfo => collect_contact(app, convo).await,
        Node::SetContact => submit_contact(app, convo).await,
        Node::PaymentInfo => collect_payment(app, convo).await,
        Node::ProcessPayment => match checkout::process_payment(app, convo).await {
            Ok(()) => Ok(Step::Advance(Node::ProductEnd)),
            Err(e) => Err(interrupted_payment(convo, e)),
        },
        Node::ProductEnd => Ok(product_end(convo)),
    }
}

// ── Model calls ──

async fn ask(app: &AppState, convo: &ConversationState, instruction: &str) -> Result<String, AppError> {
    let messages: Vec<Message> = convo.messages.iter().map(Message::from).collect();
    app.llm
        .chat(instruction, &messages)
        .await
        .map_err(|e| AppError::Ai(format!("{e:#}")))
}

/// Runs one field-collection round: the reply is untrusted, so anything that
/// is not a complete, well-formed payload becomes a prompt for the traveller.
async fn collect<T: DeserializeOwned>(
    app: &AppState,
    convo: &mut ConversationState,
    instruction: &str,
) -> Result<Gathered<T>, AppError> {
    let reply = ask(app, convo, instruction).await?;

    match parse_extraction::<T>(&reply) {
        Extraction::Complete { message, payload } => {
            if !message.trim().is_empty() {
                convo.push_message("assistant", &message);
            }
            Ok(Gathered::Ready { message, payload })
        }
        Extraction::Incomplete { message } => Ok(Gathered::NeedsInput(or_reprompt(message))),
        Extraction::Invalid { message, reason } => {
            tracing::warn!(reason = %reason, "model marked step done with an invalid payload");
            Ok(Gathered::NeedsInput(or_reprompt(message)))
        }
        Extraction::Unreadable { raw } => {
            // Plain prose is still a usable question; broken JSON is not.
            if raw.contains('{') {
                Ok(Gathered::NeedsInput(prompts::REPROMPT.to_string()))
            } else {
                Ok(Gathered::NeedsInput(or_reprompt(raw)))
            }
        }
    }
}

fn or_reprompt(message: String) -> String {
    if message.trim().is_empty() {
        prompts::REPROMPT.to_string()
    } else {
        message
    }
}

fn suspend(convo: &mut ConversationState, resume: Node, prompt: String) -> Step {
    convo.done = false;
    convo.push_message("assistant", &prompt);
    Step::Suspend { prompt, resume }
}

/// Card fields are dropped from the returned state. The retry resumes at the
/// card prompt, or at confirmation once the order has been charged.
fn interrupted_payment(convo: &mut ConversationState, error: AppError) -> AppError {
    convo.payment_information = None;
    convo.done = false;
    convo.current_node = Some(if convo.pending_confirmation.is_some() {
        Node::ProcessPayment
    } else {
        Node::PaymentInfo
    });
    tracing::warn!(
        node = %convo.resume_node(),
        order_allocated = convo.orderid.is_some(),
        "payment interrupted; returning resumable state"
    );
    AppError::Resumable {
        source: Box::new(error),
        state: Box::new(convo.clone()),
    }
}

fn require_session(convo: &ConversationState) -> Result<String, AppError> {
    convo
        .sessionid
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidState("no partner session; booking was not started".to_string()))
}

fn require_product(convo: &ConversationState) -> Result<ProductId, AppError> {
    convo
        .productid
        .ok_or_else(|| AppError::InvalidState("no product selected".to_string()))
}

// ── Nodes ──

async fn classify(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    if convo.flow == Some(Flow::Booking) {
        return Ok(Step::Advance(Node::StartBooking));
    }

    let reply = ask(app, convo, prompts::CLASSIFY).await?;
    let Some(flow) = parse_flow_label(&reply) else {
        tracing::warn!(reply = %reply, "classifier returned an unknown label");
        return Err(AppError::Unclassified(reply.trim().to_string()));
    };

    tracing::info!(?flow, "conversation classified");
    convo.flow = Some(flow);
    Ok(Step::Advance(match flow {
        Flow::Booking => Node::StartBooking,
        Flow::General => Node::General,
    }))
}

async fn answer_general(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    let answer = ask(app, convo, &prompts::with_intro(prompts::GENERAL)).await?;
    convo.push_message("assistant", &answer);
    // The next message is classified afresh.
    convo.current_node = None;
    Ok(Step::Finish(answer))
}

#[derive(Deserialize)]
struct ProductPayload {
    collected: ProductChoice,
}

#[derive(Deserialize)]
struct ProductChoice {
    productid: ProductId,
}

async fn start_booking(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    let instruction = prompts::with_intro(prompts::PRODUCT_TYPE);
    let payload = match collect::<ProductPayload>(app, convo, &instruction).await? {
        Gathered::Ready { payload, .. } => payload,
        Gathered::NeedsInput(prompt) => return Ok(suspend(convo, Node::StartBooking, prompt)),
    };

    let sessionid = app.partner.login().await?;
    tracing::info!(product = payload.collected.productid.as_str(), "partner session established");

    convo.sessionid = Some(sessionid);
    convo.productid = Some(payload.collected.productid);
    convo.done = true;
    Ok(Step::Advance(Node::ScheduleInfo))
}

#[derive(Deserialize)]
struct SchedulePayload {
    #[serde(default)]
    collected: Collected,
}

async fn collect_schedule(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    let product = require_product(convo)?;
    let pending: Vec<Direction> = product
        .directions()
        .iter()
        .copied()
        .filter(|d| convo.collected.get(*d).is_none())
        .collect();

    let instruction = match (product.is_bundle(), pending.first()) {
        (true, Some(next)) => prompts::bundle_instruction(*next),
        _ => prompts::schedule_instruction(product.directions()),
    };

    let (message, payload) = match collect::<SchedulePayload>(app, convo, &instruction).await? {
        Gathered::Ready { message, payload } => (message, payload),
        Gathered::NeedsInput(prompt) => return Ok(suspend(convo, Node::ScheduleInfo, prompt)),
    };

    let mut progressed = false;
    for &direction in product.directions() {
        let Some(leg) = payload.collected.get(direction) else {
            continue;
        };
        if let Err(reason) = leg.validate() {
            let prompt = format!(
                "I still need a few details for your {} flight: {reason}.",
                direction.label().to_lowercase()
            );
            return Ok(suspend(convo, Node::ScheduleInfo, prompt));
        }
        if convo.collected.get(direction) != Some(leg) {
            progressed = true;
        }
        convo.collected.set(direction, Some(leg.clone()));
    }

    if convo.collected.is_complete_for(product) {
        convo.done = true;
        return Ok(Step::Advance(Node::ScheduleCall));
    }

    convo.done = false;
    if product.is_bundle() && progressed {
        // One leg of the bundle is in; go straight on to ask for the other.
        return Ok(Step::Advance(Node::ScheduleInfo));
    }
    if message.trim().is_empty() {
        return Ok(suspend(convo, Node::ScheduleInfo, prompts::REPROMPT.to_string()));
    }
    // `collect` already put the model's reply in the transcript.
    Ok(Step::Suspend {
        prompt: message,
        resume: Node::ScheduleInfo,
    })
}

async fn lookup_schedules(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    let sessionid = require_session(convo)?;
    let product = require_product(convo)?;

    for &direction in product.directions() {
        let leg = convo.collected.get(direction).cloned().ok_or_else(|| {
            AppError::InvalidState(format!("no {} leg collected", direction.label()))
        })?;

        let schedules = app.partner.get_schedule(&sessionid, direction, &leg).await?;
        if schedules.is_empty() {
            tracing::info!(flight = %leg.flight_id, date = %leg.traveldate, "no matching flight schedule");
            convo.collected.set(direction, None);
            let prompt = format!(
                "I couldn't find flight {} on {} at {}. Could you double-check the flight number and date?",
                leg.flight_id, leg.traveldate, leg.airportid
            );
            return Ok(suspend(convo, Node::ScheduleInfo, prompt));
        }
        convo.schedule_data.set(direction, schedules);
    }

    Ok(Step::Advance(Node::Reservation))
}

async fn reserve(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    let sessionid = require_session(convo)?;
    let product = require_product(convo)?;
    let tickets = convo
        .tickets()
        .ok_or_else(|| AppError::InvalidState("no tickets collected".to_string()))?;

    let mut schedule_ids = [0i64; 2];
    for (slot, direction) in [Direction::Arrival, Direction::Departure].into_iter().enumerate() {
        if !product.includes(direction) {
            continue;
        }
        if convo.schedule_data.get(direction).map_or(true, |s| s.is_empty()) {
            return Err(AppError::InvalidState(format!(
                "no {} schedule looked up",
                direction.label()
            )));
        }
        schedule_ids[slot] = convo.schedule_data.schedule_id(direction);
    }

    let request = CartItemRequest {
        adulttickets: tickets.adulttickets,
        arrivalscheduleid: schedule_ids[0],
        cartitemid: 0,
        childtickets: tickets.childtickets,
        departurescheduleid: schedule_ids[1],
        distributorid: String::new(),
        paymenttype: "GUESTCARD".to_string(),
        productid: product,
        ticketsrequested: tickets.total(),
    };

    let reservation = app.partner.reserve_cart_item(&sessionid, &request).await?;
    tracing::info!(cartitemid = reservation.cartitemid, retail = reservation.retail, "cart item reserved");
    convo.reservation = Some(reservation);
    Ok(Step::Advance(Node::ContactInfo))
}

#[derive(Deserialize)]
struct ContactPayload {
    contact: ContactInfo,
    #[serde(rename = "passengerDetails", default)]
    passenger_details: PassengerDetails,
}

async fn collect_contact(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    let tickets = convo
        .tickets()
        .ok_or_else(|| AppError::InvalidState("no tickets collected".to_string()))?;

    let instruction = prompts::contact_instruction(tickets.adulttickets, tickets.childtickets);
    let payload = match collect::<ContactPayload>(app, convo, &instruction).await? {
        Gathered::Ready { payload, .. } => payload,
        Gathered::NeedsInput(prompt) => return Ok(suspend(convo, Node::ContactInfo, prompt)),
    };

    if let Err(prompt) = check_contact(&payload, tickets.adulttickets, tickets.childtickets) {
        return Ok(suspend(convo, Node::ContactInfo, prompt));
    }

    convo.contact_info = Some(payload.contact);
    convo.passenger_details = Some(payload.passenger_details);
    convo.done = true;
    Ok(Step::Advance(Node::SetContact))
}

fn check_contact(payload: &ContactPayload, adults: u32, children: u32) -> Result<(), String> {
    let contact = &payload.contact;
    if contact.firstname.trim().is_empty() || contact.lastname.trim().is_empty() {
        return Err("What is the full name of the main contact for this booking?".to_string());
    }
    if !contact.email.contains('@') {
        return Err("Could you give me a valid email address for the booking confirmation?".to_string());
    }
    if contact.phone.trim().is_empty() {
        return Err("What phone number can we reach the main contact on?".to_string());
    }

    let details = &payload.passenger_details;
    if details.adults.len() != adults as usize || details.children.len() != children as usize {
        return Err(format!(
            "I have details for {} adult(s) and {} child(ren), but the booking is for {adults} adult(s) and {children} child(ren). Could you give me the rest?",
            details.adults.len(),
            details.children.len(),
        ));
    }
    let unnamed = details
        .adults
        .iter()
        .chain(details.children.iter())
        .any(|p| p.firstname.trim().is_empty() || p.lastname.trim().is_empty());
    if unnamed {
        return Err("Could you give me the first and last name of every passenger?".to_string());
    }
    Ok(())
}

async fn submit_contact(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    let sessionid = require_session(convo)?;
    let cartitemid = convo
        .reservation
        .as_ref()
        .map(|r| r.cartitemid)
        .ok_or_else(|| AppError::InvalidState("no reservation to attach contact to".to_string()))?;
    let contact = convo
        .contact_info
        .as_ref()
        .ok_or_else(|| AppError::InvalidState("no contact collected".to_string()))?;

    let title = if contact.title.trim().is_empty() {
        "MR.".to_string()
    } else {
        contact.title.clone()
    };
    let request = ContactRequest {
        contact: CartContact {
            cartitemid,
            email: contact.email.clone(),
            firstname: contact.firstname.clone(),
            lastname: contact.lastname.clone(),
            phone: contact.phone.clone(),
            title,
        },
    };

    app.partner.set_contact(&sessionid, &request).await?;
    tracing::info!(cartitemid, "primary contact submitted");
    Ok(Step::Advance(Node::PaymentInfo))
}

#[derive(Deserialize)]
struct PaymentPayload {
    #[serde(rename = "paymentInformation")]
    payment_information: PaymentInformation,
}

async fn collect_payment(app: &AppState, convo: &mut ConversationState) -> Result<Step, AppError> {
    let instruction = prompts::with_intro(prompts::PAYMENT);
    let gathered = collect::<PaymentPayload>(app, convo, &instruction).await?;
    // Card text never stays in the transcript.
    convo.redact_latest_input(prompts::CARD_REDACTED);
    let card = match gathered {
        Gathered::Ready { payload, .. } => payload.payment_information,
        Gathered::NeedsInput(prompt) => return Ok(suspend(convo, Node::PaymentInfo, prompt)),
    };

    if let Err(prompt) = check_card(&card) {
        return Ok(suspend(convo, Node::PaymentInfo, prompt));
    }

    convo.payment_information = Some(card);
    convo.done = true;
    Ok(Step::Advance(Node::ProcessPayment))
}

fn check_card(card: &PaymentInformation) -> Result<(), String> {
    if card.last_four().len() < 4 {
        return Err("Could you give me the full card number?".to_string());
    }
    if card.cardholdername.trim().is_empty() {
        return Err("What is the name on the card?".to_string());
    }
    if card.cvv.trim().is_empty() {
        return Err("What is the card's security code (CVV)?".to_string());
    }
    if format_expiry(&card.expirydate).is_err() {
        return Err("What is the card's expiry date? Please use MM/YYYY.".to_string());
    }
    Ok(())
}

fn product_end(convo: &mut ConversationState) -> Step {
    convo.done = true;
    let message = match &convo.contact_info {
        Some(contact) => format!(
            "Your lounge booking is confirmed. A confirmation will be sent to {}.",
            contact.email
        ),
        None => "Your lounge booking is confirmed.".to_string(),
    };
    Step::Finish(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passenger;

    fn passenger(first: &str) -> Passenger {
        Passenger {
            firstname: first.to_string(),
            lastname: "Traveller".to_string(),
            ..Default::default()
        }
    }

    fn contact_payload(adults: usize, children: usize) -> ContactPayload {
        ContactPayload {
            contact: ContactInfo {
                title: "MS".to_string(),
                firstname: "Jane".to_string(),
                lastname: "Traveller".to_string(),
                email: "jane@example.com".to_string(),
                phone: "+18765550100".to_string(),
            },
            passenger_details: PassengerDetails {
                adults: (0..adults).map(|i| passenger(&format!("Adult{i}"))).collect(),
                children: (0..children).map(|i| passenger(&format!("Child{i}"))).collect(),
            },
        }
    }

    #[test]
    fn test_contact_passenger_counts_must_match_tickets() {
        assert!(check_contact(&contact_payload(2, 1), 2, 1).is_ok());

        let prompt = check_contact(&contact_payload(1, 1), 2, 1).unwrap_err();
        assert!(prompt.contains("2 adult(s)"));
        assert!(check_contact(&contact_payload(2, 0), 2, 1).is_err());
    }

    #[test]
    fn test_contact_requires_reachable_email() {
        let mut payload = contact_payload(1, 0);
        payload.contact.email = "not-an-email".to_string();
        assert!(check_contact(&payload, 1, 0).is_err());
    }

    #[test]
    fn test_card_checks() {
        let mut card = PaymentInformation {
            cardnumber: "4111 1111 1111 1111".to_string(),
            cardholdername: "Jane Traveller".to_string(),
            cvv: "123".to_string(),
            expirydate: "09/2028".to_string(),
            cardtype: "VISA".to_string(),
            cardholderemail: None,
        };
        assert!(check_card(&card).is_ok());

        card.expirydate = "September".to_string();
        assert!(check_card(&card).unwrap_err().contains("expiry"));

        card.expirydate = "09/28".to_string();
        card.cvv = " ".to_string();
        assert!(check_card(&card).unwrap_err().contains("CVV"));
    }

    #[test]
    fn test_empty_reply_falls_back_to_reprompt() {
        assert_eq!(or_reprompt("  ".to_string()), prompts::REPROMPT);
        assert_eq!(or_reprompt("Which date?".to_string()), "Which date?");
    }
}
