use crate::errors::AppError;
use crate::models::partner::{
    id_string, CardChargeRequest, CardSummary, CartLine, CartOptional, CartPassenger,
    ConfirmCartRequest, EncryptedCreditCard, OrderRequest, PaymentSummary, SendConfirmation,
};
use crate::models::{
    ContactInfo, ConversationState, Direction, PassengerDetails, PaymentInformation, ProductId,
    Reservation, ScheduleData, Tickets,
};
use crate::services::card_crypto::{encrypt_card_details, EncryptedCard};
use crate::state::AppState;

const ORDER_SOURCE: &str = "OBI-MAIN";
const PAYMENT_TYPE: &str = "GUESTCARD";
const CURRENCY: &str = "USD";

/// Everything the charge needs, copied out of the conversation.
struct Checkout {
    sessionid: String,
    product: ProductId,
    tickets: Tickets,
    reservation: Reservation,
    schedules: ScheduleData,
    contact: ContactInfo,
    passengers: PassengerDetails,
    card: PaymentInformation,
}

impl Checkout {
    fn from_state(convo: &ConversationState) -> Result<Self, AppError> {
        Ok(Self {
            sessionid: session(convo)?,
            product: convo.productid.ok_or_else(|| missing("a product"))?,
            tickets: convo.tickets().ok_or_else(|| missing("ticket counts"))?,
            reservation: convo.reservation.clone().ok_or_else(|| missing("a reservation"))?,
            schedules: convo.schedule_data.clone(),
            contact: convo.contact_info.clone().ok_or_else(|| missing("contact details"))?,
            passengers: convo
                .passenger_details
                .clone()
                .ok_or_else(|| missing("passenger details"))?,
            card: convo
                .payment_information
                .clone()
                .ok_or_else(|| missing("card details"))?,
        })
    }
}

fn missing(what: &str) -> AppError {
    AppError::InvalidState(format!("payment attempted without {what}"))
}

fn session(convo: &ConversationState) -> Result<String, AppError> {
    convo
        .sessionid
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing("a partner session"))
}

fn idempotency_key(sessionid: &str, cartitemid: i64, operation: &str) -> String {
    format!("{sessionid}-{cartitemid}-{operation}")
}

/// Charges the card unless a charged order is already awaiting confirmation,
/// then confirms the cart.
///
/// The order id is written to the conversation as soon as it is allocated and
/// reused afterwards. After a successful charge the card fields are dropped
/// and the prepared confirmation is kept until `confirmcart` accepts it.
pub async fn process_payment(app: &AppState, convo: &mut ConversationState) -> Result<(), AppError> {
    if convo.pending_confirmation.is_none() {
        charge(app, convo).await?;
    } else {
        tracing::info!(
            orderid = %convo.orderid.as_ref().map(id_string).unwrap_or_default(),
            "order already charged; retrying confirmation"
        );
    }
    confirm(app, convo).await
}

async fn charge(app: &AppState, convo: &mut ConversationState) -> Result<(), AppError> {
    let checkout = Checkout::from_state(convo)?;
    if app.config.card_encryption_key.is_empty() {
        return Err(AppError::Config("STATIC_ENCRYPTION_KEY is not set".to_string()));
    }
    let sessionid = checkout.sessionid.as_str();
    let cartitemid = checkout.reservation.cartitemid;
    let amount = checkout.reservation.retail;

    let cart = app.partner.get_cart_items(sessionid).await?;
    tracing::debug!(cart = %cart, "cart before payment");

    let orderid = match convo.orderid.clone() {
        Some(existing) => {
            tracing::info!(orderid = %id_string(&existing), "reusing allocated order");
            existing
        }
        None => {
            let request = OrderRequest {
                source: ORDER_SOURCE.to_string(),
                amount,
            };
            let allocated = app
                .partner
                .get_order_id(sessionid, &request, &idempotency_key(sessionid, cartitemid, "order"))
                .await?;
            tracing::info!(orderid = %id_string(&allocated), amount, "order allocated");
            convo.orderid = Some(allocated.clone());
            allocated
        }
    };

    let encrypted = encrypt_card_details(&checkout.card, &app.config.card_encryption_key)?;
    let charge = charge_request(&checkout.card, &encrypted, amount, orderid.clone());
    let charged = app
        .partner
        .process_card(sessionid, &charge, &idempotency_key(sessionid, cartitemid, "charge"))
        .await?;
    tracing::info!(orderid = %id_string(&orderid), "card charged");

    let authorization = charged
        .authorizationnumber
        .as_ref()
        .map(id_string)
        .unwrap_or_default();
    convo.pending_confirmation = Some(ConfirmCartRequest {
        affiliateid: "!".to_string(),
        cart: vec![cart_line(&checkout)],
        distributorid: String::new(),
        httpreferrer: String::new(),
        payment: payment_summary(&checkout.card, amount, authorization),
        referrerid: String::new(),
        sendconfirmation: SendConfirmation {
            copyto: String::new(),
            sendto: checkout.contact.email.clone(),
        },
        subaffiliateid: 0,
    });
    convo.payment_html = Some(charged.html.unwrap_or_default());
    convo.payment_information = None;
    Ok(())
}

async fn confirm(app: &AppState, convo: &mut ConversationState) -> Result<(), AppError> {
    let sessionid = session(convo)?;
    let cartitemid = convo
        .reservation
        .as_ref()
        .map(|r| r.cartitemid)
        .ok_or_else(|| missing("a reservation"))?;
    let orderid = convo.orderid.as_ref().map(id_string).unwrap_or_default();
    let confirmation = convo
        .pending_confirmation
        .as_ref()
        .ok_or_else(|| missing("a charged order"))?;

    if let Err(source) = app
        .partner
        .confirm_cart(&sessionid, confirmation, &idempotency_key(&sessionid, cartitemid, "confirm"))
        .await
    {
        tracing::error!(orderid = %orderid, error = %source, "charged cart was not confirmed");
        return Err(AppError::PaymentUnconfirmed { orderid, source });
    }

    tracing::info!(orderid = %orderid, "cart confirmed");
    convo.pending_confirmation = None;
    Ok(())
}

fn charge_request(
    card: &PaymentInformation,
    encrypted: &EncryptedCard,
    amount: f64,
    orderid: serde_json::Value,
) -> CardChargeRequest {
    CardChargeRequest {
        actiontype: "CHARGECARD".to_string(),
        creditcard: EncryptedCreditCard {
            amount,
            cardtype: card.cardtype.clone(),
            cardnumber: encrypted.card_number.clone(),
            cardholder: encrypted.card_holder_name.clone(),
            expirydate: encrypted.expiry_date.clone(),
            cvv: encrypted.cvv.clone(),
            email: card.cardholderemail.clone(),
            iv: encrypted.iv.clone(),
        },
        orderid,
    }
}

fn payment_summary(card: &PaymentInformation, amount: f64, authorization: String) -> PaymentSummary {
    PaymentSummary {
        charged: "Y".to_string(),
        creditcard: CardSummary {
            amount,
            authorizationnumber: authorization,
            cardholder: card.cardholdername.clone(),
            cardnumber: card.last_four(),
            cardtype: card.cardtype.clone(),
            currency: CURRENCY.to_string(),
            email: card.cardholderemail.clone(),
        },
        paymenttype: PAYMENT_TYPE.to_string(),
    }
}

fn cart_line(checkout: &Checkout) -> CartLine {
    let schedule_id = |direction: Direction| {
        if checkout.product.includes(direction) {
            checkout.schedules.schedule_id(direction)
        } else {
            0
        }
    };

    CartLine {
        adulttickets: checkout.tickets.adulttickets,
        amount: checkout.reservation.retail,
        arrivalscheduleid: schedule_id(Direction::Arrival),
        cartitemid: checkout.reservation.cartitemid,
        childtickets: checkout.tickets.childtickets,
        departurescheduleid: schedule_id(Direction::Departure),
        groupbooking: "N".to_string(),
        groupid: "NA".to_string(),
        infanttickets: 0,
        optional: CartOptional {
            occasioncomment: String::new(),
            paddlename: "AI Agent".to_string(),
        },
        passengers: build_passengers(&checkout.passengers, checkout.tickets, &checkout.contact),
        primarycontact: checkout.contact.clone(),
        productid: checkout.product,
        referencenumber: String::new(),
        secondarycontact: ContactInfo {
            title: "MR".to_string(),
            ..Default::default()
        },
    }
}

/// Adults first, then children, each carrying the primary contact's phone.
pub fn build_passengers(
    details: &PassengerDetails,
    tickets: Tickets,
    contact: &ContactInfo,
) -> Vec<CartPassenger> {
    let adults = details
        .adults
        .iter()
        .take(tickets.adulttickets as usize)
        .map(|p| CartPassenger {
            dob: p.dob.clone(),
            email: p.email.clone(),
            firstname: p.firstname.clone(),
            lastname: p.lastname.clone(),
            passengertype: "ADULT".to_string(),
            phone: contact.phone.clone(),
            title: p.title.clone(),
        });
    let children = details
        .children
        .iter()
        .take(tickets.childtickets as usize)
        .map(|p| CartPassenger {
            dob: p.dob.clone(),
            email: None,
            firstname: p.firstname.clone(),
            lastname: p.lastname.clone(),
            passengertype: "CHILD".to_string(),
            phone: contact.phone.clone(),
            title: p.title.clone(),
        });
    adults.chain(children).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passenger;

    fn passenger(first: &str, email: Option<&str>) -> Passenger {
        Passenger {
            title: "MS".to_string(),
            firstname: first.to_string(),
            lastname: "Traveller".to_string(),
            dob: "1990-01-01".to_string(),
            email: email.map(str::to_string),
        }
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            title: "MS".to_string(),
            firstname: "Jane".to_string(),
            lastname: "Traveller".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+18765550100".to_string(),
        }
    }

    #[test]
    fn test_passengers_adults_then_children() {
        let details = PassengerDetails {
            adults: vec![passenger("Jane", Some("jane@example.com")), passenger("John", None)],
            children: vec![passenger("Kid", Some("kid@example.com"))],
        };
        let tickets = Tickets {
            adulttickets: 2,
            childtickets: 1,
        };

        let passengers = build_passengers(&details, tickets, &contact());
        assert_eq!(passengers.len(), 3);
        assert_eq!(passengers[0].passengertype, "ADULT");
        assert_eq!(passengers[0].email.as_deref(), Some("jane@example.com"));
        assert_eq!(passengers[1].firstname, "John");
        assert_eq!(passengers[2].passengertype, "CHILD");
        assert_eq!(passengers[2].email, None);
        assert!(passengers.iter().all(|p| p.phone == "+18765550100"));
    }

    #[test]
    fn test_payment_summary_only_carries_last_four() {
        let card = PaymentInformation {
            cardnumber: "4111111111111234".to_string(),
            cardholdername: "Jane Traveller".to_string(),
            cvv: "123".to_string(),
            expirydate: "01/2030".to_string(),
            cardtype: "VISA".to_string(),
            cardholderemail: None,
        };
        let summary = payment_summary(&card, 90.0, "A1".to_string());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["creditcard"]["cardnumber"], "1234");
        assert_eq!(json["creditcard"]["currency"], "USD");
        assert_eq!(json["charged"], "Y");
        assert!(!json.to_string().contains("4111"));
        assert!(!json.to_string().contains("\"123\""));
    }
}
