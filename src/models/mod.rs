pub mod conversation;
pub mod partner;

pub use conversation::{
    Collected, ContactInfo, ConversationMessage, ConversationState, Direction, Flow, LegInfo,
    Node, Passenger, PassengerDetails, PaymentInformation, ProductId, ScheduleData, Tickets,
};
pub use partner::{FlightSchedule, Reservation};
