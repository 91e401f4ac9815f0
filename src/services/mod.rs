pub mod ai;
pub mod card_crypto;
pub mod checkout;
pub mod flow;
pub mod partner;
