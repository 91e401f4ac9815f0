use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::{check_envelope, decode_data, matching_flights, PartnerApi, PartnerError};
use crate::config::AppConfig;
use crate::models::partner::{
    CardChargeRequest, CardChargeResult, CartItemRequest, ConfirmCartRequest, ContactRequest,
    FlightSchedule, LoginRequest, LoginSession, OrderAllocation, OrderRequest, Reservation,
    ScheduleList, ScheduleQuery,
};
use crate::models::{Direction, LegInfo};

pub struct HttpPartnerClient {
    base_url: String,
    username: String,
    password: String,
    market_id: String,
    language_id: String,
    client: reqwest::Client,
}

impl HttpPartnerClient {
    pub fn new(config: &AppConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.partner_api_url.trim_end_matches('/').to_string(),
            username: config.partner_username.clone(),
            password: config.partner_password.clone(),
            market_id: config.partner_market_id.clone(),
            language_id: config.partner_language_id.clone(),
            client,
        })
    }

    async fn post<R: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        sessionid: Option<&str>,
        request: &R,
        idempotency_key: Option<&str>,
    ) -> Result<Value, PartnerError> {
        let mut envelope = json!({
            "failstatus": 0,
            "request": request,
            "username": self.username,
        });
        if let Some(sessionid) = sessionid {
            envelope["sessionid"] = json!(sessionid);
        }

        let mut req = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .json(&envelope);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }

        tracing::debug!(endpoint, "calling partner API");

        let result = async {
            let resp = req
                .send()
                .await
                .map_err(|source| PartnerError::Transport { endpoint, source })?;
            let status = resp.status().as_u16();
            let body = resp
                .bytes()
                .await
                .map_err(|source| PartnerError::Transport { endpoint, source })?;
            check_envelope(endpoint, status, &body)
        }
        .await;

        if let Err(e) = &result {
            tracing::error!(endpoint, error = %e, "partner API call failed");
        }
        result
    }
}

#[async_trait]
impl PartnerApi for HttpPartnerClient {
    async fn login(&self) -> Result<String, PartnerError> {
        let request = LoginRequest {
            getpaymentgateway: "Y".to_string(),
            languageid: self.language_id.clone(),
            marketid: self.market_id.clone(),
            password: self.password.clone(),
            username: self.username.clone(),
        };
        let body = self.post("login", None, &request, None).await?;
        let session: LoginSession = decode_data("login", body)?;
        if session.sessionid.trim().is_empty() {
            return Err(PartnerError::EmptySession);
        }
        Ok(session.sessionid)
    }

    async fn get_schedule(
        &self,
        sessionid: &str,
        direction: Direction,
        leg: &LegInfo,
    ) -> Result<Vec<FlightSchedule>, PartnerError> {
        let query = ScheduleQuery {
            direction: direction.code().to_string(),
            airportid: leg.airportid.clone(),
            traveldate: leg.traveldate.clone(),
        };
        let body = self.post("getschedule", Some(sessionid), &query, None).await?;
        let list: ScheduleList = decode_data("getschedule", body)?;
        Ok(matching_flights(list.flightschedule, &leg.flight_id))
    }

    async fn reserve_cart_item(
        &self,
        sessionid: &str,
        request: &CartItemRequest,
    ) -> Result<Reservation, PartnerError> {
        let body = self
            .post("reservecartitem", Some(sessionid), request, None)
            .await?;
        decode_data("reservecartitem", body)
    }

    async fn set_contact(
        &self,
        sessionid: &str,
        request: &ContactRequest,
    ) -> Result<(), PartnerError> {
        self.post("setcontact", Some(sessionid), request, None).await?;
        Ok(())
    }

    async fn get_cart_items(&self, sessionid: &str) -> Result<Value, PartnerError> {
        let body = self
            .post("getcartitems", Some(sessionid), &json!({}), None)
            .await?;
        decode_data("getcartitems", body)
    }

    async fn get_order_id(
        &self,
        sessionid: &str,
        request: &OrderRequest,
        idempotency_key: &str,
    ) -> Result<Value, PartnerError> {
        let body = self
            .post("getorderid", Some(sessionid), request, Some(idempotency_key))
            .await?;
        let allocation: OrderAllocation = decode_data("getorderid", body)?;
        Ok(allocation.orderid)
    }

    async fn process_card(
        &self,
        sessionid: &str,
        request: &CardChargeRequest,
        idempotency_key: &str,
    ) -> Result<CardChargeResult, PartnerError> {
        let body = self
            .post("processcard", Some(sessionid), request, Some(idempotency_key))
            .await?;
        // The gateway fragment is optional; a bare success carries no data.
        match decode_data("processcard", body) {
            Err(PartnerError::MissingData { .. }) => Ok(CardChargeResult::default()),
            other => other,
        }
    }

    async fn confirm_cart(
        &self,
        sessionid: &str,
        request: &ConfirmCartRequest,
        idempotency_key: &str,
    ) -> Result<Value, PartnerError> {
        let body = self
            .post("confirmcart", Some(sessionid), request, Some(idempotency_key))
            .await?;
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_built_from_config() {
        let mut config = AppConfig::from_env();
        config.partner_api_url = "http://partner.test/api/".to_string();
        config.partner_username = "agent".to_string();
        config.http_timeout_secs = 5;

        let client = HttpPartnerClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://partner.test/api");
        assert_eq!(client.username, "agent");
    }
}
