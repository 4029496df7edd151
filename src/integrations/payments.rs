use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{IntegrationError, IntegrationResult, truncate_body};
use crate::config::Payments;

const SERVICE: &str = "payment gateway";

/// Checkout request sent to the gateway. `reference` is the local payment id.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub amount: i64,
    pub currency: String,
    pub phone_number: String,
    pub email: String,
    pub reference: String,
    pub description: String,
    pub callback_url: String,
}

/// Gateway view of a checkout: its own reference and a free-form status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutStatus {
    pub reference: String,
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn checkout(&self, request: &CheckoutRequest) -> IntegrationResult<CheckoutStatus>;
    async fn status(&self, reference: &str) -> IntegrationResult<CheckoutStatus>;
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(client: reqwest::Client, config: &Payments) -> Self {
        Self {
            client,
            api_url: config.api_url().trim_end_matches('/').to_string(),
            api_key: config.api_key().to_string(),
        }
    }

    fn checkout_url(&self, reference: Option<&str>) -> String {
        match reference {
            Some(reference) => format!("{}/checkout/{reference}", self.api_url),
            None => format!("{}/checkout", self.api_url),
        }
    }

    async fn parse(response: reqwest::Response) -> IntegrationResult<CheckoutStatus> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::UpstreamStatus {
                service: SERVICE,
                status: status.as_u16(),
                body: truncate_body(body, 512),
            });
        }

        let checkout: CheckoutStatus = response.json().await?;
        if checkout.reference.trim().is_empty() {
            return Err(IntegrationError::UnexpectedPayload {
                service: SERVICE,
                reason: String::from("empty reference"),
            });
        }
        Ok(checkout)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip_all, fields(reference = %request.reference))]
    async fn checkout(&self, request: &CheckoutRequest) -> IntegrationResult<CheckoutStatus> {
        let response = self
            .client
            .post(self.checkout_url(None))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;
        Self::parse(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn status(&self, reference: &str) -> IntegrationResult<CheckoutStatus> {
        let response = self
            .client
            .get(self.checkout_url(Some(reference)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::parse(response).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn gateway(url: &str) -> HttpPaymentGateway {
        HttpPaymentGateway {
            client: reqwest::Client::new(),
            api_url: url.trim_end_matches('/').to_string(),
            api_key: String::from("key"),
        }
    }

    #[test]
    fn checkout_urls() {
        let gw = gateway("https://pay.example.com/v1/");
        assert_eq!(gw.checkout_url(None), "https://pay.example.com/v1/checkout");
        assert_eq!(
            gw.checkout_url(Some("ref-1")),
            "https://pay.example.com/v1/checkout/ref-1"
        );
    }

    #[test]
    fn checkout_request_wire_format() {
        let request = CheckoutRequest {
            amount: 1500,
            currency: String::from("KES"),
            phone_number: String::from("+254700000000"),
            email: String::from("a@b.co"),
            reference: String::from("local-id"),
            description: String::from("Python Basics"),
            callback_url: String::from("http://localhost/cb"),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["amount"], 1500);
        assert_eq!(value["reference"], "local-id");
        assert_eq!(value["callback_url"], "http://localhost/cb");
    }
}
