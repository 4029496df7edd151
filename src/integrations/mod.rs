//! Outbound services: the chat-completion provider behind the learning
//! assistant and the payment gateway used for course checkout.
//!
//! Both sit behind traits so the server can run against in-process fakes.

use std::{sync::Arc, time::Duration};

use crate::Config;

mod error;
pub use error::{IntegrationError, IntegrationResult};

pub mod chat;
pub use chat::{ChatMessage, ChatProvider, HttpChatProvider};

pub mod payments;
pub use payments::{CheckoutRequest, CheckoutStatus, HttpPaymentGateway, PaymentGateway};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Integrations {
    chat: Arc<dyn ChatProvider>,
    payments: Arc<dyn PaymentGateway>,
}

impl std::fmt::Debug for Integrations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integrations").finish_non_exhaustive()
    }
}

impl Integrations {
    pub fn new(chat: Arc<dyn ChatProvider>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { chat, payments }
    }

    pub fn from_config(config: &Config) -> IntegrationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::new(
            Arc::new(HttpChatProvider::new(client.clone(), config.chat())),
            Arc::new(HttpPaymentGateway::new(client, config.payments())),
        ))
    }

    pub fn chat(&self) -> &dyn ChatProvider {
        self.chat.as_ref()
    }

    pub fn payments(&self) -> &dyn PaymentGateway {
        self.payments.as_ref()
    }
}

/// Keeps at most `max` bytes of an upstream error body for logging.
fn truncate_body(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}
