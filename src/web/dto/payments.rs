use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct InitiatePaymentBody {
    pub course_id: Uuid,
    pub amount: i64,
    pub phone_number: String,
    pub email: String,
}

/// Status notification pushed by the gateway.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PaymentCallbackBody {
    pub reference: String,
    pub status: String,
}
