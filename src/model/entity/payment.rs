use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::repo::{ResourceType, ResourceTyped};
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Gateways report a few synonyms; anything unknown stays pending.
    pub fn from_gateway(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "completed" | "complete" | "success" | "successful" | "paid" => Self::Completed,
            "failed" | "failure" | "declined" | "error" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Payment {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    amount: i64,
    currency: String,
    phone_number: String,
    email: String,
    status: String,
    provider_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaymentCreate {
    pub course_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub phone_number: String,
    pub email: String,
}

impl ResourceTyped for Payment {
    fn get_resource_type() -> ResourceType {
        ResourceType::Payment
    }
}

impl Payment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from_gateway(&self.status)
    }

    pub fn provider_reference(&self) -> Option<&str> {
        self.provider_reference.as_deref()
    }

    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: PaymentCreate,
    ) -> DatabaseResult<Self> {
        let created = sqlx::query_as(
            r#"
            INSERT INTO payments (id, user_id, course_id, amount, currency, phone_number, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(data.course_id)
        .bind(data.amount)
        .bind(&data.currency)
        .bind(&data.phone_number)
        .bind(&data.email)
        .fetch_one(mm.executor())
        .await?;
        Ok(created)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_by_reference(
        mm: &ModelManager,
        reference: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM payments WHERE provider_reference = $1")
            .bind(reference)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Stores what the gateway reported. `completed` is final: later
    /// reports for a completed payment only fill in a missing reference.
    pub async fn set_gateway_result(
        self,
        mm: &ModelManager,
        reference: Option<&str>,
        status: PaymentStatus,
    ) -> DatabaseResult<Self> {
        let updated: Self = sqlx::query_as(
            r#"
            UPDATE payments
            SET provider_reference = COALESCE($1, provider_reference),
                status = CASE WHEN status = 'completed' THEN status ELSE $2 END
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(reference)
        .bind(status.as_str())
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        if self.status != updated.status {
            tracing::info!(payment_id = %updated.id, from = %self.status, to = %updated.status, "payment status changed");
        }
        Ok(updated)
    }

    pub async fn has_completed(
        mm: &ModelManager,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<bool> {
        let result: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM payments
                WHERE user_id = $1 AND course_id = $2 AND status = 'completed'
            )
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn list_for_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(actor.user_id())
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl HasOwner for Payment {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}
