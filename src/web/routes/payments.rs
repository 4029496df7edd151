use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    Config,
    integrations::payments::CheckoutRequest,
    model::{
        ResourceTyped,
        entity::{Enrollment, Payment, PaymentCreate, PaymentStatus},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::payments::{InitiatePaymentBody, PaymentCallbackBody},
        error::ErrorResponse,
        middlewares,
        routes::{courses::find_visible_course, ensure_owner},
        validation::{Validator, is_valid_email},
    },
};

pub const CALLBACK_SECRET_HEADER: &str = "x-callback-secret";

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/", get(payments_list_handler).post(payments_initiate_handler))
        .route("/{id}/verify", post(payments_verify_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/callback", post(payments_callback_handler))
        .merge(protected)
        .with_state(state)
}

async fn find_payment(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Payment> {
    Payment::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Payment::get_resource_type()))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    description = "Creates a pending payment for a course and starts a gateway checkout",
    request_body = InitiatePaymentBody,
    responses(
        (status = 201, description = "Checkout started", body = Payment),
        (status = 400, description = "Invalid amount or contact info", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Course already paid for or enrolled", body = ErrorResponse),
        (status = 500, description = "Payment gateway failure", body = ErrorResponse),
    ),
    tag = "payments",
    security(("bearer" = []), ("cookie" = []))
)]
async fn payments_initiate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<InitiatePaymentBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_visible_course(&state, user, payload.course_id).await?;

    Validator::new()
        .check(payload.amount > 0, "Amount must be positive")
        .check(
            payload.amount == course.price(),
            format!("Amount must equal the course price of {}", course.price()),
        )
        .check(is_valid_email(&payload.email), "Invalid email format")
        .check(
            !payload.phone_number.trim().is_empty(),
            "Phone number is required",
        )
        .finish()?;

    let mm = state.pool();
    let payment_err = |e| WebError::resource_db_error(Payment::get_resource_type(), e);

    let (enrolled, paid) = tokio::try_join!(
        Enrollment::find_for(mm, user.user_id(), course.id()),
        Payment::has_completed(mm, user.user_id(), course.id()),
    )
    .map_err(payment_err)?;
    if enrolled.is_some() || paid {
        return Err(WebError::resource_conflict(
            Payment::get_resource_type(),
            "Course is already paid for",
        ));
    }

    let data = PaymentCreate {
        course_id: course.id(),
        amount: payload.amount,
        currency: course.currency().to_string(),
        phone_number: payload.phone_number.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
    };
    let payment = Payment::create(mm, user, data).await.map_err(payment_err)?;
    tracing::info!(payment_id = %payment.id(), course_id = %course.id(), "payment initiated");

    let config = Config::get_or_init(false).await;
    let request = CheckoutRequest {
        amount: payment.amount(),
        currency: payment.currency().to_string(),
        phone_number: payment.phone_number().to_string(),
        email: payment.email().to_string(),
        reference: payment.id().to_string(),
        description: course.title().to_string(),
        callback_url: config.payments().callback_url().to_string(),
    };

    match state.integrations().payments().checkout(&request).await {
        Ok(checkout) => {
            let status = PaymentStatus::from_gateway(&checkout.status);
            let updated = payment
                .set_gateway_result(mm, Some(&checkout.reference), status)
                .await
                .map_err(payment_err)?;
            Ok((StatusCode::CREATED, Json(updated)))
        }
        Err(e) => {
            payment
                .set_gateway_result(mm, None, PaymentStatus::Failed)
                .await
                .map_err(payment_err)?;
            Err(WebError::upstream_error(e))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    description = "The caller's payments, newest first",
    responses(
        (status = 200, description = "Payments", body = Vec<Payment>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "payments",
    security(("bearer" = []), ("cookie" = []))
)]
async fn payments_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let payments = Payment::list_for_user(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(payments)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/verify",
    description = "Asks the gateway for the current checkout status and stores it",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Status refreshed", body = Payment),
        (status = 400, description = "Checkout was never started", body = ErrorResponse),
        (status = 403, description = "Not your payment", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 500, description = "Payment gateway failure", body = ErrorResponse),
    ),
    tag = "payments",
    security(("bearer" = []), ("cookie" = []))
)]
async fn payments_verify_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let payment = find_payment(&state, user, id).await?;
    ensure_owner(state.pool(), user, &payment).await?;

    let Some(reference) = payment.provider_reference().map(str::to_string) else {
        return Err(WebError::resource_bad_request(
            Payment::get_resource_type(),
            "Payment has no gateway reference",
        ));
    };

    let checkout = state
        .integrations()
        .payments()
        .status(&reference)
        .await
        .map_err(WebError::upstream_error)?;

    let updated = payment
        .set_gateway_result(state.pool(), None, PaymentStatus::from_gateway(&checkout.status))
        .await
        .map_err(|e| WebError::resource_db_error(Payment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/callback",
    description = "Status notification from the payment gateway, authenticated by the \
                   `X-Callback-Secret` header",
    request_body = PaymentCallbackBody,
    responses(
        (status = 200, description = "Status stored", body = Payment),
        (status = 401, description = "Missing or wrong callback secret", body = ErrorResponse),
        (status = 404, description = "Unknown reference", body = ErrorResponse),
    ),
    tag = "payments"
)]
async fn payments_callback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PaymentCallbackBody>,
) -> WebResult<impl IntoResponse> {
    let config = Config::get_or_init(false).await;
    let expected = config.payments().callback_secret();
    let provided = headers
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    // an unset secret disables the endpoint
    if expected.is_empty() || provided != Some(expected) {
        tracing::warn!(reference = %payload.reference, "payment callback rejected");
        return Err(WebError::auth_required());
    }

    let payment = Payment::find_by_reference(state.pool(), &payload.reference)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Payment::get_resource_type()))?;

    let updated = payment
        .set_gateway_result(state.pool(), None, PaymentStatus::from_gateway(&payload.status))
        .await
        .map_err(|e| WebError::resource_db_error(Payment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}
