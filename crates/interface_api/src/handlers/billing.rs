//! Billing handlers
//!
//! Thin translation between HTTP and [`domain_billing::BillingLedger`]: the
//! caller's role comes from the JWT claims, amounts are interpreted in the
//! clinic currency, and every rule is enforced by the ledger.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BillId, Money, PatientId};
use domain_billing::NewBillItem;

use crate::auth::Claims;
use crate::dto::billing::*;
use crate::{error::ApiError, AppState};

fn money(state: &AppState, amount: Decimal) -> Money {
    Money::new(amount, state.ledger.settings().currency)
}

/// Creates a bill with its initial items
pub async fn create_bill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    request.validate()?;

    let items = request
        .items
        .into_iter()
        .map(|item| NewBillItem::new(item.description, money(&state, item.amount)))
        .collect();

    let bill = state
        .ledger
        .create_bill(
            claims.role,
            PatientId::from(request.patient_id),
            items,
            request.treatment_id.map(Into::into),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BillResponse::from(&bill))))
}

/// Lists bills, newest first
pub async fn list_bills(
    State(state): State<AppState>,
    Query(params): Query<ListBillsParams>,
) -> Result<Json<Vec<BillResponse>>, ApiError> {
    params.validate()?;

    let bills = state.ledger.list_bills(params.into()).await?;
    Ok(Json(bills.iter().map(BillResponse::from).collect()))
}

/// Gets a bill by ID
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = state.ledger.get_bill(BillId::from(id)).await?;
    Ok(Json(BillResponse::from(&bill)))
}

/// Deletes an unfinalized bill
pub async fn delete_bill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.ledger.delete_bill(claims.role, BillId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Appends a line item
pub async fn add_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<BillItemRequest>,
) -> Result<Json<BillResponse>, ApiError> {
    request.validate()?;

    let amount = money(&state, request.amount);
    let bill = state
        .ledger
        .add_bill_item(claims.role, BillId::from(id), request.description, amount)
        .await?;
    Ok(Json(BillResponse::from(&bill)))
}

/// Replaces the discount
pub async fn apply_discount(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<DiscountRequest>,
) -> Result<Json<BillResponse>, ApiError> {
    let discount = money(&state, request.discount);
    let bill = state
        .ledger
        .apply_discount(claims.role, BillId::from(id), discount)
        .await?;
    Ok(Json(BillResponse::from(&bill)))
}

/// Records a payment
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    let amount = money(&state, request.amount);
    let bill = state
        .ledger
        .record_payment(BillId::from(id), amount, request.method)
        .await?;
    Ok((StatusCode::CREATED, Json(BillResponse::from(&bill))))
}

/// Finalizes a bill
pub async fn finalize_bill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = state
        .ledger
        .finalize_bill(claims.role, BillId::from(id))
        .await?;
    Ok(Json(BillResponse::from(&bill)))
}

/// Lists a patient's bills, newest first
pub async fn patient_bills(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<BillResponse>>, ApiError> {
    let bills = state
        .ledger
        .bills_for_patient(PatientId::from(patient_id))
        .await?;
    Ok(Json(bills.iter().map(BillResponse::from).collect()))
}

/// Today's income and the number of bills still owing
pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let stats = state.ledger.dashboard_stats().await?;
    Ok(Json(stats.into()))
}
