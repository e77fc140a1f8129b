//! Billing DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_billing::{Bill, BillItem, BillQuery, BillStatus, DashboardStats, Payment, PaymentMethod};

/// Largest page a list request may ask for
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Deserialize, Validate)]
pub struct BillItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBillRequest {
    pub patient_id: Uuid,
    pub treatment_id: Option<Uuid>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<BillItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub discount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
}

/// Query string for `GET /bills`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListBillsParams {
    pub patient_id: Option<Uuid>,
    pub status: Option<BillStatus>,
    #[serde(default)]
    pub outstanding_only: bool,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListBillsParams> for BillQuery {
    fn from(params: ListBillsParams) -> Self {
        BillQuery {
            patient_id: params.patient_id.map(Into::into),
            status: params.status,
            outstanding_only: params.outstanding_only,
            limit: Some(params.limit.unwrap_or(100).min(MAX_PAGE_SIZE)),
            offset: params.offset,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillItemResponse {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&BillItem> for BillItemResponse {
    fn from(item: &BillItem) -> Self {
        Self {
            id: item.id.into(),
            description: item.description.clone(),
            amount: item.amount.amount(),
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub received_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.into(),
            amount: payment.amount.amount(),
            method: payment.method,
            received_at: payment.received_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillResponse {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub currency: String,
    pub items: Vec<BillItemResponse>,
    pub payments: Vec<PaymentResponse>,
    pub discount: Decimal,
    pub total: Decimal,
    pub paid: Decimal,
    pub due: Decimal,
    pub status: BillStatus,
    pub is_finalized: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Bill> for BillResponse {
    fn from(bill: &Bill) -> Self {
        Self {
            id: bill.id.into(),
            patient_id: bill.patient_id.into(),
            treatment_id: bill.treatment_id.map(Into::into),
            currency: bill.currency.code().to_string(),
            items: bill.items.iter().map(BillItemResponse::from).collect(),
            payments: bill.payments.iter().map(PaymentResponse::from).collect(),
            discount: bill.discount.amount(),
            total: bill.total.amount(),
            paid: bill.paid.amount(),
            due: bill.due.amount(),
            status: bill.status,
            is_finalized: bill.is_finalized,
            version: bill.version,
            created_at: bill.created_at,
            updated_at: bill.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub currency: String,
    pub income_today: Decimal,
    /// `income_today` formatted with the currency symbol
    pub income_today_display: String,
    pub pending_count: u64,
}

impl From<DashboardStats> for DashboardResponse {
    fn from(stats: DashboardStats) -> Self {
        Self {
            date: stats.date,
            currency: stats.income_today.currency().code().to_string(),
            income_today: stats.income_today.amount(),
            income_today_display: stats.income_today.to_string(),
            pending_count: stats.pending_count,
        }
    }
}
