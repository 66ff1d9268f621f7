// handlers/protected/finance.rs - /api/finance/payments

use axum::extract::State;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::utils::{field_error, page_request, parse_label};
use crate::auth::Role;
use crate::database::models::{Payment, PaymentMethod, Student};
use crate::middleware::{perm, ApiResponse, ApiResult, Authorized, ValidJson, ValidQuery};
use crate::state::AppState;
use crate::types::Id;
use crate::validation::{self, paginate, FieldRule, FieldType, Page, PageQuery};

const PAYMENT_METHODS: &[&str] = &["现金", "微信", "支付宝", "银行卡"];

const RECORD_PAYMENT: &[FieldRule] = &[
    FieldRule::required("studentId", FieldType::Integer).min(1.0),
    FieldRule::required("amount", FieldType::Number).positive(),
    FieldRule::required("paymentMethod", FieldType::String).one_of(PAYMENT_METHODS),
    FieldRule::required("paymentDate", FieldType::Date).not_future(),
    FieldRule::optional("note", FieldType::String).max(200.0),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPayment {
    student_id: Id,
    amount: Decimal,
    payment_method: PaymentMethod,
    payment_date: NaiveDate,
    note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilter {
    pub student_id: Option<Id>,
    pub payment_method: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Payment list plus the total of the filtered rows
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub payments: Vec<Payment>,
    pub total_amount: Decimal,
}

/// GET /api/finance/payments - parents only see payments for their children
pub async fn list(
    State(state): State<AppState>,
    auth: Authorized<perm::ListPayments>,
    ValidQuery(query): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<PaymentFilter>,
) -> ApiResult<PaymentSummary> {
    let request = page_request(&state, &query)?;
    let method: Option<PaymentMethod> = parse_label("paymentMethod", filter.payment_method.as_deref())?;

    let children: Option<Vec<Id>> = if auth.role == Role::Parent {
        let parent_id = auth.id;
        let students = state.db.students.find(&|s: &Student| s.parent_id == parent_id).await?;
        Some(students.into_iter().map(|s| s.id).collect())
    } else {
        None
    };

    let mut payments = state
        .db
        .payments
        .find(&|p: &Payment| {
            children.as_ref().map_or(true, |ids| ids.contains(&p.student_id))
                && filter.student_id.map_or(true, |id| p.student_id == id)
                && method.map_or(true, |m| p.payment_method == m)
                && filter.from.map_or(true, |from| p.payment_date >= from)
                && filter.to.map_or(true, |to| p.payment_date <= to)
        })
        .await?;
    payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date).then(b.id.cmp(&a.id)));

    let total_amount = payments.iter().map(|p| p.amount).sum();
    let Page { items, pagination } = paginate(payments, request);

    Ok(ApiResponse::success(PaymentSummary {
        payments: items,
        total_amount,
    })
    .with_pagination(pagination))
}

/// POST /api/finance/payments
pub async fn record(
    State(state): State<AppState>,
    auth: Authorized<perm::RecordPayment>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<Payment> {
    let input: RecordPayment = validation::parse(RECORD_PAYMENT, body)?;

    // stored to the cent, so a sub-cent amount rounds to nothing
    let amount = input.amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(field_error("amount", "amount must be at least 0.01"));
    }

    if state.db.students.get(input.student_id).await?.is_none() {
        return Err(field_error("studentId", "studentId does not reference an existing student"));
    }

    let payment = state
        .db
        .payments
        .insert(Payment {
            id: 0,
            version: 0,
            student_id: input.student_id,
            amount,
            payment_method: input.payment_method,
            payment_date: input.payment_date,
            note: input.note,
            recorded_by: auth.id,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!("{} recorded payment {} of {} for student {}", auth.username, payment.id, payment.amount, payment.student_id);
    Ok(ApiResponse::created(payment).with_message("Payment recorded"))
}
