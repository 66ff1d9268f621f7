use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::impl_entity;
use crate::types::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "现金")]
    Cash,
    #[serde(rename = "微信")]
    WeChat,
    #[serde(rename = "支付宝")]
    Alipay,
    #[serde(rename = "银行卡")]
    BankCard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Id,
    pub version: u32,
    pub student_id: Id,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub note: Option<String>,
    pub recorded_by: Id,
    pub created_at: DateTime<Utc>,
}

impl_entity!(Payment, "payments");
