use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payments;

/// Append-only ledger row, one per charge attempt. Failed attempts carry no
/// payment key.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub user_id: String,
    pub subscription_id: Uuid,
    pub payment_key: Option<String>,
    pub order_id: String,
    pub amount: i32,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentEntity {
    pub user_id: String,
    pub subscription_id: Uuid,
    pub payment_key: Option<String>,
    pub order_id: String,
    pub amount: i32,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
}
